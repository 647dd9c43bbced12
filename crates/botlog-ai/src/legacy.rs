//! Best-effort prompt extraction from freeform analyzer output.
//!
//! When the analyzer falls back to the legacy freeform format, the UI still
//! lets the user pick prompts out of the text. This module's contract is
//! narrow: return zero or more extracted options and never fail. Output
//! quality is degraded by nature — it mines markdown conventions the model
//! usually, but not always, follows.

use regex::Regex;

/// One prompt option mined from a freeform suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptOption {
    pub id: String,
    pub style: String,
    pub description: String,
    pub prompt: String,
}

/// Minimum length for a mined prompt; anything shorter is markdown debris.
const MIN_PROMPT_LEN: usize = 10;

struct Patterns {
    heading: Regex,
    bold_style: Regex,
    bracket_style: Regex,
    plain_style: Regex,
    description: Regex,
    quoted_prompt: Regex,
    bare_prompt: Regex,
}

impl Patterns {
    fn compile() -> Option<Self> {
        Some(Self {
            heading: Regex::new(r"(?i)###\s*Prompt\s*\d+[\s:]*").ok()?,
            bold_style: Regex::new(r"^\s*\*\*([^*\n]+)\*\*").ok()?,
            bracket_style: Regex::new(r"^\s*\[([^\]\n]+)\]").ok()?,
            plain_style: Regex::new(r"^\s*([^\n*\[\]]+)").ok()?,
            description: Regex::new(r"(?i)\*\*Description[*:]+\s*([^\n]+)").ok()?,
            quoted_prompt: Regex::new(r#"(?i)\*\*Prompt[*:]+\s*"([^"]+)""#).ok()?,
            bare_prompt: Regex::new(r"(?i)\*\*Prompt[*:]+\s*([^\n#]+)").ok()?,
        })
    }
}

/// Extract prompt options from a freeform suggestion.
///
/// Primary pass: split the text on `### Prompt N` headings and pull a style
/// label, an optional description, and the prompt line from each block.
/// Fallback pass: collect every `**Prompt**: ...` line in the whole text.
pub fn extract_prompt_options(suggestion: &str) -> Vec<PromptOption> {
    let Some(patterns) = Patterns::compile() else {
        return Vec::new();
    };

    let mut options = Vec::new();

    let blocks: Vec<&str> = patterns.heading.split(suggestion).skip(1).collect();
    for (index, block) in blocks.iter().enumerate() {
        let style = patterns
            .bold_style
            .captures(block)
            .or_else(|| patterns.bracket_style.captures(block))
            .or_else(|| patterns.plain_style.captures(block))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| format!("Style {}", index + 1));

        let desc = patterns
            .description
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let prompt = patterns
            .quoted_prompt
            .captures(block)
            .or_else(|| patterns.bare_prompt.captures(block))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());

        if let Some(prompt) = prompt {
            if prompt.len() > MIN_PROMPT_LEN {
                options.push(PromptOption {
                    id: (index + 1).to_string(),
                    style: style.replace(['[', ']'], ""),
                    description: desc,
                    prompt,
                });
            }
        }
    }

    // Fallback: no headed blocks matched, mine bare **Prompt**: lines.
    if options.is_empty() {
        for (index, captures) in patterns.bare_prompt.captures_iter(suggestion).enumerate() {
            if let Some(m) = captures.get(1) {
                let prompt = m.as_str().trim().trim_matches('"').trim().to_string();
                if prompt.len() > MIN_PROMPT_LEN {
                    options.push(PromptOption {
                        id: (index + 1).to_string(),
                        style: format!("Option {}", index + 1),
                        description: String::new(),
                        prompt,
                    });
                }
            }
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_headed_blocks() {
        let text = "\
Some preamble.

### Prompt 1: **Watercolor**
**Description**: a soft cabin scene
**Prompt**: \"A cozy wooden cabin in a forest clearing, watercolor style\"

### Prompt 2: [Film still]
**Prompt**: A hunter asleep by candlelight, cinematic lighting
";
        let options = extract_prompt_options(text);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].style, "Watercolor");
        assert_eq!(options[0].description, "a soft cabin scene");
        assert!(options[0].prompt.starts_with("A cozy wooden cabin"));
        assert_eq!(options[1].style, "Film still");
        assert!(options[1].prompt.contains("cinematic"));
    }

    #[test]
    fn test_falls_back_to_bare_prompt_lines() {
        let text = "\
Here are two ideas.
**Prompt**: A mouse sneaking past a sleeping hunter, storybook art
**Prompt**: Interior of a rustic cabin kitchen, warm light
";
        let options = extract_prompt_options(text);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].style, "Option 1");
        assert!(options[1].prompt.contains("cabin kitchen"));
    }

    #[test]
    fn test_short_fragments_are_ignored() {
        let text = "### Prompt 1: x\n**Prompt**: too short\n";
        // "too short" is 9 chars; below the debris threshold.
        assert!(extract_prompt_options(text).is_empty());
    }

    #[test]
    fn test_prose_without_prompts_yields_nothing() {
        let options = extract_prompt_options("Nothing machine-readable here at all.");
        assert!(options.is_empty());
    }
}
