use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};

use botlog_ai::{
    extract_prompt_options, ArticleAnalyzer, ChatClient, GeminiAnalyzer, GeminiImageGenerator,
};
use botlog_canvas::{
    AnalysisOutcome, Canvas, Role, SceneAnalyzer, SceneStatus, SceneWorkbench, Session,
};
use botlog_core::BotlogConfig;
use botlog_render::{compose, ComposeOptions};
use botlog_store::{Gallery, NewImage, SessionStore};

#[derive(Parser)]
#[command(
    name = "botlog",
    version,
    about = "BotLog — AI-assisted blog authoring",
    long_about = "BotLog is a self-hosted blog CMS core with an AI-assisted authoring workflow.\nDraft with a chat partner, pin content to a canvas of cards, illustrate each\ncard scene by scene, and compose the finished article."
)]
struct Cli {
    /// Path to the config file (default: ./botlog.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a card's text into illustratable scenes
    Analyze {
        /// Path to a text file holding one card's content
        #[arg()]
        file: PathBuf,

        /// Visual style all scene prompts must share
        #[arg(short, long, default_value = "storybook illustration")]
        style: String,
    },

    /// Generate one image and register it in the gallery
    Generate {
        /// Generation prompt
        #[arg(short, long)]
        prompt: String,

        /// Text file the image illustrates, passed as grounding context
        #[arg(long)]
        source: Option<PathBuf>,

        /// Reference image file
        #[arg(long)]
        reference: Option<PathBuf>,
    },

    /// Analyze one card, generate every scene plus the cover, and commit
    Illustrate {
        /// Path to a canvas JSON file
        #[arg()]
        file: PathBuf,

        /// Zero-based card index to illustrate
        #[arg(long, default_value_t = 0)]
        card: usize,

        /// Visual style all scene prompts must share
        #[arg(short, long, default_value = "storybook illustration")]
        style: String,
    },

    /// Scan a whole canvas and suggest which cards deserve an illustration
    Suggest {
        /// Path to a canvas JSON file
        #[arg()]
        file: PathBuf,
    },

    /// Compose a canvas JSON file into a publishable article
    Compose {
        /// Path to a canvas JSON file
        #[arg()]
        file: PathBuf,

        /// Write the article body to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full article record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and curate the image gallery
    Gallery {
        #[command(subcommand)]
        command: GalleryCommands,
    },

    /// Manage saved authoring sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Send one chat message in a session and print the reply
    Chat {
        /// The message to send
        #[arg()]
        message: String,

        /// Continue an existing session by id (default: start a new one)
        #[arg(long)]
        session: Option<String>,
    },

    /// Scaffold a default botlog.toml in the current directory
    Init,
}

#[derive(Subcommand)]
enum GalleryCommands {
    /// List gallery images, newest first
    List,
    /// Search prompts, source snippets, and tags
    Search {
        #[arg()]
        term: String,
    },
    /// Delete one image by id
    Delete {
        #[arg()]
        id: String,
    },
    /// Toggle an image's favorite flag
    Favorite {
        #[arg()]
        id: String,

        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List saved sessions, newest first
    List,
    /// Print one session's transcript and canvas
    Show {
        #[arg()]
        id: String,
    },
    /// Delete one session
    Delete {
        #[arg()]
        id: String,
    },
    /// Delete every saved session
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { file, style } => cmd_analyze(&config, &file, &style),
        Commands::Generate {
            prompt,
            source,
            reference,
        } => cmd_generate(&config, &prompt, source.as_deref(), reference.as_deref()),
        Commands::Illustrate { file, card, style } => {
            cmd_illustrate(&config, &file, card, &style)
        }
        Commands::Suggest { file } => cmd_suggest(&config, &file),
        Commands::Compose { file, output, json } => {
            cmd_compose(&config, &file, output.as_deref(), json)
        }
        Commands::Gallery { command } => cmd_gallery(&config, command),
        Commands::Sessions { command } => cmd_sessions(&config, command),
        Commands::Chat { message, session } => cmd_chat(&config, &message, session.as_deref()),
        Commands::Init => cmd_init(),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<BotlogConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from("botlog.toml");
            default.exists().then_some(default)
        }
    };
    match path {
        Some(path) => BotlogConfig::load_from_file(&path)
            .map_err(|err| anyhow!("failed to load config {}: {}", path.display(), err)),
        None => Ok(BotlogConfig::default()),
    }
}

fn load_canvas(file: &Path) -> Result<Canvas> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read canvas file: {}", file.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse canvas file: {}", file.display()))
}

fn save_canvas(file: &Path, canvas: &Canvas) -> Result<()> {
    let raw = serde_json::to_string_pretty(canvas)?;
    std::fs::write(file, raw)
        .with_context(|| format!("failed to write canvas file: {}", file.display()))
}

/// Read an image file as a base64 data URI.
fn file_to_data_uri(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file: {}", path.display()))?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        other => {
            return Err(anyhow!(
                "unsupported reference image extension: {:?}",
                other
            ))
        }
    };
    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}

fn cmd_analyze(config: &BotlogConfig, file: &Path, style: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read card text: {}", file.display()))?;

    let analyzer = GeminiAnalyzer::new(config);
    match analyzer.analyze(&content, style)? {
        AnalysisOutcome::Scenes(analysis) => {
            println!("{} scene(s), style: {}", analysis.scenes.len(), style);
            for scene in &analysis.scenes {
                println!("\n[{}] {}", scene.scene_index, scene.original_text.trim());
                println!("    {}", scene.prompt);
            }
            if let Some(cover) = &analysis.cover {
                println!("\ncover: {}", cover.prompt);
            }
            if !analysis.covers_losslessly(&content) {
                println!("\nnote: scene spans do not reconstruct the input exactly");
            }
        }
        AnalysisOutcome::Freeform(text) => {
            println!("analyzer returned a freeform suggestion:\n\n{}", text);
            let options = extract_prompt_options(&text);
            if !options.is_empty() {
                println!("\nextracted {} prompt option(s):", options.len());
                for option in options {
                    println!("  [{}] {}: {}", option.id, option.style, option.prompt);
                }
            }
        }
    }
    Ok(())
}

fn cmd_generate(
    config: &BotlogConfig,
    prompt: &str,
    source: Option<&Path>,
    reference: Option<&Path>,
) -> Result<()> {
    use botlog_canvas::{GenerateRequest, ImageGenerator};

    let source_text = match source {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    let reference_uri = match reference {
        Some(path) => Some(file_to_data_uri(path)?),
        None => None,
    };

    let generator = GeminiImageGenerator::new(config);
    let image = generator.generate(&GenerateRequest {
        prompt,
        source_text: source_text.as_deref(),
        reference_image: reference_uri.as_deref(),
    })?;

    let mut gallery = Gallery::open(config);
    let saved = gallery.save(&NewImage {
        payload: &image.url,
        prompt,
        source_context: source_text.as_deref().unwrap_or(""),
        category: "ai-generated",
    })?;
    println!("{}", saved.url);
    Ok(())
}

fn cmd_illustrate(config: &BotlogConfig, file: &Path, card: usize, style: &str) -> Result<()> {
    let mut canvas = load_canvas(file)?;
    let card_id = canvas
        .cards()
        .get(card)
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow!("no card at index {} (canvas has {})", card, canvas.len()))?;

    let analyzer = GeminiAnalyzer::new(config);
    let generator = GeminiImageGenerator::new(config);
    let mut gallery = Gallery::open(config);

    let source_card = canvas
        .get(&card_id)
        .ok_or_else(|| anyhow!("card disappeared from canvas"))?;
    let mut bench = SceneWorkbench::open(source_card, style);
    if bench.scenes().is_empty() {
        bench.analyze(&analyzer)?;
    }
    if bench.scenes().is_empty() {
        println!("the analyzer returned no scenes for this card");
        if let Some(text) = bench.legacy_suggestion() {
            println!("\nfreeform suggestion:\n{}", text);
        }
        return Ok(());
    }

    // Each scene generates independently; one failure never blocks the rest.
    for index in 0..bench.scenes().len() {
        if bench.scenes()[index].status() == SceneStatus::Resolved {
            continue;
        }
        match bench.generate_scene(index, &generator, &mut gallery) {
            Ok(url) => println!("scene {}: {}", index, url),
            Err(err) => eprintln!("scene {}: generation failed: {}", index, err),
        }
    }
    if bench.cover().map(|c| c.status()) == Some(SceneStatus::Proposed) {
        match bench.generate_cover(&generator, &mut gallery) {
            Ok(url) => println!("cover: {}", url),
            Err(err) => eprintln!("cover: generation failed: {}", err),
        }
    }

    if bench.resolved_count() == 0 {
        return Err(anyhow!("no images were generated; nothing to commit"));
    }
    let target_card = canvas
        .get_mut(&card_id)
        .ok_or_else(|| anyhow!("card disappeared from canvas"))?;
    let committed = bench
        .commit(target_card)
        .map_err(|err| anyhow!("commit failed: {}", err))?;
    save_canvas(file, &canvas)?;
    println!("committed {} image(s) to card {}", committed, card);
    Ok(())
}

fn cmd_suggest(config: &BotlogConfig, file: &Path) -> Result<()> {
    let canvas = load_canvas(file)?;
    let analyzer = ArticleAnalyzer::new(config);
    let analysis = analyzer.analyze(&canvas)?;

    if !analysis.article_title.is_empty() {
        println!("article: {}", analysis.article_title);
    }
    if analysis.image_placements.is_empty() {
        println!("no placements suggested");
        return Ok(());
    }
    for placement in &analysis.image_placements {
        println!(
            "\ncard {} ({}): {}",
            placement.paragraph_index, placement.image_type, placement.reason
        );
        for suggestion in &placement.prompt_suggestions {
            println!("  [{}] {}", suggestion.style, suggestion.prompt);
        }
    }
    Ok(())
}

fn cmd_compose(
    config: &BotlogConfig,
    file: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let canvas = load_canvas(file)?;
    let mut gallery = Gallery::open(config);
    let options = ComposeOptions {
        default_cover: config.site.default_cover.clone(),
        ..ComposeOptions::default()
    };

    let article = compose(&canvas, &mut gallery, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&article)?);
        return Ok(());
    }
    if let Some(path) = output {
        std::fs::write(path, &article.content)
            .with_context(|| format!("failed to write article: {}", path.display()))?;
        println!("wrote {} ({} cards)", path.display(), canvas.len());
    } else {
        println!("{}", article.content);
    }
    eprintln!("title: {}", article.title);
    eprintln!("cover: {}", article.cover_image);
    Ok(())
}

fn cmd_gallery(config: &BotlogConfig, command: GalleryCommands) -> Result<()> {
    let mut gallery = Gallery::open(config);
    match command {
        GalleryCommands::List => {
            for image in gallery.list() {
                let star = if image.favorite { "*" } else { " " };
                println!("{} {}  [{}]  {}", star, image.id, image.category, image.prompt);
            }
        }
        GalleryCommands::Search { term } => {
            for image in gallery.search(&term) {
                println!("{}  [{}]  {}", image.id, image.category, image.prompt);
            }
        }
        GalleryCommands::Delete { id } => {
            if gallery.delete(&id)? {
                println!("deleted {}", id);
            } else {
                println!("no image with id {}", id);
            }
        }
        GalleryCommands::Favorite { id, off } => {
            match gallery.set_favorite(&id, !off)? {
                Some(image) => println!("{} favorite = {}", image.id, image.favorite),
                None => println!("no image with id {}", id),
            }
        }
    }
    Ok(())
}

fn cmd_sessions(config: &BotlogConfig, command: SessionCommands) -> Result<()> {
    let store = SessionStore::open(config)?;
    match command {
        SessionCommands::List => {
            for summary in store.list()? {
                println!(
                    "{}  {}  ({} messages, {} cards)",
                    summary.id, summary.title, summary.messages, summary.cards
                );
            }
        }
        SessionCommands::Show { id } => {
            let session = store
                .load(&id)?
                .ok_or_else(|| anyhow!("no session with id {}", id))?;
            println!("# {}\n", session.title);
            for message in &session.messages {
                let role = match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                };
                println!("[{}] {}\n", role, message.content);
            }
            if !session.canvas.is_empty() {
                println!("--- canvas ({} cards) ---", session.canvas.len());
                for (index, card) in session.canvas.cards().iter().enumerate() {
                    let preview: String = card.content.chars().take(60).collect();
                    println!("[{}] {} ({} images)", index, preview, card.images.len());
                }
            }
        }
        SessionCommands::Delete { id } => {
            if store.delete(&id)? {
                println!("deleted {}", id);
            } else {
                println!("no session with id {}", id);
            }
        }
        SessionCommands::Clear => {
            store.clear()?;
            println!("cleared all sessions");
        }
    }
    Ok(())
}

fn cmd_chat(config: &BotlogConfig, message: &str, session_id: Option<&str>) -> Result<()> {
    let store = SessionStore::open(config)?;
    let mut session = match session_id {
        Some(id) => store
            .load(id)?
            .ok_or_else(|| anyhow!("no session with id {}", id))?,
        None => Session::new(),
    };

    session.push_message(Role::User, message);
    let client = ChatClient::new(config);
    let reply = client.send(&session.messages)?;
    session.push_message(Role::Assistant, reply.clone());

    // Fire-and-forget: a failed save never loses the in-memory exchange.
    if let Err(err) = store.save(&session) {
        tracing::warn!("failed to persist session: {}", err);
    }

    println!("{}", reply);
    eprintln!("session: {}", session.id);
    Ok(())
}

fn cmd_init() -> Result<()> {
    let path = PathBuf::from("botlog.toml");
    if path.exists() {
        return Err(anyhow!("botlog.toml already exists"));
    }
    BotlogConfig::default()
        .save_to_file(&path)
        .map_err(|err| anyhow!("failed to write botlog.toml: {}", err))?;
    println!("wrote botlog.toml");
    Ok(())
}
