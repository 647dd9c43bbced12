//! Deterministic placeholder images.
//!
//! When an image cannot be externalized (store quota, network) the article
//! keeps a shared placeholder instead of the broken payload. The placeholder
//! is a prompt-seeded tile grid, so the same prompt always yields the same
//! picture.

use std::path::Path;

use image::{ImageBuffer, Rgba};

use botlog_core::{hash_text, BotlogError, BotlogResult};

const TILE: u32 = 256;
const COLS: u32 = 2;
const ROWS: u32 = 2;

fn colors_from_prompt(prompt: &str) -> [Rgba<u8>; 4] {
    let digest = *hash_text(prompt).as_bytes();

    let mut out = [Rgba([0, 0, 0, 255]); 4];
    for (i, color) in out.iter_mut().enumerate() {
        let base = (i * 5) % digest.len();
        let r = digest[base];
        let g = digest[(base + 1) % digest.len()];
        let b = digest[(base + 2) % digest.len()];
        *color = Rgba([r, g, b, 255]);
    }
    out
}

/// Render the placeholder PNG for a prompt at `out_path`.
pub fn generate_placeholder_png(prompt: &str, out_path: &Path) -> BotlogResult<()> {
    let width = TILE * COLS;
    let height = TILE * ROWS;

    let colors = colors_from_prompt(prompt);
    let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(width, height);

    // Fill tiles with solid colors; draw thin white grid lines.
    for y in 0..height {
        for x in 0..width {
            let col = x / TILE;
            let row = y / TILE;
            let idx = (row * COLS + col) as usize;
            let mut px = colors[idx];

            // grid line
            if x % TILE == 0 || y % TILE == 0 {
                px = Rgba([245, 245, 245, 255]);
            }
            img.put_pixel(x, y, px);
        }
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    img.save(out_path)
        .map_err(|err| BotlogError::store(format!("failed to write placeholder: {}", err)))?;
    Ok(())
}

/// Write the shared degraded-image placeholder under `dir` once and return
/// its path as a URL string.
pub fn ensure_shared_placeholder(dir: &Path) -> BotlogResult<String> {
    let out_path = dir.join("placeholder.png");
    if !out_path.exists() {
        generate_placeholder_png("botlog placeholder", &out_path)?;
    }
    Ok(out_path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_png_written() {
        let root = std::env::temp_dir().join(format!("botlog_placeholder_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        let out = root.join("p.png");
        generate_placeholder_png("hello world", &out).unwrap();
        assert!(out.exists());

        let img = image::open(&out).unwrap();
        assert_eq!(img.width(), 512);
        assert_eq!(img.height(), 512);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_placeholder_colors_are_prompt_seeded() {
        assert_eq!(colors_from_prompt("a"), colors_from_prompt("a"));
        assert_ne!(colors_from_prompt("a"), colors_from_prompt("b"));
    }

    #[test]
    fn test_shared_placeholder_written_once() {
        let root = std::env::temp_dir().join(format!("botlog_shared_ph_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        let first = ensure_shared_placeholder(&root).unwrap();
        let second = ensure_shared_placeholder(&root).unwrap();
        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&root);
    }
}
