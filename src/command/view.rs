use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::command::{gfx_path, SpriteRequest};
use crate::error::ExtractError;
use crate::pe::resource;
use crate::pe::GraphicsContainer;
use crate::sprite;

/// A sprite that made it all the way through the pipeline.
pub struct ExtractedSprite {
    pub image: image::DynamicImage,
    pub resource_id: u32,
}

pub fn view(
    gfx_dir: &Path,
    file: Option<u16>,
    sprite: Option<u16>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    match (file, sprite) {
        (Some(file_index), Some(sprite)) => {
            let request = SpriteRequest { file_index, sprite };
            if !view_one(gfx_dir, &request, output.as_deref()) {
                anyhow::bail!("sprite extraction failed");
            }
            Ok(())
        }
        _ => run_interactive(gfx_dir),
    }
}

/// Run the whole lookup pipeline for one request: open the derived
/// container, locate the sprite's resource, decode the bytes. Touches no
/// state outside the request.
pub fn fetch(gfx_dir: &Path, request: &SpriteRequest) -> Result<ExtractedSprite, ExtractError> {
    let path = gfx_path(gfx_dir, request.file_index);
    info!("looking for container {}", path.display());

    let container = GraphicsContainer::open(&path)?;
    info!("opened {} ({} bytes)", path.display(), container.len());

    info!("searching the bitmap resource directory...");
    let blob = resource::locate(&container, request.sprite)?;
    let resource_id = resource::resource_id(request.sprite);
    info!(
        "found sprite {} as resource id {} at rva {:#x}, {} bytes",
        request.sprite, resource_id, blob.rva, blob.size
    );

    let image = sprite::decode(blob.bytes)?;
    info!("decoded a {}x{} pixel image", image.width(), image.height());

    Ok(ExtractedSprite { image, resource_id })
}

/// Render one request; reports failures to the user and returns whether it
/// succeeded. Nothing here terminates the shell.
fn view_one(gfx_dir: &Path, request: &SpriteRequest, output: Option<&Path>) -> bool {
    match fetch(gfx_dir, request) {
        Ok(extracted) => match render(request, &extracted, output) {
            Ok(()) => true,
            Err(err) => {
                eprintln!("Failed to save sprite: {err:#}");
                false
            }
        },
        Err(err) => {
            report(request, &err);
            false
        }
    }
}

fn render(
    request: &SpriteRequest,
    extracted: &ExtractedSprite,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let target = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!(
            "sprite_{:03}_{:03}.png",
            request.file_index, request.sprite
        )),
    };
    extracted
        .image
        .save(&target)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!(
        "Sprite {} (resource id {}) from gfx{:03}.egf ({}x{}) -> {}",
        request.sprite,
        extracted.resource_id,
        request.file_index,
        extracted.image.width(),
        extracted.image.height(),
        target.display()
    );
    Ok(())
}

/// One user-facing line per error variant, matched exhaustively so a new
/// variant cannot slip through with a generic message.
fn report(request: &SpriteRequest, err: &ExtractError) {
    match err {
        ExtractError::FileNotFound(path) => {
            eprintln!("File not found: {}", path.display());
        }
        ExtractError::NoImageSection => {
            eprintln!(
                "No image section found in gfx{:03}.egf (not a valid EGF file?)",
                request.file_index
            );
        }
        ExtractError::SpriteNotFound {
            sprite,
            resource_id,
        } => {
            eprintln!(
                "Sprite {} not found in this file (looked for resource id {})",
                sprite, resource_id
            );
        }
        ExtractError::CorruptContainer(reason) => {
            eprintln!("Container is corrupt: {}", reason);
        }
        ExtractError::Decode(err) => {
            eprintln!("Sprite bytes do not decode as an image: {}", err);
        }
    }
}

fn run_interactive(gfx_dir: &Path) -> anyhow::Result<()> {
    println!("EGF sprite viewer. Empty input quits.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(file_index) = prompt(&mut lines, "GFX file (1-999): ")? else {
            break;
        };
        let Some(sprite) = prompt(&mut lines, "Sprite (1-999): ")? else {
            break;
        };
        let request = SpriteRequest { file_index, sprite };
        view_one(gfx_dir, &request, None);
    }

    Ok(())
}

/// Ask until the user enters an in-bounds number; `None` means quit.
fn prompt(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    label: &str,
) -> anyhow::Result<Option<u16>> {
    loop {
        print!("{label}");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            return Ok(None);
        }

        match parse_index(&line) {
            Some(value) => return Ok(Some(value)),
            None => eprintln!("Enter a number between 1 and 999."),
        }
    }
}

/// Bounds are enforced here, before any path derivation happens.
fn parse_index(input: &str) -> Option<u16> {
    input
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|n| (1..=999).contains(n))
}
