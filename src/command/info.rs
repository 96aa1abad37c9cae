use std::path::Path;

use serde::Serialize;

use crate::command::gfx_path;
use crate::pe::resource::{self, SpriteEntry};
use crate::pe::GraphicsContainer;

#[derive(Debug, Serialize)]
struct ContainerSummary<'a> {
    file: String,
    sprite_count: usize,
    sprites: &'a [SpriteEntry],
}

pub fn info(gfx_dir: &Path, file_index: u16, json: bool) -> anyhow::Result<()> {
    let path = gfx_path(gfx_dir, file_index);
    let container = GraphicsContainer::open(&path)?;
    let sprites = resource::list_sprites(&container)?;

    if json {
        let summary = ContainerSummary {
            file: format!("gfx{file_index:03}.egf"),
            sprite_count: sprites.len(),
            sprites: &sprites,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("gfx{:03}.egf: {} bitmap resource(s)", file_index, sprites.len());
    for entry in &sprites {
        match entry.sprite {
            Some(sprite) => println!(
                "  sprite {:3}  resource id {}, rva {:#x}, {} bytes",
                sprite, entry.resource_id, entry.rva, entry.size
            ),
            None => println!(
                "  resource id {} (outside the sprite numbering), rva {:#x}, {} bytes",
                entry.resource_id, entry.rva, entry.size
            ),
        }
    }

    Ok(())
}
