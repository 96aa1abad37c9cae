use std::path::{Path, PathBuf};

pub mod info;
pub mod list;
pub mod view;

/// One sprite lookup as chosen by the user.
#[derive(Debug, Clone, Copy)]
pub struct SpriteRequest {
    pub file_index: u16,
    pub sprite: u16,
}

/// Containers live at `<gfx_dir>/gfx{index:03}.egf`.
pub fn gfx_path(gfx_dir: &Path, index: u16) -> PathBuf {
    gfx_dir.join(format!("gfx{index:03}.egf"))
}
