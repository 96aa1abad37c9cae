use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between a sprite request and a decoded image.
///
/// The shell matches on this exhaustively, so every failure the pipeline can
/// produce has to fit one of these variants.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The container has no bitmap-type resource directory at all.
    #[error("no bitmap resource section in container")]
    NoImageSection,

    /// The bitmap table exists but holds no entry for the derived id.
    #[error("sprite {sprite} not found (looked for resource id {resource_id})")]
    SpriteNotFound { sprite: u16, resource_id: u32 },

    /// Structural parse failures and declared ranges that cannot be read.
    #[error("corrupt container: {0}")]
    CorruptContainer(String),

    #[error("sprite data does not decode as an image: {0}")]
    Decode(#[source] image::ImageError),
}

impl From<binrw::Error> for ExtractError {
    fn from(err: binrw::Error) -> Self {
        ExtractError::CorruptContainer(err.to_string())
    }
}
