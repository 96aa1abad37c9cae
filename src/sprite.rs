use image::DynamicImage;

use crate::error::ExtractError;

/// Decode one extracted blob into pixels.
///
/// EGF containers store plain bitmap-family data, so this is a straight
/// pass-through to the image crate's format sniffing.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    image::load_from_memory(bytes).map_err(ExtractError::Decode)
}
