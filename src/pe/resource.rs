use binrw::binread;
use serde::Serialize;

use crate::error::ExtractError;
use crate::pe::GraphicsContainer;

/// Resource type id under which EGF containers store their sprites.
pub const BITMAP_TYPE_ID: u32 = 2;

/// Fixed offset between a sprite number and the resource id it is stored
/// under: sprite 1 lives at resource id 101.
pub const RESOURCE_ID_OFFSET: u32 = 100;

/// High bit of a directory entry's second word marks a child table; the same
/// bit in the first word marks a name-keyed entry.
const SUBDIRECTORY_BIT: u32 = 0x8000_0000;

pub fn resource_id(sprite: u16) -> u32 {
    u32::from(sprite) + RESOURCE_ID_OFFSET
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct ResourceDirectory {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub number_of_name_entries: u16,
    pub number_of_id_entries: u16,
    #[br(count = number_of_name_entries as usize + number_of_id_entries as usize)]
    pub entries: Vec<DirectoryEntry>,
}

#[binread]
#[br(little)]
#[derive(Debug, Clone, Copy)]
pub struct DirectoryEntry {
    pub name_or_id: u32,
    pub offset: u32,
}

impl DirectoryEntry {
    /// Numeric identifier, if this entry is id-keyed rather than name-keyed.
    pub fn id(&self) -> Option<u32> {
        (self.name_or_id & SUBDIRECTORY_BIT == 0).then_some(self.name_or_id)
    }

    /// Offset of the child table, if this entry points at one.
    pub fn subdirectory(&self) -> Option<u32> {
        (self.offset & SUBDIRECTORY_BIT != 0).then_some(self.offset & !SUBDIRECTORY_BIT)
    }

    /// Offset of the data entry, if this entry is a leaf.
    pub fn data(&self) -> Option<u32> {
        (self.offset & SUBDIRECTORY_BIT == 0).then_some(self.offset)
    }
}

#[binread]
#[br(little)]
#[derive(Debug, Clone, Copy)]
pub struct ResourceDataEntry {
    pub data_rva: u32,
    pub size: u32,
    pub codepage: u32,
    pub reserved: u32,
}

/// One located sprite: the raw encoded bytes plus where they sit in the
/// container.
#[derive(Debug)]
pub struct SpriteBlob<'a> {
    pub bytes: &'a [u8],
    pub rva: u32,
    pub size: u32,
}

/// Walk the resource tree down to the sprite's raw bytes.
///
/// The path is always type table 2 -> resource id `sprite + 100` -> first
/// language leaf. Identifiers are compared as unsigned integers, exact match
/// only.
pub fn locate<'a>(
    container: &'a GraphicsContainer,
    sprite: u16,
) -> Result<SpriteBlob<'a>, ExtractError> {
    let id = resource_id(sprite);
    let bitmaps = bitmap_directory(container)?;

    let entry = bitmaps
        .entries
        .iter()
        .find(|entry| entry.id() == Some(id))
        .ok_or(ExtractError::SpriteNotFound {
            sprite,
            resource_id: id,
        })?;

    descend(container, entry)
}

/// Every id-keyed entry of the bitmap table, for container introspection.
/// Ids at or below the sprite offset carry no sprite number.
pub fn list_sprites(container: &GraphicsContainer) -> Result<Vec<SpriteEntry>, ExtractError> {
    let bitmaps = bitmap_directory(container)?;

    let mut out = Vec::with_capacity(bitmaps.entries.len());
    for entry in &bitmaps.entries {
        let Some(id) = entry.id() else { continue };
        let blob = descend(container, entry)?;
        out.push(SpriteEntry {
            sprite: id
                .checked_sub(RESOURCE_ID_OFFSET)
                .filter(|n| *n > 0)
                .and_then(|n| u16::try_from(n).ok()),
            resource_id: id,
            rva: blob.rva,
            size: blob.size,
        });
    }

    Ok(out)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SpriteEntry {
    pub sprite: Option<u16>,
    pub resource_id: u32,
    pub rva: u32,
    pub size: u32,
}

/// Find the bitmap type table under the root. Several type-2 entries are not
/// expected in this format; only the first is consulted.
fn bitmap_directory(container: &GraphicsContainer) -> Result<ResourceDirectory, ExtractError> {
    let root = container.root_directory()?;
    let entry = root
        .entries
        .iter()
        .find(|entry| entry.id() == Some(BITMAP_TYPE_ID))
        .ok_or(ExtractError::NoImageSection)?;
    let offset = entry.subdirectory().ok_or_else(|| {
        ExtractError::CorruptContainer("bitmap type entry is not a directory".into())
    })?;
    container.directory_at(offset)
}

/// Descend from a resource-id entry through its language table to the data.
/// The format stores exactly one language leaf per id, so only the first
/// entry is consulted.
fn descend<'a>(
    container: &'a GraphicsContainer,
    entry: &DirectoryEntry,
) -> Result<SpriteBlob<'a>, ExtractError> {
    let offset = entry.subdirectory().ok_or_else(|| {
        ExtractError::CorruptContainer(format!(
            "resource {} has no language directory",
            entry.name_or_id
        ))
    })?;
    let languages = container.directory_at(offset)?;

    let leaf = languages.entries.first().ok_or_else(|| {
        ExtractError::CorruptContainer(format!(
            "language directory of resource {} is empty",
            entry.name_or_id
        ))
    })?;
    let data_offset = leaf.data().ok_or_else(|| {
        ExtractError::CorruptContainer(format!(
            "resource {} nests another directory where a data entry was expected",
            entry.name_or_id
        ))
    })?;

    let data = container.data_entry_at(data_offset)?;
    let bytes = container.get_bytes(data.data_rva, data.size)?;

    Ok(SpriteBlob {
        bytes,
        rva: data.data_rva,
        size: data.size,
    })
}
