use std::fs;
use std::io::Cursor;
use std::path::Path;

use binrw::{binread, BinRead};

use crate::error::ExtractError;
use crate::pe::resource::{ResourceDataEntry, ResourceDirectory};

pub mod resource;

pub const PE32_MAGIC: u16 = 0x010b;
pub const PE32_PLUS_MAGIC: u16 = 0x020b;

/// Index of the resource table in the optional header's data directories.
const RESOURCE_TABLE_INDEX: usize = 2;

#[binread]
#[br(little, magic = b"MZ")]
#[derive(Debug)]
pub struct DosHeader {
    /// File offset of the PE signature, stored at 0x3c in the DOS stub.
    #[br(pad_before = 0x3a)]
    pub e_lfanew: u32,
}

#[binread]
#[br(little, magic = b"PE\0\0")]
#[derive(Debug)]
pub struct CoffHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct OptionalHeader {
    #[br(assert(magic == PE32_MAGIC || magic == PE32_PLUS_MAGIC))]
    pub magic: u16,
    // standard and windows-specific fields; their layout differs between
    // PE32 and PE32+ and none of them matter for resource lookup
    #[br(count = if magic == PE32_PLUS_MAGIC { 106usize } else { 90usize })]
    _skipped: Vec<u8>,
    #[br(assert(number_of_rva_and_sizes <= 16))]
    pub number_of_rva_and_sizes: u32,
    #[br(count = number_of_rva_and_sizes)]
    pub data_directories: Vec<DataDirectory>,
}

#[binread]
#[br(little)]
#[derive(Debug, Clone, Copy)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_linenumbers: u32,
    pub number_of_relocations: u16,
    pub number_of_linenumbers: u16,
    pub characteristics: u32,
}

/// An opened `.egf` container: the raw file bytes plus the parsed section
/// table needed to resolve resource addresses. Lives for one request.
#[derive(Debug)]
pub struct GraphicsContainer {
    data: Vec<u8>,
    sections: Vec<SectionHeader>,
    resource_dir: Option<DataDirectory>,
}

impl GraphicsContainer {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let data = fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound(path.to_path_buf()),
            _ => ExtractError::CorruptContainer(format!(
                "failed to read {}: {}",
                path.display(),
                err
            )),
        })?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ExtractError> {
        let mut cursor = Cursor::new(&data);
        let dos = DosHeader::read(&mut cursor)?;

        cursor.set_position(dos.e_lfanew as u64);
        let coff = CoffHeader::read(&mut cursor)?;
        let optional_start = cursor.position();
        let optional = OptionalHeader::read(&mut cursor)?;

        // the section table sits right after the optional header, whatever
        // its declared size
        cursor.set_position(optional_start + coff.size_of_optional_header as u64);
        let mut sections = Vec::with_capacity(coff.number_of_sections as usize);
        for _ in 0..coff.number_of_sections {
            sections.push(SectionHeader::read(&mut cursor)?);
        }

        let resource_dir = optional
            .data_directories
            .get(RESOURCE_TABLE_INDEX)
            .copied()
            .filter(|dir| dir.virtual_address != 0 && dir.size != 0);

        Ok(GraphicsContainer {
            data,
            sections,
            resource_dir,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Resolve a virtual address to a file offset through the section table.
    fn rva_to_offset(&self, rva: u32) -> Option<u64> {
        self.sections.iter().find_map(|section| {
            let delta = rva.checked_sub(section.virtual_address)?;
            (delta < section.size_of_raw_data)
                .then(|| section.pointer_to_raw_data as u64 + delta as u64)
        })
    }

    /// Slice the raw bytes a resource data entry points at.
    pub fn get_bytes(&self, rva: u32, size: u32) -> Result<&[u8], ExtractError> {
        let offset = self.rva_to_offset(rva).ok_or_else(|| {
            ExtractError::CorruptContainer(format!("data rva {rva:#x} is outside every section"))
        })? as usize;
        let end = offset
            .checked_add(size as usize)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ExtractError::CorruptContainer(format!(
                    "declared data range at {offset:#x} ({size} bytes) runs past the end of the file"
                ))
            })?;
        Ok(&self.data[offset..end])
    }

    /// File offset of the start of the resource section.
    fn resource_base(&self) -> Result<u64, ExtractError> {
        let dir = self.resource_dir.ok_or(ExtractError::NoImageSection)?;
        self.rva_to_offset(dir.virtual_address).ok_or_else(|| {
            ExtractError::CorruptContainer(format!(
                "resource table rva {:#x} is outside every section",
                dir.virtual_address
            ))
        })
    }

    pub fn root_directory(&self) -> Result<ResourceDirectory, ExtractError> {
        self.directory_at(0)
    }

    /// Parse a resource directory table at an offset relative to the start
    /// of the resource section.
    pub fn directory_at(&self, offset: u32) -> Result<ResourceDirectory, ExtractError> {
        let base = self.resource_base()?;
        let mut cursor = Cursor::new(&self.data);
        cursor.set_position(base + offset as u64);
        Ok(ResourceDirectory::read(&mut cursor)?)
    }

    /// Parse a resource data entry at an offset relative to the start of the
    /// resource section.
    pub fn data_entry_at(&self, offset: u32) -> Result<ResourceDataEntry, ExtractError> {
        let base = self.resource_base()?;
        let mut cursor = Cursor::new(&self.data);
        cursor.set_position(base + offset as u64);
        Ok(ResourceDataEntry::read(&mut cursor)?)
    }
}

#[cfg(test)]
pub(crate) mod testbuild {
    use byteorder::{LittleEndian, WriteBytesExt};

    pub(crate) const SECTION_RVA: u32 = 0x1000;
    const SECTION_RAW_OFFSET: u32 = 0x200;
    const E_LFANEW: u32 = 0x40;
    const OPTIONAL_HEADER_SIZE: u16 = 224;
    const DIRECTORY_COUNT: u32 = 16;
    const SUBDIRECTORY_BIT: u32 = 0x8000_0000;

    /// Shape of a synthetic container.
    pub(crate) struct Fixture<'a> {
        /// (resource id, payload) pairs stored under the bitmap type table.
        pub sprites: &'a [(u32, &'a [u8])],
        /// Emit a type-2 entry in the root table at all.
        pub with_bitmap_type: bool,
        /// Point the optional header at the resource section.
        pub with_resource_directory: bool,
        /// Emit language tables with zero entries (malformed leaves).
        pub empty_language_dirs: bool,
    }

    impl Default for Fixture<'_> {
        fn default() -> Self {
            Fixture {
                sprites: &[],
                with_bitmap_type: true,
                with_resource_directory: true,
                empty_language_dirs: false,
            }
        }
    }

    /// Assemble a minimal PE32 file with a single `.rsrc` section laid out
    /// the way real EGF containers are.
    pub(crate) fn build(fixture: &Fixture) -> Vec<u8> {
        let rsrc = build_resource_section(fixture);

        let mut out = Vec::new();
        // DOS stub: just the magic and the pointer to the PE signature
        out.extend_from_slice(b"MZ");
        out.resize(0x3c, 0);
        out.write_u32::<LittleEndian>(E_LFANEW).unwrap();

        out.extend_from_slice(b"PE\0\0");
        out.write_u16::<LittleEndian>(0x014c).unwrap(); // i386
        out.write_u16::<LittleEndian>(1).unwrap(); // one section
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(OPTIONAL_HEADER_SIZE).unwrap();
        out.write_u16::<LittleEndian>(0x0102).unwrap();

        // PE32 optional header, everything but the directories zeroed
        let optional_start = out.len();
        out.write_u16::<LittleEndian>(0x010b).unwrap();
        out.resize(optional_start + 92, 0);
        out.write_u32::<LittleEndian>(DIRECTORY_COUNT).unwrap();
        for index in 0..DIRECTORY_COUNT {
            if index == 2 && fixture.with_resource_directory {
                out.write_u32::<LittleEndian>(SECTION_RVA).unwrap();
                out.write_u32::<LittleEndian>(rsrc.len() as u32).unwrap();
            } else {
                out.write_u32::<LittleEndian>(0).unwrap();
                out.write_u32::<LittleEndian>(0).unwrap();
            }
        }
        assert_eq!(out.len(), optional_start + OPTIONAL_HEADER_SIZE as usize);

        // .rsrc section header
        out.extend_from_slice(b".rsrc\0\0\0");
        out.write_u32::<LittleEndian>(rsrc.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(SECTION_RVA).unwrap();
        out.write_u32::<LittleEndian>(rsrc.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(SECTION_RAW_OFFSET).unwrap();
        out.resize(out.len() + 8, 0); // relocation and line number pointers
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0x4000_0040).unwrap();

        out.resize(SECTION_RAW_OFFSET as usize, 0);
        out.extend_from_slice(&rsrc);
        out
    }

    fn build_resource_section(fixture: &Fixture) -> Vec<u8> {
        let n = fixture.sprites.len() as u32;
        let lang_table_size: u32 = if fixture.empty_language_dirs { 16 } else { 24 };

        let off_type: u32 = 16 + 8;
        let off_langs = off_type + 16 + 8 * n;
        let off_data = off_langs + lang_table_size * n;
        let off_payloads = off_data + 16 * n;

        let mut rsrc = Vec::new();

        if !fixture.with_bitmap_type {
            write_table_header(&mut rsrc, 0);
            return rsrc;
        }

        // root: one id entry for the bitmap type, pointing at its table
        write_table_header(&mut rsrc, 1);
        rsrc.write_u32::<LittleEndian>(2).unwrap();
        rsrc.write_u32::<LittleEndian>(off_type | SUBDIRECTORY_BIT).unwrap();

        // type table: one entry per resource id
        write_table_header(&mut rsrc, n as u16);
        for (index, (id, _)) in fixture.sprites.iter().enumerate() {
            rsrc.write_u32::<LittleEndian>(*id).unwrap();
            rsrc.write_u32::<LittleEndian>(
                (off_langs + lang_table_size * index as u32) | SUBDIRECTORY_BIT,
            )
            .unwrap();
        }

        // language tables, one leaf each (or none, when building malformed
        // containers)
        for index in 0..n {
            if fixture.empty_language_dirs {
                write_table_header(&mut rsrc, 0);
            } else {
                write_table_header(&mut rsrc, 1);
                rsrc.write_u32::<LittleEndian>(0).unwrap();
                rsrc.write_u32::<LittleEndian>(off_data + 16 * index).unwrap();
            }
        }

        if fixture.empty_language_dirs {
            return rsrc;
        }

        let mut payload_offset = off_payloads;
        for (_, payload) in fixture.sprites {
            rsrc.write_u32::<LittleEndian>(SECTION_RVA + payload_offset)
                .unwrap();
            rsrc.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            rsrc.write_u32::<LittleEndian>(0).unwrap();
            rsrc.write_u32::<LittleEndian>(0).unwrap();
            payload_offset += payload.len() as u32;
        }

        for (_, payload) in fixture.sprites {
            rsrc.extend_from_slice(payload);
        }

        rsrc
    }

    fn write_table_header(out: &mut Vec<u8>, id_entries: u16) {
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap(); // name-keyed entries
        out.write_u16::<LittleEndian>(id_entries).unwrap();
    }
}
