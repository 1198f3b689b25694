use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::warn;

use crate::consts;
use crate::error::{Error, Result};

/// Geometry of one `.cab` volume, parsed from the fixed header at the
/// start of the file.
///
/// The `first_file_*` fields describe the file whose tail continues
/// into this volume; the `last_file_*` fields describe the file whose
/// head ends here and continues into the next volume.
#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub(crate) struct VolumeHeader {
    pub(crate) version: u32,
    pub(crate) cab_descriptor_offset: u32,
    pub(crate) data_offset: u32,
    pub(crate) first_file_index: u32,
    pub(crate) last_file_index: u32,
    pub(crate) first_file_offset: u32,
    pub(crate) first_file_size_uncompressed: u32,
    pub(crate) first_file_size_compressed: u32,
    pub(crate) last_file_offset: u32,
    pub(crate) last_file_size_uncompressed: u32,
    pub(crate) last_file_size_compressed: u32,
}

/// Decodes the cabinet version from the magic bytes that follow the
/// signature. A decoded value of 0 denotes the earliest layout, 5.
fn decode_version(magic: u32) -> u32 {
    let version = if magic >> 24 == 1 {
        (magic >> 12) & 0xf
    } else {
        (magic & 0xffff) / 100
    };
    if version == 0 {
        consts::MIN_VERSION
    } else {
        version
    }
}

/// Reads the volume header at the start of `reader`.
///
/// Version 5 stores the geometry as consecutive 32-bit fields; version
/// 6 widened most of them to 64 bits, of which only the low half is
/// meaningful for the sizes this reader supports.
pub(crate) fn read_volume_header<R: Read + Seek>(
    reader: &mut R,
) -> Result<VolumeHeader> {
    reader.seek(SeekFrom::Start(0))?;
    let signature = reader.read_u32::<LittleEndian>()?;
    if signature != consts::FILE_SIGNATURE {
        warn!(
            "cabinet signature mismatch: expected {:#010x}, got {:#010x}",
            consts::FILE_SIGNATURE,
            signature
        );
        return Err(Error::BadSignature(signature));
    }

    let magic = reader.read_u32::<LittleEndian>()?;
    let version = decode_version(magic);
    if !(consts::MIN_VERSION..=consts::MAX_VERSION).contains(&version) {
        warn!("unsupported cabinet version {version}, magic bytes {magic:#010x}");
        return Err(Error::UnsupportedVersion { version, magic });
    }

    let _volume_info = reader.read_u32::<LittleEndian>()?;
    let cab_descriptor_offset = reader.read_u32::<LittleEndian>()?;
    let _cab_descriptor_size = reader.read_u32::<LittleEndian>()?;

    let mut header = VolumeHeader {
        version,
        cab_descriptor_offset,
        ..VolumeHeader::default()
    };
    header.data_offset = reader.read_u32::<LittleEndian>()?;
    reader.seek(SeekFrom::Current(4))?;
    if version == 5 {
        header.first_file_index = reader.read_u32::<LittleEndian>()?;
        header.last_file_index = reader.read_u32::<LittleEndian>()?;
        header.first_file_offset = reader.read_u32::<LittleEndian>()?;
        header.first_file_size_uncompressed =
            reader.read_u32::<LittleEndian>()?;
        header.first_file_size_compressed =
            reader.read_u32::<LittleEndian>()?;
        header.last_file_offset = reader.read_u32::<LittleEndian>()?;
        header.last_file_size_uncompressed =
            reader.read_u32::<LittleEndian>()?;
        header.last_file_size_compressed = reader.read_u32::<LittleEndian>()?;
    } else {
        header.first_file_index = reader.read_u32::<LittleEndian>()?;
        header.last_file_index = reader.read_u32::<LittleEndian>()?;
        header.first_file_offset = reader.read_u64::<LittleEndian>()? as u32;
        header.first_file_size_uncompressed =
            reader.read_u64::<LittleEndian>()? as u32;
        header.first_file_size_compressed =
            reader.read_u64::<LittleEndian>()? as u32;
        header.last_file_offset = reader.read_u64::<LittleEndian>()? as u32;
        header.last_file_size_uncompressed =
            reader.read_u64::<LittleEndian>()? as u32;
        header.last_file_size_compressed =
            reader.read_u64::<LittleEndian>()? as u32;
    }
    Ok(header)
}
