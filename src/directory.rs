//! The cabinet directory: descriptor parsing and file-table loading.
//!
//! Two table layouts exist. Version 6 and later use fixed-size records
//! at a known stride, each naming its own starting volume. Version 5
//! uses an offset table into variable-position records and leaves the
//! volume to be recovered from the per-volume file-index ranges.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::warn;

use crate::consts;
use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::header::{read_volume_header, VolumeHeader};
use crate::string::read_null_terminated_string;

/// The loaded directory of a cabinet.
pub(crate) struct Directory {
    pub(crate) version: u32,
    pub(crate) entries: HashMap<String, FileEntry>,
}

/// Folds a path into its case-insensitive map key. Cabinet paths come
/// from DOS-era installers, so ASCII folding is the match the format
/// expects.
pub(crate) fn fold_key(path: &str) -> String {
    path.to_ascii_lowercase()
}

/// Reads the cabinet descriptor and file table from the header source
/// (the `.hdr` file, or volume 1 when no `.hdr` exists).
pub(crate) fn load_directory<R: Read + Seek>(
    reader: &mut R,
    volumes: &[VolumeHeader],
) -> Result<Directory> {
    let header = read_volume_header(reader)?;
    let descriptor_offset = header.cab_descriptor_offset as u64;

    reader.seek(SeekFrom::Start(descriptor_offset + 12))?;
    let file_table_offset = reader.read_u32::<LittleEndian>()?;
    reader.seek(SeekFrom::Current(4))?;
    let file_table_size = reader.read_u32::<LittleEndian>()?;
    let file_table_size2 = reader.read_u32::<LittleEndian>()?;
    let directory_count = reader.read_u32::<LittleEndian>()?;
    reader.seek(SeekFrom::Current(8))?;
    let file_count = reader.read_u32::<LittleEndian>()?;
    if file_table_size != file_table_size2 {
        warn!(
            "file table sizes do not match ({} != {})",
            file_table_size, file_table_size2
        );
    }

    let table_offset = descriptor_offset + file_table_offset as u64;
    let mut entries = HashMap::new();
    if header.version >= 6 {
        let file_table_offset2 = reader.read_u32::<LittleEndian>()?;
        let record_offset = table_offset + file_table_offset2 as u64;
        load_file_table(reader, table_offset, record_offset, file_count, &mut entries)?;
    } else {
        load_file_table_legacy(
            reader,
            table_offset,
            directory_count,
            file_count,
            volumes,
            &mut entries,
        )?;
    }
    Ok(Directory { version: header.version, entries })
}

/// Loads the version >= 6 file table: `file_count` records of
/// [`consts::FILE_RECORD_SIZE`] bytes each.
fn load_file_table<R: Read + Seek>(
    reader: &mut R,
    table_offset: u64,
    record_offset: u64,
    file_count: u32,
    entries: &mut HashMap<String, FileEntry>,
) -> Result<()> {
    for index in 0..file_count as u64 {
        reader.seek(SeekFrom::Start(
            record_offset + index * consts::FILE_RECORD_SIZE,
        ))?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let uncompressed_size = reader.read_u32::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(4))?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(4))?;
        let offset = reader.read_u32::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(36))?;
        let name_offset = reader.read_u32::<LittleEndian>()?;
        let _directory_index = reader.read_u16::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(12))?;
        let _link_prev = reader.read_u32::<LittleEndian>()?;
        let _link_next = reader.read_u32::<LittleEndian>()?;
        let _link_flags = reader.read_u8()?;
        let volume = reader.read_u16::<LittleEndian>()?;

        // Entries with no name or no data are placeholders.
        if name_offset == 0
            || offset == 0
            || (flags & consts::FLAG_INVALID) != 0
        {
            continue;
        }

        reader.seek(SeekFrom::Start(table_offset + name_offset as u64))?;
        let name = read_null_terminated_string(reader)?;
        insert_entry(
            entries,
            FileEntry {
                name,
                uncompressed_size,
                compressed_size,
                offset,
                flags,
                volume,
            },
        );
    }
    Ok(())
}

/// Loads the version 5 file table: an offset table of
/// `directory_count + file_count` u32s, of which the trailing
/// `file_count` point at file records.
fn load_file_table_legacy<R: Read + Seek>(
    reader: &mut R,
    table_offset: u64,
    directory_count: u32,
    file_count: u32,
    volumes: &[VolumeHeader],
    entries: &mut HashMap<String, FileEntry>,
) -> Result<()> {
    reader.seek(SeekFrom::Start(table_offset))?;
    let table_len = (directory_count + file_count) as usize;
    let mut offsets = Vec::with_capacity(table_len);
    for _ in 0..table_len {
        offsets.push(reader.read_u32::<LittleEndian>()?);
    }

    let mut file_index = 0u32;
    for &record_offset in &offsets[directory_count as usize..] {
        reader.seek(SeekFrom::Start(table_offset + record_offset as u64))?;
        let name_offset = reader.read_u32::<LittleEndian>()?;
        let _directory_index = reader.read_u32::<LittleEndian>()?;
        let mut flags = reader.read_u16::<LittleEndian>()?;
        let uncompressed_size = reader.read_u32::<LittleEndian>()?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(20))?;
        let offset = reader.read_u32::<LittleEndian>()?;

        if name_offset == 0
            || offset == 0
            || (flags & consts::FLAG_INVALID) != 0
        {
            continue;
        }

        // Recover the starting volume from the index ranges, and
        // synthesize the split flag: a file ending a volume whose
        // declared size disagrees with the volume's trailing portion
        // continues into the next one.
        let mut volume = 0u16;
        for (slot, volume_header) in volumes.iter().enumerate() {
            if file_index >= volume_header.first_file_index
                && file_index <= volume_header.last_file_index
            {
                volume = (slot + 1) as u16;
                if file_index == volume_header.last_file_index
                    && compressed_size
                        != volume_header.last_file_size_compressed
                    && volume_header.last_file_size_compressed != 0
                {
                    flags |= consts::FLAG_SPLIT;
                }
                break;
            }
        }

        reader.seek(SeekFrom::Start(table_offset + name_offset as u64))?;
        let name = read_null_terminated_string(reader)?;
        if volume == 0 {
            warn!(name = %name, "no volume claims this file");
            return Err(Error::VolumeMissing { volume: 0, name });
        }

        file_index += 1;
        insert_entry(
            entries,
            FileEntry {
                name,
                uncompressed_size,
                compressed_size,
                offset,
                flags,
                volume,
            },
        );
    }
    Ok(())
}

/// Files occasionally appear in more than one volume, sometimes
/// erroneously; the copy in the lowest-numbered volume wins.
fn insert_entry(entries: &mut HashMap<String, FileEntry>, entry: FileEntry) {
    match entries.entry(fold_key(&entry.name)) {
        MapEntry::Vacant(slot) => {
            slot.insert(entry);
        }
        MapEntry::Occupied(mut slot) => {
            if slot.get().volume > entry.volume {
                slot.insert(entry);
            }
        }
    }
}
