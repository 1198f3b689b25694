//! Fixture support: an in-memory volume source and builders for
//! synthetic cabinet volume images.

use std::collections::HashMap;
use std::io::{self, Cursor};

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::{Compress, Compression, FlushCompress};
use iscab::VolumeSource;

// File entry flags as stored on disk.
pub const FLAG_SPLIT: u16 = 0x1;
pub const FLAG_OBFUSCATED: u16 = 0x2;
pub const FLAG_COMPRESSED: u16 = 0x4;
pub const FLAG_INVALID: u16 = 0x8;

pub const SIGNATURE: u32 = 0x28635349;
pub const MAGIC_V5: u32 = 500;
pub const MAGIC_V6: u32 = 0x01006000;

/// A volume source over named in-memory images.
#[derive(Clone, Default)]
pub struct MemoryVolumes {
    volumes: HashMap<String, Vec<u8>>,
}

impl MemoryVolumes {
    pub fn new() -> MemoryVolumes {
        MemoryVolumes::default()
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.volumes.insert(name.to_string(), data);
    }
}

impl VolumeSource for MemoryVolumes {
    type Volume = Cursor<Vec<u8>>;

    fn open_volume(&self, name: &str) -> io::Result<Option<Cursor<Vec<u8>>>> {
        Ok(self.volumes.get(name).cloned().map(Cursor::new))
    }
}

/// Per-volume geometry fields of the fixed header.
#[derive(Clone, Copy, Default)]
pub struct Geometry {
    pub first_file_index: u32,
    pub last_file_index: u32,
    pub first_file_offset: u32,
    pub first_file_size_uncompressed: u32,
    pub first_file_size_compressed: u32,
    pub last_file_offset: u32,
    pub last_file_size_uncompressed: u32,
    pub last_file_size_compressed: u32,
}

pub fn pad_to(buf: &mut Vec<u8>, offset: usize) {
    assert!(buf.len() <= offset, "fixture regions overlap");
    buf.resize(offset, 0);
}

/// Writes the fixed volume header at the start of `buf`. `wide`
/// selects the version >= 6 layout with 64-bit geometry fields.
pub fn write_volume_header(
    buf: &mut Vec<u8>,
    magic: u32,
    descriptor_offset: u32,
    wide: bool,
    geometry: Geometry,
) {
    assert!(buf.is_empty());
    buf.write_u32::<LittleEndian>(SIGNATURE).unwrap();
    buf.write_u32::<LittleEndian>(magic).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap(); // volume info
    buf.write_u32::<LittleEndian>(descriptor_offset).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap(); // descriptor size
    buf.write_u32::<LittleEndian>(0).unwrap(); // data offset
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(geometry.first_file_index).unwrap();
    buf.write_u32::<LittleEndian>(geometry.last_file_index).unwrap();
    let tail = [
        geometry.first_file_offset,
        geometry.first_file_size_uncompressed,
        geometry.first_file_size_compressed,
        geometry.last_file_offset,
        geometry.last_file_size_uncompressed,
        geometry.last_file_size_compressed,
    ];
    for value in tail {
        if wide {
            buf.write_u64::<LittleEndian>(value as u64).unwrap();
        } else {
            buf.write_u32::<LittleEndian>(value).unwrap();
        }
    }
}

/// Writes the cabinet descriptor at `at`. The file table starts at
/// `at + file_table_offset`; version >= 6 descriptors additionally
/// carry the record-area offset within the table.
pub fn write_descriptor(
    buf: &mut Vec<u8>,
    at: usize,
    file_table_offset: u32,
    file_table_size: (u32, u32),
    directory_count: u32,
    file_count: u32,
    file_table_offset2: Option<u32>,
) {
    pad_to(buf, at + 12);
    buf.write_u32::<LittleEndian>(file_table_offset).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(file_table_size.0).unwrap();
    buf.write_u32::<LittleEndian>(file_table_size.1).unwrap();
    buf.write_u32::<LittleEndian>(directory_count).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(file_count).unwrap();
    if let Some(offset2) = file_table_offset2 {
        buf.write_u32::<LittleEndian>(offset2).unwrap();
    }
}

/// Writes one 0x57-byte record of the version >= 6 file table.
pub fn write_file_record_v6(
    buf: &mut Vec<u8>,
    flags: u16,
    uncompressed_size: u32,
    compressed_size: u32,
    offset: u32,
    name_offset: u32,
    volume: u16,
) {
    let start = buf.len();
    buf.write_u16::<LittleEndian>(flags).unwrap();
    buf.write_u32::<LittleEndian>(uncompressed_size).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(compressed_size).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.write_u32::<LittleEndian>(offset).unwrap();
    buf.extend_from_slice(&[0u8; 36]);
    buf.write_u32::<LittleEndian>(name_offset).unwrap();
    buf.write_u16::<LittleEndian>(0).unwrap(); // directory index
    buf.extend_from_slice(&[0u8; 12]);
    buf.write_u32::<LittleEndian>(0).unwrap(); // link prev
    buf.write_u32::<LittleEndian>(0).unwrap(); // link next
    buf.write_u8(0).unwrap(); // link flags
    buf.write_u16::<LittleEndian>(volume).unwrap();
    assert_eq!(buf.len() - start, 0x57);
}

/// Writes one variable-position record of the version 5 file table.
pub fn write_file_record_v5(
    buf: &mut Vec<u8>,
    name_offset: u32,
    flags: u16,
    uncompressed_size: u32,
    compressed_size: u32,
    offset: u32,
) {
    buf.write_u32::<LittleEndian>(name_offset).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap(); // directory index
    buf.write_u16::<LittleEndian>(flags).unwrap();
    buf.write_u32::<LittleEndian>(uncompressed_size).unwrap();
    buf.write_u32::<LittleEndian>(compressed_size).unwrap();
    buf.extend_from_slice(&[0u8; 20]);
    buf.write_u32::<LittleEndian>(offset).unwrap();
}

pub fn write_name(buf: &mut Vec<u8>, at: usize, name: &str) {
    pad_to(buf, at);
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
}

/// Deterministic pseudo-data for payloads.
pub fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index % 251) as u8).collect()
}

fn deflate(data: &[u8], flush: FlushCompress) -> Vec<u8> {
    let mut compressor = Compress::new(Compression::default(), false);
    let mut out = Vec::with_capacity(data.len() + 64);
    compressor.compress_vec(data, &mut out, flush).unwrap();
    out
}

/// One raw DEFLATE stream ending in a sync flush, i.e. with the
/// big-endian `0x0000ffff` trailer that selects the monolithic
/// decompression path.
pub fn deflate_synced(data: &[u8]) -> Vec<u8> {
    let out = deflate(data, FlushCompress::Sync);
    assert_eq!(&out[out.len() - 4..], [0x00, 0x00, 0xff, 0xff]);
    out
}

/// The chunked framing: a `u16` length prefix before each complete
/// raw DEFLATE stream.
pub fn deflate_chunked(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        let chunk = deflate(part, FlushCompress::Finish);
        out.write_u16::<LittleEndian>(chunk.len() as u16).unwrap();
        out.extend_from_slice(&chunk);
    }
    assert_ne!(&out[out.len() - 4..], [0x00, 0x00, 0xff, 0xff]);
    out
}

/// Builds a single-volume version 5 image holding one stored file and
/// its directory, and returns it with the payload.
pub fn v5_single_volume(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_volume_header(&mut buf, MAGIC_V5, 512, false, Geometry::default());
    pad_to(&mut buf, 64);
    buf.extend_from_slice(payload);
    write_descriptor(&mut buf, 512, 64, (0x200, 0x200), 0, 1, None);
    pad_to(&mut buf, 576);
    buf.write_u32::<LittleEndian>(16).unwrap(); // record offset
    pad_to(&mut buf, 592);
    write_file_record_v5(
        &mut buf,
        96,
        0,
        payload.len() as u32,
        payload.len() as u32,
        64,
    );
    write_name(&mut buf, 576 + 96, name);
    pad_to(&mut buf, 2048);
    buf
}

/// Builds a single-volume version 6 image holding one file with the
/// given flags and stored bytes.
pub fn v6_single_volume(
    name: &str,
    flags: u16,
    uncompressed_size: u32,
    stored: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::new();
    write_volume_header(&mut buf, MAGIC_V6, 128, true, Geometry::default());
    write_descriptor(&mut buf, 128, 64, (0x300, 0x300), 1, 1, Some(64));
    write_name(&mut buf, 192 + 32, name);
    pad_to(&mut buf, 256);
    write_file_record_v6(
        &mut buf,
        flags,
        uncompressed_size,
        stored.len() as u32,
        1024,
        32,
        1,
    );
    pad_to(&mut buf, 1024);
    buf.extend_from_slice(stored);
    buf
}
