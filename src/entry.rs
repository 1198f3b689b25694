use std::io::{self, Cursor, Read, Seek, SeekFrom};

use crate::consts;

/// Metadata about one file stored in a cabinet.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub(crate) name: String,
    pub(crate) uncompressed_size: u32,
    pub(crate) compressed_size: u32,
    pub(crate) offset: u32,
    pub(crate) flags: u16,
    pub(crate) volume: u16,
}

impl FileEntry {
    /// Returns the path of the file inside the cabinet, with `\`
    /// separating components.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the size of the file once decompressed, in bytes.
    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    /// Returns the size of the file as stored, in bytes.
    pub fn compressed_size(&self) -> u32 {
        self.compressed_size
    }

    /// Returns the 1-based index of the volume the file starts in.
    pub fn volume(&self) -> u16 {
        self.volume
    }

    /// Returns true if the file's data continues into later volumes.
    pub fn is_split(&self) -> bool {
        (self.flags & consts::FLAG_SPLIT) != 0
    }

    /// Returns true if the file is stored obfuscated.
    pub fn is_obfuscated(&self) -> bool {
        (self.flags & consts::FLAG_OBFUSCATED) != 0
    }

    /// Returns true if the file is stored compressed.
    pub fn is_compressed(&self) -> bool {
        (self.flags & consts::FLAG_COMPRESSED) != 0
    }
}

/// A reader over the decompressed bytes of one cabinet file.
///
/// Returned by [`Cabinet::read_file`](crate::Cabinet::read_file). A
/// stored, unsplit file streams straight out of its volume; split or
/// compressed files are served from an owned in-memory buffer. Either
/// way the reader is seekable within `0..size()`.
pub struct FileReader<V> {
    inner: FileReaderInner<V>,
}

enum FileReaderInner<V> {
    Volume { stream: V, start: u64, size: u64, pos: u64 },
    Memory(Cursor<Vec<u8>>),
}

impl<V: Read + Seek> FileReader<V> {
    pub(crate) fn from_memory(data: Vec<u8>) -> FileReader<V> {
        FileReader { inner: FileReaderInner::Memory(Cursor::new(data)) }
    }

    pub(crate) fn from_volume(
        mut stream: V,
        start: u64,
        size: u64,
    ) -> io::Result<FileReader<V>> {
        stream.seek(SeekFrom::Start(start))?;
        Ok(FileReader {
            inner: FileReaderInner::Volume { stream, start, size, pos: 0 },
        })
    }

    /// Returns the total length of the stream, in bytes.
    pub fn size(&self) -> u64 {
        match &self.inner {
            FileReaderInner::Volume { size, .. } => *size,
            FileReaderInner::Memory(cursor) => cursor.get_ref().len() as u64,
        }
    }

    fn position(&self) -> u64 {
        match &self.inner {
            FileReaderInner::Volume { pos, .. } => *pos,
            FileReaderInner::Memory(cursor) => cursor.position(),
        }
    }
}

impl<V: Read + Seek> Read for FileReader<V> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            FileReaderInner::Volume { stream, size, pos, .. } => {
                debug_assert!(*pos <= *size);
                let bytes_remaining = *size - *pos;
                let max_bytes = bytes_remaining.min(buf.len() as u64) as usize;
                if max_bytes == 0 {
                    return Ok(0);
                }
                let bytes_read = stream.read(&mut buf[..max_bytes])?;
                *pos += bytes_read as u64;
                Ok(bytes_read)
            }
            FileReaderInner::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl<V: Read + Seek> Seek for FileReader<V> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.size();
        let new_offset = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => self.position() as i64 + delta,
            SeekFrom::End(delta) => size as i64 + delta,
        };
        if new_offset < 0 || (new_offset as u64) > size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot seek to {}, file length is {}",
                    new_offset, size
                ),
            ));
        }
        let new_offset = new_offset as u64;
        match &mut self.inner {
            FileReaderInner::Volume { stream, start, pos, .. } => {
                stream.seek(SeekFrom::Start(*start + new_offset))?;
                *pos = new_offset;
            }
            FileReaderInner::Memory(cursor) => cursor.set_position(new_offset),
        }
        Ok(new_offset)
    }
}
