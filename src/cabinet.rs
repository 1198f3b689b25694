use std::collections::hash_map;
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::warn;

use crate::directory::{fold_key, load_directory};
use crate::entry::{FileEntry, FileReader};
use crate::error::{Error, Result};
use crate::header::{read_volume_header, VolumeHeader};
use crate::inflate;
use crate::source::{DirSource, VolumeSource};

/// A read-only view of a multi-volume InstallShield cabinet.
///
/// Opening enumerates the `<base>N.cab` volumes, then loads the file
/// directory from `<base>1.hdr` (or volume 1 when no `.hdr` file
/// exists). Once open the cabinet is immutable: [`read_file`] takes
/// `&self` and opens its own volume streams, so parallel readers need
/// no external locking.
///
/// [`read_file`]: Cabinet::read_file
pub struct Cabinet<S: VolumeSource> {
    source: S,
    base_name: String,
    version: u32,
    volumes: Vec<VolumeHeader>,
    entries: HashMap<String, FileEntry>,
}

impl Cabinet<DirSource> {
    /// Opens the cabinet whose volumes sit next to `path`.
    ///
    /// `path` may name any of the cabinet's files (`data1.cab`,
    /// `data1.hdr`) or just the base (`data`); a trailing volume digit
    /// and extension are stripped before volume names are generated.
    pub fn open(path: impl AsRef<Path>) -> Result<Cabinet<DirSource>> {
        let path = path.as_ref();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Cabinet::open_with(DirSource::new(dir), &base_name)
    }
}

impl<S: VolumeSource> Cabinet<S> {
    /// Opens a cabinet through an arbitrary volume source.
    pub fn open_with(source: S, base_name: &str) -> Result<Cabinet<S>> {
        let base_name = strip_volume_suffix(base_name).to_string();

        // Read every volume header up to the first absent volume.
        let mut volumes = Vec::new();
        loop {
            let name = volume_name(&base_name, volumes.len() as u16 + 1);
            let mut stream = match source.open_volume(&name)? {
                Some(stream) => stream,
                None => break,
            };
            volumes.push(read_volume_header(&mut stream)?);
        }

        // The directory lives in the .hdr file when one exists, else
        // in volume 1.
        let header_name = header_name(&base_name);
        let mut header_stream = match source.open_volume(&header_name)? {
            Some(stream) => Some(stream),
            None => source.open_volume(&volume_name(&base_name, 1))?,
        };
        let directory = match header_stream.as_mut() {
            Some(stream) => load_directory(stream, &volumes)?,
            None => {
                return Err(Error::VolumeMissing {
                    volume: 1,
                    name: header_name,
                })
            }
        };

        Ok(Cabinet {
            source,
            base_name,
            version: directory.version,
            volumes,
            entries: directory.entries,
        })
    }

    /// Returns the cabinet format version (5 through 13).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns true if a file with the given path is in the cabinet.
    /// Paths match case-insensitively.
    pub fn has_file(&self, path: &str) -> bool {
        self.entries.contains_key(&fold_key(path))
    }

    /// Returns the entry for the file with the given path, if any.
    pub fn get_file_entry(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(&fold_key(path))
    }

    /// Returns an iterator over the file entries in the cabinet. The
    /// order is unspecified but stable for one opened cabinet.
    pub fn file_entries(&self) -> FileEntries {
        FileEntries { iter: self.entries.values() }
    }

    /// Closes the cabinet, dropping its directory.
    ///
    /// Afterwards `has_file` reports false for every path and
    /// [`read_file`](Cabinet::read_file) fails with
    /// [`Error::NotFound`]. Closing twice is harmless.
    pub fn close(&mut self) {
        self.base_name.clear();
        self.version = 0;
        self.volumes.clear();
        self.entries.clear();
    }

    /// Returns a reader over the decompressed bytes of the named file.
    pub fn read_file(&self, path: &str) -> Result<FileReader<S::Volume>> {
        let entry = match self.get_file_entry(path) {
            Some(entry) => entry,
            None => return Err(Error::NotFound(path.to_string())),
        };
        if entry.is_obfuscated() {
            warn!(name = %entry.name(), "cannot extract an obfuscated file");
            return Err(Error::Obfuscated(entry.name().to_string()));
        }

        if !entry.is_compressed() {
            if entry.is_split() {
                let mut data = self.assemble_split(entry)?;
                data.resize(entry.uncompressed_size() as usize, 0);
                return Ok(FileReader::from_memory(data));
            }
            // Stored and unsplit: stream straight from the volume.
            let stream = self.open_entry_volume(entry.volume(), entry.name())?;
            return Ok(FileReader::from_volume(
                stream,
                entry.offset as u64,
                entry.uncompressed_size() as u64,
            )?);
        }

        let src = if entry.is_split() {
            self.assemble_split(entry)?
        } else {
            let mut stream =
                self.open_entry_volume(entry.volume(), entry.name())?;
            stream.seek(SeekFrom::Start(entry.offset as u64))?;
            let mut src = vec![0u8; entry.compressed_size() as usize];
            read_fully(&mut stream, &mut src, entry, 0)?;
            src
        };

        let mut dst = vec![0u8; entry.uncompressed_size() as usize];
        // Zero-byte entries are legal and carry no DEFLATE stream.
        if !src.is_empty() {
            if let Err(source) = inflate::inflate(&src, &mut dst) {
                warn!(name = %entry.name(), error = %source, "failed to inflate a cabinet file");
                return Err(Error::InflateFailed {
                    name: entry.name().to_string(),
                    source,
                });
            }
        }
        Ok(FileReader::from_memory(dst))
    }

    /// Concatenates the compressed bytes of a split file: the tail of
    /// its starting volume, then the leading portion of each following
    /// volume until `compressed_size` bytes are assembled.
    fn assemble_split(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        let total = entry.compressed_size() as usize;
        let mut data = vec![0u8; total];
        let mut volume = entry.volume();

        let header = self.volume_header(volume, entry.name())?;
        let mut stream = self.open_entry_volume(volume, entry.name())?;
        stream.seek(SeekFrom::Start(entry.offset as u64))?;
        let mut filled =
            (header.last_file_size_compressed as usize).min(total);
        read_fully(&mut stream, &mut data[..filled], entry, 0)?;

        while filled < total {
            volume += 1;
            let header = self.volume_header(volume, entry.name())?;
            let mut stream = self.open_entry_volume(volume, entry.name())?;
            stream.seek(SeekFrom::Start(header.first_file_offset as u64))?;
            let take = (header.first_file_size_compressed as usize)
                .min(total - filled);
            if take == 0 {
                return Err(Error::Truncated {
                    name: entry.name().to_string(),
                    expected: total as u64,
                    actual: filled as u64,
                });
            }
            read_fully(
                &mut stream,
                &mut data[filled..filled + take],
                entry,
                filled,
            )?;
            filled += take;
        }
        Ok(data)
    }

    fn volume_header(
        &self,
        volume: u16,
        name: &str,
    ) -> Result<&VolumeHeader> {
        match volume
            .checked_sub(1)
            .and_then(|slot| self.volumes.get(slot as usize))
        {
            Some(header) => Ok(header),
            None => {
                warn!(name = %name, volume, "volume is not part of the cabinet");
                Err(Error::VolumeMissing { volume, name: name.to_string() })
            }
        }
    }

    fn open_entry_volume(&self, volume: u16, name: &str) -> Result<S::Volume> {
        self.volume_header(volume, name)?;
        match self
            .source
            .open_volume(&volume_name(&self.base_name, volume))?
        {
            Some(stream) => Ok(stream),
            None => {
                warn!(name = %name, volume, "failed to open a cabinet volume");
                Err(Error::VolumeMissing { volume, name: name.to_string() })
            }
        }
    }
}

/// An iterator over the file entries in a cabinet.
pub struct FileEntries<'a> {
    iter: hash_map::Values<'a, String, FileEntry>,
}

impl<'a> Iterator for FileEntries<'a> {
    type Item = &'a FileEntry;

    fn next(&mut self) -> Option<&'a FileEntry> {
        self.iter.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a> ExactSizeIterator for FileEntries<'a> {}

/// Reads `buf.len()` bytes, mapping a premature end of the volume to
/// [`Error::Truncated`].
fn read_fully<R: Read>(
    stream: &mut R,
    buf: &mut [u8],
    entry: &FileEntry,
    assembled: usize,
) -> Result<()> {
    stream.read_exact(buf).map_err(|error| {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated {
                name: entry.name().to_string(),
                expected: entry.compressed_size() as u64,
                actual: assembled as u64,
            }
        } else {
            Error::Io(error)
        }
    })
}

fn volume_name(base: &str, volume: u16) -> String {
    format!("{}{}.cab", base, volume)
}

fn header_name(base: &str) -> String {
    format!("{}1.hdr", base)
}

/// Strips a trailing `.cab` or `.hdr` extension along with the volume
/// digit assumed to precede it, so any of `data`, `data1.cab` and
/// `data1.hdr` name the same cabinet.
fn strip_volume_suffix(name: &str) -> &str {
    if name.len() >= 5 && (name.ends_with(".cab") || name.ends_with(".hdr")) {
        name.get(..name.len() - 5).unwrap_or(name)
    } else {
        name
    }
}
