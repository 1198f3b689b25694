//! Opening cabinet volumes by name.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::PathBuf;

/// Opens the numbered volume files of a cabinet by name.
///
/// [`Cabinet`](crate::Cabinet) asks a source for names like `data1.cab`
/// or `data1.hdr`. A source reports an absent volume as `Ok(None)`,
/// which is how volume enumeration knows where the set ends and how the
/// `.hdr`-to-volume-1 fallback is selected; any other failure
/// propagates as an error.
pub trait VolumeSource {
    /// The byte stream a volume is read through.
    type Volume: Read + Seek;

    /// Opens the named volume, or returns `None` if it does not exist.
    fn open_volume(&self, name: &str) -> io::Result<Option<Self::Volume>>;
}

/// A [`VolumeSource`] that opens volume files out of one directory.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> DirSource {
        DirSource { dir: dir.into() }
    }
}

impl VolumeSource for DirSource {
    type Volume = File;

    fn open_volume(&self, name: &str) -> io::Result<Option<File>> {
        match File::open(self.dir.join(name)) {
            Ok(file) => Ok(Some(file)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}
