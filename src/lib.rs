//! A library for reading multi-volume [InstallShield
//! cabinet](https://en.wikipedia.org/wiki/InstallShield) (CAB)
//! archives, as produced by legacy InstallShield 5 through 13
//! installers.
//!
//! A cabinet is a set of numbered volume files (`data1.cab`,
//! `data2.cab`, ...) whose directory lives either in a companion
//! `data1.hdr` file or in the first volume. Files may be stored or
//! DEFLATE-compressed, and may be split across volume boundaries;
//! both cases are reassembled transparently. Obfuscated entries are
//! detected but not decoded.
//!
//! ```no_run
//! use std::io::Read;
//!
//! let cabinet = iscab::Cabinet::open("install/data1.cab")?;
//! for entry in cabinet.file_entries() {
//!     println!("{} ({} bytes)", entry.name(), entry.uncompressed_size());
//! }
//! let mut data = Vec::new();
//! cabinet.read_file("setup.ini")?.read_to_end(&mut data)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod cabinet;
mod consts;
mod directory;
mod entry;
mod error;
mod header;
mod inflate;
mod source;
mod string;

pub use crate::cabinet::{Cabinet, FileEntries};
pub use crate::entry::{FileEntry, FileReader};
pub use crate::error::{Error, Result};
pub use crate::source::{DirSource, VolumeSource};
