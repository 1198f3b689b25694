//! Error types for cabinet parsing and extraction.

use std::io;

use thiserror::Error;

/// Result type for cabinet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening a cabinet or extracting a file from it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The first four bytes of a volume were not the InstallShield
    /// cabinet signature.
    #[error("not an InstallShield cabinet (signature {0:#010x})")]
    BadSignature(u32),

    /// The cabinet version decoded from the magic bytes is outside the
    /// supported range of 5 through 13.
    #[error("unsupported cabinet version {version} (magic bytes {magic:#010x})")]
    UnsupportedVersion {
        /// The decoded version.
        version: u32,
        /// The raw magic bytes the version was decoded from.
        magic: u32,
    },

    /// A volume needed to resolve or read the named file could not be
    /// opened.
    #[error("cannot open volume {volume} holding `{name}`")]
    VolumeMissing {
        /// The 1-based volume index, or 0 if no volume claims the file.
        volume: u16,
        /// The path of the affected file, or the volume file name when
        /// the cabinet itself could not be opened.
        name: String,
    },

    /// The volumes ran out of data before the named file's compressed
    /// bytes were fully assembled.
    #[error("`{name}` is truncated (expected {expected} compressed bytes, assembled {actual})")]
    Truncated {
        /// The path of the affected file.
        name: String,
        /// The file's declared compressed size.
        expected: u64,
        /// The number of bytes actually recovered.
        actual: u64,
    },

    /// The DEFLATE stream for the named file could not be decoded.
    #[error("failed to inflate `{name}`")]
    InflateFailed {
        /// The path of the affected file.
        name: String,
        /// The underlying decoder error.
        #[source]
        source: io::Error,
    },

    /// The requested path is not present in the cabinet.
    #[error("no such file in cabinet: `{0}`")]
    NotFound(String),

    /// The entry is stored obfuscated, which this reader does not undo.
    #[error("`{0}` is obfuscated and cannot be extracted")]
    Obfuscated(String),

    /// An I/O error from one of the underlying volume streams.
    #[error(transparent)]
    Io(#[from] io::Error),
}
