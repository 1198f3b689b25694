//! The InstallShield variant of headerless DEFLATE.
//!
//! Compressed entries come in two framings. A blob whose last four
//! bytes (read big-endian) are the zlib sync marker is one raw DEFLATE
//! stream. Anything else is a sequence of `(u16 length, raw DEFLATE
//! blob)` chunks, each an independently decodable stream.

use std::io;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::{Decompress, FlushDecompress, Status};

/// Trailer of a raw DEFLATE stream that ends with an empty stored
/// block (a sync flush), read big-endian.
const SYNC_TRAILER: u32 = 0x0000ffff;

/// Inflates `src` into `dst`, filling it up to `dst.len()` bytes or
/// until the source runs dry.
pub(crate) fn inflate(src: &[u8], dst: &mut [u8]) -> io::Result<()> {
    if src.len() >= 4
        && BigEndian::read_u32(&src[src.len() - 4..]) == SYNC_TRAILER
    {
        inflate_headerless(src, dst)?;
        return Ok(());
    }

    let mut read = 0;
    let mut written = 0;
    while written < dst.len() && read + 2 <= src.len() {
        let chunk_size = LittleEndian::read_u16(&src[read..]) as usize;
        read += 2;
        if read + chunk_size > src.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "chunk of {} bytes overruns the compressed data",
                    chunk_size
                ),
            ));
        }
        let produced =
            inflate_headerless(&src[read..read + chunk_size], &mut dst[written..])?;
        read += chunk_size;
        written += produced;
    }
    Ok(())
}

/// Decodes one raw DEFLATE stream into `dst`, returning the number of
/// bytes produced. The stream may end with a final block or at a sync
/// point coinciding with the end of the input.
fn inflate_headerless(src: &[u8], dst: &mut [u8]) -> io::Result<usize> {
    let mut inflater = Decompress::new(false);
    loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out() as usize;
        let status = inflater
            .decompress(
                &src[consumed..],
                &mut dst[produced..],
                FlushDecompress::Finish,
            )
            .map_err(|error| {
                io::Error::new(io::ErrorKind::InvalidData, error)
            })?;
        match status {
            Status::StreamEnd => return Ok(inflater.total_out() as usize),
            _ if inflater.total_in() as usize == src.len() => {
                return Ok(inflater.total_out() as usize)
            }
            Status::Ok => {}
            Status::BufError => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "DEFLATE stream does not fit the declared size",
                ));
            }
        }
    }
}
