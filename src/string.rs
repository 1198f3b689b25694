use std::io::{self, Read};

use byteorder::ReadBytesExt;

use crate::consts;

/// Reads a NUL-terminated byte string from the name area of the file
/// table. Names in the cabinets we read are effectively ASCII; anything
/// else is decoded lossily.
pub(crate) fn read_null_terminated_string<R: Read>(
    reader: &mut R,
) -> io::Result<String> {
    let mut bytes = Vec::<u8>::new();
    loop {
        let byte = reader.read_u8()?;
        if byte == 0 {
            break;
        } else if bytes.len() == consts::MAX_NAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "file name longer than maximum of {} bytes",
                    consts::MAX_NAME_SIZE
                ),
            ));
        }
        bytes.push(byte);
    }
    Ok(String::from_utf8_lossy(&bytes).to_string())
}
