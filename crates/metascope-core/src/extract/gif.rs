//! GIF block walker.

use super::cursor::{latin1, ByteCursor};
use super::{FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

/// GIF87a and GIF89a images.
pub struct GifHandler;

impl FormatHandler for GifHandler {
    fn name(&self) -> &'static str {
        "GIF"
    }

    fn description(&self) -> &'static str {
        "GIF image (screen descriptor, comments, frames, loop count)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut cursor = ByteCursor::little_endian(bytes);
        let header = cursor.take(6)?;
        sink.push("Format version", latin1(&header[3..]));

        let width = cursor.u16()?;
        let height = cursor.u16()?;
        let packed = cursor.u8()?;
        let _background = cursor.u8()?;
        let _aspect = cursor.u8()?;

        sink.push("Image width", format!("{width} pixels"));
        sink.push("Image height", format!("{height} pixels"));
        sink.push("Bits/pixel", ((packed & 0x07) + 1).to_string());
        if packed & 0x80 != 0 {
            let colors = palette_size(packed);
            sink.push("Palette", format!("{colors} colors"));
            cursor.skip(3 * colors)?;
        }
        sink.push("Compression", "LZW");

        let mut frames = 0u32;
        loop {
            match cursor.u8()? {
                0x21 => read_extension(&mut cursor, sink)?,
                0x2C => {
                    skip_image(&mut cursor)?;
                    frames += 1;
                }
                0x3B => break,
                other => {
                    return Err(ParseError::Invalid(format!(
                        "unknown block 0x{other:02X} at offset {}",
                        cursor.position() - 1
                    )));
                }
            }
        }

        if frames > 1 {
            sink.push("Frames", frames.to_string());
        }
        Ok(())
    }
}

fn palette_size(packed: u8) -> usize {
    1 << ((packed & 0x07) + 1)
}

/// Concatenate data sub-blocks up to the zero-length terminator.
fn read_sub_blocks(cursor: &mut ByteCursor<'_>) -> ParseResult<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        let size = cursor.u8()? as usize;
        if size == 0 {
            return Ok(data);
        }
        data.extend_from_slice(cursor.take(size)?);
    }
}

fn read_extension(cursor: &mut ByteCursor<'_>, sink: &mut FieldSink) -> ParseResult<()> {
    let label = cursor.u8()?;
    let data = read_sub_blocks(cursor)?;
    match label {
        0xFE => sink.push("Comment", latin1(&data)),
        0xFF if data.len() >= 14 && &data[..11] == b"NETSCAPE2.0" && data[11] == 1 => {
            let loops = u16::from_le_bytes([data[12], data[13]]);
            let value = if loops == 0 {
                "infinite".to_string()
            } else {
                loops.to_string()
            };
            sink.push("Loop count", value);
        }
        0xFF if data.len() >= 11 && &data[..11] == b"XMP DataXMP" => {
            sink.push("XMP metadata", "present");
        }
        _ => {}
    }
    Ok(())
}

fn skip_image(cursor: &mut ByteCursor<'_>) -> ParseResult<()> {
    cursor.skip(8)?;
    let packed = cursor.u8()?;
    if packed & 0x80 != 0 {
        cursor.skip(3 * palette_size(packed))?;
    }
    let _lzw_min_code_size = cursor.u8()?;
    read_sub_blocks(cursor)?;
    Ok(())
}
