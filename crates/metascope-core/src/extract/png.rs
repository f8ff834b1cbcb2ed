//! PNG chunk walker.

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::cursor::{fourcc_str, latin1, text, ByteCursor};
use super::exif_fields::push_exif_fields;
use super::{ppm_to_dpi, FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Largest inflated text chunk kept in a report.
const MAX_TEXT_BYTES: u64 = 64 * 1024;

/// PNG and APNG images.
pub struct PngHandler;

impl FormatHandler for PngHandler {
    fn name(&self) -> &'static str {
        "PNG"
    }

    fn description(&self) -> &'static str {
        "PNG image (header, text chunks, timestamps, resolution)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&SIGNATURE)
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut cursor = ByteCursor::new(bytes);
        cursor.skip(SIGNATURE.len())?;

        loop {
            let length = cursor.u32()?;
            if length > i32::MAX as u32 {
                return Err(ParseError::Invalid(format!(
                    "chunk length {length} exceeds 2^31-1"
                )));
            }
            let chunk_type = cursor.fourcc()?;
            let data = cursor.take(length as usize)?;
            let stored_crc = cursor.u32()?;

            let mut crc = flate2::Crc::new();
            crc.update(&chunk_type);
            crc.update(data);
            if crc.sum() != stored_crc {
                sink.warn(format!(
                    "PNG chunk {} has a bad CRC",
                    fourcc_str(&chunk_type)
                ));
            }

            match &chunk_type {
                b"IHDR" => read_header(data, sink)?,
                b"tEXt" => read_text(data, sink),
                b"zTXt" => read_compressed_text(data, sink),
                b"iTXt" => read_international_text(data, sink),
                b"tIME" => read_time(data, sink)?,
                b"pHYs" => read_physical(data, sink)?,
                b"gAMA" => {
                    let gamma = ByteCursor::new(data).u32()?;
                    sink.push("Gamma", format!("{:.5}", f64::from(gamma) / 100_000.0));
                }
                b"acTL" => {
                    let frames = ByteCursor::new(data).u32()?;
                    sink.push("Animation frames", frames.to_string());
                }
                b"iCCP" => {
                    let name = data.split(|&b| b == 0).next().unwrap_or_default();
                    sink.push("ICC profile", latin1(name));
                }
                b"eXIf" => {
                    if let Err(e) = push_exif_fields(data, sink) {
                        sink.warn(format!("EXIF chunk could not be decoded: {e}"));
                    }
                }
                b"IEND" => return Ok(()),
                _ => {}
            }
        }
    }
}

fn read_header(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(data);
    let width = cursor.u32()?;
    let height = cursor.u32()?;
    let bit_depth = cursor.u8()?;
    let color_type = cursor.u8()?;
    let _compression = cursor.u8()?;
    let _filter = cursor.u8()?;
    let interlace = cursor.u8()?;

    let (pixel_format, channels) = match color_type {
        0 => ("Grayscale", 1),
        2 => ("RGB", 3),
        3 => ("Color index", 1),
        4 => ("Grayscale with alpha", 2),
        6 => ("RGBA", 4),
        other => {
            return Err(ParseError::Invalid(format!("unknown color type {other}")));
        }
    };

    sink.push("Image width", format!("{width} pixels"));
    sink.push("Image height", format!("{height} pixels"));
    sink.push("Bits/pixel", (u32::from(bit_depth) * channels).to_string());
    sink.push("Pixel format", pixel_format);
    sink.push("Compression", "deflate");
    if interlace == 1 {
        sink.push("Interlace", "Adam7");
    }
    Ok(())
}

/// Split a keyword from the rest at the first NUL.
fn split_keyword(data: &[u8]) -> Option<(String, &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;
    Some((latin1(&data[..nul]), &data[nul + 1..]))
}

fn read_text(data: &[u8], sink: &mut FieldSink) {
    match split_keyword(data) {
        Some((keyword, value)) => sink.push(keyword, latin1(value)),
        None => sink.warn("PNG tEXt chunk without keyword separator"),
    }
}

fn read_compressed_text(data: &[u8], sink: &mut FieldSink) {
    let Some((keyword, rest)) = split_keyword(data) else {
        sink.warn("PNG zTXt chunk without keyword separator");
        return;
    };
    match rest.split_first() {
        Some((0, compressed)) => match inflate(compressed) {
            Ok(raw) => sink.push(keyword, latin1(&raw)),
            Err(e) => sink.warn(format!("PNG zTXt '{keyword}' could not be inflated: {e}")),
        },
        _ => sink.warn(format!("PNG zTXt '{keyword}' uses an unknown compression")),
    }
}

fn read_international_text(data: &[u8], sink: &mut FieldSink) {
    let Some((keyword, rest)) = split_keyword(data) else {
        sink.warn("PNG iTXt chunk without keyword separator");
        return;
    };
    let mut cursor = ByteCursor::new(rest);
    let (Ok(compressed), Ok(_method)) = (cursor.u8(), cursor.u8()) else {
        sink.warn(format!("PNG iTXt '{keyword}' is truncated"));
        return;
    };
    // Language tag and translated keyword, both NUL-terminated
    let body = cursor.rest();
    let mut parts = body.splitn(3, |&b| b == 0);
    let (Some(_lang), Some(_translated), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        sink.warn(format!("PNG iTXt '{keyword}' is truncated"));
        return;
    };

    if compressed == 0 {
        sink.push(keyword, text(value));
    } else {
        match inflate(value) {
            Ok(raw) => sink.push(keyword, text(&raw)),
            Err(e) => sink.warn(format!("PNG iTXt '{keyword}' could not be inflated: {e}")),
        }
    }
}

fn inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed)
        .take(MAX_TEXT_BYTES)
        .read_to_end(&mut out)?;
    Ok(out)
}

fn read_time(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(data);
    let year = cursor.u16()?;
    let [month, day, hour, minute, second] = cursor.array::<5>()?;

    let timestamp = chrono::NaiveDate::from_ymd_opt(i32::from(year), month.into(), day.into())
        .and_then(|d| d.and_hms_opt(hour.into(), minute.into(), second.into()));
    match timestamp {
        Some(ts) => sink.push("Last modification", ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => sink.warn("PNG tIME chunk holds an impossible date"),
    }
    Ok(())
}

fn read_physical(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(data);
    let x = cursor.u32()?;
    let y = cursor.u32()?;
    let unit = cursor.u8()?;
    if unit == 1 {
        sink.push(
            "Resolution",
            format!(
                "{} x {} DPI",
                ppm_to_dpi(f64::from(x)),
                ppm_to_dpi(f64::from(y))
            ),
        );
    } else {
        sink.push("Pixel aspect", format!("{x}:{y}"));
    }
    Ok(())
}
