//! RIFF containers: WebP images, WAV audio and AVI video.
//!
//! All three share the chunk layout (fourcc, little-endian size, payload,
//! pad byte to even length); only the chunks they care about differ.

use super::cursor::{fourcc_str, text, ByteCursor};
use super::exif_fields::push_exif_fields;
use super::{format_duration, FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

fn is_riff(bytes: &[u8], form: &[u8; 4]) -> bool {
    bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == form
}

/// One RIFF chunk borrowed from the input.
struct Chunk<'a> {
    id: [u8; 4],
    data: &'a [u8],
}

/// Read the next chunk, consuming its pad byte when present.
fn next_chunk<'a>(cursor: &mut ByteCursor<'a>) -> ParseResult<Chunk<'a>> {
    let id = cursor.fourcc()?;
    let size = cursor.u32()? as usize;
    let data = cursor.take(size)?;
    if size % 2 == 1 && !cursor.is_empty() {
        cursor.skip(1)?;
    }
    Ok(Chunk { id, data })
}

/// Walk the chunks of a RIFF form body (everything after `RIFF size form`).
fn for_each_chunk<'a>(
    body: &'a [u8],
    mut visit: impl FnMut(Chunk<'a>) -> ParseResult<()>,
) -> ParseResult<()> {
    let mut cursor = ByteCursor::little_endian(body);
    while !cursor.is_empty() {
        visit(next_chunk(&mut cursor)?)?;
    }
    Ok(())
}

/// Body of the RIFF form, bounded by the declared RIFF size.
///
/// A file shorter than its declared size yields what is there; the chunk
/// walk then reports the truncation at the chunk that was cut.
fn form_body(bytes: &[u8]) -> ParseResult<&[u8]> {
    let mut cursor = ByteCursor::little_endian(bytes);
    cursor.skip(4)?;
    let riff_size = cursor.u32()? as usize;
    cursor.skip(4)?;
    // The declared size includes the 4-byte form type
    let body_len = riff_size.checked_sub(4).ok_or_else(|| {
        ParseError::Invalid(format!("RIFF size {riff_size} is smaller than its header"))
    })?;
    let available = cursor.remaining();
    cursor.take(body_len.min(available))
}

/// LIST/INFO text tags shared by WAV and AVI.
fn read_info_list(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::little_endian(data);
    if &cursor.fourcc()? != b"INFO" {
        return Ok(());
    }
    for_each_chunk(cursor.rest(), |chunk| {
        let label = match &chunk.id {
            b"INAM" => "Title".to_string(),
            b"IART" => "Artist".to_string(),
            b"IPRD" => "Album".to_string(),
            b"ICMT" => "Comment".to_string(),
            b"ICOP" => "Copyright".to_string(),
            b"ICRD" => "Creation date".to_string(),
            b"IGNR" => "Genre".to_string(),
            b"ISFT" => "Producer".to_string(),
            b"ITRK" | b"IPRT" => "Track number".to_string(),
            b"IENG" => "Engineer".to_string(),
            other => fourcc_str(other),
        };
        sink.push(label, text(chunk.data));
        Ok(())
    })
}

/// WebP images (lossy, lossless and extended).
pub struct WebpHandler;

impl FormatHandler for WebpHandler {
    fn name(&self) -> &'static str {
        "WebP"
    }

    fn description(&self) -> &'static str {
        "WebP image (VP8/VP8L/VP8X headers, EXIF and XMP chunks)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        is_riff(bytes, b"WEBP")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut has_canvas = false;
        for_each_chunk(form_body(bytes)?, |chunk| {
            match &chunk.id {
                b"VP8X" => {
                    read_vp8x(chunk.data, sink)?;
                    has_canvas = true;
                }
                b"VP8 " => {
                    sink.push("Compression", "VP8 (lossy)");
                    if !has_canvas {
                        read_vp8_size(chunk.data, sink)?;
                    }
                }
                b"VP8L" => {
                    sink.push("Compression", "VP8L (lossless)");
                    if !has_canvas {
                        read_vp8l_size(chunk.data, sink)?;
                    }
                }
                b"ANIM" => {
                    let mut cursor = ByteCursor::little_endian(chunk.data);
                    cursor.skip(4)?;
                    let loops = cursor.u16()?;
                    let value = if loops == 0 {
                        "infinite".to_string()
                    } else {
                        loops.to_string()
                    };
                    sink.push("Loop count", value);
                }
                b"ICCP" => sink.push("ICC profile", "present"),
                b"EXIF" => {
                    // Some writers keep the JPEG APP1 prefix
                    let tiff = chunk.data.strip_prefix(b"Exif\0\0").unwrap_or(chunk.data);
                    if let Err(e) = push_exif_fields(tiff, sink) {
                        sink.warn(format!("EXIF chunk could not be decoded: {e}"));
                    }
                }
                b"XMP " => sink.push("XMP metadata", format!("present ({} bytes)", chunk.data.len())),
                _ => {}
            }
            Ok(())
        })
    }
}

fn read_vp8x(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::little_endian(data);
    let flags = cursor.u8()?;
    cursor.skip(3)?;
    let width = cursor.u24()? + 1;
    let height = cursor.u24()? + 1;
    sink.push("Image width", format!("{width} pixels"));
    sink.push("Image height", format!("{height} pixels"));
    if flags & 0x10 != 0 {
        sink.push("Alpha channel", "yes");
    }
    if flags & 0x02 != 0 {
        sink.push("Animated", "yes");
    }
    Ok(())
}

fn read_vp8_size(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::little_endian(data);
    cursor.skip(3)?;
    if cursor.take(3)? != [0x9D, 0x01, 0x2A] {
        return Err(ParseError::Invalid("VP8 start code missing".into()));
    }
    let width = cursor.u16()? & 0x3FFF;
    let height = cursor.u16()? & 0x3FFF;
    sink.push("Image width", format!("{width} pixels"));
    sink.push("Image height", format!("{height} pixels"));
    Ok(())
}

fn read_vp8l_size(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::little_endian(data);
    if cursor.u8()? != 0x2F {
        return Err(ParseError::Invalid("VP8L signature missing".into()));
    }
    let bits = cursor.u32()?;
    let width = (bits & 0x3FFF) + 1;
    let height = ((bits >> 14) & 0x3FFF) + 1;
    sink.push("Image width", format!("{width} pixels"));
    sink.push("Image height", format!("{height} pixels"));
    if bits & (1 << 28) != 0 {
        sink.push("Alpha channel", "yes");
    }
    Ok(())
}

/// WAVE audio.
pub struct WavHandler;

impl FormatHandler for WavHandler {
    fn name(&self) -> &'static str {
        "WAV"
    }

    fn description(&self) -> &'static str {
        "WAVE audio (format chunk, duration, LIST/INFO tags)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        is_riff(bytes, b"WAVE")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut byte_rate = 0u32;
        for_each_chunk(form_body(bytes)?, |chunk| {
            match &chunk.id {
                b"fmt " => byte_rate = read_wave_format(chunk.data, sink)?,
                b"data" if byte_rate > 0 => {
                    let seconds = chunk.data.len() as f64 / f64::from(byte_rate);
                    sink.push("Duration", format_duration(seconds));
                }
                b"LIST" => read_info_list(chunk.data, sink)?,
                _ => {}
            }
            Ok(())
        })
    }
}

/// Push the `fmt ` chunk fields and return the byte rate.
fn read_wave_format(data: &[u8], sink: &mut FieldSink) -> ParseResult<u32> {
    let mut cursor = ByteCursor::little_endian(data);
    let format_tag = cursor.u16()?;
    let channels = cursor.u16()?;
    let sample_rate = cursor.u32()?;
    let byte_rate = cursor.u32()?;
    let _block_align = cursor.u16()?;
    let bits = cursor.u16()?;

    let codec = match format_tag {
        0x0001 => "Microsoft PCM".to_string(),
        0x0003 => "IEEE float".to_string(),
        0x0006 => "A-law".to_string(),
        0x0007 => "mu-law".to_string(),
        0x0055 => "MPEG Layer III".to_string(),
        0xFFFE => "Extensible".to_string(),
        other => format!("format 0x{other:04X}"),
    };
    sink.push("Compression", codec);
    sink.push("Channel", channels.to_string());
    sink.push("Sample rate", format!("{sample_rate} Hz"));
    sink.push("Bits/sample", bits.to_string());
    sink.push(
        "Bit rate",
        format!("{:.1} Kbit/sec", f64::from(byte_rate) * 8.0 / 1000.0),
    );
    Ok(byte_rate)
}

/// AVI video.
pub struct AviHandler;

impl FormatHandler for AviHandler {
    fn name(&self) -> &'static str {
        "AVI"
    }

    fn description(&self) -> &'static str {
        "AVI video (main header, stream count, LIST/INFO tags)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        is_riff(bytes, b"AVI ")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        for_each_chunk(form_body(bytes)?, |chunk| {
            if &chunk.id != b"LIST" || chunk.data.len() < 4 {
                return Ok(());
            }
            match &chunk.data[..4] {
                b"hdrl" => for_each_chunk(&chunk.data[4..], |inner| {
                    if &inner.id == b"avih" {
                        read_avi_header(inner.data, sink)?;
                    }
                    Ok(())
                }),
                b"INFO" => read_info_list(chunk.data, sink),
                _ => Ok(()),
            }
        })
    }
}

fn read_avi_header(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::little_endian(data);
    let micros_per_frame = cursor.u32()?;
    cursor.skip(12)?;
    let total_frames = cursor.u32()?;
    cursor.skip(4)?;
    let streams = cursor.u32()?;
    cursor.skip(4)?;
    let width = cursor.u32()?;
    let height = cursor.u32()?;

    if micros_per_frame > 0 {
        let fps = 1_000_000.0 / f64::from(micros_per_frame);
        sink.push("Frame rate", format!("{fps:.2} fps"));
        let seconds = f64::from(total_frames) * f64::from(micros_per_frame) / 1_000_000.0;
        sink.push("Duration", format_duration(seconds));
    }
    sink.push("Image width", format!("{width} pixels"));
    sink.push("Image height", format!("{height} pixels"));
    sink.push("Streams", streams.to_string());
    Ok(())
}
