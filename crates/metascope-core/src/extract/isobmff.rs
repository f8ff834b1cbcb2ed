//! ISO base media files (MP4, MOV, M4A, HEIF/AVIF, 3GP).
//!
//! The walk descends only into the container boxes that carry metadata:
//! `moov/trak/mdia/minf` for tracks and `udta/meta/ilst` for iTunes-style
//! tags. Everything else is skipped by size.

use chrono::{DateTime, Utc};

use super::cursor::{fourcc_str, text, ByteCursor};
use super::{format_duration, FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

const MAX_DEPTH: usize = 16;

/// ISO/IEC 14496-12 containers identified by a leading `ftyp` box.
pub struct IsoBmffHandler;

impl FormatHandler for IsoBmffHandler {
    fn name(&self) -> &'static str {
        "ISO BMFF"
    }

    fn description(&self) -> &'static str {
        "MP4, MOV, M4A, HEIF and AVIF (brands, movie header, tracks, iTunes tags)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.len() >= 12 && &bytes[4..8] == b"ftyp"
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        walk(bytes, sink, &[], 0)
    }
}

/// One box header with its payload.
struct Atom<'a> {
    kind: [u8; 4],
    body: &'a [u8],
}

fn next_atom<'a>(cursor: &mut ByteCursor<'a>) -> ParseResult<Atom<'a>> {
    let start = cursor.position();
    let size32 = cursor.u32()?;
    let kind = cursor.fourcc()?;
    let size = match size32 {
        // Box extends to the end of its parent
        0 => (cursor.remaining() + 8) as u64,
        1 => cursor.u64()?,
        n => u64::from(n),
    };
    let header_len = (cursor.position() - start) as u64;
    if size < header_len {
        return Err(ParseError::Invalid(format!(
            "box '{}' declares size {size}, smaller than its header",
            fourcc_str(&kind)
        )));
    }
    let body_len = usize::try_from(size - header_len)
        .map_err(|_| ParseError::Invalid("box size exceeds address space".into()))?;
    let body = cursor.take(body_len)?;
    Ok(Atom { kind, body })
}

fn walk(data: &[u8], sink: &mut FieldSink, path: &[[u8; 4]], depth: usize) -> ParseResult<()> {
    if depth > MAX_DEPTH {
        return Err(ParseError::Invalid("boxes nested too deeply".into()));
    }
    let mut cursor = ByteCursor::new(data);
    while !cursor.is_empty() {
        let atom = next_atom(&mut cursor)?;
        let mut child_path = path.to_vec();
        child_path.push(atom.kind);

        match &atom.kind {
            b"ftyp" => read_ftyp(atom.body, sink)?,
            b"mvhd" => read_mvhd(atom.body, sink)?,
            b"tkhd" => read_tkhd(atom.body, sink)?,
            b"hdlr" if path.last() == Some(b"mdia") => read_hdlr(atom.body, sink)?,
            b"moov" | b"trak" | b"mdia" | b"minf" | b"udta" => {
                walk(atom.body, sink, &child_path, depth + 1)?
            }
            b"meta" => {
                // QuickTime 'meta' is a plain container; ISO 'meta' is a full box
                let body = if is_full_box(atom.body) {
                    &atom.body[4..]
                } else {
                    atom.body
                };
                walk(body, sink, &child_path, depth + 1)?
            }
            b"ilst" => read_ilst(atom.body, sink)?,
            _ => {}
        }
    }
    Ok(())
}

/// A full box starts with zero version/flags where a plain container would
/// hold the size of its first child.
fn is_full_box(body: &[u8]) -> bool {
    body.len() >= 12 && body[..4] == [0, 0, 0, 0]
}

fn read_ftyp(body: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(body);
    let major = cursor.fourcc()?;
    let minor = cursor.u32()?;
    let mut compatible = Vec::new();
    while cursor.remaining() >= 4 {
        let brand = cursor.fourcc()?;
        if brand != [0; 4] {
            compatible.push(fourcc_str(&brand).trim().to_string());
        }
    }

    let major_str = fourcc_str(&major).trim().to_string();
    sink.push("Major brand", format!("{major_str} (version {minor})"));
    if !compatible.is_empty() {
        sink.push("Compatible brands", compatible.join(", "));
    }
    sink.push("Container kind", brand_kind(&major_str));
    Ok(())
}

fn brand_kind(brand: &str) -> &'static str {
    match brand {
        "qt" => "QuickTime movie",
        "M4A" | "M4B" | "M4P" => "MPEG-4 audio",
        "M4V" => "MPEG-4 video (iTunes)",
        "heic" | "heix" | "mif1" | "msf1" | "heim" | "heis" | "hevc" => "HEIF image",
        "avif" | "avis" => "AVIF image",
        "3gp4" | "3gp5" | "3gp6" | "3g2a" => "3GPP multimedia",
        "crx" => "Canon raw (CR3)",
        _ => "MPEG-4 media",
    }
}

/// Seconds between 1904-01-01 and the Unix epoch.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

fn mac_time(seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(seconds).ok()?;
    DateTime::from_timestamp(seconds - MAC_EPOCH_OFFSET, 0)
}

fn read_mvhd(body: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(body);
    let version = cursor.u8()?;
    cursor.skip(3)?;
    let (created, modified, timescale, duration) = if version == 1 {
        (cursor.u64()?, cursor.u64()?, cursor.u32()?, cursor.u64()?)
    } else {
        (
            u64::from(cursor.u32()?),
            u64::from(cursor.u32()?),
            cursor.u32()?,
            u64::from(cursor.u32()?),
        )
    };

    // A zero timestamp means "unset"
    if created > 0 {
        if let Some(date) = mac_time(created) {
            sink.push("Creation date", date.format("%Y-%m-%d %H:%M:%S").to_string());
        }
    }
    if modified > 0 {
        if let Some(date) = mac_time(modified) {
            sink.push("Last modification", date.format("%Y-%m-%d %H:%M:%S").to_string());
        }
    }
    if timescale > 0 {
        sink.push(
            "Duration",
            format_duration(duration as f64 / f64::from(timescale)),
        );
    }
    Ok(())
}

fn read_tkhd(body: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(body);
    let version = cursor.u8()?;
    cursor.skip(3)?;
    // Times, track id, reserved, duration
    cursor.skip(if version == 1 { 32 } else { 20 })?;
    // Reserved, layer, alternate group, volume, reserved, matrix
    cursor.skip(8 + 2 + 2 + 2 + 2 + 36)?;
    let width = cursor.u32()? >> 16;
    let height = cursor.u32()? >> 16;
    if width > 0 && height > 0 {
        sink.push("Image width", format!("{width} pixels"));
        sink.push("Image height", format!("{height} pixels"));
    }
    Ok(())
}

fn read_hdlr(body: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(body);
    cursor.skip(8)?;
    let handler = cursor.fourcc()?;
    let kind = match &handler {
        b"vide" => "video".to_string(),
        b"soun" => "audio".to_string(),
        b"hint" => "hint".to_string(),
        b"text" | b"sbtl" | b"subt" => "subtitle".to_string(),
        b"meta" => "timed metadata".to_string(),
        other => fourcc_str(other),
    };
    sink.push("Track", kind);
    Ok(())
}

fn ilst_label(kind: &[u8; 4]) -> Option<&'static str> {
    Some(match kind {
        b"\xa9nam" => "Title",
        b"\xa9ART" => "Artist",
        b"aART" => "Album artist",
        b"\xa9alb" => "Album",
        b"\xa9day" => "Creation date",
        b"\xa9too" => "Encoder",
        b"\xa9cmt" => "Comment",
        b"\xa9gen" => "Genre",
        b"\xa9wrt" => "Composer",
        b"cprt" | b"\xa9cpy" => "Copyright",
        b"desc" => "Description",
        _ => return None,
    })
}

fn read_ilst(body: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut items = ByteCursor::new(body);
    while !items.is_empty() {
        let item = next_atom(&mut items)?;
        let Some(label) = ilst_label(&item.kind) else {
            continue;
        };
        let mut values = ByteCursor::new(item.body);
        while !values.is_empty() {
            let data = next_atom(&mut values)?;
            if &data.kind != b"data" {
                continue;
            }
            let mut cursor = ByteCursor::new(data.body);
            let type_code = cursor.u32()? & 0x00FF_FFFF;
            cursor.skip(4)?; // locale
            // Type 1 is UTF-8 text; other well-known types are binary
            if type_code == 1 {
                sink.push(label, text(cursor.rest()));
            }
        }
    }
    Ok(())
}
