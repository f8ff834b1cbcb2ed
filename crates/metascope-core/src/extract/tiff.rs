//! TIFF images (and TIFF-based raw formats) via their IFD tags.
//!
//! A well-formed file is listed through the EXIF reader, which also renders
//! units. When that reader rejects the structure, the IFDs are walked entry
//! by entry so every tag decoded before the break stays in the report.

use std::collections::{HashSet, VecDeque};

use exif::{Context, Field, In, Tag, Value};

use super::cursor::{ByteCursor, Endian};
use super::exif_fields::{push_exif_fields, push_field};
use super::{FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

/// IFDs visited per file, thumbnail and sub-IFDs included.
const MAX_IFDS: usize = 16;

/// Baseline TIFF, little- or big-endian.
pub struct TiffHandler;

impl FormatHandler for TiffHandler {
    fn name(&self) -> &'static str {
        "TIFF"
    }

    fn description(&self) -> &'static str {
        "TIFF image and TIFF-based raw formats (all IFD tags)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        // The reader pushes nothing when it fails
        let Err(reader_error) = push_exif_fields(bytes, sink) else {
            return Ok(());
        };
        tracing::debug!("TIFF reader failed ({}), walking IFDs", reader_error);
        walk_ifds(bytes, sink)?;
        Err(reader_error)
    }
}

/// Push the tags of IFD0, the thumbnail IFD and the EXIF, GPS and interop
/// IFDs they point to, in walk order.
fn walk_ifds(bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let endian = match bytes.get(..2) {
        Some(b"II") => Endian::Little,
        Some(b"MM") => Endian::Big,
        _ => return Err(ParseError::Invalid("unknown TIFF byte order".into())),
    };
    let mut cursor = ByteCursor::with_endian(bytes, endian);
    cursor.skip(2)?;
    if cursor.u16()? != 42 {
        return Err(ParseError::Invalid("bad TIFF magic number".into()));
    }

    let mut pending = VecDeque::from([(cursor.u32()?, In::PRIMARY, Context::Tiff)]);
    let mut visited = HashSet::new();

    while let Some((offset, ifd, context)) = pending.pop_front() {
        if offset == 0 || !visited.insert(offset) || visited.len() > MAX_IFDS {
            continue;
        }
        cursor.seek(offset as usize)?;
        let count = cursor.u16()?;

        for _ in 0..count {
            let field = read_entry(&mut cursor, bytes, endian, ifd, context)?;
            if let Some(sub) = sub_ifd_context(field.tag) {
                if let Value::Long(ref offsets) = field.value {
                    pending.extend(offsets.first().map(|&o| (o, ifd, sub)));
                }
            }
            push_field(&field, sink, |f| f.display_value().to_string());
        }

        let next = cursor.u32()?;
        if ifd == In::PRIMARY && context == Context::Tiff {
            pending.push_back((next, In::THUMBNAIL, Context::Tiff));
        }
    }
    Ok(())
}

fn sub_ifd_context(tag: Tag) -> Option<Context> {
    match tag {
        Tag::ExifIFDPointer => Some(Context::Exif),
        Tag::GPSInfoIFDPointer => Some(Context::Gps),
        Tag::InteropIFDPointer => Some(Context::Interop),
        _ => None,
    }
}

/// Read one 12-byte IFD entry and the value it refers to.
fn read_entry(
    cursor: &mut ByteCursor<'_>,
    bytes: &[u8],
    endian: Endian,
    ifd: In,
    context: Context,
) -> ParseResult<Field> {
    let number = cursor.u16()?;
    let kind = cursor.u16()?;
    let count = cursor.u32()?;
    let inline = cursor.take(4)?;
    let tag = Tag(context, number);

    let Some(unit) = unit_size(kind) else {
        let offset = ByteCursor::with_endian(inline, endian).u32()?;
        return Ok(Field {
            tag,
            ifd_num: ifd,
            value: Value::Unknown(kind, count, offset),
        });
    };

    let size = (count as usize).checked_mul(unit).ok_or_else(|| {
        ParseError::Invalid(format!("tag {tag} declares {count} values"))
    })?;
    let data = if size <= 4 {
        &inline[..size]
    } else {
        let offset = ByteCursor::with_endian(inline, endian).u32()? as usize;
        let mut at = ByteCursor::with_endian(bytes, endian);
        at.seek(offset)?;
        at.take(size)?
    };

    Ok(Field {
        tag,
        ifd_num: ifd,
        value: decode_value(kind, count as usize, data, endian)?,
    })
}

fn unit_size(kind: u16) -> Option<usize> {
    match kind {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

fn decode_value(kind: u16, count: usize, data: &[u8], endian: Endian) -> ParseResult<Value> {
    let c = &mut ByteCursor::with_endian(data, endian);
    Ok(match kind {
        1 => Value::Byte(data.to_vec()),
        2 => Value::Ascii(
            data.split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(<[u8]>::to_vec)
                .collect(),
        ),
        3 => Value::Short(read_n(c, count, |c| c.u16())?),
        4 => Value::Long(read_n(c, count, |c| c.u32())?),
        5 => Value::Rational(read_n(c, count, |c| {
            Ok(exif::Rational {
                num: c.u32()?,
                denom: c.u32()?,
            })
        })?),
        6 => Value::SByte(data.iter().map(|&b| b as i8).collect()),
        7 => Value::Undefined(data.to_vec(), 0),
        8 => Value::SShort(read_n(c, count, |c| Ok(c.u16()? as i16))?),
        9 => Value::SLong(read_n(c, count, |c| c.i32())?),
        10 => Value::SRational(read_n(c, count, |c| {
            Ok(exif::SRational {
                num: c.i32()?,
                denom: c.i32()?,
            })
        })?),
        11 => Value::Float(read_n(c, count, |c| Ok(f32::from_bits(c.u32()?)))?),
        12 => Value::Double(read_n(c, count, |c| Ok(f64::from_bits(c.u64()?)))?),
        other => {
            return Err(ParseError::Invalid(format!("unsupported TIFF type {other}")));
        }
    })
}

fn read_n<T>(
    cursor: &mut ByteCursor<'_>,
    count: usize,
    mut read: impl FnMut(&mut ByteCursor<'_>) -> ParseResult<T>,
) -> ParseResult<Vec<T>> {
    (0..count).map(|_| read(cursor)).collect()
}
