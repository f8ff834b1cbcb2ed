//! Listing of embedded EXIF/TIFF tags as metadata fields.

use exif::{Field, In, Reader, Tag, Value};

use super::FieldSink;
use crate::error::{ParseError, ParseResult};

/// Undefined/byte values longer than this are summarized instead of dumped.
const MAX_INLINE_BYTES: usize = 64;

/// Push every tag of a raw TIFF structure (EXIF payload) in IFD order.
pub(crate) fn push_exif_fields(tiff: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let exif = Reader::new()
        .read_raw(tiff.to_vec())
        .map_err(|e| ParseError::Invalid(format!("EXIF: {e}")))?;

    for field in exif.fields() {
        push_field(field, sink, |f| f.display_value().with_unit(&exif).to_string());
    }
    Ok(())
}

/// Push one decoded field with `display` rendering its value. IFD pointers
/// are skipped and oversized binary values are summarized.
pub(crate) fn push_field(
    field: &Field,
    sink: &mut FieldSink,
    display: impl FnOnce(&Field) -> String,
) {
    if is_pointer(field.tag) {
        return;
    }
    let label = if field.ifd_num == In::THUMBNAIL {
        format!("Thumbnail {}", field.tag)
    } else {
        field.tag.to_string()
    };
    let value = match oversized_len(field) {
        Some(len) => format!("({len} bytes)"),
        None => display(field).trim_matches('"').to_string(),
    };
    sink.push(label, value);
}

fn is_pointer(tag: Tag) -> bool {
    tag == Tag::ExifIFDPointer || tag == Tag::GPSInfoIFDPointer || tag == Tag::InteropIFDPointer
}

fn oversized_len(field: &Field) -> Option<usize> {
    let len = match &field.value {
        Value::Undefined(bytes, _) => bytes.len(),
        Value::Byte(bytes) => bytes.len(),
        _ => return None,
    };
    (field.tag == Tag::MakerNote || len > MAX_INLINE_BYTES).then_some(len)
}
