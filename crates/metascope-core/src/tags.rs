//! EXIF tag reading for the GPS decoder.

use exif::{In, Reader, Value};
use std::io::Cursor;

use crate::error::TagReadError;
use crate::types::{ExifTagSet, Rational, TagValue};

/// Reads the primary-image EXIF tags of any container kamadak-exif knows
/// (JPEG, TIFF, PNG, WebP, HEIF).
pub struct ExifTagReader;

impl ExifTagReader {
    /// Read all primary-IFD tags from `bytes`.
    ///
    /// Rational values are kept exactly (numerator and denominator) so the
    /// GPS decoder can reject zero denominators itself.
    pub fn read(bytes: &[u8]) -> Result<ExifTagSet, TagReadError> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .map_err(|e| match e {
                exif::Error::NotFound(_) => TagReadError::NotFound,
                other => TagReadError::Malformed(other.to_string()),
            })?;

        let tags = exif
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .map(|f| (f.tag.to_string(), Self::convert(f)))
            .collect();
        Ok(tags)
    }

    fn convert(field: &exif::Field) -> TagValue {
        match &field.value {
            Value::Rational(values) => TagValue::Rationals(
                values
                    .iter()
                    .map(|r| Rational::new(r.num, r.denom))
                    .collect(),
            ),
            Value::Ascii(strings) => TagValue::Text(
                strings
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).trim().to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => TagValue::Other(field.display_value().to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One GPS axis: rational components and an optional reference letter.
    pub(crate) struct Axis<'a> {
        pub values: &'a [(u32, u32)],
        pub reference: Option<&'a str>,
    }

    /// Little-endian TIFF whose IFD0 points at a GPS IFD holding the given
    /// latitude and longitude tags.
    pub(crate) fn gps_tiff(lat: Axis<'_>, lon: Axis<'_>) -> Vec<u8> {
        struct Entry {
            tag: u16,
            kind: u16,
            count: u32,
            inline: [u8; 4],
            data: Vec<u8>,
        }

        let mut entries = Vec::new();
        for (ref_tag, value_tag, axis) in [(1u16, 2u16, &lat), (3, 4, &lon)] {
            if let Some(reference) = axis.reference {
                let mut inline = [0u8; 4];
                inline[..reference.len().min(3)]
                    .copy_from_slice(&reference.as_bytes()[..reference.len().min(3)]);
                entries.push(Entry {
                    tag: ref_tag,
                    kind: 2,
                    count: reference.len().min(3) as u32 + 1,
                    inline,
                    data: Vec::new(),
                });
            }
            if !axis.values.is_empty() {
                let data = axis
                    .values
                    .iter()
                    .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
                    .collect();
                entries.push(Entry {
                    tag: value_tag,
                    kind: 5,
                    count: axis.values.len() as u32,
                    inline: [0; 4],
                    data,
                });
            }
        }

        let gps_ifd_offset = 8 + 2 + 12 + 4;
        let mut data_offset = gps_ifd_offset + 2 + 12 * entries.len() + 4;

        let mut tiff = b"II*\0".to_vec();
        tiff.extend_from_slice(&8u32.to_le_bytes());
        // IFD0: a single GPSInfo pointer
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x8825u16.to_le_bytes());
        tiff.extend_from_slice(&4u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&(gps_ifd_offset as u32).to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());

        tiff.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        let mut payload = Vec::new();
        for entry in &entries {
            tiff.extend_from_slice(&entry.tag.to_le_bytes());
            tiff.extend_from_slice(&entry.kind.to_le_bytes());
            tiff.extend_from_slice(&entry.count.to_le_bytes());
            if entry.data.is_empty() {
                tiff.extend_from_slice(&entry.inline);
            } else {
                tiff.extend_from_slice(&(data_offset as u32).to_le_bytes());
                data_offset += entry.data.len();
                payload.extend_from_slice(&entry.data);
            }
        }
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(&payload);
        tiff
    }

    /// The Pittsburgh fix used across the GPS tests.
    pub(crate) fn pittsburgh_tiff() -> Vec<u8> {
        gps_tiff(
            Axis {
                values: &[(40, 1), (26, 1), (46, 1)],
                reference: Some("N"),
            },
            Axis {
                values: &[(79, 1), (56, 1), (55, 1)],
                reference: Some("W"),
            },
        )
    }

    #[test]
    fn test_reads_gps_tags() {
        let tags = ExifTagReader::read(&pittsburgh_tiff()).unwrap();
        assert_eq!(
            tags.get("GPSLatitude"),
            Some(&TagValue::Rationals(vec![
                Rational::new(40, 1),
                Rational::new(26, 1),
                Rational::new(46, 1),
            ]))
        );
        assert_eq!(tags.get("GPSLatitudeRef"), Some(&TagValue::Text("N".into())));
        assert_eq!(tags.get("GPSLongitudeRef"), Some(&TagValue::Text("W".into())));
    }

    #[test]
    fn test_non_gps_tags_are_kept() {
        let tiff = crate::extract::exif_fields::tests::tiny_tiff();
        let tags = ExifTagReader::read(&tiff).unwrap();
        assert_eq!(tags.get("Make"), Some(&TagValue::Text("Canon".into())));
        assert!(matches!(tags.get("Orientation"), Some(TagValue::Other(_))));
    }

    #[test]
    fn test_unsupported_container_is_an_error() {
        assert!(ExifTagReader::read(b"GIF89a\x01\x00\x01\x00").is_err());
        assert!(ExifTagReader::read(&[]).is_err());
    }
}
