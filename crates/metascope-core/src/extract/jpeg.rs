//! JPEG segment walker.
//!
//! Reads marker segments up to the first scan: JFIF header, EXIF (APP1),
//! XMP, ICC and Adobe markers, comments and the frame header.

use super::cursor::{text, ByteCursor};
use super::exif_fields::push_exif_fields;
use super::{ppm_to_dpi, FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

const SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];
const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// JPEG/JFIF/EXIF images.
pub struct JpegHandler;

impl FormatHandler for JpegHandler {
    fn name(&self) -> &'static str {
        "JPEG"
    }

    fn description(&self) -> &'static str {
        "JPEG image (JFIF, EXIF, comments, frame header)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&SOI)
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut cursor = ByteCursor::new(bytes);
        cursor.skip(2)?;

        loop {
            if cursor.u8()? != 0xFF {
                return Err(ParseError::Invalid(format!(
                    "expected marker at offset {}",
                    cursor.position() - 1
                )));
            }
            let mut marker = cursor.u8()?;
            // Fill bytes before a marker
            while marker == 0xFF {
                marker = cursor.u8()?;
            }

            match marker {
                // EOI or start of scan: no metadata past this point
                0xD9 | 0xDA => return Ok(()),
                // Standalone markers without a length
                0x01 | 0xD0..=0xD7 => continue,
                _ => {}
            }

            let length = cursor.u16()? as usize;
            if length < 2 {
                return Err(ParseError::Invalid(format!(
                    "segment 0x{marker:02X} has invalid length {length}"
                )));
            }
            let payload = cursor.take(length - 2)?;
            read_segment(marker, payload, sink)?;
        }
    }
}

fn read_segment(marker: u8, payload: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    match marker {
        0xE0 if payload.starts_with(b"JFIF\0") => read_jfif(&payload[5..], sink)?,
        0xE1 if payload.starts_with(b"Exif\0\0") => {
            // A bad EXIF block does not make the JPEG structure corrupt
            if let Err(e) = push_exif_fields(&payload[6..], sink) {
                sink.warn(format!("EXIF block could not be decoded: {e}"));
            }
        }
        0xE1 if payload.starts_with(XMP_SIGNATURE) => {
            let size = payload.len() - XMP_SIGNATURE.len();
            sink.push("XMP metadata", format!("present ({size} bytes)"));
        }
        0xE2 if payload.starts_with(b"ICC_PROFILE\0") => {
            sink.push("ICC profile", "present");
        }
        0xEE if payload.starts_with(b"Adobe") => {
            sink.push("Adobe APP14", "present");
        }
        0xFE => sink.push("Comment", text(payload)),
        0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => read_frame(marker, payload, sink)?,
        _ => {}
    }
    Ok(())
}

fn read_jfif(payload: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(payload);
    let major = cursor.u8()?;
    let minor = cursor.u8()?;
    let units = cursor.u8()?;
    let x_density = cursor.u16()?;
    let y_density = cursor.u16()?;

    sink.push("JFIF version", format!("{major}.{minor:02}"));
    let resolution = match units {
        1 => format!("{x_density} x {y_density} DPI"),
        2 => format!(
            "{} x {} DPI",
            ppm_to_dpi(f64::from(x_density) * 100.0),
            ppm_to_dpi(f64::from(y_density) * 100.0)
        ),
        _ => format!("pixel aspect {x_density}:{y_density}"),
    };
    sink.push("Resolution", resolution);
    Ok(())
}

fn read_frame(marker: u8, payload: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(payload);
    let precision = cursor.u8()?;
    let height = cursor.u16()?;
    let width = cursor.u16()?;
    let components = cursor.u8()?;

    sink.push("Image width", format!("{width} pixels"));
    if height > 0 {
        sink.push("Image height", format!("{height} pixels"));
    }
    sink.push(
        "Bits/pixel",
        (u32::from(precision) * u32::from(components)).to_string(),
    );
    let pixel_format = match components {
        1 => "Grayscale",
        3 => "YCbCr",
        4 => "CMYK",
        _ => "Unknown",
    };
    sink.push("Pixel format", pixel_format);
    sink.push("Compression", compression_name(marker));
    Ok(())
}

fn compression_name(marker: u8) -> &'static str {
    match marker {
        0xC0 => "JPEG (Baseline)",
        0xC1 => "JPEG (Extended sequential)",
        0xC2 => "JPEG (Progressive)",
        0xC3 => "JPEG (Lossless)",
        0xC5..=0xC7 => "JPEG (Differential, Huffman)",
        _ => "JPEG (Arithmetic coding)",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::exif_fields::tests::tiny_tiff;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Baseline JPEG header with JFIF, optional EXIF payload, a comment and
    /// a 640x480 frame, terminated by SOS.
    pub(crate) fn sample_jpeg(exif_tiff: Option<&[u8]>) -> Vec<u8> {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend(segment(0xE0, b"JFIF\0\x01\x02\x01\x00\x48\x00\x48\x00\x00"));
        if let Some(tiff) = exif_tiff {
            let mut app1 = b"Exif\0\0".to_vec();
            app1.extend_from_slice(tiff);
            jpeg.extend(segment(0xE1, &app1));
        }
        jpeg.extend(segment(0xFE, b"holiday"));
        jpeg.extend(segment(0xC0, &[8, 0x01, 0xE0, 0x02, 0x80, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]));
        jpeg.extend(segment(0xDA, &[1, 1, 0, 0, 63, 0]));
        jpeg.extend_from_slice(&[0x12, 0x34, 0xFF, 0xD9]);
        jpeg
    }

    fn read(bytes: &[u8]) -> (FieldSink, ParseResult<()>) {
        let mut sink = FieldSink::new();
        let result = JpegHandler.read_fields(bytes, &mut sink);
        (sink, result)
    }

    fn value<'a>(sink: &'a FieldSink, label: &str) -> Option<&'a str> {
        sink.fields()
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn test_sniff() {
        assert!(JpegHandler.sniff(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!JpegHandler.sniff(&[0xFF, 0xD8]));
        assert!(!JpegHandler.sniff(b"\x89PNG"));
    }

    #[test]
    fn test_reads_jfif_comment_and_frame() {
        let (sink, result) = read(&sample_jpeg(None));
        result.unwrap();
        assert_eq!(value(&sink, "JFIF version"), Some("1.02"));
        assert_eq!(value(&sink, "Resolution"), Some("72 x 72 DPI"));
        assert_eq!(value(&sink, "Comment"), Some("holiday"));
        assert_eq!(value(&sink, "Image width"), Some("640 pixels"));
        assert_eq!(value(&sink, "Image height"), Some("480 pixels"));
        assert_eq!(value(&sink, "Bits/pixel"), Some("24"));
        assert_eq!(value(&sink, "Compression"), Some("JPEG (Baseline)"));
    }

    #[test]
    fn test_reads_embedded_exif() {
        let (sink, result) = read(&sample_jpeg(Some(&tiny_tiff())));
        result.unwrap();
        assert_eq!(value(&sink, "Make"), Some("Canon"));
        // EXIF fields come before the comment, as in the file
        let make = sink.fields().iter().position(|f| f.label == "Make");
        let comment = sink.fields().iter().position(|f| f.label == "Comment");
        assert!(make < comment);
    }

    #[test]
    fn test_bad_exif_is_a_warning() {
        let (sink, result) = read(&sample_jpeg(Some(b"II*\0\xff\xff\xff\xff")));
        result.unwrap();
        assert_eq!(sink.warnings().len(), 1);
        assert_eq!(value(&sink, "Comment"), Some("holiday"));
    }

    #[test]
    fn test_truncated_segment_keeps_earlier_fields() {
        let jpeg = sample_jpeg(None);
        // Cut inside the frame header segment
        let cut = jpeg.len() - 20;
        let (sink, result) = read(&jpeg[..cut]);
        assert!(matches!(result, Err(ParseError::Truncated { .. })));
        assert_eq!(value(&sink, "Comment"), Some("holiday"));
        assert_eq!(value(&sink, "Image width"), None);
    }
}
