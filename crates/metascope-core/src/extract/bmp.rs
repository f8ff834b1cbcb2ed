//! Windows bitmap headers.

use super::cursor::ByteCursor;
use super::{ppm_to_dpi, FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

/// Sizes of the known DIB header versions.
const DIB_HEADER_SIZES: [u32; 6] = [12, 40, 52, 56, 108, 124];

/// BMP images.
pub struct BmpHandler;

impl FormatHandler for BmpHandler {
    fn name(&self) -> &'static str {
        "BMP"
    }

    fn description(&self) -> &'static str {
        "Windows bitmap (dimensions, depth, compression, resolution)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        // "BM" alone is too weak; require a known DIB header size as well
        bytes.len() >= 18
            && bytes.starts_with(b"BM")
            && DIB_HEADER_SIZES
                .contains(&u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]))
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut cursor = ByteCursor::little_endian(bytes);
        cursor.skip(2)?;
        let file_size = cursor.u32()?;
        cursor.skip(4)?;
        let _pixel_offset = cursor.u32()?;
        let dib_size = cursor.u32()?;

        if file_size as usize > bytes.len() {
            sink.warn(format!(
                "BMP header declares {file_size} bytes but only {} are present",
                bytes.len()
            ));
        }

        if dib_size == 12 {
            // OS/2 BITMAPCOREHEADER
            let width = cursor.u16()?;
            let height = cursor.u16()?;
            let _planes = cursor.u16()?;
            let bits = cursor.u16()?;
            sink.push("Image width", format!("{width} pixels"));
            sink.push("Image height", format!("{height} pixels"));
            sink.push("Bits/pixel", bits.to_string());
            sink.push("Header", "OS/2 1.x");
            return Ok(());
        }

        let width = cursor.i32()?;
        let height = cursor.i32()?;
        let planes = cursor.u16()?;
        let bits = cursor.u16()?;
        let compression = cursor.u32()?;
        let _image_size = cursor.u32()?;
        let x_ppm = cursor.i32()?;
        let y_ppm = cursor.i32()?;
        let colors_used = cursor.u32()?;

        if planes != 1 {
            return Err(ParseError::Invalid(format!(
                "BMP plane count must be 1, found {planes}"
            )));
        }

        sink.push("Image width", format!("{} pixels", width.unsigned_abs()));
        sink.push("Image height", format!("{} pixels", height.unsigned_abs()));
        sink.push("Bits/pixel", bits.to_string());
        let method = match compression {
            0 => "Uncompressed".to_string(),
            1 => "RLE (8 bits)".to_string(),
            2 => "RLE (4 bits)".to_string(),
            3 => "Bitfields".to_string(),
            4 => "JPEG".to_string(),
            5 => "PNG".to_string(),
            other => format!("unknown ({other})"),
        };
        sink.push("Compression", method);
        if x_ppm > 0 && y_ppm > 0 {
            sink.push(
                "Resolution",
                format!(
                    "{} x {} DPI",
                    ppm_to_dpi(f64::from(x_ppm)),
                    ppm_to_dpi(f64::from(y_ppm))
                ),
            );
        }
        if colors_used > 0 {
            sink.push("Palette", format!("{colors_used} colors"));
        }
        if height < 0 {
            sink.push("Row order", "top-down");
        }
        Ok(())
    }
}
