//! PDF document information dictionary.
//!
//! Only the uncompressed parts of the file are inspected: the header, the
//! `/Info` dictionary entries and the page objects. Object streams are not
//! inflated, so documents that keep their info dictionary inside a
//! compressed stream report fewer fields.

use chrono::{FixedOffset, NaiveDate, TimeZone};

use super::{FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

/// Info dictionary keys and the labels they are reported under.
const INFO_KEYS: [(&str, &str); 8] = [
    ("Title", "Title"),
    ("Author", "Author"),
    ("Subject", "Subject"),
    ("Keywords", "Keywords"),
    ("Creator", "Creator"),
    ("Producer", "Producer"),
    ("CreationDate", "Creation date"),
    ("ModDate", "Last modification"),
];

/// How far from the end of the file the `%%EOF` marker may sit.
const EOF_WINDOW: usize = 1024;

/// Portable Document Format.
pub struct PdfHandler;

impl FormatHandler for PdfHandler {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn description(&self) -> &'static str {
        "PDF document (version, info dictionary, page count)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"%PDF-")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let version: String = bytes
            .get(5..)
            .unwrap_or_default()
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|&b| b as char)
            .collect();
        if version.is_empty() {
            return Err(ParseError::Invalid("PDF header has no version".into()));
        }
        sink.push("Format version", format!("PDF {version}"));

        for (key, label) in INFO_KEYS {
            if let Some(raw) = find_string_value(bytes, key) {
                let value = if key.ends_with("Date") {
                    format_pdf_date(&raw).unwrap_or(raw)
                } else {
                    raw
                };
                sink.push(label, value);
            }
        }

        let pages = count_pages(bytes);
        if pages > 0 {
            sink.push("Pages", pages.to_string());
        }
        if find(bytes, b"/Encrypt", 0).is_some() {
            sink.push("Encrypted", "yes");
        }

        let tail_start = bytes.len().saturating_sub(EOF_WINDOW);
        if find(bytes, b"%%EOF", tail_start).is_none() {
            return Err(ParseError::Invalid(
                "missing %%EOF marker, file is truncated".into(),
            ));
        }
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b"()<>[]{}/%".contains(&b)
}

/// Find `/Key` followed by a string object and decode the string.
fn find_string_value(bytes: &[u8], key: &str) -> Option<String> {
    let needle = format!("/{key}");
    let mut from = 0;
    while let Some(at) = find(bytes, needle.as_bytes(), from) {
        let mut pos = at + needle.len();
        from = pos;
        // Reject prefixes of longer names ("/Title" inside "/TitleX")
        if bytes.get(pos).is_some_and(|&b| !is_delimiter(b)) {
            continue;
        }
        while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        let decoded = match bytes.get(pos) {
            Some(b'(') => parse_literal(&bytes[pos + 1..]),
            Some(b'<') if bytes.get(pos + 1) != Some(&b'<') => parse_hex(&bytes[pos + 1..]),
            _ => None,
        };
        if let Some(raw) = decoded {
            return Some(decode_text_string(&raw));
        }
    }
    None
}

/// Parse a literal string body (after the opening paren).
fn parse_literal(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'\\' => {
                i += 1;
                let escaped = *data.get(i)?;
                match escaped {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'\r' | b'\n' => {
                        // Line continuation
                        if escaped == b'\r' && data.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'0'..=b'7' => {
                        let mut value = u32::from(escaped - b'0');
                        let mut digits = 1;
                        while digits < 3 {
                            match data.get(i + 1) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    i += 1;
                                    digits += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                    }
                    other => out.push(other),
                }
            }
            b'(' => {
                depth += 1;
                out.push(b);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(out);
                }
                out.push(b);
            }
            _ => out.push(b),
        }
        i += 1;
    }
    None
}

/// Parse a hex string body (after the opening angle bracket).
fn parse_hex(data: &[u8]) -> Option<Vec<u8>> {
    let end = data.iter().position(|&b| b == b'>')?;
    let mut digits: Vec<u8> = data[..end]
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|&b| (b as char).to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    if digits.len() % 2 == 1 {
        digits.push(0);
    }
    Some(digits.chunks(2).map(|p| p[0] << 4 | p[1]).collect())
}

/// Text strings are UTF-16BE with a BOM, or PDFDocEncoding (read as Latin-1).
fn decode_text_string(raw: &[u8]) -> String {
    if raw.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|p| u16::from_be_bytes([p[0], p[1]]))
            .collect();
        String::from_utf16_lossy(&units).trim().to_string()
    } else if raw.starts_with(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(&raw[3..]).trim().to_string()
    } else {
        raw.iter().map(|&b| b as char).collect::<String>().trim().to_string()
    }
}

/// Format `D:YYYYMMDDHHmmSSOHH'mm'` as "YYYY-MM-DD HH:MM:SS+HH:MM".
fn format_pdf_date(raw: &str) -> Option<String> {
    let s = raw.strip_prefix("D:").unwrap_or(raw);
    let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return None;
    }
    let field = |start: usize, len: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + len) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month = field(4, 2, 1)?;
    let day = field(6, 2, 1)?;
    let hour = field(8, 2, 0)?;
    let minute = field(10, 2, 0)?;
    let second = field(12, 2, 0)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    let rest = &s[digits.len()..];
    let offset_secs = match rest.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let tz: String = rest[1..].chars().filter(char::is_ascii_digit).collect();
            let hours: i32 = tz.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i32 = tz.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let total = hours * 3600 + minutes * 60;
            if sign == '-' {
                -total
            } else {
                total
            }
        }
        _ => 0,
    };
    let offset = FixedOffset::east_opt(offset_secs)?;
    let date = offset.from_local_datetime(&naive).single()?;
    Some(date.format("%Y-%m-%d %H:%M:%S%:z").to_string())
}

/// Count `/Type /Page` objects, excluding `/Type /Pages` tree nodes.
fn count_pages(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut from = 0;
    while let Some(at) = find(bytes, b"/Type", from) {
        let mut pos = at + 5;
        from = pos;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        if bytes.get(pos..pos + 5) == Some(b"/Page")
            && bytes.get(pos + 5).map_or(true, |&b| is_delimiter(b))
        {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf() -> Vec<u8> {
        concat!(
            "%PDF-1.7\n",
            "1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n",
            "2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj\n",
            "3 0 obj << /Type /Page /Parent 2 0 R >> endobj\n",
            "4 0 obj << /Type/Page /Parent 2 0 R >> endobj\n",
            "5 0 obj << /Title (Annual \\(draft\\) report) /Author <FEFF0041006400610020004C> ",
            "/CreationDate (D:20240229134500+01'00') /Producer (metascope\\040test) >> endobj\n",
            "trailer << /Root 1 0 R /Info 5 0 R >>\n",
            "%%EOF\n"
        )
        .as_bytes()
        .to_vec()
    }

    #[test]
    fn test_reads_info_dictionary() {
        let mut sink = FieldSink::new();
        PdfHandler.read_fields(&sample_pdf(), &mut sink).unwrap();
        let lines: Vec<_> = sink.fields().iter().map(|f| f.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "Format version: PDF 1.7",
                "Title: Annual (draft) report",
                "Author: Ada L",
                "Producer: metascope test",
                "Creation date: 2024-02-29 13:45:00+01:00",
                "Pages: 2",
            ]
        );
    }

    #[test]
    fn test_missing_eof_keeps_partial_fields() {
        let pdf = sample_pdf();
        let cut = &pdf[..pdf.len() - 6];
        let mut sink = FieldSink::new();
        let result = PdfHandler.read_fields(cut, &mut sink);
        assert!(matches!(result, Err(ParseError::Invalid(_))));
        assert_eq!(sink.fields()[0].to_string(), "Format version: PDF 1.7");
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(parse_literal(b"a(b)c\\)d) tail").unwrap(), b"a(b)c)d");
        assert_eq!(parse_literal(b"\\101\\12x)").unwrap(), b"A\nx");
        assert!(parse_literal(b"unterminated").is_none());
    }

    #[test]
    fn test_date_without_offset() {
        assert_eq!(
            format_pdf_date("D:20231105").as_deref(),
            Some("2023-11-05 00:00:00+00:00")
        );
        assert!(format_pdf_date("yesterday").is_none());
    }
}
