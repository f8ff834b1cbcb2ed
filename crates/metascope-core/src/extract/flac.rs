//! FLAC metadata blocks.

use super::cursor::{text, ByteCursor};
use super::{format_duration, FieldSink, FormatHandler};
use crate::error::{ParseError, ParseResult};

const STREAMINFO: u8 = 0;
const VORBIS_COMMENT: u8 = 4;
const PICTURE: u8 = 6;

/// Free Lossless Audio Codec streams.
pub struct FlacHandler;

impl FormatHandler for FlacHandler {
    fn name(&self) -> &'static str {
        "FLAC"
    }

    fn description(&self) -> &'static str {
        "FLAC audio (stream info, Vorbis comments, cover art)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"fLaC")
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut cursor = ByteCursor::new(bytes);
        cursor.skip(4)?;

        loop {
            let header = cursor.u8()?;
            let is_last = header & 0x80 != 0;
            let block_type = header & 0x7F;
            let length = cursor.u24()? as usize;
            let data = cursor.take(length)?;

            match block_type {
                STREAMINFO => read_stream_info(data, sink)?,
                VORBIS_COMMENT => read_vorbis_comment(data, sink)?,
                PICTURE => read_picture(data, sink)?,
                127 => return Err(ParseError::Invalid("reserved block type 127".into())),
                _ => {}
            }

            if is_last {
                return Ok(());
            }
        }
    }
}

fn read_stream_info(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(data);
    cursor.skip(10)?;
    // 20 bits sample rate, 3 bits channels-1, 5 bits bps-1, 36 bits samples
    let packed = cursor.u64()?;
    let sample_rate = (packed >> 44) as u32;
    let channels = ((packed >> 41) & 0x07) + 1;
    let bits = ((packed >> 36) & 0x1F) + 1;
    let total_samples = packed & 0x0F_FFFF_FFFF;

    sink.push("Channel", channels.to_string());
    sink.push("Sample rate", format!("{sample_rate} Hz"));
    sink.push("Bits/sample", bits.to_string());
    if sample_rate > 0 && total_samples > 0 {
        let seconds = total_samples as f64 / f64::from(sample_rate);
        sink.push("Duration", format_duration(seconds));
    }
    sink.push("Compression", "FLAC");
    Ok(())
}

fn read_vorbis_comment(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    // Vorbis comments are little-endian, unlike the rest of FLAC
    let mut cursor = ByteCursor::little_endian(data);
    let vendor_len = cursor.u32()? as usize;
    sink.push("Producer", text(cursor.take(vendor_len)?));

    let count = cursor.u32()?;
    for _ in 0..count {
        let len = cursor.u32()? as usize;
        let comment = text(cursor.take(len)?);
        match comment.split_once('=') {
            Some((key, value)) => sink.push(comment_label(key), value),
            None => sink.warn(format!("Vorbis comment without '=': {comment}")),
        }
    }
    Ok(())
}

/// Map a Vorbis comment key to a display label.
fn comment_label(key: &str) -> String {
    match key.to_ascii_uppercase().as_str() {
        "TITLE" => "Title".into(),
        "ARTIST" => "Artist".into(),
        "ALBUM" => "Album".into(),
        "ALBUMARTIST" => "Album artist".into(),
        "DATE" => "Creation date".into(),
        "GENRE" => "Genre".into(),
        "TRACKNUMBER" => "Track number".into(),
        "DISCNUMBER" => "Disc number".into(),
        "COMMENT" | "DESCRIPTION" => "Comment".into(),
        "COPYRIGHT" => "Copyright".into(),
        "ENCODER" => "Encoder".into(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        }
    }
}

fn read_picture(data: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
    let mut cursor = ByteCursor::new(data);
    let _picture_type = cursor.u32()?;
    let mime_len = cursor.u32()? as usize;
    let mime = text(cursor.take(mime_len)?);
    sink.push("Cover picture", mime);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(kind: u8, last: bool, data: &[u8]) -> Vec<u8> {
        let header = if last { kind | 0x80 } else { kind };
        let mut out = vec![header];
        out.extend_from_slice(&(data.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(data);
        out
    }

    fn stream_info(sample_rate: u64, channels: u64, bits: u64, samples: u64) -> Vec<u8> {
        let mut data = vec![0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0];
        let packed =
            (sample_rate << 44) | ((channels - 1) << 41) | ((bits - 1) << 36) | samples;
        data.extend_from_slice(&packed.to_be_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data
    }

    fn vorbis(vendor: &str, comments: &[&str]) -> Vec<u8> {
        let mut data = (vendor.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(vendor.as_bytes());
        data.extend_from_slice(&(comments.len() as u32).to_le_bytes());
        for c in comments {
            data.extend_from_slice(&(c.len() as u32).to_le_bytes());
            data.extend_from_slice(c.as_bytes());
        }
        data
    }

    fn sample_flac() -> Vec<u8> {
        let mut flac = b"fLaC".to_vec();
        flac.extend(block(STREAMINFO, false, &stream_info(44100, 2, 16, 44100 * 3)));
        flac.extend(block(
            VORBIS_COMMENT,
            true,
            &vorbis("reference libFLAC 1.4.3", &["TITLE=Intro", "ARTIST=Band", "MOOD=calm"]),
        ));
        flac
    }

    #[test]
    fn test_reads_stream_info_and_comments() {
        let mut sink = FieldSink::new();
        FlacHandler.read_fields(&sample_flac(), &mut sink).unwrap();
        let lines: Vec<_> = sink.fields().iter().map(|f| f.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "Channel: 2",
                "Sample rate: 44100 Hz",
                "Bits/sample: 16",
                "Duration: 3 sec",
                "Compression: FLAC",
                "Producer: reference libFLAC 1.4.3",
                "Title: Intro",
                "Artist: Band",
                "Mood: calm",
            ]
        );
    }

    #[test]
    fn test_truncated_comment_block() {
        let flac = sample_flac();
        let mut sink = FieldSink::new();
        let result = FlacHandler.read_fields(&flac[..flac.len() - 5], &mut sink);
        assert!(matches!(result, Err(ParseError::Truncated { .. })));
        assert_eq!(sink.fields()[1].to_string(), "Sample rate: 44100 Hz");
    }
}
