//! MP3 audio: ID3v2 tag frames and the first MPEG audio frame header.

use super::cursor::{latin1, ByteCursor};
use super::{format_duration, FieldSink, FormatHandler};
use crate::error::ParseResult;

/// MPEG audio with or without a leading ID3v2 tag.
pub struct Mp3Handler;

impl FormatHandler for Mp3Handler {
    fn name(&self) -> &'static str {
        "MP3"
    }

    fn description(&self) -> &'static str {
        "MPEG audio (ID3v2 tags, frame header, estimated duration)"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        if bytes.len() >= 10 && bytes.starts_with(b"ID3") {
            return (2..=4).contains(&bytes[3]);
        }
        // Without a tag, require two consecutive valid frame headers
        let Some(first) = FrameHeader::parse(bytes) else {
            return false;
        };
        bytes
            .get(first.frame_len..)
            .and_then(FrameHeader::parse)
            .is_some()
    }

    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
        let mut audio_start = 0;
        if bytes.starts_with(b"ID3") {
            audio_start = read_id3v2(bytes, sink)?;
        }

        let audio = &bytes[audio_start.min(bytes.len())..];
        match find_frame(audio) {
            Some((offset, header)) => {
                sink.push("Compression", header.codec_name());
                sink.push("Bit rate", format!("{} Kbit/sec", header.bitrate_kbps));
                sink.push("Sample rate", format!("{} Hz", header.sample_rate));
                sink.push("Channel mode", header.channel_mode);
                let audio_bytes = (audio.len() - offset) as f64;
                let seconds = audio_bytes * 8.0 / (f64::from(header.bitrate_kbps) * 1000.0);
                sink.push("Duration", format!("{} (estimated)", format_duration(seconds)));
            }
            None => sink.warn("No MPEG audio frame found after the ID3 tag"),
        }
        Ok(())
    }
}

/// Decode a 28-bit synchsafe integer.
fn synchsafe(bytes: [u8; 4]) -> usize {
    bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | usize::from(b & 0x7F))
}

/// Drop the 0x00 stuffed after every 0xFF by unsynchronisation.
fn resync(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev_ff = false;
    for &b in data {
        if !(prev_ff && b == 0x00) {
            out.push(b);
        }
        prev_ff = b == 0xFF;
    }
    out
}

/// Read an ID3v2 tag, pushing its frames; returns the offset past the tag.
fn read_id3v2(bytes: &[u8], sink: &mut FieldSink) -> ParseResult<usize> {
    let mut cursor = ByteCursor::new(bytes);
    cursor.skip(3)?;
    let major = cursor.u8()?;
    let revision = cursor.u8()?;
    let flags = cursor.u8()?;
    let size = synchsafe(cursor.array::<4>()?);
    sink.push("ID3 version", format!("2.{major}.{revision}"));

    let raw = cursor.take(size)?;
    let tag_end = cursor.position() + if flags & 0x10 != 0 { 10 } else { 0 };

    let body = if flags & 0x80 != 0 && major < 4 {
        resync(raw)
    } else {
        raw.to_vec()
    };
    let mut frames = ByteCursor::new(&body);

    if flags & 0x40 != 0 {
        let ext_size = if major >= 4 {
            synchsafe(frames.array::<4>()?).saturating_sub(4)
        } else {
            frames.u32()? as usize
        };
        frames.skip(ext_size)?;
    }

    let id_len = if major == 2 { 3 } else { 4 };
    while frames.remaining() > id_len {
        let id = frames.take(id_len)?;
        if id[0] == 0 {
            // Padding
            break;
        }
        let frame_size = match major {
            2 => frames.u24()? as usize,
            3 => frames.u32()? as usize,
            _ => synchsafe(frames.array::<4>()?),
        };
        let frame_flags = if major == 2 { 0 } else { frames.u16()? };
        let data = frames.take(frame_size)?;

        let data = if major >= 4 && frame_flags & 0x0002 != 0 {
            resync(data)
        } else {
            data.to_vec()
        };
        if major >= 3 && frame_flags & 0x00C0 != 0 {
            sink.warn(format!(
                "ID3 frame {} is compressed or encrypted",
                latin1(id)
            ));
            continue;
        }
        read_frame(&latin1(id), &data, sink);
    }

    Ok(tag_end)
}

fn frame_label(id: &str) -> Option<&'static str> {
    Some(match id {
        "TIT2" | "TT2" => "Title",
        "TIT3" | "TT3" => "Subtitle",
        "TPE1" | "TP1" => "Artist",
        "TPE2" | "TP2" => "Album artist",
        "TALB" | "TAL" => "Album",
        "TYER" | "TYE" => "Year",
        "TDRC" => "Recording date",
        "TCON" | "TCO" => "Genre",
        "TRCK" | "TRK" => "Track number",
        "TPOS" | "TPA" => "Disc number",
        "TCOM" | "TCM" => "Composer",
        "TCOP" | "TCR" => "Copyright",
        "TENC" | "TEN" => "Encoded by",
        "TSSE" | "TSS" => "Encoder settings",
        "TBPM" | "TBP" => "BPM",
        "TPUB" | "TPB" => "Publisher",
        "TLAN" | "TLA" => "Language",
        _ => return None,
    })
}

fn read_frame(id: &str, data: &[u8], sink: &mut FieldSink) {
    let Some((&encoding, payload)) = data.split_first() else {
        return;
    };
    match id {
        "TXXX" | "TXX" => {
            let (description, value) = split_terminated(encoding, payload);
            let label = decode_text(encoding, description);
            let label = if label.is_empty() { "User text".to_string() } else { label };
            sink.push(label, decode_text(encoding, value));
        }
        "COMM" | "COM" => {
            // Three-byte language code, then description and text
            if payload.len() < 3 {
                return;
            }
            let (_description, value) = split_terminated(encoding, &payload[3..]);
            sink.push("Comment", decode_text(encoding, value));
        }
        "APIC" | "PIC" => sink.push("Cover picture", format!("present ({} bytes)", data.len())),
        "TLEN" | "TLE" => {
            if let Ok(ms) = decode_text(encoding, payload).parse::<u64>() {
                sink.push("Duration", format_duration(ms as f64 / 1000.0));
            }
        }
        _ => {
            if let Some(label) = frame_label(id) {
                sink.push(label, decode_text(encoding, payload));
            }
        }
    }
}

/// Split at the first encoding-appropriate string terminator.
fn split_terminated(encoding: u8, data: &[u8]) -> (&[u8], &[u8]) {
    let position = match encoding {
        1 | 2 => data
            .chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|i| (i * 2, 2)),
        _ => data.iter().position(|&b| b == 0).map(|i| (i, 1)),
    };
    match position {
        Some((i, width)) => (&data[..i], &data[i + width..]),
        None => (data, &[]),
    }
}

/// Decode ID3 text; multiple NUL-separated values are joined with " / ".
fn decode_text(encoding: u8, data: &[u8]) -> String {
    let decoded = match encoding {
        0 => latin1(data),
        1 | 2 => {
            let mut units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| {
                    if encoding == 2 {
                        u16::from_be_bytes([pair[0], pair[1]])
                    } else {
                        u16::from_le_bytes([pair[0], pair[1]])
                    }
                })
                .collect();
            if encoding == 1 {
                // Honor the BOM; big-endian content reads as 0xFFFE first
                if units.first() == Some(&0xFFFE) {
                    units = units.iter().map(|u| u.swap_bytes()).collect();
                }
                units.retain(|&u| u != 0xFEFF);
            }
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(data).into_owned(),
    };
    decoded
        .split('\0')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// The fields of one MPEG audio frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    version: &'static str,
    layer: u8,
    bitrate_kbps: u32,
    sample_rate: u32,
    channel_mode: &'static str,
    frame_len: usize,
}

impl FrameHeader {
    fn parse(bytes: &[u8]) -> Option<Self> {
        let header = u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?);
        if header >> 21 != 0x7FF {
            return None;
        }
        let version_bits = (header >> 19) & 0x3;
        let layer_bits = (header >> 17) & 0x3;
        let bitrate_index = ((header >> 12) & 0xF) as usize;
        let rate_index = ((header >> 10) & 0x3) as usize;
        let padding = (header >> 9) & 0x1;
        let mode = (header >> 6) & 0x3;

        if version_bits == 1 || layer_bits == 0 || bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let base_rate = [44100, 48000, 32000].get(rate_index).copied()?;
        let (version, sample_rate) = match version_bits {
            3 => ("MPEG-1", base_rate),
            2 => ("MPEG-2", base_rate / 2),
            _ => ("MPEG-2.5", base_rate / 4),
        };
        let layer = (4 - layer_bits) as u8;
        let is_v1 = version_bits == 3;

        const V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
        const V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
        const V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
        const V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
        const V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];
        let table = match (is_v1, layer) {
            (true, 1) => &V1_L1,
            (true, 2) => &V1_L2,
            (true, _) => &V1_L3,
            (false, 1) => &V2_L1,
            (false, _) => &V2_L23,
        };
        let bitrate_kbps = table[bitrate_index];

        let frame_len = (if layer == 1 {
            ((12 * bitrate_kbps * 1000 / sample_rate) + padding) * 4
        } else {
            let coefficient = if layer == 3 && !is_v1 { 72 } else { 144 };
            coefficient * bitrate_kbps * 1000 / sample_rate + padding
        }) as usize;
        if frame_len < 4 {
            return None;
        }

        let channel_mode = match mode {
            0 => "Stereo",
            1 => "Joint stereo",
            2 => "Dual channel",
            _ => "Mono",
        };

        Some(Self {
            version,
            layer,
            bitrate_kbps,
            sample_rate,
            channel_mode,
            frame_len,
        })
    }

    fn codec_name(&self) -> String {
        let layer = match self.layer {
            1 => "I",
            2 => "II",
            _ => "III",
        };
        format!("{} Layer {}", self.version, layer)
    }
}

/// Locate the first frame header, tolerating a little junk before it.
fn find_frame(audio: &[u8]) -> Option<(usize, FrameHeader)> {
    const SCAN_LIMIT: usize = 4096;
    (0..audio.len().min(SCAN_LIMIT))
        .find_map(|offset| FrameHeader::parse(&audio[offset..]).map(|h| (offset, h)))
}
