//! In-memory fixture builders shared by the integration tests.

#![allow(dead_code)]

/// Little-endian TIFF with a GPS IFD. `None` references are left out.
pub fn gps_tiff(
    lat: [(u32, u32); 3],
    lat_ref: Option<&str>,
    lon: [(u32, u32); 3],
    lon_ref: Option<&str>,
) -> Vec<u8> {
    let mut entries: Vec<(u16, u16, u32, Vec<u8>)> = Vec::new();
    for (ref_tag, value_tag, values, reference) in [(1u16, 2u16, lat, lat_ref), (3, 4, lon, lon_ref)]
    {
        if let Some(r) = reference {
            let mut inline = r.as_bytes().to_vec();
            inline.resize(4, 0);
            entries.push((ref_tag, 2, r.len() as u32 + 1, inline));
        }
        let data = values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect();
        entries.push((value_tag, 5, 3, data));
    }

    let gps_ifd = 8 + 2 + 12 + 4;
    let mut data_offset = gps_ifd + 2 + 12 * entries.len() + 4;

    let mut tiff = b"II*\0".to_vec();
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x8825u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&(gps_ifd as u32).to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    tiff.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    let mut payload = Vec::new();
    for (tag, kind, count, data) in &entries {
        tiff.extend_from_slice(&tag.to_le_bytes());
        tiff.extend_from_slice(&kind.to_le_bytes());
        tiff.extend_from_slice(&count.to_le_bytes());
        if *kind == 2 {
            tiff.extend_from_slice(data);
        } else {
            tiff.extend_from_slice(&(data_offset as u32).to_le_bytes());
            data_offset += data.len();
            payload.extend_from_slice(data);
        }
    }
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(&payload);
    tiff
}

pub fn pittsburgh_tiff() -> Vec<u8> {
    gps_tiff(
        [(40, 1), (26, 1), (46, 1)],
        Some("N"),
        [(79, 1), (56, 1), (55, 1)],
        Some("W"),
    )
}

fn segment(marker: u8, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((data.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// Baseline 640x480 JPEG header, optionally carrying an EXIF block.
pub fn jpeg(exif_tiff: Option<&[u8]>) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];
    jpeg.extend(segment(0xE0, b"JFIF\0\x01\x01\x01\x00\x48\x00\x48\x00\x00"));
    if let Some(tiff) = exif_tiff {
        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(tiff);
        jpeg.extend(segment(0xE1, &app1));
    }
    jpeg.extend(segment(
        0xC0,
        &[8, 0x01, 0xE0, 0x02, 0x80, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1],
    ));
    jpeg.extend(segment(0xDA, &[1, 1, 0, 0, 63, 0]));
    jpeg.extend_from_slice(&[0x00, 0xFF, 0xD9]);
    jpeg
}

fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = flate2::Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
    out
}

/// 16x16 truecolor PNG with a Title text chunk.
pub fn png() -> Vec<u8> {
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&16u32.to_be_bytes());
    ihdr.extend_from_slice(&16u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    png.extend(png_chunk(b"IHDR", &ihdr));
    png.extend(png_chunk(b"tEXt", b"Title\0Harbour"));
    png.extend(png_chunk(b"IDAT", &[0u8; 64]));
    png.extend(png_chunk(b"IEND", &[]));
    png
}

/// 44.1 kHz 16-bit stereo WAV with one second of silence.
pub fn wav() -> Vec<u8> {
    let mut fmt = Vec::new();
    fmt.extend_from_slice(&1u16.to_le_bytes());
    fmt.extend_from_slice(&2u16.to_le_bytes());
    fmt.extend_from_slice(&44_100u32.to_le_bytes());
    fmt.extend_from_slice(&176_400u32.to_le_bytes());
    fmt.extend_from_slice(&4u16.to_le_bytes());
    fmt.extend_from_slice(&16u16.to_le_bytes());

    let mut body = b"WAVE".to_vec();
    body.extend_from_slice(b"fmt ");
    body.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
    body.extend_from_slice(&fmt);
    body.extend_from_slice(b"data");
    body.extend_from_slice(&176_400u32.to_le_bytes());
    body.extend(std::iter::repeat(0u8).take(176_400));

    let mut wav = b"RIFF".to_vec();
    wav.extend_from_slice(&(body.len() as u32).to_le_bytes());
    wav.extend(body);
    wav
}
