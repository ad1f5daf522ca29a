//! PNG decoding and 16-bit RGB encoding.

use crate::{scale_samples, ImageData, IoError, IoResult};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Reads a PNG file into 16-bit-scale floats.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<ImageData> {
    let file = File::open(path.as_ref())?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
    let bytes = &buf[..info.buffer_size()];

    let channels = match info.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        other => return Err(IoError::UnsupportedLayout(format!("{:?}", other))),
    };

    let data = match info.bit_depth {
        png::BitDepth::Eight => scale_samples(bytes, 8),
        png::BitDepth::Sixteen => scale_samples(&bytes_to_u16(bytes), 16),
        depth => {
            return Err(IoError::UnsupportedLayout(format!(
                "{:?} {:?}",
                info.color_type, depth
            )));
        }
    };

    Ok(ImageData {
        width: info.width,
        height: info.height,
        channels,
        data,
    })
}

/// Writes interleaved 16-bit RGB samples as a PNG.
///
/// # Errors
///
/// [`IoError::EncodeError`] when `rgb` does not hold `width * height * 3`
/// samples or the encoder fails.
pub fn write_rgb16<P: AsRef<Path>>(path: P, width: u32, height: u32, rgb: &[u16]) -> IoResult<()> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(IoError::EncodeError(format!(
            "expected {} samples, got {}",
            expected,
            rgb.len()
        )));
    }

    let file = File::create(path.as_ref())?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Sixteen);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    let bytes: Vec<u8> = rgb.iter().flat_map(|v| v.to_be_bytes()).collect();
    writer
        .write_image_data(&bytes)
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    Ok(())
}

/// Converts big-endian byte slice to u16 vector.
fn bytes_to_u16(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect()
}
