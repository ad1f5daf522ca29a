//! TIFF decoding and 16-bit RGB encoding.

use crate::{scale_samples, ImageData, IoError, IoResult, SAMPLE_MAX};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

/// Reads a TIFF file into 16-bit-scale floats.
///
/// Float TIFFs are taken as `0.0..=1.0` and scaled.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<ImageData> {
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;
    let color_type = decoder
        .colortype()
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;
    let result = decoder
        .read_image()
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;

    let channels = match color_type {
        ColorType::Gray(_) => 1,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) => 4,
        other => return Err(IoError::UnsupportedLayout(format!("{:?}", other))),
    };

    let data = match result {
        DecodingResult::U8(buf) => scale_samples(&buf, 8),
        DecodingResult::U16(buf) => scale_samples(&buf, 16),
        DecodingResult::F32(buf) => buf.iter().map(|v| v * SAMPLE_MAX).collect(),
        _ => return Err(IoError::UnsupportedLayout(format!("{:?}", color_type))),
    };

    Ok(ImageData { width, height, channels, data })
}

/// Writes interleaved 16-bit RGB samples as an uncompressed TIFF.
pub fn write_rgb16<P: AsRef<Path>>(path: P, width: u32, height: u32, rgb: &[u16]) -> IoResult<()> {
    use tiff::encoder::{colortype, TiffEncoder};

    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(file)
        .map_err(|e: tiff::TiffError| IoError::EncodeError(e.to_string()))?;
    encoder
        .write_image::<colortype::RGB16>(width, height, rgb)
        .map_err(|e: tiff::TiffError| IoError::EncodeError(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_rgb16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tif");
        let rgb: Vec<u16> = (0..3 * 3 * 3).map(|v| (v * 2000) as u16).collect();
        write_rgb16(&path, 3, 3, &rgb).unwrap();

        let img = read(&path).unwrap();
        assert_eq!((img.width, img.height, img.channels), (3, 3, 3));
        assert_eq!(img.data[5], 10000.0);
    }
}
