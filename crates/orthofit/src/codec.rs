use std::io::Cursor;

use image::{ImageFormat, ImageResult, RgbImage};

/// A decoded input photo and the container format it came in.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub rgb: RgbImage,
    pub format: ImageFormat,
}

/// Decode JPEG/PNG (or any format `image` recognises) into RGB.
pub fn decode_image(bytes: &[u8]) -> ImageResult<DecodedImage> {
    let format = image::guess_format(bytes)?;
    let rgb = image::load_from_memory_with_format(bytes, format)?.to_rgb8();
    Ok(DecodedImage { rgb, format })
}

/// Format [`encode_image`] writes for an input of `format`.
pub fn encoded_format(format: ImageFormat) -> ImageFormat {
    match format {
        ImageFormat::Jpeg => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    }
}

/// Encode `img` as JPEG or PNG; other input formats are written as PNG.
pub fn encode_image(img: &RgbImage, format: ImageFormat) -> ImageResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, encoded_format(format))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn png_keeps_format_and_pixels() {
        let img = RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]));
        let bytes = encode_image(&img, ImageFormat::Png).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.rgb, img);
    }

    #[test]
    fn jpeg_round_trips_format() {
        let img = RgbImage::from_pixel(16, 16, Rgb([200, 200, 200]));
        let bytes = encode_image(&img, ImageFormat::Jpeg).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.rgb.dimensions(), (16, 16));
    }

    #[test]
    fn other_formats_fall_back_to_png() {
        let img = RgbImage::new(4, 4);
        let bytes = encode_image(&img, ImageFormat::Bmp).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(encoded_format(ImageFormat::Bmp), ImageFormat::Png);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_image(b"definitely not an image").is_err());
    }
}
