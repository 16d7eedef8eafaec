use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, ImageReader};
use ndarray::{Array3, Array4, Axis};
use std::path::Path;

/// Side length the Siamese towers were trained on
pub const INPUT_SIZE: u32 = 100;

/// Model-ready image: `(100, 100, 3)` RGB, values in [0, 1]
#[derive(Debug, Clone)]
pub struct InputImage {
    pub pixels: Array3<f32>,
}

impl InputImage {
    /// NHWC batch of one, the layout the embedding tower expects
    pub fn to_tensor(&self) -> Array4<f32> {
        self.pixels.clone().insert_axis(Axis(0))
    }
}

/// Resize to 100x100 (bilinear) and scale to [0, 1]
pub fn preprocess_image(img: &DynamicImage) -> InputImage {
    let size = INPUT_SIZE as usize;
    let resized = img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let pixels = Array3::from_shape_fn((size, size, 3), |(y, x, c)| {
        resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    });

    InputImage { pixels }
}

/// Decode an image file and preprocess it. The format is sniffed from the
/// file contents, so a mislabelled extension still decodes.
pub fn preprocess_path(path: &Path) -> Result<InputImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("reading {}", path.display()))?
        .decode()
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(preprocess_image(&img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_output_shape_is_fixed() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(250, 180));
        let input = preprocess_image(&img);
        assert_eq!(input.pixels.shape(), &[100, 100, 3]);
        assert_eq!(input.to_tensor().shape(), &[1, 100, 100, 3]);
    }

    #[test]
    fn test_values_are_scaled_to_unit_range() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));
        let input = preprocess_image(&white);
        assert!(input.pixels.iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let black = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
        let input = preprocess_image(&black);
        assert!(input.pixels.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_channel_order_is_rgb() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([255, 0, 0])));
        let input = preprocess_image(&red);
        assert!((input.pixels[[50, 50, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(input.pixels[[50, 50, 1]], 0.0);
        assert_eq!(input.pixels[[50, 50, 2]], 0.0);
    }
}
