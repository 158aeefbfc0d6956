//! Image → tensor conversion for the tumor classifier.
//!
//! The model expects a single NHWC image of 150×150 RGB pixels scaled to [0, 1].

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader};
use ndarray::Array4;
use tracing::debug;

use crate::error::Result;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 150;

/// RGB.
pub const INPUT_CHANNELS: usize = 3;

/// Shape of the tensor produced by [`load_tensor`].
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, INPUT_CHANNELS];

/// Decode the image at `path` and convert it with [`image_to_tensor`].
///
/// The format is sniffed from the file contents, so a wrong or missing
/// extension does not matter. Unreadable or non-image files return an error.
pub fn load_tensor(path: &Path) -> Result<Array4<f32>> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded scan image"
    );
    Ok(image_to_tensor(&image))
}

/// Coerce to RGB, resize to [`INPUT_SIZE`] square and normalize to [0, 1].
pub fn image_to_tensor(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    Array4::from_shape_fn(INPUT_SHAPE, |(_, y, x, c)| {
        f32::from(resized.get_pixel(x as u32, y as u32)[c]) / 255.0
    })
}
