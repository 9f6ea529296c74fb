//! Image preprocessing into normalized model input.
//!
//! Each image is resized to a fixed square, forced to RGB, scaled to [0, 1]
//! and normalized per channel with the ImageNet mean and standard deviation.
//! The output is a channel-major (CHW) tensor.

use image::imageops::FilterType;
use image::DynamicImage;
use snapseek_core::PreprocessError;
use std::path::Path;

pub const DEFAULT_IMAGE_SIZE: u32 = 224;
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A `3 x size x size` float tensor in channel-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    size: u32,
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn shape(&self) -> [usize; 3] {
        let s = self.size as usize;
        [3, s, s]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Values of one channel plane, `None` past the third channel.
    pub fn channel(&self, c: usize) -> Option<&[f32]> {
        let plane = (self.size as usize) * (self.size as usize);
        self.data.get(c * plane..(c + 1) * plane)
    }
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    image_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE)
    }
}

impl Preprocessor {
    pub fn new(image_size: u32) -> Self {
        Self {
            image_size,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Decode the file at `path` and transform it.
    ///
    /// The decoder is chosen from the file contents, as the corpus loader
    /// does, so a mislabelled extension does not matter.
    pub fn load(&self, path: &Path) -> Result<ImageTensor, PreprocessError> {
        let image = image::ImageReader::open(path)
            .map_err(|e| PreprocessError::new(path, e.to_string()))?
            .with_guessed_format()
            .map_err(|e| PreprocessError::new(path, e.to_string()))?
            .decode()
            .map_err(|e| PreprocessError::new(path, e.to_string()))?;
        self.process(&image)
            .map_err(|message| PreprocessError::new(path, message))
    }

    /// Transform an already decoded image.
    pub fn process(&self, image: &DynamicImage) -> Result<ImageTensor, String> {
        if self.image_size == 0 {
            return Err("target size must be positive".to_string());
        }
        if image.width() == 0 || image.height() == 0 {
            return Err("image has no pixels".to_string());
        }

        let size = self.image_size;
        let rgb = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();

        let plane = (size as usize) * (size as usize);
        let mut data = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let idx = (y as usize) * (size as usize) + (x as usize);
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                data[c * plane + idx] = (value - self.mean[c]) / self.std[c];
            }
        }

        Ok(ImageTensor { size, data })
    }
}
