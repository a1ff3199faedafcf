use image::{DynamicImage, GenericImageView};

use crate::error::ProcessingError;
use crate::options::{CropRegion, Rotation};

/// Right-angle rotation, mirroring and cropping
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotate clockwise; 90 and 270 swap width and height
    pub fn rotate(img: DynamicImage, rotation: Rotation) -> DynamicImage {
        match rotation {
            Rotation::Deg0 => img,
            Rotation::Deg90 => img.rotate90(),
            Rotation::Deg180 => img.rotate180(),
            Rotation::Deg270 => img.rotate270(),
        }
    }

    /// Mirror top to bottom
    pub fn flip(img: DynamicImage) -> DynamicImage {
        img.flipv()
    }

    /// Mirror left to right
    pub fn flop(img: DynamicImage) -> DynamicImage {
        img.fliph()
    }

    /// Extract `region`, checked against the image as it is now.
    pub fn crop(img: DynamicImage, region: CropRegion) -> Result<DynamicImage, ProcessingError> {
        let (width, height) = img.dimensions();

        let right = region.left as u64 + region.width as u64;
        let bottom = region.top as u64 + region.height as u64;
        if region.width == 0 || region.height == 0 || right > width as u64 || bottom > height as u64
        {
            return Err(ProcessingError::OutOfBounds(format!(
                "Crop region {}x{} at ({}, {}) is outside the {}x{} image",
                region.width, region.height, region.left, region.top, width, height
            )));
        }

        Ok(img.crop_imm(region.left, region.top, region.width, region.height))
    }
}
