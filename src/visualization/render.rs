use burn::prelude::*;
use image::{Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;

use super::ClassPalette;
use crate::evaluation::ClassMap;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VisualizationError {
    #[error("Overlay requested without an input image")]
    MissingInput,
}

#[derive(Config, Debug)]
pub struct VisualizationConfig {
    /// Blend the segmentation over the input image.
    #[config(default = false)]
    pub overlay: bool,
    /// Output size as `[width, height]`. Defaults to the input image size.
    pub prediction_size: Option<[u32; 2]>,
}

/// Paint every pixel with its class colour. Classes outside the palette are
/// painted black.
pub fn colorize(map: &ClassMap, palette: &ClassPalette) -> RgbImage {
    let width = map.width() as u32;
    RgbImage::from_fn(width, map.height() as u32, |x, y| {
        let class = map.get(y as usize, x as usize).unwrap_or(0);
        Rgb(palette.color(class).unwrap_or([0, 0, 0]))
    })
}

/// Average `segmentation` with `image`, after resizing the segmentation to
/// the image size.
pub fn overlay(image: &RgbImage, segmentation: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let segmentation = resize(segmentation, width, height);

    RgbImage::from_fn(width, height, |x, y| {
        let a = image.get_pixel(x, y).0;
        let b = segmentation.get_pixel(x, y).0;
        Rgb([0, 1, 2].map(|c| ((a[c] as u16 + b[c] as u16) / 2) as u8))
    })
}

fn resize(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Nearest)
}

/// Render a class map for display, optionally over the image it was
/// predicted from.
pub fn visualize(
    map: &ClassMap,
    input: Option<&RgbImage>,
    palette: &ClassPalette,
    config: &VisualizationConfig,
) -> Result<RgbImage, VisualizationError> {
    tracing::debug!(
        "Rendering classes {:?} of a {:?} class map",
        map.classes_present(),
        map.dims()
    );

    let mut segmentation = colorize(map, palette);
    let mut input = input.cloned();

    if let Some(image) = &input {
        segmentation = resize(&segmentation, image.width(), image.height());
    }

    if let Some([width, height]) = config.prediction_size {
        segmentation = resize(&segmentation, width, height);
        input = input.map(|image| resize(&image, width, height));
    }

    if config.overlay {
        let image = input.ok_or(VisualizationError::MissingInput)?;
        segmentation = overlay(&image, &segmentation);
    }

    Ok(segmentation)
}
