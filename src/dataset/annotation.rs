use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage};
use thiserror::Error;

use crate::evaluation::{ClassMap, EvaluationError};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
const ANNOTATION_EXTENSIONS: [&str; 2] = ["png", "bmp"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Directory does not exist: {0:?}")]
    MissingDirectory(PathBuf),

    #[error("No annotation found for image {0:?}")]
    MissingAnnotation(PathBuf),

    #[error("Annotation {path:?} holds class {class}, expected fewer than {n_classes}")]
    ClassOutOfRange {
        path: PathBuf,
        class: usize,
        n_classes: usize,
    },

    #[error("Failed to decode {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|&valid_ext| valid_ext.eq_ignore_ascii_case(ext))
        })
}

fn ensure_dir(dir: &Path) -> Result<(), DatasetError> {
    if !dir.is_dir() {
        return Err(DatasetError::MissingDirectory(dir.to_path_buf()));
    }
    Ok(())
}

pub fn open_image(path: &Path) -> Result<DynamicImage, DatasetError> {
    image::open(path).map_err(|source| DatasetError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    ensure_dir(dir)?;

    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, &IMAGE_EXTENSIONS) {
            images.push(path);
        }
    }
    images.sort();

    Ok(images)
}

/// Pair every image in `images_dir` with the annotation sharing its file
/// stem in `annotations_dir`.
pub fn pairs_from_paths(
    images_dir: &Path,
    annotations_dir: &Path,
) -> Result<Vec<(PathBuf, PathBuf)>, DatasetError> {
    ensure_dir(annotations_dir)?;

    let mut pairs = Vec::new();
    for image_path in list_images(images_dir)? {
        let Some(stem) = image_path.file_stem() else {
            continue;
        };

        let annotation = ANNOTATION_EXTENSIONS
            .iter()
            .map(|ext| annotations_dir.join(format!("{}.{}", stem.to_string_lossy(), ext)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| DatasetError::MissingAnnotation(image_path.clone()))?;

        pairs.push((image_path, annotation));
    }

    tracing::info!(
        "Paired {} images from {} with annotations from {}",
        pairs.len(),
        images_dir.display(),
        annotations_dir.display()
    );

    Ok(pairs)
}

/// Convert a decoded index-encoded annotation to a class map. The class of
/// a pixel is its first channel.
pub fn annotation_to_class_map(
    image: &DynamicImage,
    n_classes: usize,
) -> Result<ClassMap, EvaluationError> {
    let (width, height) = (image.width() as usize, image.height() as usize);

    let data: Vec<usize> = match image.color() {
        ColorType::L8 => image.to_luma8().iter().map(|&x| x as usize).collect(),
        ColorType::L16 => image.to_luma16().iter().map(|&x| x as usize).collect(),
        ColorType::Rgb16 | ColorType::Rgba16 => image
            .to_rgb16()
            .pixels()
            .map(|pixel| pixel.0[0] as usize)
            .collect(),
        _ => image
            .to_rgb8()
            .pixels()
            .map(|pixel| pixel.0[0] as usize)
            .collect(),
    };

    if let Some(&class) = data.iter().find(|&&class| class >= n_classes) {
        return Err(EvaluationError::ClassOutOfRange {
            index: 0,
            class,
            n_classes,
        });
    }

    ClassMap::new(height, width, data)
}

/// Load an index-encoded annotation image from disk.
pub fn load_annotation(path: &Path, n_classes: usize) -> Result<ClassMap, DatasetError> {
    let image = open_image(path)?;

    annotation_to_class_map(&image, n_classes).map_err(|err| match err {
        EvaluationError::ClassOutOfRange {
            class, n_classes, ..
        } => DatasetError::ClassOutOfRange {
            path: path.to_path_buf(),
            class,
            n_classes,
        },
        other => other.into(),
    })
}
