mod annotation;

pub use annotation::{
    DatasetError, annotation_to_class_map, list_images, load_annotation, open_image,
    pairs_from_paths,
};
