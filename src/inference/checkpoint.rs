use std::path::{Path, PathBuf};

use burn::{prelude::*, record::CompactRecorder};

use super::InferenceError;

const CHECKPOINT_EXTENSION: &str = "mpk";

/// Everything needed to rebuild a segmentation model from a checkpoint,
/// stored next to the weights as `<checkpoints_path>_config.json`.
#[derive(Config, Debug, PartialEq)]
pub struct SegmentationModelConfig {
    pub model_class: String,
    pub n_classes: usize,
    #[config(default = 224)]
    pub input_height: usize,
    #[config(default = 224)]
    pub input_width: usize,
}

impl SegmentationModelConfig {
    pub fn config_path(checkpoints_path: &Path) -> PathBuf {
        let mut name = checkpoints_path.as_os_str().to_owned();
        name.push("_config.json");
        PathBuf::from(name)
    }

    pub fn load_from_checkpoint(checkpoints_path: &Path) -> Result<Self, InferenceError> {
        let path = Self::config_path(checkpoints_path);
        if !path.is_file() {
            return Err(InferenceError::CheckpointNotFound(path));
        }

        Self::load(&path).map_err(|err| InferenceError::Config {
            path,
            reason: format!("{:?}", err),
        })
    }

    pub fn save_for_checkpoint(&self, checkpoints_path: &Path) -> Result<PathBuf, InferenceError> {
        let path = Self::config_path(checkpoints_path);
        self.save(&path)?;
        Ok(path)
    }
}

fn checkpoint_epoch(file_name: &str, stem: &str) -> Option<usize> {
    file_name
        .strip_prefix(stem)?
        .strip_prefix('-')?
        .strip_suffix(CHECKPOINT_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// The `<stem>-<epoch>.mpk` file next to `checkpoints_path` with the highest
/// epoch.
pub fn find_latest_checkpoint(checkpoints_path: &Path) -> Option<PathBuf> {
    let stem = checkpoints_path.file_name()?.to_str()?;
    let dir = match checkpoints_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("Cannot list checkpoints in {}: {}", dir.display(), err);
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let epoch = checkpoint_epoch(entry.file_name().to_str()?, stem)?;
            Some((epoch, entry.path()))
        })
        .max_by_key(|(epoch, _)| *epoch)
        .map(|(_, path)| path)
}

/// Record `model` as `<checkpoints_path>-<epoch>.mpk`.
///
/// Dots already in the stem are kept, so `segnet.v2` gives `segnet.v2-3.mpk`.
pub fn save_checkpoint<B: Backend, M: Module<B>>(
    model: M,
    checkpoints_path: &Path,
    epoch: usize,
) -> Result<PathBuf, InferenceError> {
    let mut name = checkpoints_path.as_os_str().to_owned();
    name.push(format!("-{}.{}", epoch, CHECKPOINT_EXTENSION));
    let path = PathBuf::from(name);

    model
        .save_file(path.clone(), &CompactRecorder::new())
        .map_err(|err| InferenceError::Recorder(format!("{:?}", err)))?;

    Ok(path)
}

/// Load the most recent checkpoint of `checkpoints_path` into `model`.
pub fn load_latest_weights<B: Backend, M: Module<B>>(
    model: M,
    checkpoints_path: &Path,
    device: &B::Device,
) -> Result<M, InferenceError> {
    let latest = find_latest_checkpoint(checkpoints_path)
        .ok_or_else(|| InferenceError::CheckpointNotFound(checkpoints_path.to_path_buf()))?;

    tracing::info!("Loading weights from {}", latest.display());

    model
        .load_file(latest, &CompactRecorder::new(), device)
        .map_err(|err| InferenceError::Recorder(format!("{:?}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::LinearConfig;

    #[test]
    fn latest_checkpoint_has_the_highest_epoch() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "segnet-1.mpk",
            "segnet-12.mpk",
            "segnet-3.mpk",
            "segnet-x.mpk",
            "segnet-40.bin",
            "other-99.mpk",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let latest = find_latest_checkpoint(&dir.path().join("segnet"));

        assert_eq!(latest, Some(dir.path().join("segnet-12.mpk")));
    }

    #[test]
    fn dotted_stem_keeps_its_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = dir.path().join("segnet.v2");
        let device = Default::default();
        let model = LinearConfig::new(2, 2).init::<NdArray>(&device);

        let first = save_checkpoint(model.clone(), &checkpoints, 1).unwrap();
        let second = save_checkpoint(model.clone(), &checkpoints, 2).unwrap();

        assert_eq!(first, dir.path().join("segnet.v2-1.mpk"));
        assert_eq!(second, dir.path().join("segnet.v2-2.mpk"));
        assert!(first.is_file());
        assert!(second.is_file());
        assert_eq!(find_latest_checkpoint(&checkpoints), Some(second));
        assert!(load_latest_weights(model, &checkpoints, &device).is_ok());
    }

    #[test]
    fn no_checkpoint_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_latest_checkpoint(&dir.path().join("segnet")), None);
    }

    #[test]
    fn config_is_stored_next_to_the_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = dir.path().join("segnet");
        let config = SegmentationModelConfig::new("mobilenet_segnet".to_string(), 4)
            .with_input_height(160);

        let path = config.save_for_checkpoint(&checkpoints).unwrap();

        assert_eq!(path, dir.path().join("segnet_config.json"));
        assert_eq!(
            SegmentationModelConfig::load_from_checkpoint(&checkpoints).unwrap(),
            config
        );
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SegmentationModelConfig::load_from_checkpoint(&dir.path().join("segnet")),
            Err(InferenceError::CheckpointNotFound(_))
        ));
    }
}
