mod detector_script;

pub use detector_script::{CodegenError, DetectorScriptConfig, SCRIPT_FILE_NAME};
