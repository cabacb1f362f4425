mod palette;
mod render;

pub use palette::{ClassPalette, DEFAULT_PALETTE_SEED};
pub use render::{VisualizationConfig, VisualizationError, colorize, overlay, visualize};
