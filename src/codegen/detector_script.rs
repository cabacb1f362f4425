//! MaixPy script generation for YOLOv2 detectors running on the K210 KPU.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use thiserror::Error;

pub const SCRIPT_FILE_NAME: &str = "generated_script.py";

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("At least one class name is required")]
    EmptyClasses,

    #[error("Anchors come in (width, height) pairs, got {0} values")]
    OddAnchors(usize),

    #[error("At least one output dimension is required")]
    EmptyOutputs,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Config, Debug)]
pub struct DetectorScriptConfig {
    /// Label of each class id, in order.
    pub classes: Vec<String>,
    /// Flattened `(width, height)` anchor pairs.
    pub anchors: Vec<f64>,
    /// Output tensor shape handed to `kpu.set_outputs`.
    pub outputs: Vec<usize>,
    /// Detection probability threshold.
    #[config(default = 0.8)]
    pub threshold: f64,
    /// Non-maximum suppression threshold.
    #[config(default = 0.5)]
    pub nms: f64,
    #[config(default = 5)]
    pub anchor_count: usize,
    /// Pixels added to each detected box before drawing.
    #[config(default = 40)]
    pub box_padding: i32,
    /// Flash address of the model.
    #[config(default = 5242880)]
    pub task_address: u32,
}

/// Double-quoted Python string literal for `value`.
fn python_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\x{:02x}", c as u32)),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

impl DetectorScriptConfig {
    fn validate(&self) -> Result<(), CodegenError> {
        if self.classes.is_empty() {
            return Err(CodegenError::EmptyClasses);
        }
        if self.anchors.len() % 2 != 0 {
            return Err(CodegenError::OddAnchors(self.anchors.len()));
        }
        if self.outputs.is_empty() {
            return Err(CodegenError::EmptyOutputs);
        }
        if self.anchors.len() != 2 * self.anchor_count {
            tracing::warn!(
                "{} anchor values given for {} anchors",
                self.anchors.len(),
                self.anchor_count
            );
        }
        Ok(())
    }

    pub fn render(&self) -> Result<String, CodegenError> {
        self.validate()?;

        let classes = self
            .classes
            .iter()
            .map(|class| python_string_literal(class))
            .collect::<Vec<_>>()
            .join(", ");
        let anchors = self
            .anchors
            .iter()
            .map(|anchor| format!("{:?}", anchor))
            .collect::<Vec<_>>()
            .join(", ");
        let outputs = self
            .outputs
            .iter()
            .map(|dim| dim.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            r#"
import ai
import time
import KPU as kpu
import sensor, lcd

# Initialize LCD and camera sensor
lcd.init()
sensor.reset()
sensor.set_pixformat(sensor.RGB565)
sensor.set_framesize(sensor.QVGA)
sensor.set_windowing((224, 224))
sensor.set_vflip(1)
sensor.run(1)

classes = [{classes}]

task = kpu.load({task_address:#x})

anchors = ({anchors})

a = kpu.init_yolo2(task, {threshold:?}, {nms:?}, {anchor_count}, anchors)
a = kpu.set_outputs(task, {outputs})

while True:
    img = sensor.snapshot()
    a = img.pix_to_ai()
    code = kpu.run_yolo2(task, img)

    if code:
        for i in code:
            x, y, w, h = i.rect()
            new_w = w + {padding}
            new_h = h + {padding}
            new_x = x - (new_w - w) // 2
            new_y = y - (new_h - h) // 2
            a = img.draw_rectangle(new_x, new_y, new_w, new_h, color=(0, 255, 0))
            a = img.draw_string(new_x, new_y, classes[i.classid()], color=(255, 0, 0), scale=1.5)
        lcd.display(img)
    else:
        lcd.display(img)

a = kpu.deinit(task)
"#,
            task_address = self.task_address,
            threshold = self.threshold,
            nms = self.nms,
            anchor_count = self.anchor_count,
            padding = self.box_padding,
        ))
    }

    /// Render the script into `target_dir/generated_script.py`.
    pub fn write_to(&self, target_dir: &Path) -> Result<PathBuf, CodegenError> {
        let script = self.render()?;
        let path = target_dir.join(SCRIPT_FILE_NAME);
        std::fs::write(&path, script)?;

        tracing::info!("Script generated successfully as {}", path.display());
        Ok(path)
    }
}
