//! Text overlay
//!
//! Pure formatting of the current measurements into the fixed-layout block
//! shown in the top-left corner of the container.

use crate::host::{HeapUsage, RenderInfo};
use crate::params::StressParameters;

pub const OVERLAY_TITLE: &str = "3D Stress Test (Instanced)";
pub const USAGE_HINT: &str = "Tips: stress3d \"count=40000&speed=1.5\"";

const MIB: f64 = 1024.0 * 1024.0;

/// Snapshot of everything the overlay shows.
#[derive(Debug, Clone, Copy)]
pub struct OverlayReport {
    pub params: StressParameters,
    pub fps: f64,
    pub avg_fps: f64,
    pub frame_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub gpu_ms: Option<f64>,
    pub render: RenderInfo,
    pub device_pixel_ratio: f64,
    pub heap: Option<HeapUsage>,
}

/// Fixed-precision number, or `-` when there is nothing meaningful to show.
fn human(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.digits$}"),
        _ => "-".to_string(),
    }
}

impl OverlayReport {
    fn gpu_label(&self) -> String {
        match self.gpu_ms {
            Some(ms) => format!("{} ms", human(Some(ms), 2)),
            None => "n/a".to_string(),
        }
    }

    pub fn render(&self) -> String {
        let p = &self.params;
        let r = &self.render;
        let memory = match self.heap {
            Some(heap) => format!(
                "Memory: used {}MB / total {}MB (limit ~{}MB)",
                human(Some(heap.used as f64 / MIB), 1),
                human(Some(heap.total as f64 / MIB), 1),
                human(Some(heap.limit as f64 / MIB), 0)
            ),
            None => "Memory: (unsupported)".to_string(),
        };

        [
            OVERLAY_TITLE.to_string(),
            format!("count={}, size={}, speed={}", p.count, p.size, p.speed),
            String::new(),
            format!(
                "FPS:  {} (avg {})",
                human(Some(self.fps), 1),
                human(Some(self.avg_fps), 1)
            ),
            format!(
                "CPU:  {} ms (min {} / max {})",
                human(Some(self.frame_ms), 2),
                human(Some(self.min_ms), 2),
                human(Some(self.max_ms), 2)
            ),
            format!("GPU:  {}", self.gpu_label()),
            String::new(),
            format!("DrawCalls: {}", r.draw_calls),
            format!("Triangles: {}", r.triangles),
            format!("Points:    {}  Lines: {}", r.points, r.lines),
            String::new(),
            format!("PixelRatio: {}", self.device_pixel_ratio),
            memory,
            String::new(),
            USAGE_HINT.to_string(),
        ]
        .join("\n")
    }
}
