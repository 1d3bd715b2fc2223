//! Viewport sizing
//!
//! Keeps the camera projection and output surface in step with the host
//! container. Pixel density is capped to bound fill-rate cost.

use crate::scene::PerspectiveCamera;

/// Highest output pixel density, in physical pixels per logical pixel.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Container size in logical pixels plus the host-reported density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Width over height; 1.0 when either side is degenerate.
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 && self.width > 0.0 && self.width.is_finite() && self.height.is_finite() {
            (self.width / self.height) as f32
        } else {
            1.0
        }
    }

    /// Density actually used for the output surface.
    pub fn pixel_ratio(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        }
    }

    pub fn surface_size(&self) -> SurfaceSize {
        let ratio = self.pixel_ratio();
        let scale = |logical: f64| {
            if logical.is_finite() && logical > 0.0 {
                (logical * ratio).round() as u32
            } else {
                0
            }
        };
        SurfaceSize {
            width: scale(self.width),
            height: scale(self.height),
        }
    }
}

/// Output surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Apply a viewport change to the camera and return the new surface size.
pub fn resize_camera(camera: &mut PerspectiveCamera, viewport: &Viewport) -> SurfaceSize {
    camera.aspect = viewport.aspect();
    let size = viewport.surface_size();
    tracing::debug!(
        width = viewport.width,
        height = viewport.height,
        surface_width = size.width,
        surface_height = size.height,
        aspect = camera.aspect,
        "viewport resized"
    );
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_from_size() {
        assert_eq!(Viewport::new(1600.0, 800.0, 1.0).aspect(), 2.0);
    }

    #[test]
    fn zero_height_does_not_divide() {
        let viewport = Viewport::new(800.0, 0.0, 1.0);
        assert_eq!(viewport.aspect(), 1.0);
        assert!(viewport.surface_size().is_empty());

        let mut camera = PerspectiveCamera::new(1.5);
        let size = resize_camera(&mut camera, &viewport);
        assert!(camera.aspect.is_finite());
        assert!(camera.projection().is_finite());
        assert_eq!(size, SurfaceSize { width: 800, height: 0 });
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::new(100.0, 50.0, 3.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        assert_eq!(
            viewport.surface_size(),
            SurfaceSize {
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn low_density_is_kept() {
        let viewport = Viewport::new(100.0, 50.0, 1.5);
        assert_eq!(
            viewport.surface_size(),
            SurfaceSize {
                width: 150,
                height: 75
            }
        );
    }

    #[test]
    fn bogus_density_falls_back_to_one() {
        assert_eq!(Viewport::new(10.0, 10.0, 0.0).pixel_ratio(), 1.0);
        assert_eq!(Viewport::new(10.0, 10.0, f64::NAN).pixel_ratio(), 1.0);
    }
}
