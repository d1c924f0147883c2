use std::path::PathBuf;

use image::{imageops::FilterType, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::visuals::{parse_hex_color, Surface};

/// Where the overlay sits on the vertical frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPosition {
    Top,
    Center,
    Bottom,
}

/// Static content drawn on top of every exported frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Overlay {
    /// Optional logo or artwork (PNG/JPEG)
    pub image: Option<PathBuf>,

    /// Translucent banner strip behind the image, as `#rrggbb`
    pub banner_color: Option<String>,

    pub position: OverlayPosition,

    /// Image width as a fraction of the frame width
    pub scale: f32,

    pub opacity: f32,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            image: None,
            banner_color: None,
            position: OverlayPosition::Bottom,
            scale: 0.4,
            opacity: 0.9,
        }
    }
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.banner_color.is_none()
    }

    /// Render the overlay once for a `width`×`height` frame
    ///
    /// Returns `None` when there is nothing to draw.
    pub fn prerender(&self, width: u32, height: u32) -> Result<Option<OverlayLayer>> {
        if self.is_empty() {
            return Ok(None);
        }

        let band_height = (height as f32 * 0.14) as u32;
        let band_y = match self.position {
            OverlayPosition::Top => (height as f32 * 0.05) as u32,
            OverlayPosition::Center => (height - band_height) / 2,
            OverlayPosition::Bottom => height - band_height - (height as f32 * 0.05) as u32,
        };

        let mut layer = RgbaImage::new(width, band_height);

        if let Some(hex) = &self.banner_color {
            let color = parse_hex_color(hex).ok_or_else(|| RenderError::OverlayFailed {
                reason: format!("invalid banner color '{}'", hex),
            })?;
            for pixel in layer.pixels_mut() {
                *pixel = Rgba([color[0], color[1], color[2], 160]);
            }
        }

        if let Some(path) = &self.image {
            let source = image::open(path).map_err(|e| RenderError::OverlayFailed {
                reason: format!("{}: {}", path.display(), e),
            })?;

            let target_width = ((width as f32 * self.scale.clamp(0.05, 1.0)) as u32).max(1);
            let aspect = source.height() as f32 / source.width().max(1) as f32;
            let target_height = ((target_width as f32 * aspect) as u32).clamp(1, band_height.max(1));
            let resized = image::imageops::resize(
                &source.to_rgba8(),
                target_width,
                target_height,
                FilterType::Triangle,
            );

            let x = (width - resized.width()) / 2;
            let y = (band_height - resized.height()) / 2;
            image::imageops::overlay(&mut layer, &resized, x as i64, y as i64);
        }

        tracing::debug!("Overlay pre-rendered: {}x{} at y={}", width, band_height, band_y);

        Ok(Some(OverlayLayer {
            image: layer,
            y: band_y,
            opacity: self.opacity.clamp(0.0, 1.0),
        }))
    }
}

/// Pre-rendered overlay, composited onto each frame after the visualizer draws
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    image: RgbaImage,
    y: u32,
    opacity: f32,
}

impl OverlayLayer {
    pub fn composite(&self, surface: &mut Surface) {
        surface.blend_image(&self.image, 0, self.y as i64, self.opacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_overlay_renders_nothing() {
        assert!(Overlay::default().prerender(72, 128).unwrap().is_none());
    }

    #[test]
    fn test_banner_is_composited() {
        let overlay = Overlay {
            banner_color: Some("#ffffff".to_string()),
            opacity: 1.0,
            ..Default::default()
        };
        let layer = overlay.prerender(72, 128).unwrap().unwrap();

        let mut surface = Surface::new_black(72, 128);
        layer.composite(&mut surface);

        // Bottom band: 128 - 17 - 6 = 105..122
        assert_ne!(surface.get_pixel(10, 110), [0, 0, 0]);
        assert_eq!(surface.get_pixel(10, 10), [0, 0, 0]);
    }

    #[test]
    fn test_image_overlay_loads_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 255])).save(&path).unwrap();

        let overlay = Overlay {
            image: Some(path),
            position: OverlayPosition::Center,
            opacity: 1.0,
            ..Default::default()
        };
        let layer = overlay.prerender(100, 200).unwrap().unwrap();

        let mut surface = Surface::new_black(100, 200);
        layer.composite(&mut surface);
        assert_eq!(surface.get_pixel(50, 100), [255, 0, 0]);
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let overlay = Overlay {
            image: Some(PathBuf::from("/definitely/not/here.png")),
            ..Default::default()
        };
        assert!(overlay.prerender(72, 128).is_err());
    }
}
