use image::{ImageBuffer, Rgb, RgbImage, RgbaImage};

/// Offscreen RGB drawing target the visualizers render into
///
/// This is a thin wrapper around an RGB image buffer with the handful of
/// primitives the built-in visualizers need. The recorder reads the raw
/// bytes after every drawn frame.
#[derive(Clone, Debug)]
pub struct Surface {
    buffer: RgbImage,
}

impl Surface {
    /// Create a new surface with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Raw packed RGB24 bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Fill the whole surface with one color
    pub fn fill(&mut self, color: [u8; 3]) {
        for pixel in self.buffer.chunks_exact_mut(3) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Alpha-blend a single pixel; out-of-bounds coordinates are ignored
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: [u8; 3], alpha: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }

        let alpha = alpha.clamp(0.0, 1.0);
        let pixel = self.buffer.get_pixel_mut(x as u32, y as u32);
        for channel in 0..3 {
            let blended = pixel[channel] as f32 * (1.0 - alpha) + color[channel] as f32 * alpha;
            pixel[channel] = blended.round() as u8;
        }
    }

    /// Blend an axis-aligned rectangle, clipped to the surface
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: [u8; 3], alpha: f32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width() as i64);
        let y1 = (y + height as i64).min(self.height() as i64);

        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color, alpha);
            }
        }
    }

    /// Blend a filled circle, clipped to the surface
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 3], alpha: f32) {
        if radius <= 0.0 {
            return;
        }

        let r2 = radius * radius;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;

        for py in y0..=y1 {
            let dy = py as f32 + 0.5 - cy;
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(px, py, color, alpha);
                }
            }
        }
    }

    /// Blend a circular ring of the given thickness
    pub fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, thickness: f32, color: [u8; 3], alpha: f32) {
        let outer = radius + thickness / 2.0;
        let inner = (radius - thickness / 2.0).max(0.0);
        let (outer2, inner2) = (outer * outer, inner * inner);

        for py in (cy - outer).floor() as i64..=(cy + outer).ceil() as i64 {
            let dy = py as f32 + 0.5 - cy;
            for px in (cx - outer).floor() as i64..=(cx + outer).ceil() as i64 {
                let dx = px as f32 + 0.5 - cx;
                let d2 = dx * dx + dy * dy;
                if d2 <= outer2 && d2 >= inner2 {
                    self.blend_pixel(px, py, color, alpha);
                }
            }
        }
    }

    /// Composite an RGBA image with its top-left corner at (x, y)
    pub fn blend_image(&mut self, layer: &RgbaImage, x: i64, y: i64, opacity: f32) {
        for (lx, ly, pixel) in layer.enumerate_pixels() {
            let alpha = pixel[3] as f32 / 255.0 * opacity;
            if alpha <= 0.0 {
                continue;
            }
            self.blend_pixel(
                x + lx as i64,
                y + ly as i64,
                [pixel[0], pixel[1], pixel[2]],
                alpha,
            );
        }
    }
}

/// Scale an RGB color by `factor`, saturating at white
pub fn scale_color(color: [u8; 3], factor: f32) -> [u8; 3] {
    color.map(|c| (c as f32 * factor).round().clamp(0.0, 255.0) as u8)
}
