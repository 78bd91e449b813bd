//! Floating-point grayscale planes

use image::{GrayImage, RgbImage};

/// Row-major grayscale plane in the 0..=255 range
#[derive(Debug, Clone, PartialEq)]
pub struct LumaPlane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl LumaPlane {
    /// ITU-R 601 luma weights
    pub fn from_rgb(image: &RgbImage) -> Self {
        let data = image
            .pixels()
            .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
            .collect();

        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data,
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn to_gray8(&self) -> GrayImage {
        let pixels = self.data.iter().map(|v| v.round().clamp(0.0, 255.0) as u8).collect();
        GrayImage::from_raw(self.width as u32, self.height as u32, pixels)
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.height as u32))
    }
}

/// Summed-area table with one row and column of zero padding
pub(crate) struct Integral {
    width: usize,
    sums: Vec<f64>,
}

impl Integral {
    pub fn build(width: usize, height: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { width, sums }
    }

    /// Sum over `[x, x + w) × [y, y + h)`
    #[inline]
    pub fn window(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let stride = self.width + 1;
        let a = self.sums[y * stride + x];
        let b = self.sums[y * stride + x + w];
        let c = self.sums[(y + h) * stride + x];
        let d = self.sums[(y + h) * stride + x + w];
        d - b - c + a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_luma_weights() {
        let image = RgbImage::from_pixel(2, 1, Rgb([255, 255, 255]));
        let plane = LumaPlane::from_rgb(&image);
        assert!((plane.at(1, 0) - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_integral_window_sum() {
        let integral = Integral::build(4, 3, |x, y| (x + y * 4) as f64);
        // cells (1,1),(2,1),(1,2),(2,2) = 5 + 6 + 9 + 10
        assert_eq!(integral.window(1, 1, 2, 2), 30.0);
        assert_eq!(integral.window(0, 0, 4, 3), (0..12).sum::<usize>() as f64);
    }
}
