//! Structural similarity over a uniform window

use crate::luma::{Integral, LumaPlane};

const WINDOW: usize = 7;
const DATA_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Mean SSIM over every fully contained 7×7 window. Images smaller than
/// the window are compared as one global window. Both planes must share
/// dimensions.
pub fn ssim(a: &LumaPlane, b: &LumaPlane) -> f64 {
    debug_assert_eq!((a.width, a.height), (b.width, b.height));
    let (width, height) = (a.width.min(b.width), a.height.min(b.height));
    if width == 0 || height == 0 {
        return 0.0;
    }

    let (win_w, win_h) = if width < WINDOW || height < WINDOW {
        (width, height)
    } else {
        (WINDOW, WINDOW)
    };

    let sx = Integral::build(width, height, |x, y| a.at(x, y));
    let sy = Integral::build(width, height, |x, y| b.at(x, y));
    let sxx = Integral::build(width, height, |x, y| a.at(x, y) * a.at(x, y));
    let syy = Integral::build(width, height, |x, y| b.at(x, y) * b.at(x, y));
    let sxy = Integral::build(width, height, |x, y| a.at(x, y) * b.at(x, y));

    let n = (win_w * win_h) as f64;
    let sample = if n > 1.0 { n / (n - 1.0) } else { 1.0 };
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut windows = 0usize;
    for y in 0..=(height - win_h) {
        for x in 0..=(width - win_w) {
            let ux = sx.window(x, y, win_w, win_h) / n;
            let uy = sy.window(x, y, win_w, win_h) / n;
            let vx = (sxx.window(x, y, win_w, win_h) / n - ux * ux) * sample;
            let vy = (syy.window(x, y, win_w, win_h) / n - uy * uy) * sample;
            let vxy = (sxy.window(x, y, win_w, win_h) / n - ux * uy) * sample;

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += numerator / denominator;
            windows += 1;
        }
    }

    total / windows as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> LumaPlane {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        LumaPlane { width, height, data }
    }

    #[test]
    fn test_identical_planes_score_one() {
        let a = plane(32, 24, |x, y| ((x * 7 + y * 13) % 255) as f64);
        assert!((ssim(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_plane_scores_low() {
        let a = plane(32, 32, |x, y| if (x / 4 + y / 4) % 2 == 0 { 0.0 } else { 255.0 });
        let b = plane(32, 32, |x, y| 255.0 - a.at(x, y));
        assert!(ssim(&a, &b) < 0.0);
    }

    #[test]
    fn test_tiny_images_use_global_window() {
        let a = plane(3, 3, |x, _| x as f64 * 50.0);
        assert!((ssim(&a, &a) - 1.0).abs() < 1e-9);
    }
}
