//! Per-channel color histogram correlation

use image::RgbImage;

const BINS: usize = 256;

fn channel_histograms(image: &RgbImage) -> [[f64; BINS]; 3] {
    let mut hist = [[0.0; BINS]; 3];
    for pixel in image.pixels() {
        for (channel, value) in pixel.0.iter().enumerate() {
            hist[channel][*value as usize] += 1.0;
        }
    }
    hist
}

/// Pearson correlation of two histograms. A zero denominator (either
/// histogram flat) counts as a perfect correlation, as OpenCV's CORREL does.
fn correlation(a: &[f64; BINS], b: &[f64; BINS]) -> f64 {
    let mean_a = a.iter().sum::<f64>() / BINS as f64;
    let mean_b = b.iter().sum::<f64>() / BINS as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denominator = var_a * var_b;
    if denominator.abs() > f64::EPSILON {
        cov / denominator.sqrt()
    } else {
        1.0
    }
}

/// Mean over R, G and B of the 256-bin histogram correlation
pub fn color_hist_correlation(a: &RgbImage, b: &RgbImage) -> f64 {
    let ha = channel_histograms(a);
    let hb = channel_histograms(b);
    (0..3).map(|c| correlation(&ha[c], &hb[c])).sum::<f64>() / 3.0
}
