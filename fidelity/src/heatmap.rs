//! Difference heatmap rendering

use image::{Rgb, RgbImage};

/// OpenCV-style JET colormap: blue for 0, red for 255
pub fn jet(value: u8) -> Rgb<u8> {
    let v = value as f64 / 255.0;
    let channel = |offset: f64| ((1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Per-pixel absolute difference, normalized by the largest channel
/// difference, averaged over channels and mapped through [`jet`]
pub fn difference_heatmap(source: &RgbImage, generated: &RgbImage) -> RgbImage {
    let (width, height) = generated.dimensions();

    let max_diff = source
        .pixels()
        .zip(generated.pixels())
        .flat_map(|(a, b)| (0..3).map(move |c| a[c].abs_diff(b[c])))
        .max()
        .unwrap_or(0);

    RgbImage::from_fn(width, height, |x, y| {
        if max_diff == 0 {
            return jet(0);
        }
        let a = source.get_pixel(x, y);
        let b = generated.get_pixel(x, y);
        let normalized: f64 = (0..3)
            .map(|c| a[c].abs_diff(b[c]) as f64 / max_diff as f64 * 255.0)
            .sum::<f64>()
            / 3.0;
        jet(normalized as u8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0), Rgb([0, 0, 128]));
        assert_eq!(jet(255), Rgb([128, 0, 0]));
    }

    #[test]
    fn test_identical_images_render_cold() {
        let image = RgbImage::from_pixel(4, 4, Rgb([90, 90, 90]));
        let heatmap = difference_heatmap(&image, &image);
        assert!(heatmap.pixels().all(|p| *p == jet(0)));
    }

    #[test]
    fn test_changed_region_is_hottest() {
        let source = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let mut generated = source.clone();
        generated.put_pixel(2, 2, Rgb([255, 255, 255]));

        let heatmap = difference_heatmap(&source, &generated);
        assert_eq!(*heatmap.get_pixel(2, 2), jet(255));
        assert_eq!(*heatmap.get_pixel(0, 0), jet(0));
    }
}
