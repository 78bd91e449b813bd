//! Unoriented FAST corners with BRIEF descriptors and cross-checked
//! Hamming matching

use image::imageops::{self, FilterType};
use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FAST_THRESHOLD: i16 = 20;
const FAST_ARC: usize = 9;
const PYRAMID_LEVELS: u32 = 3;
const MAX_FEATURES: usize = 500;
const PATCH_RADIUS: i32 = 15;
const DESCRIPTOR_BITS: usize = 256;
/// Fixed so descriptors are comparable across images and runs
const PATTERN_SEED: u64 = 0x5eed_b41e;

/// Bresenham circle of radius 3, clockwise from 12 o'clock
const CIRCLE: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub level: u32,
    pub score: f64,
}

pub type Descriptor = [u64; DESCRIPTOR_BITS / 64];

/// Keypoints plus their descriptors, index-aligned
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Sampling pairs inside the patch, identical on every call
fn brief_pattern() -> Vec<((i32, i32), (i32, i32))> {
    let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
    let mut coord = || rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS);
    (0..DESCRIPTOR_BITS)
        .map(|_| ((coord(), coord()), (coord(), coord())))
        .collect()
}

fn fast_score(image: &GrayImage, x: u32, y: u32) -> Option<f64> {
    let center = image.get_pixel(x, y)[0] as i16;
    let ring: Vec<i16> = CIRCLE
        .iter()
        .map(|(dx, dy)| image.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as i16)
        .collect();

    let brighter = |v: i16| v > center + FAST_THRESHOLD;
    let darker = |v: i16| v < center - FAST_THRESHOLD;

    let has_arc = |test: &dyn Fn(i16) -> bool| {
        let mut run = 0;
        // Walk the ring twice so arcs may wrap around
        for i in 0..32 {
            if test(ring[i % 16]) {
                run += 1;
                if run >= FAST_ARC {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    };

    if !has_arc(&brighter) && !has_arc(&darker) {
        return None;
    }

    let score = ring
        .iter()
        .map(|v| ((v - center).abs() - FAST_THRESHOLD).max(0) as f64)
        .sum();
    Some(score)
}

/// FAST-9 corners with 3×3 non-maximum suppression. Corners closer than
/// the BRIEF patch radius to the border are skipped.
fn detect_level(image: &GrayImage, level: u32) -> Vec<Keypoint> {
    let margin = (PATCH_RADIUS + 1) as u32;
    let (width, height) = image.dimensions();
    if width <= 2 * margin || height <= 2 * margin {
        return Vec::new();
    }

    let mut scores = vec![0.0f64; (width * height) as usize];
    for y in margin..height - margin {
        for x in margin..width - margin {
            if let Some(score) = fast_score(image, x, y) {
                scores[(y * width + x) as usize] = score;
            }
        }
    }

    let mut keypoints = Vec::new();
    for y in margin..height - margin {
        for x in margin..width - margin {
            let score = scores[(y * width + x) as usize];
            if score <= 0.0 {
                continue;
            }
            let is_max = (-1i32..=1).all(|dy| {
                (-1i32..=1).all(|dx| {
                    if dx == 0 && dy == 0 {
                        return true;
                    }
                    let idx = ((y as i32 + dy) as u32 * width + (x as i32 + dx) as u32) as usize;
                    scores[idx] < score || (scores[idx] == score && (dy, dx) > (0, 0))
                })
            });
            if is_max {
                keypoints.push(Keypoint { x, y, level, score });
            }
        }
    }
    keypoints
}

fn describe(smoothed: &GrayImage, keypoint: &Keypoint, pattern: &[((i32, i32), (i32, i32))]) -> Descriptor {
    let mut descriptor = [0u64; DESCRIPTOR_BITS / 64];
    let sample = |(dx, dy): (i32, i32)| {
        smoothed.get_pixel((keypoint.x as i32 + dx) as u32, (keypoint.y as i32 + dy) as u32)[0]
    };

    for (bit, (p, q)) in pattern.iter().enumerate() {
        if sample(*p) < sample(*q) {
            descriptor[bit / 64] |= 1 << (bit % 64);
        }
    }
    descriptor
}

/// Detect up to 500 of the strongest corners over a 3-level pyramid and
/// describe each one
pub fn extract(image: &GrayImage) -> Features {
    let pattern = brief_pattern();
    let mut levels = vec![image.clone()];
    for _ in 1..PYRAMID_LEVELS {
        let Some(previous) = levels.last() else { break };
        let (w, h) = (previous.width() / 2, previous.height() / 2);
        if w == 0 || h == 0 {
            break;
        }
        let next = imageops::resize(previous, w, h, FilterType::Triangle);
        levels.push(next);
    }

    let mut keypoints: Vec<Keypoint> = levels
        .iter()
        .enumerate()
        .flat_map(|(level, img)| detect_level(img, level as u32))
        .collect();
    keypoints.sort_by(|a, b| b.score.total_cmp(&a.score));
    keypoints.truncate(MAX_FEATURES);

    let smoothed: Vec<GrayImage> = levels.iter().map(|img| imageops::blur(img, 2.0)).collect();
    let descriptors = keypoints
        .iter()
        .map(|kp| describe(&smoothed[kp.level as usize], kp, &pattern))
        .collect();

    Features { keypoints, descriptors }
}

fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

fn nearest(query: &Descriptor, candidates: &[Descriptor]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| hamming(query, c))
        .map(|(i, _)| i)
}

/// Number of mutual nearest-neighbour pairs
pub fn cross_checked_matches(a: &Features, b: &Features) -> usize {
    a.descriptors
        .iter()
        .enumerate()
        .filter(|(i, descriptor)| {
            nearest(descriptor, &b.descriptors)
                .and_then(|j| nearest(&b.descriptors[j], &a.descriptors))
                .is_some_and(|back| back == *i)
        })
        .count()
}

/// `matches / max(|A|, |B|)`, or 0 when either side has no keypoints
pub fn match_ratio(a: &GrayImage, b: &GrayImage) -> f64 {
    let fa = extract(a);
    let fb = extract(b);
    if fa.is_empty() || fb.is_empty() {
        return 0.0;
    }
    cross_checked_matches(&fa, &fb) as f64 / fa.len().max(fb.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blocks(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let cells: Vec<u8> = (0..(width / 8 + 1) * (height / 8 + 1)).map(|_| rng.gen()).collect();
        GrayImage::from_fn(width, height, |x, y| Luma([cells[((y / 8) * (width / 8 + 1) + x / 8) as usize]]))
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let flat = GrayImage::from_pixel(96, 96, Luma([128]));
        assert!(extract(&flat).is_empty());
        assert_eq!(match_ratio(&flat, &flat), 0.0);
    }

    #[test]
    fn test_one_flat_side_gives_zero_ratio() {
        let flat = GrayImage::from_pixel(128, 128, Luma([128]));
        let textured = blocks(128, 128, 7);
        assert!(!extract(&textured).is_empty());

        assert_eq!(match_ratio(&textured, &flat), 0.0);
        assert_eq!(match_ratio(&flat, &textured), 0.0);
    }

    #[test]
    fn test_textured_image_matches_itself() {
        let image = blocks(128, 128, 3);
        let features = extract(&image);
        assert!(!features.is_empty());
        assert!(features.len() <= MAX_FEATURES);
        assert!(match_ratio(&image, &image) >= 0.8);
    }

    #[test]
    fn test_single_bright_dot_is_a_corner() {
        let mut image = GrayImage::from_pixel(64, 64, Luma([0]));
        image.put_pixel(32, 32, Luma([255]));
        let corners = detect_level(&image, 0);
        assert_eq!(corners.len(), 1);
        assert_eq!((corners[0].x, corners[0].y), (32, 32));
    }
}
