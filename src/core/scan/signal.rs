//! 信号检测 - 颜色空间掩码 + 形态学膨胀 + 归一化强度
//!
//! Pipeline per region:
//! 1. RGB -> 8-bit HSV (H in 0..180, S/V in 0..255), or luma for the legacy mode
//! 2. Inclusive band test -> binary mask (0 / 255)
//! 3. Dilation with a small elliptical kernel to close compression gaps
//! 4. Sum of the mask divided by the region area -> score in [0, 255]

use log::{debug, warn};
use rayon::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ConfigError;
use super::region::Region;

pub const MASK_ON: u8 = 255;

/// Largest accepted kernel side.
pub const MAX_KERNEL_SIDE: usize = 31;

/// Which pixels count as "signal present".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SignalBand {
    Hsv {
        #[serde(default = "default_hue")]
        hue: [u8; 2],
        #[serde(default = "default_saturation")]
        saturation: [u8; 2],
        #[serde(default = "default_value")]
        value: [u8; 2],
    },
    /// Earlier detection mode: bright pixels on the grayscale image.
    ///
    /// Red and blue weights are swapped relative to BT.601 so masks match
    /// results produced by those builds.
    Luma {
        #[serde(default = "default_luma_threshold")]
        threshold: u8,
    },
}

fn default_hue() -> [u8; 2] {
    [20, 40]
}
fn default_saturation() -> [u8; 2] {
    [200, 255]
}
fn default_value() -> [u8; 2] {
    [200, 255]
}
pub fn default_luma_threshold() -> u8 {
    230
}

impl Default for SignalBand {
    fn default() -> Self {
        SignalBand::Hsv {
            hue: default_hue(),
            saturation: default_saturation(),
            value: default_value(),
        }
    }
}

impl SignalBand {
    pub fn luma(threshold: u8) -> Self {
        SignalBand::Luma { threshold }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let SignalBand::Hsv {
            hue,
            saturation,
            value,
        } = self
        {
            for (name, [lo, hi]) in [("hue", hue), ("saturation", saturation), ("value", value)] {
                if lo > hi {
                    return Err(ConfigError::InvalidBand(format!(
                        "{name} lower bound {lo} exceeds upper bound {hi}"
                    )));
                }
            }
            if hue[1] >= 180 {
                return Err(ConfigError::InvalidBand(format!(
                    "hue upper bound {} must be below 180",
                    hue[1]
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, rgb: &[u8]) -> bool {
        match self {
            SignalBand::Hsv {
                hue,
                saturation,
                value,
            } => {
                let [h, s, v] = rgb_to_hsv(rgb[0], rgb[1], rgb[2]);
                (hue[0]..=hue[1]).contains(&h)
                    && (saturation[0]..=saturation[1]).contains(&s)
                    && (value[0]..=value[1]).contains(&v)
            }
            // earlier builds ran an RGB gray conversion over BGR frames; keep their weighting
            SignalBand::Luma { threshold } => rgb_to_luma(rgb[2], rgb[1], rgb[0]) > *threshold,
        }
    }
}

const HSV_SHIFT: u32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// `round((255 << 12) / v)`, index 0 unused.
static SAT_DIV: Lazy<[i32; 256]> = Lazy::new(|| {
    let mut table = [0i32; 256];
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = ((255 << HSV_SHIFT) as f64 / i as f64).round_ties_even() as i32;
    }
    table
});

/// `round((180 << 12) / (6 * diff))`, index 0 unused.
static HUE_DIV: Lazy<[i32; 256]> = Lazy::new(|| {
    let mut table = [0i32; 256];
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = ((180 << HSV_SHIFT) as f64 / (6.0 * i as f64)).round_ties_even() as i32;
    }
    table
});

/// 8-bit HSV with the hue halved to fit a byte.
///
/// Fixed-point division tables with 12 fractional bits, the same integer path
/// OpenCV's `cvtColor` takes for `CV_8U`, so band edges agree bit for bit.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = (diff * SAT_DIV[v as usize] + HSV_ROUND) >> HSV_SHIFT;

    // red wins ties, then green
    let h_raw = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (h_raw * HUE_DIV[diff as usize] + HSV_ROUND) >> HSV_SHIFT;
    if h < 0 {
        h += 180;
    }

    [h as u8, s as u8, v as u8]
}

/// Fixed-point BT.601 luma.
pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14) as u8
}

/// 形态学结构元素
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    anchor: (usize, usize),
    cells: Vec<bool>,
}

impl Kernel {
    /// Elliptical structuring element inscribed in a `width x height` box,
    /// anchored at its center.
    pub fn ellipse(width: usize, height: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 || width > MAX_KERNEL_SIDE || height > MAX_KERNEL_SIDE {
            return Err(ConfigError::InvalidKernel { width, height });
        }

        let r = (height / 2) as i64;
        let c = (width / 2) as i64;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut cells = vec![false; width * height];
        for i in 0..height {
            let dy = i as i64 - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
            let j1 = (c - dx).max(0) as usize;
            let j2 = ((c + dx + 1) as usize).min(width);
            for cell in &mut cells[i * width + j1..i * width + j2] {
                *cell = true;
            }
        }

        Ok(Self {
            width,
            height,
            anchor: (width / 2, height / 2),
            cells,
        })
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x]
    }

    /// Offsets (dx, dy) relative to the anchor of every set cell.
    fn offsets(&self) -> Vec<(isize, isize)> {
        let (ax, ay) = (self.anchor.0 as isize, self.anchor.1 as isize);
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_set(x, y))
            .map(|(x, y)| (x as isize - ax, y as isize - ay))
            .collect()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self {
            width: 2,
            height: 2,
            anchor: (1, 1),
            cells: vec![false, true, true, true],
        }
    }
}

/// Max-filter over the kernel footprint. Neighbours outside the mask are ignored.
pub fn dilate(mask: &[u8], width: usize, height: usize, kernel: &Kernel) -> Vec<u8> {
    let offsets = kernel.offsets();
    let mut out = vec![0u8; mask.len()];

    for y in 0..height {
        for x in 0..width {
            let mut best = 0u8;
            for &(dx, dy) in &offsets {
                let sx = x as isize + dx;
                let sy = y as isize + dy;
                if sx < 0 || sy < 0 || sx >= width as isize || sy >= height as isize {
                    continue;
                }
                best = best.max(mask[sy as usize * width + sx as usize]);
                if best == MASK_ON {
                    break;
                }
            }
            out[y * width + x] = best;
        }
    }

    out
}

/// 信号检测器 - 纯函数：同一区域总是得到同一分数
pub struct SignalDetector {
    band: SignalBand,
    kernel: Kernel,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl SignalDetector {
    pub fn new(band: SignalBand, kernel: Kernel) -> Result<Self, ConfigError> {
        band.validate()?;
        Ok(Self {
            band,
            kernel,
            pool: None,
        })
    }

    /// Row-parallel masking on a dedicated pool. `0` means one thread per core,
    /// `1` keeps everything on the calling thread.
    pub fn with_workers(mut self, workers: usize) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        if workers <= 1 {
            self.pool = None;
            return self;
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("flashscan-mask-{i}"))
            .build()
        {
            Ok(pool) => {
                debug!("Using {} threads for masking", workers);
                self.pool = Some(Arc::new(pool));
            }
            Err(e) => {
                warn!("⚠️ Failed to build masking pool, staying sequential: {}", e);
                self.pool = None;
            }
        }
        self
    }

    pub fn band(&self) -> &SignalBand {
        &self.band
    }

    pub fn mask(&self, region: &Region) -> Vec<u8> {
        let w = region.width as usize;
        let mut mask = vec![0u8; region.pixel_count()];
        if mask.is_empty() {
            return mask;
        }

        let band = &self.band;
        let fill = |(row_mask, row_px): (&mut [u8], &[u8])| {
            for (m, px) in row_mask.iter_mut().zip(row_px.chunks_exact(3)) {
                if band.contains(px) {
                    *m = MASK_ON;
                }
            }
        };

        match &self.pool {
            Some(pool) => pool.install(|| {
                mask.par_chunks_mut(w)
                    .zip(region.data.par_chunks(w * 3))
                    .for_each(fill)
            }),
            None => mask
                .chunks_mut(w)
                .zip(region.data.chunks(w * 3))
                .for_each(fill),
        }

        mask
    }

    /// Normalized intensity in [0, 255].
    pub fn score(&self, region: &Region) -> f64 {
        let area = region.pixel_count();
        if area == 0 {
            return 0.0;
        }

        let mask = self.mask(region);
        let dilated = dilate(&mask, region.width as usize, region.height as usize, &self.kernel);
        let sum: u64 = dilated.iter().map(|&v| v as u64).sum();

        sum as f64 / area as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVE_YELLOW: [u8; 3] = [255, 200, 0];

    fn solid_region(width: u32, height: u32, rgb: [u8; 3]) -> Region {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Region {
            width,
            height,
            data,
        }
    }

    fn set(region: &mut Region, x: u32, y: u32, rgb: [u8; 3]) {
        let idx = ((y * region.width + x) * 3) as usize;
        region.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    fn detector() -> SignalDetector {
        SignalDetector::new(SignalBand::default(), Kernel::default()).unwrap()
    }

    #[test]
    fn test_hsv_conversion() {
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(255, 255, 255), [0, 0, 255]);
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(255, 255, 0), [30, 255, 255]);
        assert_eq!(rgb_to_hsv(255, 0, 255), [150, 255, 255]);
        assert_eq!(rgb_to_hsv(255, 200, 0), [24, 255, 255]);
        assert_eq!(rgb_to_hsv(128, 64, 64), [0, 128, 128]);
    }

    #[test]
    fn test_hsv_fixed_point_rounding_at_band_edge() {
        // float rounding would give hue 41 here
        assert_eq!(rgb_to_hsv(130, 200, 0), [40, 255, 200]);
        assert!(SignalBand::default().contains(&[130, 200, 0]));

        assert_eq!(rgb_to_hsv(200, 200, 1), [30, 254, 200]);
        assert_eq!(rgb_to_hsv(10, 5, 7), [168, 128, 10]);
    }

    #[test]
    fn test_luma_conversion() {
        assert_eq!(rgb_to_luma(0, 0, 0), 0);
        assert_eq!(rgb_to_luma(255, 255, 255), 255);
        assert_eq!(rgb_to_luma(255, 0, 0), 76);
    }

    #[test]
    fn test_band_contains() {
        let band = SignalBand::default();
        assert!(band.contains(&SAVE_YELLOW));
        assert!(!band.contains(&[255, 0, 0]));
        assert!(!band.contains(&[255, 255, 255]));
        assert!(!band.contains(&[120, 96, 0]));

        let luma = SignalBand::luma(230);
        assert!(luma.contains(&[255, 255, 255]));
        assert!(!luma.contains(&[230, 230, 230]));
        assert!(!luma.contains(&SAVE_YELLOW));
    }

    #[test]
    fn test_luma_band_uses_swapped_weights() {
        let band = SignalBand::luma(70);
        // blue carries the 0.299 weight, red the 0.114 one
        assert!(band.contains(&[0, 0, 255]));
        assert!(!band.contains(&[255, 0, 0]));
    }

    #[test]
    fn test_band_validation() {
        assert!(SignalBand::default().validate().is_ok());
        let inverted = SignalBand::Hsv {
            hue: [40, 20],
            saturation: [200, 255],
            value: [200, 255],
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::InvalidBand(_))));
        let wrapped = SignalBand::Hsv {
            hue: [20, 200],
            saturation: [0, 255],
            value: [0, 255],
        };
        assert!(wrapped.validate().is_err());
    }

    #[test]
    fn test_ellipse_kernel_shapes() {
        let k = Kernel::ellipse(2, 2).unwrap();
        assert_eq!(k, Kernel::default());

        let k = Kernel::ellipse(3, 3).unwrap();
        let expected = [
            false, true, false, //
            true, true, true, //
            false, true, false,
        ];
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(k.is_set(x, y), expected[y * 3 + x], "cell ({x}, {y})");
            }
        }

        let k = Kernel::ellipse(1, 1).unwrap();
        assert!(k.is_set(0, 0));

        assert!(Kernel::ellipse(0, 2).is_err());
        assert!(Kernel::ellipse(MAX_KERNEL_SIDE, MAX_KERNEL_SIDE).is_ok());
        assert!(matches!(
            Kernel::ellipse(100_000, 100_000),
            Err(ConfigError::InvalidKernel {
                width: 100_000,
                height: 100_000
            })
        ));
    }

    #[test]
    fn test_dilate_closes_single_gap() {
        let mut mask = vec![MASK_ON; 16];
        mask[5] = 0;
        let out = dilate(&mask, 4, 4, &Kernel::default());
        assert!(out.iter().all(|&v| v == MASK_ON));
    }

    #[test]
    fn test_dilate_spreads_right_and_down() {
        let mut mask = vec![0u8; 9];
        mask[4] = MASK_ON;
        let out = dilate(&mask, 3, 3, &Kernel::default());
        let lit: Vec<usize> = (0..9).filter(|&i| out[i] == MASK_ON).collect();
        assert_eq!(lit, vec![4, 5, 7]);
    }

    #[test]
    fn test_score_saturated_region() {
        let region = solid_region(4, 4, SAVE_YELLOW);
        let score = detector().score(&region);
        assert_eq!(score, 255.0);
        assert!(score >= 250.0);
    }

    #[test]
    fn test_score_empty_signal() {
        assert_eq!(detector().score(&solid_region(8, 3, [0, 0, 0])), 0.0);
        assert_eq!(detector().score(&solid_region(8, 3, [0, 0, 255])), 0.0);
    }

    #[test]
    fn test_isolated_gaps_are_closed() {
        let mut region = solid_region(16, 16, SAVE_YELLOW);
        for &(x, y) in &[(3, 2), (10, 5), (1, 12), (14, 14), (7, 0), (0, 9)] {
            set(&mut region, x, y, [0, 0, 0]);
        }
        assert_eq!(detector().score(&region), 255.0);
    }

    #[test]
    fn test_origin_gap_survives_dilation() {
        let mut region = solid_region(4, 4, SAVE_YELLOW);
        set(&mut region, 0, 0, [0, 0, 0]);
        let score = detector().score(&region);
        assert_eq!(score, 255.0 * 15.0 / 16.0);
        assert!(score < 250.0);
    }

    #[test]
    fn test_partial_region_score() {
        let mut region = solid_region(10, 10, [0, 0, 0]);
        for y in 0..10 {
            for x in 0..4 {
                set(&mut region, x, y, SAVE_YELLOW);
            }
        }
        // column 4 picks up the left neighbour through dilation
        assert_eq!(detector().score(&region), 255.0 * 50.0 / 100.0);
    }

    #[test]
    fn test_parallel_mask_matches_sequential() {
        let mut region = solid_region(33, 17, [10, 10, 10]);
        for i in 0..(33 * 17) {
            if i % 3 == 0 {
                set(&mut region, (i % 33) as u32, (i / 33) as u32, SAVE_YELLOW);
            }
        }
        let sequential = detector();
        let parallel = detector().with_workers(4);

        assert_eq!(sequential.mask(&region), parallel.mask(&region));
        assert_eq!(sequential.score(&region), parallel.score(&region));
    }

    #[test]
    fn test_band_from_toml() {
        let band: SignalBand = toml::from_str("mode = \"hsv\"\nhue = [15, 45]").unwrap();
        assert_eq!(
            band,
            SignalBand::Hsv {
                hue: [15, 45],
                saturation: [200, 255],
                value: [200, 255],
            }
        );

        let band: SignalBand = toml::from_str("mode = \"luma\"").unwrap();
        assert_eq!(band, SignalBand::luma(230));
    }
}
