use super::config::ColorThresholds;
use super::core::{mean_and_std_dev, require_min_size, ImageRegion, SeverityReport, SkinAlgorithm};
use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinTone {
    VeryLight,
    Light,
    Medium,
    Tan,
    Deep,
}

impl SkinTone {
    fn from_value(v: f64) -> Self {
        if v > 0.8 {
            SkinTone::VeryLight
        } else if v > 0.6 {
            SkinTone::Light
        } else if v > 0.4 {
            SkinTone::Medium
        } else if v > 0.2 {
            SkinTone::Tan
        } else {
            SkinTone::Deep
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PigmentationKind {
    /// Darker than the surrounding skin.
    Hyper,
    /// Lighter than the surrounding skin.
    Hypo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PigmentationLevel {
    Mild,
    Marked,
}

#[derive(Debug, Clone, Serialize)]
pub struct PigmentedRegion {
    pub bounds: ImageRegion,
    pub kind: PigmentationKind,
    pub level: PigmentationLevel,
    pub deviation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorAnalysis {
    pub dominant_tone: SkinTone,
    pub mean_hue: f64,
    pub mean_saturation: f64,
    pub mean_value: f64,
    /// 0..=10, higher is more even.
    pub evenness: f64,
    pub pigmented_regions: Vec<PigmentedRegion>,
    pub pigmentation: Severity,
}

impl SeverityReport for ColorAnalysis {
    fn severity(&self) -> Severity {
        self.pigmentation
    }
}

/// HSV components with hue in degrees and saturation/value in [0, 1].
pub(crate) fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue, saturation, max)
}

/// Tone and pigmentation analyzer
pub struct ColorAnalyzer {
    thresholds: ColorThresholds,
}

impl ColorAnalyzer {
    pub fn new() -> Self {
        Self {
            thresholds: ColorThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ColorThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn classify(&self, deviation: f64) -> Option<(PigmentationKind, PigmentationLevel)> {
        let kind = if deviation < 0.0 {
            PigmentationKind::Hyper
        } else {
            PigmentationKind::Hypo
        };
        let magnitude = deviation.abs();
        if magnitude > self.thresholds.marked_deviation {
            Some((kind, PigmentationLevel::Marked))
        } else if magnitude > self.thresholds.mild_deviation {
            Some((kind, PigmentationLevel::Mild))
        } else {
            None
        }
    }

    /// Compare each window's mean brightness against the global mean.
    fn pigmented_windows(
        &self,
        brightness: &[f64],
        width: u32,
        height: u32,
        global_mean: f64,
    ) -> (Vec<PigmentedRegion>, usize) {
        let window = self.thresholds.window_size;
        let mut regions = Vec::new();
        let mut windows = 0;

        for wy in (0..height).step_by(window as usize) {
            for wx in (0..width).step_by(window as usize) {
                let w = window.min(width - wx);
                let h = window.min(height - wy);
                let mut sum = 0.0;
                for y in wy..wy + h {
                    let row = (y * width) as usize;
                    for x in wx..wx + w {
                        sum += brightness[row + x as usize];
                    }
                }
                windows += 1;

                let deviation = sum / (w * h) as f64 - global_mean;
                if let Some((kind, level)) = self.classify(deviation) {
                    regions.push(PigmentedRegion {
                        bounds: ImageRegion::new(wx, wy, w, h),
                        kind,
                        level,
                        deviation,
                    });
                }
            }
        }

        (regions, windows)
    }
}

impl Default for ColorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinAlgorithm for ColorAnalyzer {
    type Output = ColorAnalysis;

    fn name(&self) -> &'static str {
        "color_analyzer"
    }

    fn analyze(&self, sample: &ImageSample) -> Result<ColorAnalysis, AlgorithmError> {
        require_min_size(self.name(), sample, 1)?;
        let (width, height) = sample.dimensions();
        let n = sample.pixel_count() as f64;

        let (mut hue_sum, mut sat_sum, mut value_sum) = (0.0, 0.0, 0.0);
        for pixel in sample.rgb().pixels() {
            let [r, g, b] = pixel.0;
            let (h, s, v) = rgb_to_hsv(r, g, b);
            hue_sum += h;
            sat_sum += s;
            value_sum += v;
        }
        let mean_value = value_sum / n;

        let brightness = sample.brightness();
        let (global_mean, brightness_std) = mean_and_std_dev(&brightness);
        let evenness = (10.0 - brightness_std / 10.0).clamp(0.0, 10.0);

        let (pigmented_regions, windows) =
            self.pigmented_windows(&brightness, width, height, global_mean);
        let flagged_fraction = pigmented_regions.len() as f64 / windows.max(1) as f64;

        Ok(ColorAnalysis {
            dominant_tone: SkinTone::from_value(mean_value),
            mean_hue: hue_sum / n,
            mean_saturation: sat_sum / n,
            mean_value,
            evenness,
            pigmentation: Severity::from_score((10.0 - evenness) + flagged_fraction * 10.0),
            pigmented_regions,
        })
    }

    fn confidence(&self, _output: &ColorAnalysis) -> f32 {
        0.7
    }
}
