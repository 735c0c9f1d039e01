use serde::Deserialize;

/// Configuration for the CV pipeline with tunable parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CvAnalysisConfig {
    pub spots: SpotThresholds,
    pub texture: TextureThresholds,
    pub color: ColorThresholds,
    pub redness: RednessThresholds,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpotThresholds {
    pub darkness_threshold: u8,
    pub min_blob_px: usize,
    pub max_blob_px: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextureThresholds {
    pub window_size: u32,
    pub roughness_variance_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    pub window_size: u32,
    pub mild_deviation: f64,
    pub marked_deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RednessThresholds {
    pub min_red: u8,
    pub dominance_margin: u8,
    pub min_region_px: usize,
    pub inflammation_max_px: usize,
    pub inflammation_min_intensity: f64,
    pub diffuse_min_px: usize,
}

impl Default for CvAnalysisConfig {
    fn default() -> Self {
        Self {
            spots: SpotThresholds::default(),
            texture: TextureThresholds::default(),
            color: ColorThresholds::default(),
            redness: RednessThresholds::default(),
        }
    }
}

impl Default for SpotThresholds {
    fn default() -> Self {
        Self {
            darkness_threshold: 70,
            min_blob_px: 5,
            max_blob_px: 100,
        }
    }
}

impl Default for TextureThresholds {
    fn default() -> Self {
        Self {
            window_size: 20,
            roughness_variance_threshold: 100.0,
        }
    }
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            window_size: 10,
            mild_deviation: 15.0,
            marked_deviation: 30.0,
        }
    }
}

impl Default for RednessThresholds {
    fn default() -> Self {
        Self {
            min_red: 120,
            dominance_margin: 20,
            min_region_px: 5,
            inflammation_max_px: 50,
            inflammation_min_intensity: 60.0,
            diffuse_min_px: 500,
        }
    }
}

impl CvAnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.spots.min_blob_px == 0 || self.spots.min_blob_px > self.spots.max_blob_px {
            return Err("Spot blob size band must satisfy 0 < min <= max".to_string());
        }

        if self.texture.window_size < 3 {
            return Err("Texture window must be at least 3 pixels".to_string());
        }

        if self.color.window_size == 0 {
            return Err("Color window must be greater than 0".to_string());
        }

        if self.color.mild_deviation <= 0.0 || self.color.marked_deviation < self.color.mild_deviation {
            return Err("Color deviation thresholds must satisfy 0 < mild <= marked".to_string());
        }

        if self.redness.min_region_px == 0 {
            return Err("Redness minimum region size must be greater than 0".to_string());
        }

        Ok(())
    }
}
