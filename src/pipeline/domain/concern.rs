use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracked skin-condition categories, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernKind {
    Acne,
    Wrinkles,
    FineLines,
    DarkSpots,
    Hyperpigmentation,
    Redness,
    Pores,
    Texture,
    DarkCircles,
    Dehydration,
}

impl ConcernKind {
    pub const ALL: [ConcernKind; 10] = [
        ConcernKind::Acne,
        ConcernKind::Wrinkles,
        ConcernKind::FineLines,
        ConcernKind::DarkSpots,
        ConcernKind::Hyperpigmentation,
        ConcernKind::Redness,
        ConcernKind::Pores,
        ConcernKind::Texture,
        ConcernKind::DarkCircles,
        ConcernKind::Dehydration,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ConcernKind::Acne => "acne",
            ConcernKind::Wrinkles => "wrinkles",
            ConcernKind::FineLines => "fine_lines",
            ConcernKind::DarkSpots => "dark_spots",
            ConcernKind::Hyperpigmentation => "hyperpigmentation",
            ConcernKind::Redness => "redness",
            ConcernKind::Pores => "pores",
            ConcernKind::Texture => "texture",
            ConcernKind::DarkCircles => "dark_circles",
            ConcernKind::Dehydration => "dehydration",
        }
    }

    /// Exact match against canonical keys only. Synonyms live in the normalizer.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.key() == key)
    }

    /// Targeted care suggestion appended after the baseline routine.
    pub fn care_hint(&self) -> &'static str {
        match self {
            ConcernKind::Acne => "Salicylic acid spot treatment for active breakouts",
            ConcernKind::Wrinkles => "Retinoid serum applied at night",
            ConcernKind::FineLines => "Hydrating peptide serum",
            ConcernKind::DarkSpots => "Vitamin C serum in the morning",
            ConcernKind::Hyperpigmentation => "Niacinamide or azelaic acid for uneven tone",
            ConcernKind::Redness => "Fragrance-free soothing serum with centella",
            ConcernKind::Pores => "Weekly clay mask and BHA exfoliant",
            ConcernKind::Texture => "Gentle AHA exfoliation twice a week",
            ConcernKind::DarkCircles => "Caffeine eye cream",
            ConcernKind::Dehydration => "Hyaluronic acid serum under moisturizer",
        }
    }
}

impl fmt::Display for ConcernKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    #[default]
    Normal,
    Oily,
    Dry,
    Combination,
    Sensitive,
}

impl SkinType {
    pub fn key(&self) -> &'static str {
        match self {
            SkinType::Normal => "normal",
            SkinType::Oily => "oily",
            SkinType::Dry => "dry",
            SkinType::Combination => "combination",
            SkinType::Sensitive => "sensitive",
        }
    }
}

/// Integer severity rating, 1 (mild) to 10 (severe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: Severity = Severity(1);
    pub const MAX: Severity = Severity(10);
    pub const MIDPOINT: Severity = Severity(5);

    /// Round and clamp an arbitrary score into range. NaN maps to the midpoint.
    pub fn from_score(score: f64) -> Self {
        if score.is_nan() {
            return Self::MIDPOINT;
        }
        Severity(score.round().clamp(1.0, 10.0) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::MIDPOINT
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=10).contains(&value) {
            Ok(Severity(value))
        } else {
            Err(format!("severity {value} is outside 1..=10"))
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcernScore {
    pub kind: ConcernKind,
    pub severity: Severity,
    pub confidence: f32,
}

impl ConcernScore {
    pub fn new(kind: ConcernKind, severity: Severity, confidence: f32) -> Self {
        Self {
            kind,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
