use crate::pipeline::domain::{CanonicalAnalysis, ConcernKind, Severity, SkinType};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_PROVIDER_CONFIDENCE: f32 = 0.75;

pub const BASELINE_RECOMMENDATIONS: [&str; 3] = [
    "Gentle cleanser morning and night",
    "Daily moisturizer suited to your skin type",
    "Broad-spectrum sunscreen SPF 30 or higher",
];

const CONCERN_SYNONYMS: &[(&str, ConcernKind)] = &[
    ("pimple", ConcernKind::Acne),
    ("pimples", ConcernKind::Acne),
    ("breakout", ConcernKind::Acne),
    ("breakouts", ConcernKind::Acne),
    ("blemishes", ConcernKind::Acne),
    ("acne_vulgaris", ConcernKind::Acne),
    ("wrinkle", ConcernKind::Wrinkles),
    ("deep_wrinkles", ConcernKind::Wrinkles),
    ("fine_line", ConcernKind::FineLines),
    ("lines", ConcernKind::FineLines),
    ("dark_spot", ConcernKind::DarkSpots),
    ("spots", ConcernKind::DarkSpots),
    ("age_spots", ConcernKind::DarkSpots),
    ("sun_spots", ConcernKind::DarkSpots),
    ("pigmentation", ConcernKind::Hyperpigmentation),
    ("uneven_skin_tone", ConcernKind::Hyperpigmentation),
    ("uneven_tone", ConcernKind::Hyperpigmentation),
    ("melasma", ConcernKind::Hyperpigmentation),
    ("discoloration", ConcernKind::Hyperpigmentation),
    ("rosacea", ConcernKind::Redness),
    ("erythema", ConcernKind::Redness),
    ("irritation", ConcernKind::Redness),
    ("inflammation", ConcernKind::Redness),
    ("pore", ConcernKind::Pores),
    ("enlarged_pores", ConcernKind::Pores),
    ("large_pores", ConcernKind::Pores),
    ("roughness", ConcernKind::Texture),
    ("rough_texture", ConcernKind::Texture),
    ("uneven_texture", ConcernKind::Texture),
    ("dark_circle", ConcernKind::DarkCircles),
    ("under_eye_circles", ConcernKind::DarkCircles),
    ("eye_bags", ConcernKind::DarkCircles),
    ("dryness", ConcernKind::Dehydration),
    ("dehydrated", ConcernKind::Dehydration),
];

const SKIN_TYPE_SYNONYMS: &[(&str, SkinType)] = &[
    ("normal", SkinType::Normal),
    ("balanced", SkinType::Normal),
    ("oily", SkinType::Oily),
    ("greasy", SkinType::Oily),
    ("dry", SkinType::Dry),
    ("combination", SkinType::Combination),
    ("combo", SkinType::Combination),
    ("mixed", SkinType::Combination),
    ("sensitive", SkinType::Sensitive),
    ("reactive", SkinType::Sensitive),
];

const RECOMMENDATION_FIELDS: [&str; 5] = ["title", "name", "text", "recommendation", "product"];

const CONCERN_FIELDS: [&str; 3] = ["name", "label", "concern"];

/// Loosely-typed provider payload, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProviderAnalysis {
    #[serde(alias = "skinType")]
    pub skin_type: Option<String>,
    /// A delimited string, or a list of strings or `{name | label | concern}` objects.
    pub concerns: Value,
    #[serde(alias = "severities", alias = "scores")]
    pub severity: IndexMap<String, Value>,
    pub recommendations: Value,
    /// Number or numeric string.
    pub confidence: Value,
}

/// Lowercase, collapse every non-alphabetic run to one underscore, trim.
pub fn normalize_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    let mut pending_separator = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    key
}

/// Maps provider vocabularies onto the canonical schema. Never fails: unknown
/// terms are dropped and gaps are filled with defaults.
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer;

impl ResultNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize_concern(&self, text: &str) -> Option<ConcernKind> {
        let key = normalize_key(text);
        ConcernKind::from_key(&key).or_else(|| {
            CONCERN_SYNONYMS
                .iter()
                .find(|(synonym, _)| *synonym == key)
                .map(|(_, kind)| *kind)
        })
    }

    pub fn normalize_concerns<S: AsRef<str>>(&self, terms: &[S]) -> IndexSet<ConcernKind> {
        let mut concerns = IndexSet::new();
        for term in terms {
            match self.normalize_concern(term.as_ref()) {
                Some(kind) => {
                    concerns.insert(kind);
                }
                None => debug!("Dropping unrecognized concern '{}'", term.as_ref()),
            }
        }
        concerns
    }

    /// Concern terms from any of the payload shapes providers use. Entries
    /// that carry no term are skipped.
    pub fn normalize_concern_value(&self, raw: &Value) -> IndexSet<ConcernKind> {
        let mut terms: Vec<&str> = Vec::new();
        match raw {
            Value::String(text) => terms.extend(text.split([',', ';'])),
            Value::Array(entries) => {
                for entry in entries {
                    match entry {
                        Value::String(text) => terms.push(text),
                        Value::Object(fields) => {
                            if let Some(text) = CONCERN_FIELDS
                                .iter()
                                .find_map(|field| fields.get(*field).and_then(Value::as_str))
                            {
                                terms.push(text);
                            }
                        }
                        other => debug!("Skipping concern entry {}", other),
                    }
                }
            }
            Value::Null => {}
            other => debug!("Ignoring concerns of unexpected shape: {}", other),
        }
        terms.retain(|term| !term.trim().is_empty());
        self.normalize_concerns(&terms)
    }

    /// Clamp every recognized score into [1, 10] and default missing kinds to 5.
    /// When a kind appears more than once the worst score is kept.
    pub fn normalize_severity(
        &self,
        raw: &IndexMap<String, Value>,
    ) -> IndexMap<ConcernKind, Severity> {
        let mut partial: IndexMap<ConcernKind, Severity> = IndexMap::new();
        for (term, value) in raw {
            let Some(kind) = self.normalize_concern(term) else {
                continue;
            };
            let Some(score) = numeric(value) else {
                debug!("Ignoring non-numeric severity for '{}': {}", term, value);
                continue;
            };
            let severity = Severity::from_score(score);
            partial
                .entry(kind)
                .and_modify(|existing| *existing = (*existing).max(severity))
                .or_insert(severity);
        }
        self.complete_severity(&partial)
    }

    /// Complete map in canonical order, defaulting absent kinds to the midpoint.
    pub fn complete_severity(
        &self,
        partial: &IndexMap<ConcernKind, Severity>,
    ) -> IndexMap<ConcernKind, Severity> {
        ConcernKind::ALL
            .iter()
            .map(|kind| (*kind, partial.get(kind).copied().unwrap_or(Severity::MIDPOINT)))
            .collect()
    }

    pub fn normalize_recommendations(&self, raw: &Value) -> Vec<String> {
        let mut items: Vec<String> = Vec::new();
        let mut push = |text: &str| {
            let text = text.trim();
            if !text.is_empty() && !items.iter().any(|existing| existing == text) {
                items.push(text.to_string());
            }
        };

        match raw {
            Value::String(text) => push(text),
            Value::Array(entries) => {
                for entry in entries {
                    match entry {
                        Value::String(text) => push(text),
                        Value::Object(fields) => {
                            if let Some(text) = RECOMMENDATION_FIELDS
                                .iter()
                                .find_map(|field| fields.get(*field).and_then(Value::as_str))
                            {
                                push(text);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        if items.is_empty() {
            return baseline_recommendations();
        }
        items
    }

    pub fn normalize_skin_type(&self, raw: Option<&str>) -> SkinType {
        raw.map(normalize_key)
            .and_then(|key| {
                SKIN_TYPE_SYNONYMS
                    .iter()
                    .find(|(synonym, _)| key == *synonym || key.starts_with(&format!("{synonym}_")))
                    .map(|(_, skin_type)| *skin_type)
            })
            .unwrap_or_default()
    }

    /// Skin type named by a classifier label of the form "<type> skin".
    pub fn skin_type_label(&self, label: &str) -> Option<SkinType> {
        let key = normalize_key(label);
        let prefix = key.strip_suffix("_skin")?;
        SKIN_TYPE_SYNONYMS
            .iter()
            .find(|(synonym, _)| *synonym == prefix)
            .map(|(_, skin_type)| *skin_type)
    }

    pub fn normalize_confidence(&self, raw: Option<f64>) -> f32 {
        match raw {
            Some(value) if value.is_finite() => value.clamp(0.0, 1.0) as f32,
            _ => DEFAULT_PROVIDER_CONFIDENCE,
        }
    }

    /// Re-establish the canonical guarantees on an analysis built outside the
    /// normalizer: complete severity map, non-empty recommendations, confidence
    /// in [0, 1].
    pub fn conform(&self, mut analysis: CanonicalAnalysis) -> CanonicalAnalysis {
        analysis.severity = self.complete_severity(&analysis.severity);
        analysis
            .recommendations
            .retain(|recommendation| !recommendation.trim().is_empty());
        if analysis.recommendations.is_empty() {
            analysis.recommendations = baseline_recommendations();
        }
        analysis.confidence = self.normalize_confidence(Some(f64::from(analysis.confidence)));
        analysis
    }

    pub fn normalize(&self, raw: &RawProviderAnalysis) -> CanonicalAnalysis {
        let mut concerns = self.normalize_concern_value(&raw.concerns);
        let severity = self.normalize_severity(&raw.severity);

        // Kinds the provider scored but did not list still count as concerns
        // when they were explicitly scored above the midpoint.
        for term in raw.severity.keys() {
            if let Some(kind) = self.normalize_concern(term) {
                if severity[&kind] > Severity::MIDPOINT {
                    concerns.insert(kind);
                }
            }
        }

        CanonicalAnalysis {
            skin_type: self.normalize_skin_type(raw.skin_type.as_deref()),
            concerns,
            severity,
            recommendations: self.normalize_recommendations(&raw.recommendations),
            confidence: self.normalize_confidence(numeric(&raw.confidence)),
        }
    }
}

pub fn baseline_recommendations() -> Vec<String> {
    BASELINE_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
}

fn numeric(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_normalization_collapses_separators() {
        assert_eq!(normalize_key("  Fine-Lines!! "), "fine_lines");
        assert_eq!(normalize_key("Dark  Spots (mild)"), "dark_spots_mild");
        assert_eq!(normalize_key("acne2"), "acne");
        assert_eq!(normalize_key("123"), "");
    }

    #[test]
    fn synonyms_resolve_to_canonical_kinds() {
        let normalizer = ResultNormalizer::new();
        assert_eq!(
            normalizer.normalize_concern("Pigmentation"),
            Some(ConcernKind::Hyperpigmentation)
        );
        assert_eq!(normalizer.normalize_concern("fine line"), Some(ConcernKind::FineLines));
        assert_eq!(normalizer.normalize_concern("REDNESS"), Some(ConcernKind::Redness));
        assert_eq!(normalizer.normalize_concern("freckles of doom"), None);
    }

    #[test]
    fn unknown_terms_are_dropped_and_duplicates_removed() {
        let normalizer = ResultNormalizer::new();
        let concerns =
            normalizer.normalize_concerns(&["acne", "pimples", "unicorn", "Redness", "acne"]);
        assert_eq!(
            concerns.into_iter().collect::<Vec<_>>(),
            vec![ConcernKind::Acne, ConcernKind::Redness]
        );
    }

    #[test]
    fn normalizing_canonical_list_is_a_no_op() {
        let normalizer = ResultNormalizer::new();
        let canonical: Vec<&str> = ConcernKind::ALL.iter().map(|k| k.key()).collect();
        let once = normalizer.normalize_concerns(&canonical);
        let keys: Vec<&str> = once.iter().map(|k| k.key()).collect();
        let twice = normalizer.normalize_concerns(&keys);
        assert_eq!(once, twice);
        assert_eq!(once.len(), ConcernKind::ALL.len());
        assert!(once.iter().copied().eq(ConcernKind::ALL.iter().copied()));
    }

    #[test]
    fn severity_is_clamped_and_completed() {
        let normalizer = ResultNormalizer::new();
        let raw: IndexMap<String, Value> = [
            ("acne".to_string(), json!(14)),
            ("Redness".to_string(), json!(-2)),
            ("pores".to_string(), json!("7.4")),
            ("texture".to_string(), json!("rough")),
            ("bogus".to_string(), json!(9)),
        ]
        .into_iter()
        .collect();

        let severity = normalizer.normalize_severity(&raw);
        assert_eq!(severity.len(), ConcernKind::ALL.len());
        assert_eq!(severity[&ConcernKind::Acne].value(), 10);
        assert_eq!(severity[&ConcernKind::Redness].value(), 1);
        assert_eq!(severity[&ConcernKind::Pores].value(), 7);
        assert_eq!(severity[&ConcernKind::Texture], Severity::MIDPOINT);
        assert_eq!(severity[&ConcernKind::DarkCircles], Severity::MIDPOINT);
        assert!(severity.keys().copied().eq(ConcernKind::ALL.iter().copied()));
    }

    #[test]
    fn recommendations_accept_mixed_shapes() {
        let normalizer = ResultNormalizer::new();
        let recs = normalizer.normalize_recommendations(&json!([
            "Use retinol",
            {"title": "Vitamin C serum"},
            {"product": "Mineral sunscreen"},
            {"unrelated": true},
            42,
            "Use retinol"
        ]));
        assert_eq!(recs, vec!["Use retinol", "Vitamin C serum", "Mineral sunscreen"]);
    }

    #[test]
    fn empty_or_malformed_recommendations_fall_back_to_baseline() {
        let normalizer = ResultNormalizer::new();
        for raw in [json!(null), json!([]), json!({"oops": 1}), json!(["   "]), json!(3.5)] {
            let recs = normalizer.normalize_recommendations(&raw);
            assert_eq!(recs.len(), 3, "input {raw}");
            assert_eq!(recs, baseline_recommendations());
        }
    }

    #[test]
    fn skin_type_maps_free_text() {
        let normalizer = ResultNormalizer::new();
        assert_eq!(normalizer.normalize_skin_type(Some("Oily")), SkinType::Oily);
        assert_eq!(normalizer.normalize_skin_type(Some("greasy T-zone")), SkinType::Oily);
        assert_eq!(normalizer.normalize_skin_type(Some("Mixed")), SkinType::Combination);
        assert_eq!(normalizer.normalize_skin_type(Some("???")), SkinType::Normal);
        assert_eq!(normalizer.normalize_skin_type(None), SkinType::Normal);
    }

    #[test]
    fn full_payload_normalizes_to_complete_analysis() {
        let raw: RawProviderAnalysis = serde_json::from_value(json!({
            "skinType": "sensitive",
            "concerns": ["Rosacea", "fine-lines"],
            "severity": {"redness": 8, "fine_lines": 3.2, "dark spots": 7},
            "recommendations": null,
            "confidence": 1.7
        }))
        .unwrap();

        let analysis = ResultNormalizer::new().normalize(&raw);
        assert_eq!(analysis.skin_type, SkinType::Sensitive);
        assert!(analysis.is_complete());
        assert_eq!(
            analysis.concerns.iter().copied().collect::<Vec<_>>(),
            vec![ConcernKind::Redness, ConcernKind::FineLines, ConcernKind::DarkSpots]
        );
        assert_eq!(analysis.severity_of(ConcernKind::FineLines).value(), 3);
        assert_eq!(analysis.recommendations.len(), 3);
        assert_eq!(analysis.confidence, 1.0);
    }

    #[test]
    fn concerns_accept_every_payload_shape() {
        let normalizer = ResultNormalizer::new();
        let expected = vec![ConcernKind::Acne, ConcernKind::Redness];
        for raw in [
            json!("acne, redness"),
            json!("Acne; rosacea"),
            json!(["acne", null, "redness", 7]),
            json!([{"name": "acne", "severity": 7}, {"label": "Redness"}, {"score": 2}]),
            json!([{"concern": "pimples"}, "erythema"]),
        ] {
            let concerns = normalizer.normalize_concern_value(&raw);
            assert_eq!(concerns.into_iter().collect::<Vec<_>>(), expected, "input {raw}");
        }
        for raw in [json!(null), json!(12), json!({"acne": true}), json!(" , ")] {
            assert!(normalizer.normalize_concern_value(&raw).is_empty(), "input {raw}");
        }
    }

    #[test]
    fn loose_payload_shapes_deserialize() {
        let normalizer = ResultNormalizer::new();
        for payload in [
            json!({"concerns": [{"name": "acne", "severity": 7}]}),
            json!({"concerns": "acne, redness"}),
            json!({"concerns": ["acne", null]}),
        ] {
            let raw: RawProviderAnalysis = serde_json::from_value(payload.clone()).unwrap();
            let analysis = normalizer.normalize(&raw);
            assert!(analysis.concerns.contains(&ConcernKind::Acne), "payload {payload}");
            assert!(analysis.is_complete());
        }

        let raw: RawProviderAnalysis =
            serde_json::from_value(json!({"confidence": "0.8"})).unwrap();
        assert!((normalizer.normalize(&raw).confidence - 0.8).abs() < 1e-6);

        let raw: RawProviderAnalysis =
            serde_json::from_value(json!({"confidence": "high"})).unwrap();
        assert_eq!(normalizer.normalize(&raw).confidence, DEFAULT_PROVIDER_CONFIDENCE);
    }

    #[test]
    fn skin_type_labels_need_a_known_prefix() {
        let normalizer = ResultNormalizer::new();
        assert_eq!(normalizer.skin_type_label("dry skin"), Some(SkinType::Dry));
        assert_eq!(normalizer.skin_type_label("Oily-Skin"), Some(SkinType::Oily));
        assert_eq!(normalizer.skin_type_label("skin"), None);
        assert_eq!(normalizer.skin_type_label("dry patches"), None);
        assert_eq!(normalizer.skin_type_label("flaky skin"), None);
        assert_eq!(normalizer.normalize_concern("dry skin"), None);
        assert_eq!(normalizer.normalize_concern("dryness"), Some(ConcernKind::Dehydration));
    }

    #[test]
    fn conform_repairs_sparse_analysis() {
        let sparse = CanonicalAnalysis {
            skin_type: SkinType::Oily,
            concerns: [ConcernKind::Acne].into_iter().collect(),
            severity: [(ConcernKind::Acne, Severity::from_score(8.0))].into_iter().collect(),
            recommendations: vec!["  ".to_string()],
            confidence: 3.0,
        };

        let analysis = ResultNormalizer::new().conform(sparse);
        assert!(analysis.is_complete());
        assert_eq!(analysis.severity_of(ConcernKind::Acne).value(), 8);
        assert_eq!(analysis.severity_of(ConcernKind::Pores), Severity::MIDPOINT);
        assert_eq!(analysis.recommendations, baseline_recommendations());
        assert_eq!(analysis.confidence, 1.0);

        let nan = CanonicalAnalysis {
            confidence: f32::NAN,
            ..analysis
        };
        assert_eq!(ResultNormalizer::new().conform(nan).confidence, DEFAULT_PROVIDER_CONFIDENCE);
    }

    #[test]
    fn missing_confidence_uses_default() {
        let analysis = ResultNormalizer::new().normalize(&RawProviderAnalysis::default());
        assert_eq!(analysis.confidence, DEFAULT_PROVIDER_CONFIDENCE);
        assert!(analysis.concerns.is_empty());
        assert!(analysis.is_complete());
    }
}
