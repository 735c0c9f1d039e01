use crate::pipeline::domain::{CanonicalAnalysis, ConcernKind, Severity, SkinType};
use crate::pipeline::services::image::CvAnalysis;
use crate::pipeline::services::normalizer::{ResultNormalizer, baseline_recommendations};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

pub const FALLBACK_CONFIDENCE: f32 = 0.55;

const PRIMARY_CONCERN_LIMIT: usize = 4;
const PRIMARY_CONCERN_MIN: u8 = 6;

/// Builds a canonical analysis from CV measurements alone.
#[derive(Debug, Clone, Default)]
pub struct FallbackSynthesizer {
    normalizer: ResultNormalizer,
}

impl FallbackSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synthesize(&self, cv: &CvAnalysis) -> CanonicalAnalysis {
        let measured = cv.severity_scores();
        let severity = self.normalizer.complete_severity(&measured);

        let ranking_source = if measured.is_empty() { &severity } else { &measured };
        let concerns = primary_concerns(ranking_source);

        let mut recommendations = baseline_recommendations();
        recommendations.extend(concerns.iter().map(|kind| kind.care_hint().to_string()));

        let skin_type = infer_skin_type(
            cv.redness_severity(),
            cv.pore_severity(),
            cv.texture_roughness(),
        );
        debug!(
            "Synthesized {:?} skin with {} primary concerns from CV output",
            skin_type,
            concerns.len()
        );

        CanonicalAnalysis {
            skin_type,
            concerns,
            severity,
            recommendations,
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

/// Ordered rules; the first match wins.
pub fn infer_skin_type(redness: Severity, pores: Severity, roughness: Severity) -> SkinType {
    let (redness, pores, roughness) = (redness.value(), pores.value(), roughness.value());
    if redness >= 7 {
        SkinType::Sensitive
    } else if pores >= 7 && roughness <= 5 {
        SkinType::Oily
    } else if roughness >= 7 && pores <= 4 {
        SkinType::Dry
    } else if pores.abs_diff(roughness) >= 2 {
        SkinType::Combination
    } else {
        SkinType::Normal
    }
}

/// Up to four concerns at severity 6 or above, worst first with ties in
/// canonical order. Without any, the single worst concern.
pub fn primary_concerns(scores: &IndexMap<ConcernKind, Severity>) -> IndexSet<ConcernKind> {
    let mut ranked: Vec<(ConcernKind, Severity)> =
        scores.iter().map(|(kind, severity)| (*kind, *severity)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let primary: IndexSet<ConcernKind> = ranked
        .iter()
        .filter(|(_, severity)| severity.value() >= PRIMARY_CONCERN_MIN)
        .take(PRIMARY_CONCERN_LIMIT)
        .map(|(kind, _)| *kind)
        .collect();

    if primary.is_empty() {
        return ranked.first().map(|(kind, _)| *kind).into_iter().collect();
    }
    primary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ImageSample;
    use crate::pipeline::services::image::CvPipeline;
    use crate::pipeline::services::normalizer::BASELINE_RECOMMENDATIONS;
    use image::{ImageBuffer, Rgb};

    fn sev(value: u8) -> Severity {
        Severity::from_score(value as f64)
    }

    #[test]
    fn skin_type_rules_apply_in_order() {
        assert_eq!(infer_skin_type(sev(8), sev(9), sev(2)), SkinType::Sensitive);
        assert_eq!(infer_skin_type(sev(3), sev(7), sev(5)), SkinType::Oily);
        assert_eq!(infer_skin_type(sev(3), sev(4), sev(7)), SkinType::Dry);
        assert_eq!(infer_skin_type(sev(3), sev(7), sev(6)), SkinType::Normal);
        assert_eq!(infer_skin_type(sev(3), sev(6), sev(3)), SkinType::Combination);
        assert_eq!(infer_skin_type(sev(5), sev(5), sev(5)), SkinType::Normal);
    }

    #[test]
    fn keeps_at_most_four_severe_concerns() {
        let scores: IndexMap<ConcernKind, Severity> = [
            (ConcernKind::Acne, sev(6)),
            (ConcernKind::Wrinkles, sev(9)),
            (ConcernKind::DarkSpots, sev(7)),
            (ConcernKind::Redness, sev(7)),
            (ConcernKind::Pores, sev(8)),
            (ConcernKind::Texture, sev(3)),
        ]
        .into_iter()
        .collect();

        let primary: Vec<_> = primary_concerns(&scores).into_iter().collect();
        assert_eq!(
            primary,
            vec![
                ConcernKind::Wrinkles,
                ConcernKind::Pores,
                ConcernKind::DarkSpots,
                ConcernKind::Redness
            ]
        );
    }

    #[test]
    fn mild_scores_keep_the_single_worst() {
        let scores: IndexMap<ConcernKind, Severity> = [
            (ConcernKind::Texture, sev(4)),
            (ConcernKind::Pores, sev(4)),
            (ConcernKind::Acne, sev(2)),
        ]
        .into_iter()
        .collect();
        let primary: Vec<_> = primary_concerns(&scores).into_iter().collect();
        assert_eq!(primary, vec![ConcernKind::Pores]);
    }

    #[tokio::test]
    async fn synthesizes_complete_analysis_from_cv() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(60, 60, Rgb([128, 128, 128])));
        let cv = CvPipeline::default().process(&sample).await.unwrap();
        let analysis = FallbackSynthesizer::new().synthesize(&cv);

        assert!(analysis.is_complete());
        assert!(!analysis.concerns.is_empty());
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(
            &analysis.recommendations[..3],
            &BASELINE_RECOMMENDATIONS.map(String::from)[..]
        );
        assert_eq!(
            analysis.recommendations.len(),
            BASELINE_RECOMMENDATIONS.len() + analysis.concerns.len()
        );
    }

    #[tokio::test]
    async fn only_measured_concerns_are_ranked() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(60, 60, Rgb([128, 128, 128])));
        let cv = CvPipeline::default().process(&sample).await.unwrap();
        let measured = cv.severity_scores();
        let analysis = FallbackSynthesizer::new().synthesize(&cv);

        assert!(!analysis.concerns.is_empty());
        for kind in &analysis.concerns {
            assert!(measured.contains_key(kind), "{kind} was not measured");
        }
        assert!(!analysis.concerns.contains(&ConcernKind::DarkCircles));
        assert!(!analysis.concerns.contains(&ConcernKind::Dehydration));
        assert_eq!(analysis.severity_of(ConcernKind::DarkCircles), Severity::MIDPOINT);
    }
}
