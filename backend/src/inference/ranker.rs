use std::cmp::Ordering;

use shared::RankedLabel;

use super::labels::LabelSet;
use super::model::{Classifier, InferenceError};
use super::preprocess::ImageTensor;

pub const DEFAULT_TOP_K: usize = 10;

/// Runs the model and ranks its scores. The first entry is the prediction.
pub fn classify(
    model: &dyn Classifier,
    input: &ImageTensor,
    labels: &LabelSet,
    top_k: usize,
) -> Result<Vec<RankedLabel>, InferenceError> {
    let scores = model.predict(input)?;
    if scores.is_empty() {
        return Err(InferenceError::EmptyOutput);
    }
    if labels.len() != scores.len() {
        log::warn!(
            "Model emitted {} scores but {} labels are loaded",
            scores.len(),
            labels.len()
        );
    }
    Ok(rank(&scores, labels, top_k))
}

/// Top `top_k` entries by descending score. Equal scores keep index order and
/// NaN ranks below everything.
pub fn rank(scores: &[f32], labels: &LabelSet, top_k: usize) -> Vec<RankedLabel> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| descending(scores[a], scores[b]));

    indices
        .into_iter()
        .take(top_k)
        .map(|i| RankedLabel {
            label: labels.get(i).to_string(),
            confidence: scores[i] * 100.0,
        })
        .collect()
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::preprocess::{DEFAULT_INPUT_SIZE, preprocess, tests::leaf_png};
    use crate::inference::registry::tests::FixedScores;

    fn labels(n: usize) -> LabelSet {
        LabelSet::new((0..n).map(|i| format!("class_{i}")).collect())
    }

    fn probabilities(n: usize) -> Vec<f32> {
        // Deterministic but unordered, with a few ties.
        let raw: Vec<f32> = (0..n).map(|i| ((i * 37 + 11) % 17) as f32 + 1.0).collect();
        let total: f32 = raw.iter().sum();
        raw.into_iter().map(|v| v / total).collect()
    }

    #[test]
    fn returns_exactly_top_k_non_increasing() {
        for n in [10, 11, 17, 38] {
            let probs = probabilities(n);
            let ranked = rank(&probs, &labels(n), DEFAULT_TOP_K);

            assert_eq!(ranked.len(), 10);
            assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
            for entry in &ranked {
                let index: usize = entry.label["class_".len()..].parse().unwrap();
                assert_eq!(entry.confidence, probs[index] * 100.0);
                assert!((0.0..=100.0).contains(&entry.confidence));
            }
        }
    }

    #[test]
    fn ties_keep_index_order() {
        let ranked = rank(&[0.2, 0.3, 0.2, 0.3], &labels(4), 4);
        let order: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(order, ["class_1", "class_3", "class_0", "class_2"]);
    }

    #[test]
    fn fewer_classes_than_k() {
        let ranked = rank(&[0.1, 0.9], &labels(2), DEFAULT_TOP_K);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, "class_1");
    }

    #[test]
    fn indices_past_label_set_are_unknown() {
        let ranked = rank(&[0.1, 0.2, 0.7], &labels(2), 3);
        assert_eq!(ranked[0].label, "Unknown");
        assert_eq!(ranked[1].label, "class_1");
    }

    #[test]
    fn nan_sinks_to_the_bottom() {
        let ranked = rank(&[f32::NAN, 0.4, 0.6], &labels(3), 3);
        assert_eq!(ranked[0].label, "class_2");
        assert_eq!(ranked[2].label, "class_0");
    }

    #[test]
    fn classify_runs_the_model() {
        let input = preprocess(&leaf_png(32, 32), DEFAULT_INPUT_SIZE).unwrap();
        let model = FixedScores(vec![0.05, 0.9, 0.05]);
        let ranked = classify(&model, &input, &labels(3), DEFAULT_TOP_K).unwrap();
        assert_eq!(ranked[0].label, "class_1");
        assert!((ranked[0].confidence - 90.0).abs() < 1e-4);
    }

    #[test]
    fn classify_rejects_empty_output() {
        let input = preprocess(&leaf_png(8, 8), 8).unwrap();
        let err = classify(&FixedScores(vec![]), &input, &labels(0), DEFAULT_TOP_K).unwrap_err();
        assert!(matches!(err, InferenceError::EmptyOutput));
    }
}
