use std::cmp::Ordering;

/// A class label and its probability, as a percentage formatted with two
/// decimal places.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LabeledScore {
    /// Label for the class, or `None` if there is no label for its index.
    pub label: Option<String>,
    pub prob: String,
}

/// Return the `(index, score)` pairs of the `k` highest scores, highest first.
///
/// Scores are sorted in ascending order with a stable sort and the result is
/// reversed, so equal scores are returned in descending index order. NaN
/// values compare equal to everything.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    indexed.reverse();
    indexed.truncate(k);
    indexed
}

/// Return the 3 classes with the highest scores, highest first.
///
/// `scores` is typically the output of a softmax over class logits. Fewer
/// than 3 results are returned if there are fewer than 3 scores.
pub fn top_classes(scores: &[f32], labels: &[String]) -> Vec<LabeledScore> {
    top_k(scores, 3)
        .into_iter()
        .map(|(index, score)| LabeledScore {
            label: labels.get(index).cloned(),
            prob: format_percent(score),
        })
        .collect()
}

/// Format `score` as a percentage with two decimal places.
///
/// Values exactly halfway between two hundredths round away from zero,
/// rather than to even as `format!` does. A percentage can only be such a
/// tie if it is an odd multiple of 1/8, in which case multiplying it by 1000
/// is exact.
fn format_percent(score: f32) -> String {
    let percent = score as f64 * 100.;
    let eighths = percent.abs() * 8.;
    let is_tie = eighths.fract() == 0. && eighths % 2. == 1. && eighths < 1e12;
    if !is_tie {
        return format!("{:.2}", percent);
    }

    let thousandths = (percent.abs() * 1000.) as u64;
    let hundredths = (thousandths + 5) / 10;
    let sign = if percent < 0. { "-" } else { "" };
    format!("{}{}.{:02}", sign, hundredths / 100, hundredths % 100)
}

#[cfg(test)]
mod tests {
    use super::{format_percent, top_classes, top_k, LabeledScore};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn score(label: &str, prob: &str) -> LabeledScore {
        LabeledScore {
            label: Some(label.to_string()),
            prob: prob.to_string(),
        }
    }

    #[test]
    fn test_top_classes() {
        let result = top_classes(&[0.1, 0.7, 0.05, 0.15], &labels(&["a", "b", "c", "d"]));
        assert_eq!(
            result,
            [score("b", "70.00"), score("d", "15.00"), score("a", "10.00")]
        );
    }

    #[test]
    fn test_top_classes_rounding() {
        let result = top_classes(
            &[0.123456, 0.876543, 0.0001],
            &labels(&["x", "y", "z"]),
        );
        assert_eq!(
            result,
            [score("y", "87.65"), score("x", "12.35"), score("z", "0.01")]
        );

        // 3.125 and 9.375 are exactly halfway between two hundredths.
        let result = top_classes(&[0.03125, 0.5, 0.09375], &labels(&["a", "b", "c"]));
        assert_eq!(
            result,
            [score("b", "50.00"), score("c", "9.38"), score("a", "3.13")]
        );
    }

    #[test]
    fn test_format_percent() {
        struct Case {
            score: f32,
            expected: &'static str,
        }

        let cases = [
            Case {
                score: 0.03125,
                expected: "3.13",
            },
            Case {
                score: 0.09375,
                expected: "9.38",
            },
            Case {
                score: 0.125,
                expected: "12.50",
            },
            Case {
                score: 1.0,
                expected: "100.00",
            },
            Case {
                score: 0.0,
                expected: "0.00",
            },
            Case {
                score: -0.03125,
                expected: "-3.13",
            },
            Case {
                score: 0.123456,
                expected: "12.35",
            },
        ];

        for Case { score, expected } in cases {
            assert_eq!(format_percent(score), expected, "score {}", score);
        }
    }

    #[test]
    fn test_top_classes_missing_labels() {
        let result = top_classes(&[0.2, 0.3, 0.5], &labels(&["a"]));
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].label, None);
        assert_eq!(result[2], score("a", "20.00"));
    }

    #[test]
    fn test_top_classes_few_scores() {
        let result = top_classes(&[0.4, 0.6], &labels(&["a", "b"]));
        assert_eq!(result, [score("b", "60.00"), score("a", "40.00")]);
    }

    #[test]
    fn test_top_k_ties_reverse_index_order() {
        let result = top_k(&[0.25, 0.5, 0.25, 0.0], 3);
        assert_eq!(result, [(1, 0.5), (2, 0.25), (0, 0.25)]);
    }
}
