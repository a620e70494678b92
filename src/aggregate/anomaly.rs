//! Isolation-forest outlier detection over the standardized model outputs

use crate::config::AnomalyConfig;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Average path length of an unsuccessful search in a binary tree of `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn build(rows: &[Vec<f64>], members: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || members.len() <= 1 {
        return Node::Leaf {
            size: members.len(),
        };
    }

    let dims = rows[members[0]].len();
    let ranges: Vec<(usize, f64, f64)> = (0..dims)
        .filter_map(|feature| {
            let (lo, hi) = members.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &m| {
                (acc.0.min(rows[m][feature]), acc.1.max(rows[m][feature]))
            });
            (hi > lo).then_some((feature, lo, hi))
        })
        .collect();

    if ranges.is_empty() {
        return Node::Leaf {
            size: members.len(),
        };
    }

    let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        members.into_iter().partition(|&m| rows[m][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(rows, left, depth + 1, limit, rng)),
        right: Box::new(build(rows, right, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, point: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if point[*feature] < *threshold {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}

/// Value below which the lowest `fraction` of `values` lie (linear interpolation)
fn percentile(values: &[f64], fraction: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| crate::utils::cmp_f64(*a, *b));
    let position = fraction * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Outlier verdict for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_anomaly: bool,
    /// Negated anomaly score: lower means more isolated
    pub score: f64,
}

/// Score every row; the lowest `contamination` share is flagged.
/// Deterministic for a given seed.
pub fn isolation_forest(rows: &[Vec<f64>], config: &AnomalyConfig) -> Vec<Verdict> {
    let n = rows.len();
    if n < 2 {
        return vec![
            Verdict {
                is_anomaly: false,
                score: 0.0,
            };
            n
        ];
    }

    let sample_size = config.max_samples.min(n);
    let height_limit = (sample_size as f64).log2().ceil() as usize;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let forest: Vec<Node> = (0..config.trees)
        .map(|_| {
            let members = sample(&mut rng, n, sample_size).into_vec();
            build(rows, members, 0, height_limit, &mut rng)
        })
        .collect();

    let normalizer = average_path_length(sample_size);
    let scores: Vec<f64> = rows
        .iter()
        .map(|row| {
            let mean_depth = forest
                .iter()
                .map(|tree| path_length(tree, row, 0))
                .sum::<f64>()
                / forest.len() as f64;
            -(2.0_f64.powf(-mean_depth / normalizer))
        })
        .collect();

    let threshold = percentile(&scores, config.contamination);
    scores
        .into_iter()
        .map(|score| Verdict {
            is_anomaly: score < threshold,
            score,
        })
        .collect()
}
