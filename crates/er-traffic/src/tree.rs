//! CART regression tree shared by both tree ensembles.
//!
//! Splits minimise the summed squared error of the two children.  Candidate
//! features per node are drawn from the caller's RNG when
//! `max_features < n_features`, so a forest gets decorrelated trees while a
//! seeded run stays reproducible.

use serde::{Deserialize, Serialize};

use er_core::SeededRng;

/// Growth limits for a single tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` = all.
    pub max_features: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum TreeNode {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// A fitted regression tree stored as a flat node arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Fit on the rows of `x` listed in `sample` (duplicates allowed, which
    /// is how bootstrap resamples are passed in).
    ///
    /// `sample` must be non-empty.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        sample: &[usize],
        params: &TreeParams,
        rng: &mut SeededRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let mut idx = sample.to_vec();
        tree.grow(x, y, &mut idx, 0, params, rng);
        tree
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], at: usize) -> usize {
            match &nodes[at] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        idx: &mut [usize],
        depth: usize,
        params: &TreeParams,
        rng: &mut SeededRng,
    ) -> usize {
        let at = self.nodes.len();
        let mean = idx.iter().map(|&i| y[i]).sum::<f64>() / idx.len() as f64;
        self.nodes.push(TreeNode::Leaf { value: mean });

        let min_leaf = params.min_samples_leaf.max(1);
        if depth >= params.max_depth || idx.len() < 2 * min_leaf {
            return at;
        }
        let Some(split) = best_split(x, y, idx, min_leaf, params.max_features, rng) else {
            return at;
        };

        // Partition in place: rows going left first.
        let mut mid = 0;
        for j in 0..idx.len() {
            if x[idx[j]][split.feature] <= split.threshold {
                idx.swap(mid, j);
                mid += 1;
            }
        }
        if mid == 0 || mid == idx.len() {
            return at;
        }

        let (left_idx, right_idx) = idx.split_at_mut(mid);
        let left = self.grow(x, y, left_idx, depth + 1, params, rng);
        let right = self.grow(x, y, right_idx, depth + 1, params, rng);
        self.nodes[at] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }
}

fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    idx: &[usize],
    min_leaf: usize,
    max_features: Option<usize>,
    rng: &mut SeededRng,
) -> Option<BestSplit> {
    let n_features = x[idx[0]].len();
    let mut features: Vec<usize> = (0..n_features).collect();
    let m = max_features.unwrap_or(n_features).clamp(1, n_features);
    if m < n_features {
        rng.shuffle(&mut features);
        features.truncate(m);
        features.sort_unstable();
    }

    let n = idx.len();
    let total: f64 = idx.iter().map(|&i| y[i]).sum();
    // Score = Σ_left² / n_left + Σ_right² / n_right; maximising it minimises
    // the children's squared error.  Must beat the unsplit parent.
    let parent_score = total * total / n as f64;
    let mut best: Option<BestSplit> = None;
    let mut order: Vec<usize> = idx.to_vec();

    for f in features {
        order.sort_by(|&a, &b| x[a][f].total_cmp(&x[b][f]));
        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += y[order[k]];
            let n_left = k + 1;
            if n_left < min_leaf || n - n_left < min_leaf {
                continue;
            }
            let here = x[order[k]][f];
            let next = x[order[k + 1]][f];
            if here == next {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64
                + right_sum * right_sum / (n - n_left) as f64;
            if score > parent_score + 1e-12 && best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(BestSplit { feature: f, threshold: 0.5 * (here + next), score });
            }
        }
    }
    best
}
