use super::{check_training_input, ForestParams, Regressor};
use crate::SolubilityError;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::*;

/// Values closer than this are treated as equal when placing thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A CART regression tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Best split found for a node.
struct Split {
    feature: usize,
    threshold: f64,
    /// `sum_left² / n_left + sum_right² / n_right`, which orders splits the same
    /// way as the weighted squared-error reduction.
    proxy: f64,
}

struct Grower<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [f64],
    params: &'a ForestParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    fn grow(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let index = self.nodes.len();
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().map(|&s| self.labels[s]).sum();
        let mean = sum / n;
        self.nodes.push(Node::Leaf(mean));

        let sum_sq: f64 = samples.iter().map(|&s| self.labels[s] * self.labels[s]).sum();
        let impurity = sum_sq / n - mean * mean;
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if samples.len() < self.params.min_samples_split
            || samples.len() < 2 * self.params.min_samples_leaf
            || depth_reached
            || impurity <= f64::EPSILON
        {
            return index;
        }

        let Some(split) = self.best_split(samples, sum) else {
            return index;
        };

        // Partition in place: samples going left first.
        let mut boundary = 0;
        for i in 0..samples.len() {
            if self.features[samples[i]][split.feature] <= split.threshold {
                samples.swap(i, boundary);
                boundary += 1;
            }
        }
        let (left, right) = samples.split_at_mut(boundary);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&mut self, samples: &[usize], total: f64) -> Option<Split> {
        let n_features = self.features[0].len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(&mut *self.rng);

        let mut best: Option<Split> = None;
        let mut sorted = samples.to_vec();
        for feature in order {
            let x = |s: usize| self.features[s][feature];
            sorted.sort_by(|&a, &b| x(a).total_cmp(&x(b)));
            if x(sorted[sorted.len() - 1]) <= x(sorted[0]) + FEATURE_THRESHOLD {
                continue;
            }

            let mut left_sum = 0.0;
            for i in 1..sorted.len() {
                left_sum += self.labels[sorted[i - 1]];
                let (lo, hi) = (x(sorted[i - 1]), x(sorted[i]));
                if hi <= lo + FEATURE_THRESHOLD {
                    continue;
                }
                let (n_left, n_right) = (i, sorted.len() - i);
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                let proxy = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if best.as_ref().map_or(true, |b| proxy > b.proxy) {
                    let mut threshold = (lo + hi) / 2.0;
                    if threshold == hi {
                        threshold = lo;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        proxy,
                    });
                }
            }
        }
        best
    }
}

impl DecisionTree {
    /// Grow a tree on `samples`, a list of row indices that may repeat.
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[f64],
        samples: &[usize],
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut grower = Grower {
            features,
            labels,
            params,
            rng,
            nodes: Vec::new(),
        };
        let mut samples = samples.to_vec();
        if !samples.is_empty() {
            grower.grow(&mut samples, 0);
        }
        Self { nodes: grower.nodes }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf(value)) => return *value,
                Some(&Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if row[feature] <= threshold { left } else { right };
                }
                None => return f64::NAN,
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }

    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[Node], index: usize) -> usize {
            match nodes[index] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + depth_of(nodes, left).max(depth_of(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            depth_of(&self.nodes, 0)
        }
    }
}

/// Bagged regression trees. Each tree sees a bootstrap sample drawn with its
/// own seed, and the seeds come from one master generator.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(features: &[Vec<f64>], labels: &[f64], params: &ForestParams) -> Result<Self, SolubilityError> {
        check_training_input(features, labels)?;
        if params.n_estimators == 0 {
            return Err(SolubilityError::Model("a forest needs at least one tree".to_owned()));
        }

        let n = features.len();
        let mut master = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let tree = DecisionTree::fit(features, labels, &samples, params, &mut rng);
                trace!("Tree {i}: {} nodes, depth {}", tree.n_nodes(), tree.depth());
                tree
            })
            .collect::<Vec<_>>();
        debug!("Grew {} trees", trees.len());
        Ok(Self { trees })
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Regressor for RandomForest {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}
