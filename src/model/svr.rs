use super::{check_training_input, Gamma, Regressor, SvrParams};
use crate::SolubilityError;
use tracing::*;

const TAU: f64 = 1e-12;

fn rbf(gamma: f64, a: &[f64], b: &[f64]) -> f64 {
    let distance: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * distance).exp()
}

/// Resolve the kernel width against the training matrix.
pub fn resolve_gamma(gamma: Gamma, features: &[Vec<f64>]) -> f64 {
    let n_features = features.first().map_or(1, Vec::len).max(1) as f64;
    match gamma {
        Gamma::Value(v) => v,
        Gamma::Auto => 1.0 / n_features,
        Gamma::Scale => {
            let values: Vec<f64> = features.iter().flatten().copied().collect();
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            if variance > 0.0 {
                1.0 / (n_features * variance)
            } else {
                1.0
            }
        }
    }
}

/// ε-insensitive support-vector regression with an RBF kernel.
///
/// Solved in the dual with SMO over `2l` variables: `alpha[..l]` pair with
/// `y = +1` and `alpha[l..]` with `y = -1`. Working pairs are chosen with the
/// second-order rule, and training stops once the maximal KKT violation drops
/// below `tolerance`.
#[derive(Debug, Clone)]
pub struct Svr {
    support: Vec<Vec<f64>>,
    coefficients: Vec<f64>,
    rho: f64,
    gamma: f64,
}

struct Solver<'a> {
    kernel: &'a [Vec<f64>],
    l: usize,
    c: f64,
    y: Vec<f64>,
    alpha: Vec<f64>,
    gradient: Vec<f64>,
}

impl Solver<'_> {
    /// `Q[i][j] = y_i y_j K(x_i, x_j)` over the doubled index space.
    fn q(&self, i: usize, j: usize) -> f64 {
        self.y[i] * self.y[j] * self.kernel[i % self.l][j % self.l]
    }

    fn qd(&self, i: usize) -> f64 {
        self.kernel[i % self.l][i % self.l]
    }

    fn at_upper(&self, t: usize) -> bool {
        self.alpha[t] >= self.c
    }

    fn at_lower(&self, t: usize) -> bool {
        self.alpha[t] <= 0.0
    }

    /// Pick the maximal-violating `i` and the `j` giving the largest decrease
    /// of the objective, or `None` when the KKT conditions hold within `tolerance`.
    fn select_working_set(&self, tolerance: f64) -> Option<(usize, usize)> {
        let mut g_max = f64::NEG_INFINITY;
        let mut i = None;
        for t in 0..self.alpha.len() {
            let violation = if self.y[t] > 0.0 {
                (!self.at_upper(t)).then(|| -self.gradient[t])
            } else {
                (!self.at_lower(t)).then(|| self.gradient[t])
            };
            if let Some(v) = violation {
                if v >= g_max {
                    g_max = v;
                    i = Some(t);
                }
            }
        }
        let i = i?;

        let mut g_max2 = f64::NEG_INFINITY;
        let mut j = None;
        let mut best_decrease = f64::INFINITY;
        for t in 0..self.alpha.len() {
            let candidate = if self.y[t] > 0.0 {
                (!self.at_lower(t)).then(|| self.gradient[t])
            } else {
                (!self.at_upper(t)).then(|| -self.gradient[t])
            };
            let Some(v) = candidate else { continue };
            g_max2 = g_max2.max(v);

            let grad_diff = g_max + v;
            if grad_diff > 0.0 {
                let quad = self.qd(i) + self.qd(t) - 2.0 * self.kernel[i % self.l][t % self.l];
                let decrease = -(grad_diff * grad_diff) / if quad > 0.0 { quad } else { TAU };
                if decrease <= best_decrease {
                    best_decrease = decrease;
                    j = Some(t);
                }
            }
        }

        if g_max + g_max2 < tolerance {
            return None;
        }
        j.map(|j| (i, j))
    }

    fn update(&mut self, i: usize, j: usize) {
        let c = self.c;
        let (old_i, old_j) = (self.alpha[i], self.alpha[j]);
        let (mut ai, mut aj) = (old_i, old_j);

        if self.y[i] != self.y[j] {
            let quad = self.qd(i) + self.qd(j) + 2.0 * self.q(i, j);
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (-self.gradient[i] - self.gradient[j]) / quad;
            let diff = ai - aj;
            ai += delta;
            aj += delta;
            if diff > 0.0 {
                if aj < 0.0 {
                    aj = 0.0;
                    ai = diff;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = -diff;
            }
            if diff > 0.0 {
                if ai > c {
                    ai = c;
                    aj = c - diff;
                }
            } else if aj > c {
                aj = c;
                ai = c + diff;
            }
        } else {
            let quad = self.qd(i) + self.qd(j) - 2.0 * self.q(i, j);
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (self.gradient[i] - self.gradient[j]) / quad;
            let sum = ai + aj;
            ai -= delta;
            aj += delta;
            if sum > c {
                if ai > c {
                    ai = c;
                    aj = sum - c;
                }
            } else if aj < 0.0 {
                aj = 0.0;
                ai = sum;
            }
            if sum > c {
                if aj > c {
                    aj = c;
                    ai = sum - c;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = sum;
            }
        }

        self.alpha[i] = ai;
        self.alpha[j] = aj;
        let (delta_i, delta_j) = (ai - old_i, aj - old_j);
        for t in 0..self.alpha.len() {
            self.gradient[t] += self.q(i, t) * delta_i + self.q(j, t) * delta_j;
        }
    }

    /// The offset: the mean of `y·G` over free variables, or the middle of the
    /// feasible interval when every variable sits at a bound.
    fn rho(&self) -> f64 {
        let (mut upper, mut lower) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut free, mut free_sum) = (0usize, 0.0);
        for t in 0..self.alpha.len() {
            let yg = self.y[t] * self.gradient[t];
            let positive = self.y[t] > 0.0;
            if self.at_upper(t) {
                if positive {
                    lower = lower.max(yg);
                } else {
                    upper = upper.min(yg);
                }
            } else if self.at_lower(t) {
                if positive {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else {
                free += 1;
                free_sum += yg;
            }
        }
        if free > 0 {
            free_sum / free as f64
        } else {
            (upper + lower) / 2.0
        }
    }
}

impl Svr {
    pub fn fit(features: &[Vec<f64>], labels: &[f64], params: &SvrParams) -> Result<Self, SolubilityError> {
        check_training_input(features, labels)?;
        if params.c <= 0.0 || params.epsilon < 0.0 {
            return Err(SolubilityError::Model(format!(
                "SVR needs C > 0 and epsilon >= 0, got C = {} and epsilon = {}",
                params.c, params.epsilon
            )));
        }

        let gamma = resolve_gamma(params.gamma, features);
        let l = features.len();
        let kernel: Vec<Vec<f64>> = features
            .iter()
            .map(|a| features.iter().map(|b| rbf(gamma, a, b)).collect())
            .collect();

        let y: Vec<f64> = (0..2 * l).map(|t| if t < l { 1.0 } else { -1.0 }).collect();
        // With every alpha at zero the gradient is the linear term.
        let gradient: Vec<f64> = (0..2 * l)
            .map(|t| {
                if t < l {
                    params.epsilon - labels[t]
                } else {
                    params.epsilon + labels[t - l]
                }
            })
            .collect();
        let mut solver = Solver {
            kernel: &kernel,
            l,
            c: params.c,
            y,
            alpha: vec![0.0; 2 * l],
            gradient,
        };

        let mut iterations = 0;
        while let Some((i, j)) = solver.select_working_set(params.tolerance) {
            if iterations >= params.max_iterations {
                warn!("SVR solver stopped after {iterations} iterations without converging");
                break;
            }
            solver.update(i, j);
            iterations += 1;
        }
        let rho = solver.rho();

        let mut support = Vec::new();
        let mut coefficients = Vec::new();
        for (i, row) in features.iter().enumerate() {
            let beta = solver.alpha[i] - solver.alpha[i + l];
            if beta != 0.0 {
                support.push(row.clone());
                coefficients.push(beta);
            }
        }
        debug!(
            "SVR converged in {iterations} iterations: {} support vectors, gamma {gamma}, rho {rho}",
            support.len()
        );

        Ok(Self {
            support,
            coefficients,
            rho,
            gamma,
        })
    }

    pub fn n_support(&self) -> usize {
        self.support.len()
    }
}

impl Regressor for Svr {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self
            .support
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, beta)| beta * rbf(self.gamma, sv, row))
            .sum();
        sum - self.rho
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gamma() {
        let features = vec![vec![0.0, 2.0], vec![2.0, 0.0]];
        // Elements 0, 2, 2, 0: variance 1.
        assert_abs_diff_eq!(resolve_gamma(Gamma::Scale, &features), 0.5);
        assert_abs_diff_eq!(resolve_gamma(Gamma::Auto, &features), 0.5);
        assert_abs_diff_eq!(resolve_gamma(Gamma::Value(3.0), &features), 3.0);
        assert_abs_diff_eq!(resolve_gamma(Gamma::Scale, &[vec![1.0], vec![1.0]]), 1.0);
    }

    #[test]
    fn test_constant_target() {
        let features = vec![vec![0.0], vec![1.0], vec![2.0]];
        let svr = Svr::fit(&features, &[2.0; 3], &SvrParams::default()).unwrap();
        assert_eq!(svr.n_support(), 0);
        assert_abs_diff_eq!(svr.predict_row(&[0.5]), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(svr.predict_row(&[50.0]), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_curve() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 * 0.2]).collect();
        let labels: Vec<f64> = features.iter().map(|x| x[0].sin()).collect();
        let svr = Svr::fit(&features, &labels, &SvrParams::default()).unwrap();
        assert!(svr.n_support() > 0);

        let worst = features
            .iter()
            .zip(&labels)
            .map(|(x, y)| (svr.predict_row(x) - y).abs())
            .fold(0.0, f64::max);
        assert!(worst < 0.3, "worst training error {worst}");

        let between = svr.predict_row(&[1.5]);
        assert!((between - 1.5f64.sin()).abs() < 0.3);
    }

    #[test]
    fn test_deterministic() {
        let features: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let labels: Vec<f64> = (0..12).map(|i| (i as f64).sqrt()).collect();
        let a = Svr::fit(&features, &labels, &SvrParams::default()).unwrap();
        let b = Svr::fit(&features, &labels, &SvrParams::default()).unwrap();
        assert_eq!(a.predict_row(&[3.5, 1.0]), b.predict_row(&[3.5, 1.0]));
    }

    #[test]
    fn test_invalid_parameters() {
        let features = vec![vec![0.0], vec![1.0]];
        let params = SvrParams {
            c: 0.0,
            ..Default::default()
        };
        assert!(Svr::fit(&features, &[0.0, 1.0], &params).is_err());
    }
}
