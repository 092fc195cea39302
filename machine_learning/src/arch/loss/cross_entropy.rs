use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::LossFn;

/// Softmax cross entropy over raw scores.
///
/// The predictions are unnormalized logits, one row per example, and the targets are
/// probability rows (one-hot labels for classification).
#[derive(Default, Clone, Copy, Debug)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
        let mut probs = logits.to_owned();

        for mut row in probs.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|p| p / sum);
        }

        probs
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.;
        }

        let mut total = 0.;
        Zip::from(y_pred.rows()).and(y.rows()).for_each(|z, t| {
            let max = z.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum_exp = max + z.mapv(|v| (v - max).exp()).sum().ln();
            let target_score = z.dot(&t);
            let mass = t.sum();

            total += mass * log_sum_exp - target_score;
        });

        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        let mut d = Self::softmax(y_pred);

        Zip::from(d.rows_mut()).and(y.rows()).for_each(|mut d, t| {
            let mass = t.sum();
            Zip::from(&mut d).and(&t).for_each(|d, &t| *d = (*d * mass - t) / n);
        });

        d
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn uniform_logits_give_log_of_the_class_count() {
        let logits = array![[0.0, 0.0, 0.0, 0.0]];
        let target = array![[0.0, 1.0, 0.0, 0.0]];

        let loss = CrossEntropy.loss(logits.view(), target.view());

        assert!((loss - 4.0_f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn large_logits_do_not_overflow() {
        let logits = array![[1000.0, 0.0]];
        let target = array![[1.0, 0.0]];

        let loss = CrossEntropy.loss(logits.view(), target.view());
        let d = CrossEntropy.loss_prime(logits.view(), target.view());

        assert!(loss.is_finite() && loss.abs() < 1e-6);
        assert!(d.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn derivative_is_softmax_minus_target_over_batch() {
        let logits = array![[1.0, 2.0], [0.5, -0.5]];
        let target = array![[0.0, 1.0], [1.0, 0.0]];

        let d = CrossEntropy.loss_prime(logits.view(), target.view());

        let eps = 1e-2;
        for ((i, j), &analytic) in d.indexed_iter() {
            let mut plus = logits.clone();
            let mut minus = logits.clone();
            plus[[i, j]] += eps;
            minus[[i, j]] -= eps;

            let numeric = (CrossEntropy.loss(plus.view(), target.view())
                - CrossEntropy.loss(minus.view(), target.view()))
                / (2.0 * eps);

            assert!((numeric - analytic).abs() < 1e-3, "({i}, {j})");
        }
    }
}
