//! Forecast accuracy metrics.
//!
//! MAE, RMSE, and R² over an (actual, predicted) pair of vectors. Pure
//! computation; callers decide what to log or track.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean square error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Number of samples evaluated
    pub sample_count: usize,
}

impl Evaluation {
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, EngineError> {
        if actual.len() != predicted.len() {
            return Err(EngineError::ShapeMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Err(EngineError::ShapeMismatch {
                actual: 0,
                predicted: 0,
            });
        }

        let n = actual.len() as f64;

        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;

        let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
        let rmse = (ss_res / n).sqrt();

        let mean_actual = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
        let r2 = if ss_tot > 1e-10 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        };

        Ok(Self {
            mae,
            rmse,
            r2,
            sample_count: actual.len(),
        })
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE={:.2} EUR, RMSE={:.2} EUR, R²={:.3} (n={})",
            self.mae, self.rmse, self.r2, self.sample_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_forecast_scores_zero_error_and_unit_r2() {
        let y = vec![10.0, 20.0, 35.0, 15.0];
        let metrics = Evaluation::calculate(&y, &y).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.sample_count, 4);
    }

    #[test]
    fn known_errors_produce_known_metrics() {
        let actual = vec![100.0, 200.0, 300.0];
        let predicted = vec![110.0, 190.0, 310.0];
        let metrics = Evaluation::calculate(&actual, &predicted).unwrap();
        assert!((metrics.mae - 10.0).abs() < 1e-12);
        assert!((metrics.rmse - 10.0).abs() < 1e-12);
        assert!(metrics.r2 > 0.95);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = Evaluation::calculate(&[1.0, 2.0], &[1.0]);
        assert!(matches!(
            result,
            Err(EngineError::ShapeMismatch {
                actual: 2,
                predicted: 1
            })
        ));
    }

    #[test]
    fn empty_vectors_are_rejected() {
        assert!(Evaluation::calculate(&[], &[]).is_err());
    }
}
