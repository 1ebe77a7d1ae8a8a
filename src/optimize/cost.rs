//! GloVe-family regression costs.

use crate::config::CostFunctionKind;
use crate::error::{DivergenceStage, OptimizeError, OptimizeResult};

/// Exponent of the co-occurrence weighting `min(1, (x / xmax)^0.75)`.
pub const WEIGHT_EXPONENT: f64 = 0.75;

/// Precomputed regression target and weight for one triplet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostTerm {
    pub target: f64,
    pub weight: f64,
}

/// Which transform of the co-occurrence value the model regresses onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostFunction {
    /// `ln(x)`.
    Glove,
    /// `logit(x)`, for values in (0, 1).
    Pglove,
}

impl From<CostFunctionKind> for CostFunction {
    fn from(kind: CostFunctionKind) -> Self {
        match kind {
            CostFunctionKind::Glove => CostFunction::Glove,
            CostFunctionKind::Pglove => CostFunction::Pglove,
        }
    }
}

impl CostFunction {
    /// Build the term for co-occurrence value `x` in a matrix whose largest
    /// value is `xmax`. A non-finite target or weight is a divergence.
    pub fn term(&self, x: f64, xmax: f64) -> OptimizeResult<CostTerm> {
        let target = match self {
            CostFunction::Glove => x.ln(),
            CostFunction::Pglove => (x / (1.0 - x)).ln(),
        };
        let weight = if x < xmax {
            (x / xmax).powf(WEIGHT_EXPONENT)
        } else {
            1.0
        };
        if !target.is_finite() || !weight.is_finite() {
            return Err(OptimizeError::NumericDivergence {
                stage: DivergenceStage::CostTerm { value: x },
                cost: target,
            });
        }
        Ok(CostTerm { target, weight })
    }

    /// Terms for every value, in order.
    pub fn terms(
        &self,
        values: impl IntoIterator<Item = f64>,
        xmax: f64,
    ) -> OptimizeResult<Vec<CostTerm>> {
        values.into_iter().map(|x| self.term(x, xmax)).collect()
    }

    /// Residual of the model prediction against the term's target.
    #[inline]
    pub fn inner_cost(&self, prediction: f64, term: &CostTerm) -> f64 {
        prediction - term.target
    }

    /// The residual scaled by the term's co-occurrence weight.
    #[inline]
    pub fn weighted_cost(&self, inner: f64, term: &CostTerm) -> f64 {
        term.weight * inner
    }
}
