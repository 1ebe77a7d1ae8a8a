//! Adaptive per-coordinate update rules.
//!
//! Each rule keeps its state in [`ParamSet`]s shaped like the parameters, so a
//! `(Side, index)` address selects both the parameter and its moments.

use crate::config::{Consistency, OptimizationMethod};

use super::params::{ParamSet, ParamShape, Side};

pub const ADAM_BETA1: f64 = 0.9;
pub const ADAM_BETA2: f64 = 0.999;
/// Denominator offset for Adam and AMSGrad.
pub const ADAM_EPSILON: f64 = 0.1;
/// Initial Adagrad accumulator value.
pub const ADAGRAD_INITIAL: f64 = 1.0;

/// Per-coordinate step computation.
pub trait UpdateRule: Send + Sync {
    /// Effective learning rate for `epoch` (0-based). Computed once per epoch.
    fn step_size(&self, epoch: usize) -> f64;

    /// Fold gradient `grad` into the state of coordinate `(side, index)` and
    /// return the amount to subtract from the parameter.
    fn step(&self, side: Side, index: usize, grad: f64, step_size: f64) -> f64;
}

/// Adagrad: `p -= lr * g / sqrt(acc)`, then `acc += g^2`.
#[derive(Debug)]
pub struct Adagrad {
    learning_rate: f64,
    consistency: Consistency,
    accumulators: ParamSet,
}

impl Adagrad {
    pub fn new(shape: ParamShape, learning_rate: f64, consistency: Consistency) -> Self {
        Self {
            learning_rate,
            consistency,
            accumulators: ParamSet::filled(shape, ADAGRAD_INITIAL),
        }
    }
}

impl UpdateRule for Adagrad {
    fn step_size(&self, _epoch: usize) -> f64 {
        self.learning_rate
    }

    #[inline]
    fn step(&self, side: Side, index: usize, grad: f64, step_size: f64) -> f64 {
        let acc = self.accumulators.side(side);
        let before = acc.load(index);
        acc.add(index, grad * grad, self.consistency);
        step_size * grad / before.sqrt()
    }
}

/// Adam with bias-corrected step size. With `max_second_moment` set this is
/// AMSGrad: the denominator uses the running maximum of the second moment.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f64,
    consistency: Consistency,
    first: ParamSet,
    second: ParamSet,
    second_max: Option<ParamSet>,
}

impl Adam {
    pub fn new(shape: ParamShape, learning_rate: f64, consistency: Consistency) -> Self {
        Self {
            learning_rate,
            consistency,
            first: ParamSet::filled(shape, 0.0),
            second: ParamSet::filled(shape, 0.0),
            second_max: None,
        }
    }

    pub fn amsgrad(shape: ParamShape, learning_rate: f64, consistency: Consistency) -> Self {
        Self {
            second_max: Some(ParamSet::filled(shape, 0.0)),
            ..Self::new(shape, learning_rate, consistency)
        }
    }
}

impl UpdateRule for Adam {
    fn step_size(&self, epoch: usize) -> f64 {
        let t = (epoch + 1) as i32;
        self.learning_rate * (1.0 - ADAM_BETA2.powi(t)).sqrt() / (1.0 - ADAM_BETA1.powi(t))
    }

    #[inline]
    fn step(&self, side: Side, index: usize, grad: f64, step_size: f64) -> f64 {
        let m = self.first.side(side).update(index, self.consistency, |m| {
            ADAM_BETA1 * m + (1.0 - ADAM_BETA1) * grad
        });
        let v = self.second.side(side).update(index, self.consistency, |v| {
            ADAM_BETA2 * v + (1.0 - ADAM_BETA2) * grad * grad
        });
        let v = match &self.second_max {
            Some(max) => max.side(side).update(index, self.consistency, |prev| prev.max(v)),
            None => v,
        };
        step_size * m / (v.sqrt() + ADAM_EPSILON)
    }
}

/// The configured rule, chosen at optimizer construction.
#[derive(Debug)]
pub enum AdaptiveRule {
    Adagrad(Adagrad),
    Adam(Adam),
    AmsGrad(Adam),
}

impl AdaptiveRule {
    pub fn new(
        method: OptimizationMethod,
        shape: ParamShape,
        learning_rate: f64,
        consistency: Consistency,
    ) -> Self {
        match method {
            OptimizationMethod::Adagrad => {
                AdaptiveRule::Adagrad(Adagrad::new(shape, learning_rate, consistency))
            }
            OptimizationMethod::Adam => {
                AdaptiveRule::Adam(Adam::new(shape, learning_rate, consistency))
            }
            OptimizationMethod::Amsgrad => {
                AdaptiveRule::AmsGrad(Adam::amsgrad(shape, learning_rate, consistency))
            }
        }
    }
}

impl UpdateRule for AdaptiveRule {
    fn step_size(&self, epoch: usize) -> f64 {
        match self {
            AdaptiveRule::Adagrad(rule) => rule.step_size(epoch),
            AdaptiveRule::Adam(rule) | AdaptiveRule::AmsGrad(rule) => rule.step_size(epoch),
        }
    }

    #[inline]
    fn step(&self, side: Side, index: usize, grad: f64, step_size: f64) -> f64 {
        match self {
            AdaptiveRule::Adagrad(rule) => rule.step(side, index, grad, step_size),
            AdaptiveRule::Adam(rule) | AdaptiveRule::AmsGrad(rule) => {
                rule.step(side, index, grad, step_size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> ParamShape {
        ParamShape {
            focus_rows: 1,
            context_rows: 1,
            dimension: 2,
        }
    }

    #[test]
    fn adagrad_uses_accumulator_before_update() {
        let rule = Adagrad::new(shape(), 0.05, Consistency::Strict);
        let lr = rule.step_size(0);
        // acc starts at 1: first step is lr * g.
        assert!((rule.step(Side::Focus, 0, 2.0, lr) - 0.1).abs() < 1e-12);
        // acc is now 5.
        assert!((rule.step(Side::Focus, 0, 2.0, lr) - 0.1 / 5f64.sqrt()).abs() < 1e-12);
        // Other coordinates are untouched.
        assert!((rule.step(Side::Focus, 1, 2.0, lr) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn adam_bias_correction_at_first_epoch() {
        let rule = Adam::new(shape(), 0.05, Consistency::Strict);
        let lr = rule.step_size(0);
        assert!((lr - 0.05 * 0.001f64.sqrt() / 0.1).abs() < 1e-12);
        // m = 0.1 g, v = 0.001 g^2
        let g = 1.0;
        let expected = lr * 0.1 / (0.001f64.sqrt() + ADAM_EPSILON);
        assert!((rule.step(Side::ContextBias, 0, g, lr) - expected).abs() < 1e-12);
    }

    #[test]
    fn adam_step_size_approaches_learning_rate() {
        let rule = Adam::new(shape(), 0.05, Consistency::Hogwild);
        assert!((rule.step_size(100_000) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn amsgrad_keeps_largest_second_moment() {
        let adam = Adam::new(shape(), 0.05, Consistency::Strict);
        let ams = Adam::amsgrad(shape(), 0.05, Consistency::Strict);
        for rule in [&adam, &ams] {
            rule.step(Side::FocusBias, 0, 10.0, 0.05);
        }
        // After a large gradient, a small one: AMSGrad keeps the big v.
        let a = adam.step(Side::FocusBias, 0, 0.01, 0.05);
        let b = ams.step(Side::FocusBias, 0, 0.01, 0.05);
        assert!(b < a);
    }

    #[test]
    fn adaptive_rule_dispatches_by_method() {
        let rule =
            AdaptiveRule::new(OptimizationMethod::Amsgrad, shape(), 0.05, Consistency::Hogwild);
        assert!(matches!(rule, AdaptiveRule::AmsGrad(_)));
        let rule =
            AdaptiveRule::new(OptimizationMethod::Adagrad, shape(), 0.05, Consistency::Hogwild);
        assert_eq!(rule.step_size(9), 0.05);
    }
}
