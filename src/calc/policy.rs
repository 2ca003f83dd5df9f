use serde::{Serialize, Deserialize};
use std::fmt;
use tracing::warn;
use crate::distr::DcmError;

/// Classes of floating-point conditions the estimators watch for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {

    /// Finite non-zero value divided by zero.
    Divide,

    /// Operation without a defined result (0/0, NaN operands, digamma outside its domain).
    Invalid,

    /// Result too large to be represented.
    Overflow,

    /// Non-zero result too small to be represented as a normal double.
    Underflow

}

impl fmt::Display for Condition {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Condition::Divide => "divide by zero",
            Condition::Invalid => "invalid value",
            Condition::Overflow => "overflow",
            Condition::Underflow => "underflow"
        };
        f.write_str(name)
    }

}

/// What to do when a floating-point condition is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {

    /// Abort the current call with DcmError::Numeric.
    Raise,

    /// Emit a warning event and continue with the (possibly saturated) value.
    Warn,

    /// Continue silently.
    Ignore

}

/// Numeric error policy scoped to a single estimator configuration. Each estimator
/// call consults its own policy; nothing here touches process-wide state, so calls
/// configured differently may run side by side.
///
/// The default raises on divide-by-zero and invalid operations, and warns on
/// overflow and underflow, letting the iteration continue with the saturated value.
///
/// ```
/// use polya::calc::*;
///
/// let policy = NumericPolicy::default();
/// assert!(policy.divide(1.0, 0.0, "example").is_err());
/// assert_eq!(policy.divide(1.0, 4.0, "example").unwrap(), 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericPolicy {

    pub divide : Action,

    pub invalid : Action,

    pub overflow : Action,

    pub underflow : Action

}

impl Default for NumericPolicy {

    fn default() -> Self {
        Self {
            divide : Action::Raise,
            invalid : Action::Raise,
            overflow : Action::Warn,
            underflow : Action::Warn
        }
    }

}

impl NumericPolicy {

    /// Policy applying the same action to every condition.
    pub fn uniform(action : Action) -> Self {
        Self { divide : action, invalid : action, overflow : action, underflow : action }
    }

    pub fn action(&self, condition : Condition) -> Action {
        match condition {
            Condition::Divide => self.divide,
            Condition::Invalid => self.invalid,
            Condition::Overflow => self.overflow,
            Condition::Underflow => self.underflow
        }
    }

    /// Reports a detected condition according to the policy.
    pub fn signal(&self, condition : Condition, context : &'static str, value : f64) -> Result<(), DcmError> {
        match self.action(condition) {
            Action::Raise => Err(DcmError::Numeric { condition, context }),
            Action::Warn => {
                warn!(%condition, context, value, "floating-point condition");
                Ok(())
            },
            Action::Ignore => Ok(())
        }
    }

    /// Verifies an accumulated value: NaN is an invalid operation and an
    /// infinite value an overflow.
    pub fn check(&self, value : f64, context : &'static str) -> Result<f64, DcmError> {
        if value.is_nan() {
            self.signal(Condition::Invalid, context, value)?;
        } else if value.is_infinite() {
            self.signal(Condition::Overflow, context, value)?;
        }
        Ok(value)
    }

    /// Checked division num / den.
    pub fn divide(&self, num : f64, den : f64, context : &'static str) -> Result<f64, DcmError> {
        let q = num / den;
        if num.is_nan() || den.is_nan() {
            self.signal(Condition::Invalid, context, q)?;
        } else if den == 0.0 {
            let condition = if num == 0.0 || num.is_infinite() {
                Condition::Invalid
            } else {
                Condition::Divide
            };
            self.signal(condition, context, q)?;
        } else if q.is_nan() {
            self.signal(Condition::Invalid, context, q)?;
        } else if q.is_infinite() && num.is_finite() {
            self.signal(Condition::Overflow, context, q)?;
        } else if num != 0.0 && num.is_finite() && (q == 0.0 || q.is_subnormal()) {
            self.signal(Condition::Underflow, context, q)?;
        }
        Ok(q)
    }

    /// Checked product a * b, flagging overflow of finite operands and
    /// underflow of non-zero operands.
    pub fn multiply(&self, a : f64, b : f64, context : &'static str) -> Result<f64, DcmError> {
        let p = a * b;
        if p.is_nan() {
            self.signal(Condition::Invalid, context, p)?;
        } else if p.is_infinite() && a.is_finite() && b.is_finite() {
            self.signal(Condition::Overflow, context, p)?;
        } else if a != 0.0 && b != 0.0 && (p == 0.0 || p.is_subnormal()) {
            self.signal(Condition::Underflow, context, p)?;
        }
        Ok(p)
    }

    /// Digamma restricted to positive arguments. Zero, negative and NaN arguments
    /// are invalid operations (the poles of the function sit at the non-positive integers).
    pub fn digamma(&self, x : f64, context : &'static str) -> Result<f64, DcmError> {
        if x.is_nan() || x <= 0.0 {
            self.signal(Condition::Invalid, context, x)?;
            return Ok(f64::NAN);
        }
        self.check(super::digamma(x), context)
    }

}
