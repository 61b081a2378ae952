//! The abstract value domain: inclusive integer intervals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::BinaryOp;

/// Over-approximation of the integer values an expression may take.
///
/// `IntegerInterval` bounds are inclusive. `Unknown` is the top element:
/// anything the analysis cannot pin down, including every non-integer
/// expression result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "value", rename_all = "snake_case")]
pub enum AbstractValue {
    IntegerInterval { low: i64, high: i64 },
    Unknown,
}

impl AbstractValue {
    /// The singleton interval `[v, v]`.
    pub fn exact(v: i64) -> Self {
        AbstractValue::IntegerInterval { low: v, high: v }
    }

    pub fn interval(low: i64, high: i64) -> Self {
        debug_assert!(low <= high);
        AbstractValue::IntegerInterval { low, high }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AbstractValue::Unknown)
    }

    /// Interval inclusion: `[l1,h1] ⊆ [l2,h2]`. Total; false whenever either
    /// side is `Unknown`.
    pub fn included_in(&self, other: &AbstractValue) -> bool {
        match (self, other) {
            (
                AbstractValue::IntegerInterval { low: l1, high: h1 },
                AbstractValue::IntegerInterval { low: l2, high: h2 },
            ) => l2 <= l1 && h1 <= h2,
            _ => false,
        }
    }

    /// Apply a binary operator to two values, returning the narrowest sound
    /// interval, or `Unknown` when either operand is unknown or the result
    /// cannot be bounded (overflow, shift out of range, division through
    /// zero).
    pub fn apply(op: BinaryOp, lhs: AbstractValue, rhs: AbstractValue) -> AbstractValue {
        let (AbstractValue::IntegerInterval { low: a, high: b },
             AbstractValue::IntegerInterval { low: c, high: d }) = (lhs, rhs)
        else {
            return AbstractValue::Unknown;
        };

        let corners = |vals: [Option<i64>; 4]| -> AbstractValue {
            let mut lo = i64::MAX;
            let mut hi = i64::MIN;
            for v in vals {
                match v {
                    Some(v) => {
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                    None => return AbstractValue::Unknown,
                }
            }
            AbstractValue::interval(lo, hi)
        };

        match op {
            BinaryOp::Add => match (a.checked_add(c), b.checked_add(d)) {
                (Some(lo), Some(hi)) => AbstractValue::interval(lo, hi),
                _ => AbstractValue::Unknown,
            },
            BinaryOp::Sub => match (a.checked_sub(d), b.checked_sub(c)) {
                (Some(lo), Some(hi)) => AbstractValue::interval(lo, hi),
                _ => AbstractValue::Unknown,
            },
            BinaryOp::Mul => corners([
                a.checked_mul(c),
                a.checked_mul(d),
                b.checked_mul(c),
                b.checked_mul(d),
            ]),
            BinaryOp::Div => {
                // A divisor interval containing zero cannot be bounded.
                if c <= 0 && d >= 0 {
                    return AbstractValue::Unknown;
                }
                corners([
                    a.checked_div(c),
                    a.checked_div(d),
                    b.checked_div(c),
                    b.checked_div(d),
                ])
            }
            BinaryOp::Shl => {
                if c < 0 || d > 62 {
                    return AbstractValue::Unknown;
                }
                corners([
                    a.checked_shl(c as u32),
                    a.checked_shl(d as u32),
                    b.checked_shl(c as u32),
                    b.checked_shl(d as u32),
                ])
            }
            BinaryOp::Shr => {
                if c < 0 || d > 62 {
                    return AbstractValue::Unknown;
                }
                corners([
                    a.checked_shr(c as u32),
                    a.checked_shr(d as u32),
                    b.checked_shr(c as u32),
                    b.checked_shr(d as u32),
                ])
            }
        }
    }
}

impl fmt::Display for AbstractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractValue::IntegerInterval { low, high } if low == high => {
                write!(f, "[{}]", low)
            }
            AbstractValue::IntegerInterval { low, high } => write!(f, "[{}, {}]", low, high),
            AbstractValue::Unknown => write!(f, "unknown"),
        }
    }
}
