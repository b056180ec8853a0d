//! Scalar diagnostics over triadic state vectors.
//!
//! Implements the core metric functions:
//! - Strength: saturating summary of the component product
//! - Balance: dispersion of the three components (scale-invariant)
//! - Entropy: Shannon entropy of the normalized component distribution
//! - Alignment: cosine similarity between two vectors
//!
//! All functions are total over finite inputs. Degenerate cases (zero
//! vectors, non-positive sums) map to documented neutral values instead
//! of propagating NaN or infinities.

use crate::history;
use serde::{Deserialize, Serialize};

/// Epsilon for numerical stability (avoids division by zero)
pub const EPSILON: f64 = 1e-10;

/// Half-saturation constant for `strength`: the component product at
/// which strength reaches 0.5
pub const STRENGTH_HALF_SATURATION: f64 = 1.0;

/// ln(3), the maximum Shannon entropy of a 3-outcome distribution
const LN_3: f64 = 1.0986122886681098;

/// Weight of strength in the aggregate health score
pub const HEALTH_WEIGHT_STRENGTH: f64 = 0.4;
/// Weight of balance in the aggregate health score
pub const HEALTH_WEIGHT_BALANCE: f64 = 0.3;
/// Weight of (1 - entropy) in the aggregate health score
pub const HEALTH_WEIGHT_FOCUS: f64 = 0.2;
/// Weight of stability in the aggregate health score
pub const HEALTH_WEIGHT_STABILITY: f64 = 0.1;

/// A 3-component real-valued state vector.
///
/// Components are semantically independent and unconstrained in sign,
/// though typically non-negative in practice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TriadicVector {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TriadicVector {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn as_array(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Product of the three components
    #[inline]
    pub fn product(&self) -> f64 {
        self.a * self.b * self.c
    }

    /// Euclidean norm
    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.a * self.a + self.b * self.b + self.c * self.c).sqrt()
    }

    /// Euclidean distance to another vector
    #[inline]
    pub fn distance(&self, other: &TriadicVector) -> f64 {
        let da = self.a - other.a;
        let db = self.b - other.b;
        let dc = self.c - other.c;
        (da * da + db * db + dc * dc).sqrt()
    }

    /// Component-wise difference `other - self`
    #[inline]
    pub fn delta(&self, other: &TriadicVector) -> TriadicVector {
        TriadicVector::new(other.a - self.a, other.b - self.b, other.c - self.c)
    }

    /// Component-wise mean of a set of vectors; `None` for an empty slice
    pub fn mean(vectors: &[TriadicVector]) -> Option<TriadicVector> {
        if vectors.is_empty() {
            return None;
        }
        let n = vectors.len() as f64;
        let (sa, sb, sc) = vectors.iter().fold((0.0, 0.0, 0.0), |(sa, sb, sc), v| {
            (sa + v.a, sb + v.b, sc + v.c)
        });
        Some(TriadicVector::new(sa / n, sb / n, sc / n))
    }

    /// Saturating strength of this vector, see [`strength`]
    #[inline]
    pub fn strength(&self) -> f64 {
        strength(self.a, self.b, self.c)
    }

    /// Balance of this vector, see [`balance`]
    #[inline]
    pub fn balance(&self) -> f64 {
        balance(self.a, self.b, self.c)
    }

    /// Normalized entropy of this vector, see [`entropy`]
    #[inline]
    pub fn entropy(&self) -> f64 {
        entropy(self.a, self.b, self.c)
    }

    /// Cosine alignment with another vector, see [`alignment`]
    #[inline]
    pub fn alignment(&self, other: &TriadicVector) -> f64 {
        alignment(self, other)
    }
}

impl From<(f64, f64, f64)> for TriadicVector {
    fn from((a, b, c): (f64, f64, f64)) -> Self {
        Self::new(a, b, c)
    }
}

impl From<[f64; 3]> for TriadicVector {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Saturating strength of a triadic state in [0, 1].
///
/// Let `p = a * b * c`. Strength is 0 when `p <= 0` and otherwise
/// `p / (p + STRENGTH_HALF_SATURATION)`, which is continuous, bounded,
/// and monotone non-decreasing in the product. `strength(1, 1, 1) = 0.5`.
#[inline]
pub fn strength(a: f64, b: f64, c: f64) -> f64 {
    let product = a * b * c;
    if product <= 0.0 {
        return 0.0;
    }
    product / (product + STRENGTH_HALF_SATURATION)
}

/// Balance of the three components in [0, 1].
///
/// Maps the coefficient of variation of the component magnitudes through
/// `1 / (1 + cv)`, so `balance(k, k, k) = 1.0` for any `k != 0` and the
/// result is scale-invariant. An all-zero vector yields 0.0.
pub fn balance(a: f64, b: f64, c: f64) -> f64 {
    let values = [a.abs(), b.abs(), c.abs()];
    let mean = (values[0] + values[1] + values[2]) / 3.0;
    if mean < EPSILON {
        return 0.0;
    }

    let variance = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / 3.0;

    let cv = variance.sqrt() / mean;
    1.0 / (1.0 + cv)
}

/// Shannon entropy of the normalized distribution `{a, b, c} / (a + b + c)`,
/// normalized by `ln(3)` to [0, 1].
///
/// Defined as 0.0 when the component sum is non-positive (degenerate case,
/// not an error). Components contributing non-positive mass are skipped.
pub fn entropy(a: f64, b: f64, c: f64) -> f64 {
    let total = a + b + c;
    if total <= 0.0 {
        return 0.0;
    }

    let mut h = 0.0;
    for v in [a, b, c] {
        let p = v / total;
        if p > EPSILON {
            h -= p * p.ln();
        }
    }

    h / LN_3
}

/// Cosine similarity between two triadic vectors in [-1, 1].
///
/// Returns 0.0 (defined, not an error) when either vector has zero
/// magnitude.
pub fn alignment(v1: &TriadicVector, v2: &TriadicVector) -> f64 {
    let dot = v1.a * v2.a + v1.b * v2.b + v1.c * v2.c;
    let mag1 = v1.magnitude();
    let mag2 = v2.magnitude();

    if mag1 < EPSILON || mag2 < EPSILON {
        return 0.0;
    }

    (dot / (mag1 * mag2)).clamp(-1.0, 1.0)
}

/// Bundle of all scalar diagnostics for one state vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub strength: f64,
    pub balance: f64,
    pub entropy: f64,
    /// Stability over the supplied history; `None` when no history given
    pub stability: Option<f64>,
    /// Weighted aggregate of the above, in [0, 1]
    pub health_score: f64,
}

/// Compute the full diagnostic bundle for a state vector.
///
/// When `history` is supplied, a stability score over that sequence is
/// included. The health score is a fixed-weight mean:
/// `0.4*strength + 0.3*balance + 0.2*(1-entropy) + 0.1*stability`,
/// with stability defaulting to 1.0 when no history is supplied.
pub fn diagnostic(vector: &TriadicVector, history: Option<&[TriadicVector]>) -> Diagnostic {
    let strength = vector.strength();
    let balance = vector.balance();
    let entropy = vector.entropy();
    let stability = history.map(history::stability);

    let health_score = strength * HEALTH_WEIGHT_STRENGTH
        + balance * HEALTH_WEIGHT_BALANCE
        + (1.0 - entropy) * HEALTH_WEIGHT_FOCUS
        + stability.unwrap_or(1.0) * HEALTH_WEIGHT_STABILITY;

    Diagnostic {
        strength,
        balance,
        entropy,
        stability,
        health_score,
    }
}
