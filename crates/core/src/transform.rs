//! Section-to-trace coordinate transforms.
//!
//! Coefficients follow the RECONSTRUCT polynomial layout:
//!
//! ```text
//! x' = a0 + a1*x + a2*y + a3*x*y + a4*x*x + a5*y*y
//! y' = b0 + b1*x + b2*y + b3*x*y + b4*x*x + b5*y*y
//! ```
//!
//! `dim == 0` is the identity regardless of coefficients.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

const NEWTON_ITERATIONS: usize = 32;
const NEWTON_EPSILON: f64 = 1e-12;

/// Inverse of the affine part, cached at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AffineInverse {
    c: [f64; 3],
    d: [f64; 3],
}

/// Polynomial transform with a cached affine inverse.
///
/// Equality compares `dim` and coefficients only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawTransform", into = "RawTransform")]
pub struct Transform {
    dim: u8,
    xcoef: [f64; 6],
    ycoef: [f64; 6],
    inverse: Option<AffineInverse>,
}

#[derive(Serialize, Deserialize)]
struct RawTransform {
    dim: u8,
    xcoef: [f64; 6],
    ycoef: [f64; 6],
}

impl From<RawTransform> for Transform {
    fn from(raw: RawTransform) -> Self {
        Transform::new(raw.dim, raw.xcoef, raw.ycoef)
    }
}

impl From<Transform> for RawTransform {
    fn from(t: Transform) -> Self {
        RawTransform { dim: t.dim, xcoef: t.xcoef, ycoef: t.ycoef }
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.dim == other.dim && self.xcoef == other.xcoef && self.ycoef == other.ycoef
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(dim: u8, xcoef: [f64; 6], ycoef: [f64; 6]) -> Self {
        let mut t = Self { dim, xcoef, ycoef, inverse: None };
        t.inverse = t.compute_affine_inverse();
        t
    }

    pub fn identity() -> Self {
        Self::new(0, [0.0, 1.0, 0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0, 0.0, 0.0])
    }

    /// Pure translation.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new(1, [dx, 1.0, 0.0, 0.0, 0.0, 0.0], [dy, 0.0, 1.0, 0.0, 0.0, 0.0])
    }

    pub fn dim(&self) -> u8 {
        self.dim
    }

    pub fn xcoef(&self) -> &[f64; 6] {
        &self.xcoef
    }

    pub fn ycoef(&self) -> &[f64; 6] {
        &self.ycoef
    }

    pub fn is_identity(&self) -> bool {
        self.dim == 0
    }

    fn is_affine(&self) -> bool {
        self.xcoef[3..].iter().chain(self.ycoef[3..].iter()).all(|c| *c == 0.0)
    }

    fn compute_affine_inverse(&self) -> Option<AffineInverse> {
        if self.is_identity() {
            return Some(AffineInverse { c: [0.0, 1.0, 0.0], d: [0.0, 0.0, 1.0] });
        }
        let [a0, a1, a2, ..] = self.xcoef;
        let [b0, b1, b2, ..] = self.ycoef;
        let det = a1 * b2 - a2 * b1;
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }
        // x = c0 + c1*x' + c2*y', y = d0 + d1*x' + d2*y'
        let c1 = b2 / det;
        let c2 = -a2 / det;
        let d1 = -b1 / det;
        let d2 = a1 / det;
        let c0 = -(c1 * a0 + c2 * b0);
        let d0 = -(d1 * a0 + d2 * b0);
        Some(AffineInverse { c: [c0, c1, c2], d: [d0, d1, d2] })
    }

    /// Map one point forward.
    pub fn map_point(&self, p: Point) -> Point {
        if self.is_identity() {
            return p;
        }
        let terms = [1.0, p.x, p.y, p.x * p.y, p.x * p.x, p.y * p.y];
        let x = terms.iter().zip(self.xcoef.iter()).map(|(t, c)| t * c).sum();
        let y = terms.iter().zip(self.ycoef.iter()).map(|(t, c)| t * c).sum();
        Point { x, y }
    }

    pub fn map_points(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.map_point(*p)).collect()
    }

    /// Map one point backward. `None` when the affine part is singular or
    /// the polynomial inverse fails to converge.
    pub fn inverse_point(&self, p: Point) -> Option<Point> {
        let inv = self.inverse?;
        let guess = Point {
            x: inv.c[0] + inv.c[1] * p.x + inv.c[2] * p.y,
            y: inv.d[0] + inv.d[1] * p.x + inv.d[2] * p.y,
        };
        if self.is_identity() || self.is_affine() {
            return Some(guess);
        }
        self.newton_inverse(p, guess)
    }

    fn newton_inverse(&self, target: Point, mut guess: Point) -> Option<Point> {
        let [_, a1, a2, a3, a4, a5] = self.xcoef;
        let [_, b1, b2, b3, b4, b5] = self.ycoef;
        for _ in 0..NEWTON_ITERATIONS {
            let mapped = self.map_point(guess);
            let fx = mapped.x - target.x;
            let fy = mapped.y - target.y;
            if fx.abs() < NEWTON_EPSILON && fy.abs() < NEWTON_EPSILON {
                return Some(guess);
            }
            let (x, y) = (guess.x, guess.y);
            let j11 = a1 + a3 * y + 2.0 * a4 * x;
            let j12 = a2 + a3 * x + 2.0 * a5 * y;
            let j21 = b1 + b3 * y + 2.0 * b4 * x;
            let j22 = b2 + b3 * x + 2.0 * b5 * y;
            let det = j11 * j22 - j12 * j21;
            if det.abs() < f64::EPSILON {
                return None;
            }
            guess.x -= (j22 * fx - j12 * fy) / det;
            guess.y -= (-j21 * fx + j11 * fy) / det;
        }
        let mapped = self.map_point(guess);
        let close = (mapped.x - target.x).abs() < 1e-9 && (mapped.y - target.y).abs() < 1e-9;
        close.then_some(guess)
    }
}
