//! Planar geometry for contour matching.
//!
//! Shapes are simple polygons (closed contours) or polylines (open
//! contours) in section coordinates. All predicates validate their inputs
//! first and report malformed shapes as [`GeometryError`] instead of
//! producing a misleading answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default relative tolerance for "exact" overlap (2^-17).
pub const DEFAULT_EXACT_TOLERANCE: f64 = 1.0 / 131_072.0;

/// Default overlap ratio above which two shapes are potential duplicates.
pub const DEFAULT_POTENTIAL_THRESHOLD: f64 = 0.8;

// Relative epsilon for incidence tests, scaled by the shapes' extent.
const INCIDENCE_EPSILON: f64 = 1e-9;
const PARAM_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, o: Point) -> Point {
        Point { x: self.x - o.x, y: self.y - o.y }
    }

    fn dot(self, o: Point) -> f64 {
        self.x * o.x + self.y * o.y
    }

    fn cross(self, o: Point) -> f64 {
        self.x * o.y - self.y * o.x
    }

    fn lerp(self, o: Point, t: f64) -> Point {
        Point { x: self.x + (o.x - self.x) * t, y: self.y + (o.y - self.y) * t }
    }

    fn distance(self, o: Point) -> f64 {
        let d = self.sub(o);
        d.dot(d).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Polygon,
    LineString,
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Polygon => write!(f, "Polygon"),
            Self::LineString => write!(f, "LineString"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{kind} needs at least {needed} distinct points, found {found}")]
    TooFewPoints { kind: ShapeKind, needed: usize, found: usize },
    #[error("polygon has zero area")]
    ZeroArea,
    #[error("polygon edges {0} and {1} intersect")]
    SelfIntersecting(usize, usize),
    #[error("shape contains a non-finite coordinate")]
    NonFinite,
}

/// A contour outline in section coordinates.
///
/// Consecutive repeated vertices are collapsed; a polygon's closing vertex
/// is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    kind: ShapeKind,
    coords: Vec<Point>,
}

impl Shape {
    pub fn new(kind: ShapeKind, points: &[Point]) -> Self {
        let mut coords: Vec<Point> = Vec::with_capacity(points.len());
        for p in points {
            if coords.last() != Some(p) {
                coords.push(*p);
            }
        }
        if kind == ShapeKind::Polygon && coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }
        Self { kind, coords }
    }

    pub fn polygon(points: &[Point]) -> Self {
        Self::new(ShapeKind::Polygon, points)
    }

    pub fn line(points: &[Point]) -> Self {
        Self::new(ShapeKind::LineString, points)
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn coords(&self) -> &[Point] {
        &self.coords
    }

    /// `[min_x, min_y, max_x, max_y]`, or `None` for an empty shape.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let first = self.coords.first()?;
        let mut b = [first.x, first.y, first.x, first.y];
        for p in &self.coords[1..] {
            b[0] = b[0].min(p.x);
            b[1] = b[1].min(p.y);
            b[2] = b[2].max(p.x);
            b[3] = b[3].max(p.y);
        }
        Some(b)
    }

    /// Absolute enclosed area. Zero for lines.
    pub fn area(&self) -> f64 {
        match self.kind {
            ShapeKind::Polygon => signed_area(&self.coords).abs(),
            ShapeKind::LineString => 0.0,
        }
    }

    /// Check the shape is usable by the predicates below.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.coords.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        let needed = match self.kind {
            ShapeKind::Polygon => 3,
            ShapeKind::LineString => 2,
        };
        if self.coords.len() < needed {
            return Err(GeometryError::TooFewPoints {
                kind: self.kind,
                needed,
                found: self.coords.len(),
            });
        }
        if self.kind == ShapeKind::LineString {
            return Ok(());
        }

        let eps = INCIDENCE_EPSILON * extent(&self.coords, &[]).max(1.0);
        let edges = edges(self.kind, &self.coords);
        let n = edges.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                let (a1, a2) = edges[i];
                let (b1, b2) = edges[j];
                if segments_intersect(a1, a2, b1, b2, eps) {
                    return Err(GeometryError::SelfIntersecting(i, j));
                }
            }
        }
        if signed_area(&self.coords).abs() <= eps * eps {
            return Err(GeometryError::ZeroArea);
        }
        Ok(())
    }

    fn edges(&self) -> Vec<(Point, Point)> {
        edges(self.kind, &self.coords)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Geometric predicates consumed by the contour classifier.
pub trait GeometryProvider: Sync {
    /// True when the shapes intersect, touch, or one contains the other.
    /// Symmetric.
    fn contacts(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError>;

    /// Overlap measure in `[0, 1]`.
    fn overlap_ratio(&self, a: &Shape, b: &Shape) -> Result<f64, GeometryError>;

    fn is_exact_duplicate(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError>;

    fn is_potential_duplicate(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError>;
}

/// Exact planar implementation of [`GeometryProvider`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarGeometry {
    /// Relative tolerance for exact duplicates.
    pub exact_tolerance: f64,
    /// Overlap ratio a potential duplicate must exceed.
    pub potential_threshold: f64,
}

impl Default for PlanarGeometry {
    fn default() -> Self {
        Self {
            exact_tolerance: DEFAULT_EXACT_TOLERANCE,
            potential_threshold: DEFAULT_POTENTIAL_THRESHOLD,
        }
    }
}

impl PlanarGeometry {
    pub fn new(exact_tolerance: f64, potential_threshold: f64) -> Self {
        Self { exact_tolerance, potential_threshold }
    }

    fn check(a: &Shape, b: &Shape) -> Result<f64, GeometryError> {
        a.validate()?;
        b.validate()?;
        Ok(INCIDENCE_EPSILON * extent(&a.coords, &b.coords).max(1.0))
    }
}

impl GeometryProvider for PlanarGeometry {
    fn contacts(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        let eps = Self::check(a, b)?;
        Ok(shapes_contact(a, b, eps))
    }

    fn overlap_ratio(&self, a: &Shape, b: &Shape) -> Result<f64, GeometryError> {
        let eps = Self::check(a, b)?;
        Ok(overlap_ratio(a, b, eps))
    }

    fn is_exact_duplicate(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        let eps = Self::check(a, b)?;
        match (a.kind, b.kind) {
            (ShapeKind::Polygon, ShapeKind::Polygon) => {
                Ok(overlap_ratio(a, b, eps) >= 1.0 - self.exact_tolerance)
            }
            (ShapeKind::LineString, ShapeKind::LineString) => {
                let coord_eps = self.exact_tolerance * extent(&a.coords, &b.coords).max(1.0);
                Ok(coincident_vertices(&a.coords, &b.coords, coord_eps)
                    && coincident_vertices(&b.coords, &a.coords, coord_eps))
            }
            _ => Ok(false),
        }
    }

    fn is_potential_duplicate(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        if self.is_exact_duplicate(a, b)? {
            return Ok(false);
        }
        Ok(self.overlap_ratio(a, b)? > self.potential_threshold)
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn signed_area(coords: &[Point]) -> f64 {
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n).map(|i| coords[i].cross(coords[(i + 1) % n])).sum();
    twice / 2.0
}

fn extent(a: &[Point], b: &[Point]) -> f64 {
    let mut iter = a.iter().chain(b.iter());
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in iter {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    (max_x - min_x).hypot(max_y - min_y)
}

fn edges(kind: ShapeKind, coords: &[Point]) -> Vec<(Point, Point)> {
    let mut out: Vec<(Point, Point)> = coords.windows(2).map(|w| (w[0], w[1])).collect();
    if kind == ShapeKind::Polygon && coords.len() > 2 {
        out.push((coords[coords.len() - 1], coords[0]));
    }
    out
}

fn orient(a: Point, b: Point, c: Point) -> f64 {
    b.sub(a).cross(c.sub(a))
}

/// Sign of an orientation value, treating anything within `eps * len` as zero.
fn orient_sign(a: Point, b: Point, c: Point, eps: f64) -> i8 {
    let o = orient(a, b, c);
    let scale = eps * a.distance(b).max(1.0);
    if o > scale {
        1
    } else if o < -scale {
        -1
    } else {
        0
    }
}

fn point_on_segment(p: Point, a: Point, b: Point, eps: f64) -> bool {
    if orient_sign(a, b, p, eps) != 0 {
        return false;
    }
    p.x >= a.x.min(b.x) - eps
        && p.x <= a.x.max(b.x) + eps
        && p.y >= a.y.min(b.y) - eps
        && p.y <= a.y.max(b.y) + eps
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point, eps: f64) -> bool {
    let d1 = orient_sign(q1, q2, p1, eps);
    let d2 = orient_sign(q1, q2, p2, eps);
    let d3 = orient_sign(p1, p2, q1, eps);
    let d4 = orient_sign(p1, p2, q2, eps);

    if d1 * d2 < 0 && d3 * d4 < 0 {
        return true;
    }
    point_on_segment(p1, q1, q2, eps)
        || point_on_segment(p2, q1, q2, eps)
        || point_on_segment(q1, p1, p2, eps)
        || point_on_segment(q2, p1, p2, eps)
}

/// Crossing-number test. Boundary points may land either way.
fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn bounds_overlap(a: &Shape, b: &Shape, eps: f64) -> bool {
    match (a.bounds(), b.bounds()) {
        (Some(ba), Some(bb)) => {
            ba[0] <= bb[2] + eps && bb[0] <= ba[2] + eps && ba[1] <= bb[3] + eps && bb[1] <= ba[3] + eps
        }
        _ => false,
    }
}

fn shapes_contact(a: &Shape, b: &Shape, eps: f64) -> bool {
    if !bounds_overlap(a, b, eps) {
        return false;
    }
    let edges_a = a.edges();
    let edges_b = b.edges();
    for &(a1, a2) in &edges_a {
        for &(b1, b2) in &edges_b {
            if segments_intersect(a1, a2, b1, b2, eps) {
                return true;
            }
        }
    }
    // No boundary contact: one can only lie wholly inside the other.
    (b.kind == ShapeKind::Polygon && point_in_polygon(a.coords[0], &b.coords))
        || (a.kind == ShapeKind::Polygon && point_in_polygon(b.coords[0], &a.coords))
}

fn overlap_ratio(a: &Shape, b: &Shape, eps: f64) -> f64 {
    match (a.kind, b.kind) {
        (ShapeKind::Polygon, ShapeKind::Polygon) => {
            if !bounds_overlap(a, b, eps) {
                return 0.0;
            }
            let area_a = a.area();
            let area_b = b.area();
            let inter = intersection_area(&a.coords, &b.coords, eps).min(area_a.min(area_b));
            let union = area_a + area_b - inter;
            if union <= 0.0 {
                return 0.0;
            }
            (inter / union).clamp(0.0, 1.0)
        }
        (ShapeKind::LineString, ShapeKind::LineString) => {
            let edges_a = a.edges();
            let edges_b = b.edges();
            let on_b = a
                .coords
                .iter()
                .filter(|p| edges_b.iter().any(|&(s, e)| point_on_segment(**p, s, e, eps)))
                .count();
            let on_a = b
                .coords
                .iter()
                .filter(|p| edges_a.iter().any(|&(s, e)| point_on_segment(**p, s, e, eps)))
                .count();
            (on_a + on_b) as f64 / (a.coords.len() + b.coords.len()) as f64
        }
        _ => 0.0,
    }
}

fn coincident_vertices(a: &[Point], b: &[Point], eps: f64) -> bool {
    a.iter().all(|p| b.iter().any(|q| p.distance(*q) <= eps))
}

fn counter_clockwise(coords: &[Point]) -> Vec<Point> {
    let mut out = coords.to_vec();
    if signed_area(&out) < 0.0 {
        out.reverse();
    }
    out
}

/// Area of the intersection of two simple polygons.
///
/// Integrates `x dy - y dx` over the parts of each boundary lying inside the
/// other polygon. Edge fragments shared by both boundaries are counted once,
/// and only when both outlines run the same way along them.
fn intersection_area(a: &[Point], b: &[Point], eps: f64) -> f64 {
    let a = counter_clockwise(a);
    let b = counter_clockwise(b);
    let twice = boundary_integral(&a, &b, true, eps) + boundary_integral(&b, &a, false, eps);
    (twice / 2.0).max(0.0)
}

fn boundary_integral(p: &[Point], q: &[Point], include_shared: bool, eps: f64) -> f64 {
    let q_edges = edges(ShapeKind::Polygon, q);
    let mut total = 0.0;

    for (s, e) in edges(ShapeKind::Polygon, p) {
        let d = e.sub(s);
        let len2 = d.dot(d);
        if len2 == 0.0 {
            continue;
        }
        let mut cuts = vec![0.0, 1.0];
        for &(u, v) in &q_edges {
            let f = v.sub(u);
            let denom = d.cross(f);
            let su = u.sub(s);
            if denom.abs() > PARAM_EPSILON * len2.sqrt() * f.dot(f).sqrt() {
                let t = su.cross(f) / denom;
                let w = su.cross(d) / denom;
                if (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&t)
                    && (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&w)
                {
                    cuts.push(t.clamp(0.0, 1.0));
                }
            } else if orient_sign(s, e, u, eps) == 0 {
                for endpoint in [u, v] {
                    let t = endpoint.sub(s).dot(d) / len2;
                    if (0.0..=1.0).contains(&t) {
                        cuts.push(t);
                    }
                }
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|x, y| (*x - *y).abs() <= PARAM_EPSILON);

        for w in cuts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 - t0 <= PARAM_EPSILON {
                continue;
            }
            let mid = s.lerp(e, (t0 + t1) / 2.0);
            let shared = q_edges
                .iter()
                .find(|&&(u, v)| point_on_segment(mid, u, v, eps))
                .map(|&(u, v)| d.dot(v.sub(u)) > 0.0);
            let include = match shared {
                Some(same_direction) => include_shared && same_direction,
                None => point_in_polygon(mid, q),
            };
            if include {
                total += s.lerp(e, t0).cross(s.lerp(e, t1));
            }
        }
    }
    total
}
