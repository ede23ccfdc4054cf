//! Bezier path values used by shapes and masks.

use common::geometry::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A vector path: vertices with per-vertex incoming and outgoing tangents.
///
/// Tangents are stored relative to their vertex. The three lists always have
/// the same length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PathValueRepr")]
pub struct PathValue {
    pub closed: bool,
    pub vertices: Vec<Point>,
    pub in_tangents: Vec<Vec2>,
    pub out_tangents: Vec<Vec2>,
}

#[derive(Deserialize)]
struct PathValueRepr {
    #[serde(default)]
    closed: bool,
    vertices: Vec<Point>,
    #[serde(default)]
    in_tangents: Vec<Vec2>,
    #[serde(default)]
    out_tangents: Vec<Vec2>,
}

impl From<PathValueRepr> for PathValue {
    fn from(repr: PathValueRepr) -> Self {
        PathValue::new(repr.closed, repr.vertices, repr.in_tangents, repr.out_tangents)
    }
}

/// Cubic circle approximation constant.
const KAPPA: f64 = 0.552_284_749_831;

impl PathValue {
    /// Create a path. Tangent lists are zero-padded or truncated to the vertex count.
    pub fn new(
        closed: bool,
        vertices: Vec<Point>,
        mut in_tangents: Vec<Vec2>,
        mut out_tangents: Vec<Vec2>,
    ) -> Self {
        in_tangents.resize(vertices.len(), Vec2::ZERO);
        out_tangents.resize(vertices.len(), Vec2::ZERO);
        Self {
            closed,
            vertices,
            in_tangents,
            out_tangents,
        }
    }

    /// A closed polygon with straight edges.
    pub fn polygon(vertices: Vec<Point>) -> Self {
        Self::new(true, vertices, Vec::new(), Vec::new())
    }

    /// An axis-aligned rectangle.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::polygon(vec![
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    /// An ellipse built from four cubic arcs.
    pub fn ellipse(center: Point, rx: f64, ry: f64) -> Self {
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        Self::new(
            true,
            vec![
                Point::new(center.x, center.y - ry),
                Point::new(center.x + rx, center.y),
                Point::new(center.x, center.y + ry),
                Point::new(center.x - rx, center.y),
            ],
            vec![
                Vec2::new(-kx, 0.0),
                Vec2::new(0.0, -ky),
                Vec2::new(kx, 0.0),
                Vec2::new(0.0, ky),
            ],
            vec![
                Vec2::new(kx, 0.0),
                Vec2::new(0.0, ky),
                Vec2::new(-kx, 0.0),
                Vec2::new(0.0, -ky),
            ],
        )
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Element-wise linear blend towards `other`.
    ///
    /// `closed` comes from `self`. When the vertex counts differ the shorter
    /// path is padded with zero vertices and zero tangents.
    pub fn interpolate(&self, other: &PathValue, t: f64) -> PathValue {
        let len = self.len().max(other.len());
        let point = |p: &PathValue, i: usize| p.vertices.get(i).copied().unwrap_or(Point::ZERO);
        let tangent = |list: &[Vec2], i: usize| list.get(i).copied().unwrap_or(Vec2::ZERO);

        let mut vertices = Vec::with_capacity(len);
        let mut in_tangents = Vec::with_capacity(len);
        let mut out_tangents = Vec::with_capacity(len);
        for i in 0..len {
            vertices.push(point(self, i).lerp(point(other, i), t));
            in_tangents.push(tangent(&self.in_tangents, i).lerp(tangent(&other.in_tangents, i), t));
            out_tangents.push(tangent(&self.out_tangents, i).lerp(tangent(&other.out_tangents, i), t));
        }

        PathValue {
            closed: self.closed,
            vertices,
            in_tangents,
            out_tangents,
        }
    }

    /// Flatten into a polyline, `segments` line pieces per cubic span.
    ///
    /// Open paths are returned without the closing span; fills close them
    /// implicitly.
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        let segments = segments.max(1);
        let spans = if self.closed { n } else { n - 1 };

        let mut points = Vec::with_capacity(spans * segments + 1);
        points.push(self.vertices[0]);
        for i in 0..spans {
            let j = (i + 1) % n;
            let p0 = self.vertices[i];
            let p1 = p0 + self.out_tangents[i];
            let p3 = self.vertices[j];
            let p2 = p3 + self.in_tangents[j];

            let straight = self.out_tangents[i] == Vec2::ZERO && self.in_tangents[j] == Vec2::ZERO;
            if straight {
                points.push(p3);
                continue;
            }
            for step in 1..=segments {
                let s = step as f64 / segments as f64;
                points.push(cubic_point(p0, p1, p2, p3, s));
            }
        }
        if self.closed && points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points
    }
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, s: f64) -> Point {
    let u = 1.0 - s;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * s, 3.0 * u * s * s, s * s * s);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}
