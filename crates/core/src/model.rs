use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Shape, ShapeKind};
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// Series / Section
// ---------------------------------------------------------------------------

/// One reconstructed volume: an ordered stack of sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

fn default_units() -> String {
    "microns".into()
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), index: 0, units: default_units(), sections: Vec::new() }
    }

    /// Section with the given physical index.
    pub fn section(&self, index: i32) -> Option<&Section> {
        self.sections.iter().find(|s| s.index == index)
    }

    pub fn contour_count(&self) -> usize {
        self.sections.iter().map(|s| s.contours.len()).sum()
    }
}

/// One physical slice. `index` is shared by every Series of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub index: i32,
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    #[serde(default)]
    pub align_locked: bool,
    #[serde(default)]
    pub contours: Vec<Contour>,
}

fn default_thickness() -> f64 {
    0.05
}

impl Section {
    pub fn new(index: i32) -> Self {
        Self { index, thickness: default_thickness(), align_locked: false, contours: Vec::new() }
    }

    /// Same metadata, no contours.
    pub fn skeleton(&self) -> Self {
        Self {
            index: self.index,
            thickness: self.thickness,
            align_locked: self.align_locked,
            contours: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Contour
// ---------------------------------------------------------------------------

/// A single traced shape on one section.
///
/// `points` are in trace coordinates; [`Contour::shape`] maps them through
/// `transform` into section coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_closed")]
    pub closed: bool,
    #[serde(default)]
    pub mode: i32,
    #[serde(default)]
    pub border: [f64; 3],
    #[serde(default)]
    pub fill: [f64; 3],
    pub points: Vec<Point>,
    #[serde(default)]
    pub transform: Transform,
}

fn default_closed() -> bool {
    true
}

impl Contour {
    pub fn new(name: impl Into<String>, points: Vec<Point>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            comment: None,
            hidden: false,
            closed: true,
            mode: 0,
            border: [1.0, 0.0, 1.0],
            fill: [1.0, 0.0, 1.0],
            points,
            transform,
        }
    }

    /// Open polyline variant of [`Contour::new`].
    pub fn open(name: impl Into<String>, points: Vec<Point>, transform: Transform) -> Self {
        Self { closed: false, ..Self::new(name, points, transform) }
    }

    pub fn shape_kind(&self) -> ShapeKind {
        if self.closed {
            ShapeKind::Polygon
        } else {
            ShapeKind::LineString
        }
    }

    /// Outline in section coordinates.
    pub fn shape(&self) -> Shape {
        Shape::new(self.shape_kind(), &self.transform.map_points(&self.points))
    }

    /// Copy under a different name.
    pub fn renamed(&self, name: &str) -> Self {
        Self { name: name.to_string(), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(0.0, 3.0)]
    }

    #[test]
    fn shape_applies_transform() {
        let c = Contour::new("mito1", tri(), Transform::translation(10.0, 0.0));
        let shape = c.shape();
        assert_eq!(shape.kind(), ShapeKind::Polygon);
        assert_eq!(shape.coords()[1], Point::new(14.0, 0.0));
        assert_eq!(shape.area(), 6.0);
    }

    #[test]
    fn open_contour_is_a_line() {
        let c = Contour::open("axon", tri(), Transform::identity());
        assert_eq!(c.shape_kind(), ShapeKind::LineString);
    }

    #[test]
    fn renamed_leaves_original_alone() {
        let c = Contour::new("mito1", tri(), Transform::identity());
        let r = c.renamed("mito1_final");
        assert_eq!(c.name, "mito1");
        assert_eq!(r.name, "mito1_final");
        assert_eq!(r.points, c.points);
    }

    #[test]
    fn series_deserializes_with_defaults() {
        let json = r#"{
            "name": "volumeA",
            "sections": [
                { "index": 7, "contours": [
                    { "name": "d001", "points": [{"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 0, "y": 1}] }
                ]}
            ]
        }"#;
        let s: Series = serde_json::from_str(json).unwrap();
        assert_eq!(s.units, "microns");
        let section = s.section(7).unwrap();
        assert_eq!(section.contours[0].transform, Transform::identity());
        assert!(section.contours[0].closed);
        assert_eq!(s.contour_count(), 1);
        assert!(s.section(8).is_none());
    }
}
