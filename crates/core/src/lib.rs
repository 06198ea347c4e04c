//! `tracemerge-core`: data model shared by the matching engine, the entity
//! store and the CLI.
//!
//! Pure types and planar geometry. No IO, no store access.

pub mod geometry;
pub mod matching;
pub mod model;
pub mod transform;

pub use geometry::{GeometryError, GeometryProvider, PlanarGeometry, Point, Shape, ShapeKind};
pub use matching::{ContourId, ContourRef, MatchRecord, MatchType, ReviewCategory, SeriesId};
pub use model::{Contour, Section, Series};
pub use transform::Transform;
