use tracemerge_core::{Contour, GeometryError, GeometryProvider, MatchType, Shape};

/// A contour with its section-space outline computed once.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub contour: &'a Contour,
    pub shape: Shape,
}

impl<'a> Candidate<'a> {
    pub fn new(contour: &'a Contour) -> Self {
        Self { contour, shape: contour.shape() }
    }
}

/// Classify one contour pair.
///
/// Rules, first hit wins:
/// - different names or shape kinds: no match
/// - same raw points under a different transform: `PotentialRealigned`
/// - shapes not in contact: no match
/// - exact duplicate: `Exact`
/// - potential duplicate: `Potential`
pub fn classify(
    a: &Contour,
    b: &Contour,
    geometry: &dyn GeometryProvider,
) -> Result<Option<MatchType>, GeometryError> {
    classify_candidates(&Candidate::new(a), &Candidate::new(b), geometry)
}

pub fn classify_candidates(
    a: &Candidate<'_>,
    b: &Candidate<'_>,
    geometry: &dyn GeometryProvider,
) -> Result<Option<MatchType>, GeometryError> {
    if a.contour.name != b.contour.name || a.shape.kind() != b.shape.kind() {
        return Ok(None);
    }

    if a.contour.points == b.contour.points && a.contour.transform != b.contour.transform {
        return Ok(Some(MatchType::PotentialRealigned));
    }

    if !geometry.contacts(&a.shape, &b.shape)? {
        return Ok(None);
    }
    if geometry.is_exact_duplicate(&a.shape, &b.shape)? {
        return Ok(Some(MatchType::Exact));
    }
    if geometry.is_potential_duplicate(&a.shape, &b.shape)? {
        return Ok(Some(MatchType::Potential));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
