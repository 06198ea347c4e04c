use proptest::prelude::*;

use tracemerge_core::{GeometryProvider, PlanarGeometry, Point, Shape};

fn rect(x: i32, y: i32, w: u8, h: u8) -> Shape {
    let (x, y) = (x as f64, y as f64);
    let (w, h) = (w.max(1) as f64, h.max(1) as f64);
    Shape::polygon(&[
        Point::new(x, y),
        Point::new(x + w, y),
        Point::new(x + w, y + h),
        Point::new(x, y + h),
    ])
}

fn rect_strategy() -> impl Strategy<Value = Shape> {
    (-20i32..20, -20i32..20, 1u8..15, 1u8..15).prop_map(|(x, y, w, h)| rect(x, y, w, h))
}

fn line_strategy() -> impl Strategy<Value = Shape> {
    prop::collection::vec((-20i32..20, -20i32..20), 2..6).prop_filter_map("distinct endpoints", |pts| {
        let points: Vec<Point> = pts.iter().map(|&(x, y)| Point::new(x as f64, y as f64)).collect();
        let shape = Shape::line(&points);
        shape.validate().ok().map(|_| shape)
    })
}

proptest! {
    #[test]
    fn contacts_is_symmetric_for_polygons(a in rect_strategy(), b in rect_strategy()) {
        let g = PlanarGeometry::default();
        prop_assert_eq!(g.contacts(&a, &b).unwrap(), g.contacts(&b, &a).unwrap());
    }

    #[test]
    fn contacts_is_symmetric_for_lines(a in line_strategy(), b in line_strategy()) {
        let g = PlanarGeometry::default();
        prop_assert_eq!(g.contacts(&a, &b).unwrap(), g.contacts(&b, &a).unwrap());
    }

    #[test]
    fn overlap_ratio_is_bounded_and_symmetric(a in rect_strategy(), b in rect_strategy()) {
        let g = PlanarGeometry::default();
        let ab = g.overlap_ratio(&a, &b).unwrap();
        let ba = g.overlap_ratio(&b, &a).unwrap();
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn rectangle_overlap_matches_closed_form(
        (x1, y1, w1, h1) in (-20i32..20, -20i32..20, 1u8..15, 1u8..15),
        (x2, y2, w2, h2) in (-20i32..20, -20i32..20, 1u8..15, 1u8..15),
    ) {
        let a = rect(x1, y1, w1, h1);
        let b = rect(x2, y2, w2, h2);
        let ix = ((x1 + w1 as i32).min(x2 + w2 as i32) - x1.max(x2)).max(0) as f64;
        let iy = ((y1 + h1 as i32).min(y2 + h2 as i32) - y1.max(y2)).max(0) as f64;
        let inter = ix * iy;
        let union = a.area() + b.area() - inter;
        let g = PlanarGeometry::default();
        let ratio = g.overlap_ratio(&a, &b).unwrap();
        prop_assert!((ratio - inter / union).abs() < 1e-9, "ratio {} expected {}", ratio, inter / union);
    }

    #[test]
    fn a_shape_is_an_exact_duplicate_of_itself(a in rect_strategy()) {
        let g = PlanarGeometry::default();
        prop_assert!(g.contacts(&a, &a).unwrap());
        prop_assert!(g.is_exact_duplicate(&a, &a).unwrap());
    }
}
