#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// --- Point ---

#[test]
fn point_new() {
    let p = Point::new(3.0, 4.0);
    assert_eq!(p.x, 3.0);
    assert_eq!(p.y, 4.0);
}

#[test]
fn point_default_is_origin() {
    assert_eq!(Point::default(), Point::new(0.0, 0.0));
}

#[test]
fn point_plus_offset() {
    let p = Point::new(1.0, 2.0) + Offset::new(10.0, -5.0);
    assert_eq!(p, Point::new(11.0, -3.0));
}

#[test]
fn point_minus_offset_undoes_plus() {
    let o = Offset::new(0.3, -7.25);
    let p = Point::new(12.5, 4.0);
    let back = (p + o) - o;
    assert!(approx_eq(back.x, p.x));
    assert!(approx_eq(back.y, p.y));
}

#[test]
fn point_scale_and_divide() {
    let p = Point::new(2.0, -4.0) * 2.5;
    assert_eq!(p, Point::new(5.0, -10.0));
    assert_eq!(p / 2.5, Point::new(2.0, -4.0));
}

// --- Offset ---

#[test]
fn offset_zero_is_zero() {
    assert!(Offset::ZERO.is_zero());
    assert!(Offset::default().is_zero());
    assert!(!Offset::new(0.0, 0.1).is_zero());
}

#[test]
fn offset_add_and_neg() {
    let a = Offset::new(1.0, 2.0);
    let b = Offset::new(-3.0, 5.0);
    assert_eq!(a + b, Offset::new(-2.0, 7.0));
    assert!((a + -a).is_zero());
}

#[test]
fn offset_scale() {
    assert_eq!(Offset::new(4.0, -2.0) * 0.5, Offset::new(2.0, -1.0));
    assert_eq!(Offset::new(4.0, -2.0) / 4.0, Offset::new(1.0, -0.5));
}

// --- Size ---

#[test]
fn size_half() {
    assert_eq!(Size::new(300.0, 200.0).half(), Offset::new(150.0, 100.0));
}

#[test]
fn size_positive_requires_both_dimensions() {
    assert!(Size::new(1.0, 1.0).is_positive());
    assert!(!Size::new(0.0, 10.0).is_positive());
    assert!(!Size::new(10.0, -1.0).is_positive());
    assert!(!Size::new(f64::NAN, 10.0).is_positive());
    assert!(!Size::new(f64::INFINITY, 10.0).is_positive());
}

#[test]
fn size_serde_roundtrip() {
    let s = Size::new(640.0, 480.0);
    let json = serde_json::to_string(&s).unwrap();
    let back: Size = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}
