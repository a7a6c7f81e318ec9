use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::Color;
use crate::easing::Easing;
use crate::error::{EngineError, EngineResult};
use crate::math::Point2D;

/// The kind of a property value. Interpolation is only defined between
/// values of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Color,
    Point,
    Text,
    Flag,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Number => write!(f, "number"),
            ValueKind::Color => write!(f, "color"),
            ValueKind::Point => write!(f, "point"),
            ValueKind::Text => write!(f, "text"),
            ValueKind::Flag => write!(f, "flag"),
        }
    }
}

/// A dynamically typed property value.
///
/// Numbers, colors and points interpolate continuously. Text and flags
/// are discrete: an animated text property holds its starting value and
/// snaps to the target when progress reaches 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Color(Color),
    Point(Point2D),
    Text(String),
    Flag(bool),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Color(_) => ValueKind::Color,
            Value::Point(_) => ValueKind::Point,
            Value::Text(_) => ValueKind::Text,
            Value::Flag(_) => ValueKind::Flag,
        }
    }

    /// Interpolate from `self` toward `to` at the given progress, remapped
    /// through `easing`.
    ///
    /// Progress outside [0, 1] clamps. At progress 0 the result equals
    /// `self`, at progress 1 it equals `to` exactly. Mismatched kinds fail
    /// with [`EngineError::InvalidInput`].
    pub fn interpolate(&self, to: &Value, progress: f64, easing: Easing) -> EngineResult<Value> {
        let t = easing.apply(progress.clamp(0.0, 1.0));
        match (self, to) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + (b - a) * t)),
            (Value::Color(a), Value::Color(b)) => Ok(Value::Color(a.lerp(b, t as f32))),
            (Value::Point(a), Value::Point(b)) => Ok(Value::Point(a.lerp(b, t))),
            // Discrete kinds hold the starting value until completion.
            (Value::Text(a), Value::Text(b)) => {
                Ok(Value::Text(if t >= 1.0 { b.clone() } else { a.clone() }))
            }
            (Value::Flag(a), Value::Flag(b)) => Ok(Value::Flag(if t >= 1.0 { *b } else { *a })),
            (from, to) => Err(EngineError::invalid_input(format!(
                "cannot interpolate {} into {}",
                from.kind(),
                to.kind()
            ))),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point2D> {
        match self {
            Value::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Color(c) => write!(f, "{c}"),
            Value::Point(p) => write!(f, "({}, {})", p.x, p.y),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<Point2D> for Value {
    fn from(p: Point2D) -> Self {
        Value::Point(p)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Flag(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_interpolation_endpoints() {
        let a = Value::Number(100.0);
        let b = Value::Number(200.0);
        for easing in Easing::all() {
            assert_eq!(a.interpolate(&b, 0.0, easing).unwrap(), a);
            assert_eq!(a.interpolate(&b, 1.0, easing).unwrap(), b);
        }
    }

    #[test]
    fn test_number_interpolation_monotonic() {
        let a = Value::Number(0.0);
        let b = Value::Number(10.0);
        for easing in Easing::all() {
            let mut prev = f64::NEG_INFINITY;
            for i in 0..=20 {
                let v = a
                    .interpolate(&b, i as f64 / 20.0, easing)
                    .unwrap()
                    .as_number()
                    .unwrap();
                assert!(v >= prev, "{:?} interpolation must be monotonic", easing);
                prev = v;
            }
        }
    }

    #[test]
    fn test_progress_clamps() {
        let a = Value::Number(0.0);
        let b = Value::Number(1.0);
        assert_eq!(a.interpolate(&b, -3.0, Easing::Linear).unwrap(), a);
        assert_eq!(a.interpolate(&b, 7.0, Easing::Linear).unwrap(), b);
    }

    #[test]
    fn test_color_interpolation() {
        let a = Value::Color(Color::BLACK);
        let b = Value::Color(Color::WHITE);
        let mid = a.interpolate(&b, 0.5, Easing::Linear).unwrap();
        let c = mid.as_color().unwrap();
        assert!((c.r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_point_interpolation() {
        let a = Value::Point(Point2D::new(0.0, 0.0));
        let b = Value::Point(Point2D::new(100.0, -100.0));
        let mid = a.interpolate(&b, 0.5, Easing::Linear).unwrap();
        assert_eq!(mid.as_point().unwrap(), Point2D::new(50.0, -50.0));
    }

    #[test]
    fn test_text_is_discrete() {
        let a = Value::from("Development");
        let b = Value::from("Updated Dev");
        assert_eq!(a.interpolate(&b, 0.99, Easing::Linear).unwrap(), a);
        assert_eq!(a.interpolate(&b, 1.0, Easing::Linear).unwrap(), b);
    }

    #[test]
    fn test_mismatched_kinds_fail() {
        let a = Value::Number(1.0);
        let b = Value::from("one");
        assert!(matches!(
            a.interpolate(&b, 0.5, Easing::Linear),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
