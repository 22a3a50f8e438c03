use crate::band::{band_for, Band};
use crate::models::Factors;
use serde::Serialize;

/// Axis angles in degrees: demographic, behavior, engagement.
pub const AXIS_ANGLES_DEG: [f64; 3] = [-90.0, 30.0, 150.0];

pub const DEFAULT_CENTER: Point = Point { x: 60.0, y: 60.0 };
pub const DEFAULT_RADIUS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Drawing canvas for the radar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarCanvas {
    pub center: Point,
    pub radius: f64,
}

impl Default for RadarCanvas {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            radius: DEFAULT_RADIUS,
        }
    }
}

impl RadarCanvas {
    /// Builds a canvas, falling back to defaults for non-finite or negative values.
    pub fn new(cx: Option<f64>, cy: Option<f64>, radius: Option<f64>) -> Self {
        let finite = |v: Option<f64>, default: f64| v.filter(|v| v.is_finite()).unwrap_or(default);
        Self {
            center: Point {
                x: finite(cx, DEFAULT_CENTER.x),
                y: finite(cy, DEFAULT_CENTER.y),
            },
            radius: radius
                .filter(|r| r.is_finite() && *r >= 0.0)
                .unwrap_or(DEFAULT_RADIUS),
        }
    }
}

/// Radar polygon plus the color derived from the factor average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadarGeometry {
    /// Demographic, behavior and engagement vertices.
    pub points: [Point; 3],
    /// Mean of the three factors on the 0-100 scale.
    pub average: f64,
    /// Band of the factor average (not of the lead's composite score).
    pub band: Band,
    pub color: &'static str,
}

impl RadarGeometry {
    /// Vertices formatted for an SVG `points` attribute.
    pub fn svg_points(&self) -> String {
        self.points
            .iter()
            .map(|p| format!("{:.2},{:.2}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Scales a factor to `[0, 1]`. Non-finite values count as 0.
pub fn normalize_factor(value: f64) -> f64 {
    if value.is_finite() {
        (value / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Computes the radar vertices for a set of factors on the given canvas.
///
/// Axes sit 120° apart starting at the top: demographic at -90°, behavior at
/// +30° and engagement at +150°. Each factor is scaled to `[0, 1]` along its
/// axis.
pub fn radar(factors: &Factors, canvas: RadarCanvas) -> RadarGeometry {
    let values = [
        normalize_factor(factors.demographic),
        normalize_factor(factors.behavior),
        normalize_factor(factors.engagement),
    ];

    let mut points = [canvas.center; 3];
    for (i, value) in values.iter().enumerate() {
        let angle = AXIS_ANGLES_DEG[i].to_radians();
        points[i] = Point {
            x: canvas.center.x + canvas.radius * value * angle.cos(),
            y: canvas.center.y + canvas.radius * value * angle.sin(),
        };
    }

    let average = values.iter().sum::<f64>() / 3.0 * 100.0;
    let band = band_for(average);

    RadarGeometry {
        points,
        average,
        band,
        color: band.color(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn factors(d: f64, b: f64, e: f64) -> Factors {
        Factors {
            demographic: d,
            behavior: b,
            engagement: e,
        }
    }

    #[test]
    fn test_zero_factors_collapse_to_center() {
        let geometry = radar(&factors(0.0, 0.0, 0.0), RadarCanvas::default());
        for p in geometry.points {
            assert!((p.x - DEFAULT_CENTER.x).abs() < EPS);
            assert!((p.y - DEFAULT_CENTER.y).abs() < EPS);
        }
        assert_eq!(geometry.band, Band::Ice);
        assert_eq!(geometry.average, 0.0);
    }

    #[test]
    fn test_full_factors_lie_on_circle() {
        let canvas = RadarCanvas::new(Some(100.0), Some(80.0), Some(40.0));
        let geometry = radar(&factors(100.0, 100.0, 100.0), canvas);
        for p in geometry.points {
            let dist = ((p.x - 100.0).powi(2) + (p.y - 80.0).powi(2)).sqrt();
            assert!((dist - 40.0).abs() < EPS, "distance {}", dist);
        }
        assert_eq!(geometry.band, Band::Hot);
    }

    #[test]
    fn test_axis_directions() {
        let geometry = radar(&factors(100.0, 100.0, 100.0), RadarCanvas::default());
        let [top, lower_right, lower_left] = geometry.points;
        assert!((top.x - 60.0).abs() < EPS);
        assert!((top.y - 10.0).abs() < EPS);
        assert!(lower_right.x > 60.0 && lower_right.y > 60.0);
        assert!(lower_left.x < 60.0 && lower_left.y > 60.0);
    }

    #[test]
    fn test_color_follows_factor_average() {
        // average 60 -> WARM
        let geometry = radar(&factors(30.0, 60.0, 90.0), RadarCanvas::default());
        assert!((geometry.average - 60.0).abs() < EPS);
        assert_eq!(geometry.band, Band::Warm);
        assert_eq!(geometry.color, Band::Warm.color());
    }

    #[test]
    fn test_out_of_range_factors_are_clamped() {
        let geometry = radar(&factors(250.0, -10.0, f64::NAN), RadarCanvas::default());
        let [top, lower_right, lower_left] = geometry.points;
        assert!((top.y - 10.0).abs() < EPS);
        assert!((lower_right.x - 60.0).abs() < EPS);
        assert!((lower_left.x - 60.0).abs() < EPS);
    }

    #[test]
    fn test_invalid_canvas_uses_defaults() {
        let canvas = RadarCanvas::new(Some(f64::NAN), None, Some(-3.0));
        assert_eq!(canvas, RadarCanvas::default());
    }

    #[test]
    fn test_svg_points_format() {
        let geometry = radar(&factors(0.0, 0.0, 0.0), RadarCanvas::default());
        assert_eq!(geometry.svg_points(), "60.00,60.00 60.00,60.00 60.00,60.00");
    }
}
