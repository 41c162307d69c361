//! Great-circle arc geometry.
//!
//! The segment builder asks a [`GeometryProvider`] for the polyline of each
//! new city pair. The default [`GreatCircle`] provider interpolates points
//! along the great circle and splits the result where it crosses the
//! antimeridian, so a map in a flat projection does not draw a line across
//! the whole world.

use geo::{Distance, Haversine, Point};
use serde::Serialize;

use crate::Coordinate;

/// Whether a fragment is a whole arc or one piece of a split arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FragmentKind {
    /// The full arc between the two cities
    Whole,
    /// One piece of an arc split at the antimeridian
    SplitPart,
    /// The provider does not say; schedulers fall back to the point count
    Unknown,
}

/// One polyline piece of an arc.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcFragment {
    pub points: Vec<Coordinate>,
    pub kind: FragmentKind,
}

impl ArcFragment {
    /// Create a fragment.
    pub fn new(points: Vec<Coordinate>, kind: FragmentKind) -> Self {
        Self { points, kind }
    }

    /// Number of points in the fragment.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the fragment has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Source of arc polylines between two places.
pub trait GeometryProvider {
    /// Compute the arc from `from` to `to` using `points` points.
    ///
    /// Returns one fragment, several fragments when the arc had to be
    /// split, or none when no arc exists (identical or antipodal points).
    fn arc(&self, from: Coordinate, to: Coordinate, points: usize) -> Vec<ArcFragment>;
}

/// Great-circle arcs by spherical linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreatCircle;

/// Angular distances below this are treated as degenerate.
const MIN_ANGLE: f64 = 1e-12;

fn to_unit_vector(c: Coordinate) -> [f64; 3] {
    let (lat, lon) = (c.latitude.to_radians(), c.longitude.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn from_unit_vector(v: [f64; 3]) -> Coordinate {
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    let lon = v[1].atan2(v[0]);
    Coordinate::new(lat.to_degrees(), lon.to_degrees())
}

impl GreatCircle {
    /// Interpolate `count` points from `from` to `to`, ends included.
    fn interpolate(from: Coordinate, to: Coordinate, count: usize) -> Option<Vec<Coordinate>> {
        let a = to_unit_vector(from);
        let b = to_unit_vector(to);
        let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        let cross = [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ];
        let sin_d = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        let d = sin_d.atan2(dot);
        if sin_d < MIN_ANGLE || d < MIN_ANGLE {
            return None;
        }

        let points = (0..count)
            .map(|i| {
                let f = i as f64 / (count - 1) as f64;
                let wa = ((1.0 - f) * d).sin() / sin_d;
                let wb = (f * d).sin() / sin_d;
                from_unit_vector([
                    wa * a[0] + wb * b[0],
                    wa * a[1] + wb * b[1],
                    wa * a[2] + wb * b[2],
                ])
            })
            .collect();
        Some(points)
    }

    /// Split a polyline wherever consecutive points jump across ±180°.
    ///
    /// Both pieces get an extra point on the antimeridian so the arc stays
    /// visually connected.
    fn split_at_antimeridian(points: Vec<Coordinate>) -> Vec<Vec<Coordinate>> {
        let mut pieces = Vec::new();
        let mut current: Vec<Coordinate> = Vec::with_capacity(points.len());

        for p in points {
            if let Some(&prev) = current.last() {
                let delta = p.longitude - prev.longitude;
                if delta.abs() > 180.0 {
                    // Eastward crossing when we jump from +180 towards -180
                    let edge = if delta < 0.0 { 180.0 } else { -180.0 };
                    let unwrapped = p.longitude + 2.0 * edge;
                    let t = (edge - prev.longitude) / (unwrapped - prev.longitude);
                    let lat = prev.latitude + t * (p.latitude - prev.latitude);
                    current.push(Coordinate::new(lat, edge));
                    pieces.push(std::mem::take(&mut current));
                    current.push(Coordinate::new(lat, -edge));
                }
            }
            current.push(p);
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

impl GeometryProvider for GreatCircle {
    fn arc(&self, from: Coordinate, to: Coordinate, points: usize) -> Vec<ArcFragment> {
        if points < 2 || from.key() == to.key() {
            return Vec::new();
        }
        let Some(line) = Self::interpolate(from, to, points) else {
            return Vec::new();
        };

        let pieces = Self::split_at_antimeridian(line);
        let kind = if pieces.len() > 1 {
            FragmentKind::SplitPart
        } else {
            FragmentKind::Whole
        };
        pieces
            .into_iter()
            .filter(|piece| piece.len() >= 2)
            .map(|piece| ArcFragment::new(piece, kind))
            .collect()
    }
}

/// Haversine distance between two places in meters.
pub fn great_circle_distance(a: Coordinate, b: Coordinate) -> f64 {
    let point1 = Point::new(a.longitude, a.latitude);
    let point2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(point1, point2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_endpoints() {
        let paris = Coordinate::new(48.85, 2.35);
        let rome = Coordinate::new(41.9, 12.49);
        let fragments = GreatCircle.arc(paris, rome, 100);
        assert_eq!(fragments.len(), 1);
        let arc = &fragments[0];
        assert_eq!(arc.len(), 100);
        assert_eq!(arc.kind, FragmentKind::Whole);
        let first = arc.points[0];
        let last = arc.points[99];
        assert!((first.latitude - paris.latitude).abs() < 1e-9);
        assert!((first.longitude - paris.longitude).abs() < 1e-9);
        assert!((last.latitude - rome.latitude).abs() < 1e-9);
        assert!((last.longitude - rome.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_arcs() {
        let a = Coordinate::new(10.0, 20.0);
        assert!(GreatCircle.arc(a, a, 100).is_empty());
        let antipode = Coordinate::new(-10.0, -160.0);
        assert!(GreatCircle.arc(a, antipode, 100).is_empty());
        assert!(GreatCircle.arc(a, Coordinate::new(0.0, 0.0), 1).is_empty());
    }

    #[test]
    fn test_antimeridian_split() {
        let tokyo = Coordinate::new(35.68, 139.69);
        let san_francisco = Coordinate::new(37.77, -122.42);
        let fragments = GreatCircle.arc(tokyo, san_francisco, 100);
        assert_eq!(fragments.len(), 2);
        assert!(fragments.iter().all(|f| f.kind == FragmentKind::SplitPart));
        // Each piece gains one point on the antimeridian
        assert_eq!(fragments[0].len() + fragments[1].len(), 102);
        assert_eq!(fragments[0].points.last().map(|p| p.longitude), Some(180.0));
        assert_eq!(fragments[1].points[0].longitude, -180.0);
        assert!(fragments.iter().all(|f| f.len() < 100));
    }

    #[test]
    fn test_distance() {
        let d = great_circle_distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 500.0);
    }
}
