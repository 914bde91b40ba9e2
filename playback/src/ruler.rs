//! Fast approximations for distances and bearings around one latitude. The earth is treated as
//! flat near that latitude (an equirectangular projection using the WGS84 ellipsoid's local
//! radii), which is plenty accurate for the few meters between consecutive tracklets.

use std::f64::consts::PI;

use geo::Point;

const EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const FLATTENING: f64 = 1.0 / 298.257223563;
const ECCENTRICITY_SQUARED: f64 = FLATTENING * (2.0 - FLATTENING);
const RAD: f64 = PI / 180.0;

/// Meters per degree of longitude and latitude, at some latitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ruler {
    kx: f64,
    ky: f64,
}

impl Ruler {
    pub fn new(lat: f64) -> Self {
        let m = RAD * EQUATORIAL_RADIUS_KM * 1000.0;
        let cos = (lat * RAD).cos();
        let w2 = 1.0 / (1.0 - ECCENTRICITY_SQUARED * (1.0 - cos * cos));
        let w = w2.sqrt();
        Self {
            kx: m * w * cos,
            ky: m * w * w2 * (1.0 - ECCENTRICITY_SQUARED),
        }
    }

    /// Good for one segment; uses the latitude halfway between the points.
    pub fn for_segment(a: Point, b: Point) -> Self {
        Self::new((a.y() + b.y()) / 2.0)
    }

    /// In meters
    pub fn distance(&self, a: Point, b: Point) -> f64 {
        let dx = wrap(a.x() - b.x()) * self.kx;
        let dy = (a.y() - b.y()) * self.ky;
        (dx * dx + dy * dy).sqrt()
    }

    /// Degrees clockwise from north, in `[0, 360)`. Zero when the points coincide.
    pub fn bearing(&self, a: Point, b: Point) -> f64 {
        let dx = wrap(b.x() - a.x()) * self.kx;
        let dy = (b.y() - a.y()) * self.ky;
        let deg = dx.atan2(dy) / RAD;
        if deg < 0.0 {
            deg + 360.0
        } else {
            deg
        }
    }

    /// The point some distance in meters along the line from `a` to `b`, clamped to the line.
    pub fn along(&self, a: Point, b: Point, dist: f64) -> Point {
        let total = self.distance(a, b);
        if dist <= 0.0 || total == 0.0 {
            return a;
        }
        if dist >= total {
            return b;
        }
        let pct = dist / total;
        Point::new(
            a.x() + wrap(b.x() - a.x()) * pct,
            a.y() + (b.y() - a.y()) * pct,
        )
    }

    /// Converts a displacement in meters to degrees of (longitude, latitude).
    pub fn meters_to_degrees(&self, east: f64, north: f64) -> (f64, f64) {
        (east / self.kx, north / self.ky)
    }
}

// Longitude differences across the antimeridian, into [-180, 180)
fn wrap(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}
