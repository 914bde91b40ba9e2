use geo::Point;

use crate::ruler::Ruler;
use crate::Path;

/// Where an object is at some instant, and which way it's heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub pos: Point,
    /// Degrees clockwise from north, constant over one segment
    pub bearing: f64,
}

impl Path {
    /// None if the path isn't active at this time. The active segment is the first pair of
    /// consecutive points with `t1 <= time < t2`.
    ///
    /// This is a linear scan, not a binary search: after folding onto the loop, a path that
    /// spans the loop boundary jumps back to the start of the timeline partway through.
    pub fn interpolate(&self, time: f64) -> Option<Placement> {
        for pair in self.points().windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            if p1.time <= time && time < p2.time {
                let pos1 = Point::new(p1.lng, p1.lat);
                let pos2 = Point::new(p2.lng, p2.lat);
                let ruler = Ruler::for_segment(pos1, pos2);

                let progress = (time - p1.time) / (p2.time - p1.time);
                let distance = ruler.distance(pos1, pos2);
                return Some(Placement {
                    pos: ruler.along(pos1, pos2, progress * distance),
                    bearing: ruler.bearing(pos1, pos2),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::TimePoint;

    fn path(points: &[(f64, f64, f64)]) -> Path {
        Path::new(
            points
                .iter()
                .map(|(lng, lat, t)| TimePoint::new(*lng, *lat, *t))
                .collect(),
        )
    }

    #[test]
    fn too_short() {
        for t in [-1.0, 0.0, 5.0, 1e9] {
            assert_eq!(Path::default().interpolate(t), None);
            assert_eq!(path(&[(-74.0, 40.0, 0.0)]).interpolate(t), None);
        }
    }

    #[test]
    fn outside_the_span() {
        let p = path(&[(-74.0, 40.0, 100.0), (-73.9, 40.1, 200.0), (-73.8, 40.1, 300.0)]);
        assert_eq!(p.interpolate(99.999), None);
        // The end is exclusive
        assert_eq!(p.interpolate(300.0), None);
        assert_eq!(p.interpolate(1000.0), None);
        assert!(p.interpolate(100.0).is_some());
        assert!(p.interpolate(299.999).is_some());
    }

    #[test]
    fn halfway() {
        let p = path(&[(-74.0, 40.0, 0.0), (-73.9, 40.1, 1000.0)]);
        let placement = p.interpolate(500.0).unwrap();
        assert_relative_eq!(placement.pos.x(), -73.95, epsilon = 1e-9);
        assert_relative_eq!(placement.pos.y(), 40.05, epsilon = 1e-9);
        // Northeast-ish; a degree of longitude is shorter than a degree of latitude up here
        assert!(placement.bearing > 30.0 && placement.bearing < 45.0);
        // Heading doesn't change within a segment
        assert_eq!(p.interpolate(10.0).unwrap().bearing, placement.bearing);
    }

    #[test]
    fn picks_the_right_segment() {
        // East, then south
        let p = path(&[(0.0, 0.0, 0.0), (0.001, 0.0, 10.0), (0.001, -0.001, 20.0)]);
        assert_relative_eq!(p.interpolate(5.0).unwrap().bearing, 90.0, epsilon = 1e-9);
        let second = p.interpolate(15.0).unwrap();
        assert_relative_eq!(second.bearing, 180.0, epsilon = 1e-9);
        assert_relative_eq!(second.pos.y(), -0.0005, epsilon = 1e-12);
        // Exactly at a shared point, the later segment wins
        assert_relative_eq!(p.interpolate(10.0).unwrap().bearing, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn standing_still() {
        let p = path(&[(-74.0, 40.0, 0.0), (-74.0, 40.0, 10.0)]);
        let placement = p.interpolate(3.0).unwrap();
        assert_eq!(placement.pos, Point::new(-74.0, 40.0));
        assert_eq!(placement.bearing, 0.0);
    }

    #[test]
    fn duplicate_timestamps_are_skipped() {
        let p = path(&[(0.0, 0.0, 0.0), (0.0, 1.0, 5.0), (1.0, 1.0, 5.0), (1.0, 2.0, 10.0)]);
        let placement = p.interpolate(5.0).unwrap();
        assert_eq!(placement.pos, Point::new(1.0, 1.0));
    }

    #[test]
    fn wrapped_path() {
        // Folded onto a loop of length 100: the recording started near the end of one pass
        let p = path(&[(0.0, 0.0, 90.0), (0.0, 0.001, 95.0), (0.0, 0.002, 0.0), (0.0, 0.003, 5.0)]);
        assert!(p.interpolate(92.0).is_some());
        assert!(p.interpolate(2.0).is_some());
        assert_eq!(p.interpolate(50.0), None);
        assert_eq!(p.interpolate(97.0), None);
    }
}
