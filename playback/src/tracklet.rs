use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoopParameters};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectID(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Person,
    Vehicle,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Person, Category::Vehicle];

    /// Interprets the detector's class IDs.
    pub fn from_id(id: u32) -> Result<Self, ConfigError> {
        match id {
            1 => Ok(Category::Person),
            3 => Ok(Category::Vehicle),
            _ => Err(ConfigError::UnknownCategory(id)),
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Category::Person => 1,
            Category::Vehicle => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Person => "person",
            Category::Vehicle => "car",
        }
    }
}

/// One recorded sample of an object's position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub lng: f64,
    pub lat: f64,
    /// Milliseconds when raw; virtual timeline units after folding
    pub time: f64,
}

impl TimePoint {
    pub fn new(lng: f64, lat: f64, time: f64) -> Self {
        Self { lng, lat, time }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    points: Vec<TimePoint>,
}

impl Path {
    pub fn new(points: Vec<TimePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|pair| pair[0].time <= pair[1].time)
    }

    pub fn start_time(&self) -> Option<f64> {
        self.points.first().map(|pt| pt.time)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.points.last().map(|pt| pt.time)
    }
}

/// Something being tracked. The path lives behind an `Arc`, so handing new data to an object is
/// one pointer swap, and anybody still reading the old path keeps a consistent copy.
#[derive(Clone, Debug)]
pub struct TrackableObject {
    pub id: ObjectID,
    pub category: Category,
    path: Arc<Path>,
    sorted: bool,
}

impl TrackableObject {
    pub fn new(id: ObjectID, category: Category, raw: Path) -> Self {
        Self {
            id,
            category,
            path: Arc::new(raw),
            sorted: false,
        }
    }

    pub fn path(&self) -> &Arc<Path> {
        &self.path
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Swaps in fresh raw data. It'll have to be normalized again.
    pub fn replace_path(&mut self, raw: Path) {
        self.path = Arc::new(raw);
        self.sorted = false;
    }

    pub(crate) fn swap_path(&mut self, path: Path) {
        self.path = Arc::new(path);
    }
}

/// Sorts the object's path by time, only if that hasn't happened since the path was last
/// replaced. Ties keep their original order.
pub fn normalize(mut object: TrackableObject) -> TrackableObject {
    if object.sorted {
        return object;
    }
    let mut points = object.path.points.clone();
    points.sort_by(|a, b| a.time.total_cmp(&b.time));
    object.swap_path(Path::new(points));
    object.sorted = true;
    object
}

/// Maps every timestamp (in milliseconds) onto the virtual timeline, so a finite recording
/// replays forever. Only valid on raw timestamps; folding twice scrambles the path.
pub fn fold_to_loop(path: &Path, params: &LoopParameters) -> Path {
    Path::new(
        path.points
            .iter()
            .map(|pt| TimePoint::new(pt.lng, pt.lat, params.fold(pt.time)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn object(times: &[f64]) -> TrackableObject {
        let points = times
            .iter()
            .enumerate()
            .map(|(idx, t)| TimePoint::new(-74.0 + idx as f64 * 0.001, 40.0, *t))
            .collect();
        TrackableObject::new(ObjectID("a".to_string()), Category::Person, Path::new(points))
    }

    #[test]
    fn normalize_sorts() {
        let obj = normalize(object(&[30.0, 10.0, 20.0, 10.0]));
        assert!(obj.is_sorted());
        let times: Vec<f64> = obj.path().points().iter().map(|pt| pt.time).collect();
        assert_eq!(times, vec![10.0, 10.0, 20.0, 30.0]);
        // Stable: the first 10.0 was the second point
        assert_relative_eq!(obj.path().points()[0].lng, -73.999, epsilon = 1e-9);
        assert_relative_eq!(obj.path().points()[1].lng, -73.997, epsilon = 1e-9);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(object(&[5.0, 3.0, 9.0, 1.0]));
        let twice = normalize(once.clone());
        assert_eq!(once.path(), twice.path());
        // Nothing was re-sorted, so the same allocation is still there
        assert!(Arc::ptr_eq(once.path(), twice.path()));
    }

    #[test]
    fn replacing_resets_sorted() {
        let mut obj = normalize(object(&[2.0, 1.0]));
        obj.replace_path(Path::new(vec![
            TimePoint::new(0.0, 0.0, 9.0),
            TimePoint::new(0.0, 0.0, 8.0),
        ]));
        assert!(!obj.is_sorted());
        let obj = normalize(obj);
        assert!(obj.path().is_sorted());
    }

    #[test]
    fn fold_every_point() {
        let params = LoopParameters::from_speed(1000.0, 1000.0).unwrap();
        let path = Path::new(vec![
            TimePoint::new(-74.0, 40.0, 0.0),
            TimePoint::new(-73.95, 40.05, 500.0),
            TimePoint::new(-73.9, 40.1, 1000.0),
        ]);
        let folded = fold_to_loop(&path, &params);
        let times: Vec<f64> = folded.points().iter().map(|pt| pt.time).collect();
        assert_eq!(times, vec![0.0, 500.0, 0.0]);
        assert_eq!(folded.points()[1].lng, -73.95);
    }

    #[test]
    fn category_ids() {
        assert_eq!(Category::from_id(1), Ok(Category::Person));
        assert_eq!(Category::from_id(3), Ok(Category::Vehicle));
        assert_eq!(Category::from_id(2), Err(ConfigError::UnknownCategory(2)));
        for cat in Category::ALL {
            assert_eq!(Category::from_id(cat.id()), Ok(cat));
        }
    }
}
