//! Everything being played back: the clock, the tracked objects, and turning the two into
//! polygons every frame.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use geojson::{Feature, FeatureCollection, GeoJson};

use crate::{
    fold_to_loop, normalize, Batch, BatchError, Category, CategoryConfig, Config, ConfigError,
    Footprints, LoopParameters, ObjectID, Path, TrackableObject, VirtualClock,
};

pub struct Scene {
    pub clock: VirtualClock,
    loop_params: LoopParameters,
    footprints: Footprints,
    styles: BTreeMap<Category, CategoryConfig>,
    objects: BTreeMap<ObjectID, TrackableObject>,
    min_zoom: f64,
    /// None until a map reports its zoom; everything is drawn until then
    zoom: Option<f64>,
}

/// What one tick produced.
#[derive(Clone, Debug)]
pub struct Frame {
    pub timestamp_ms: f64,
    /// Where the clock lands on the loop
    pub virtual_time: f64,
    pub features: BTreeMap<ObjectID, Feature>,
}

impl Scene {
    /// Fails if the loop parameters are nonsense or some category has no footprint.
    pub fn new(config: &Config, clock: VirtualClock) -> Result<Self, ConfigError> {
        let loop_params = config.loop_parameters()?;
        let footprints = Footprints::new(config)?;
        footprints.validate()?;
        Ok(Self {
            clock,
            loop_params,
            footprints,
            styles: config.categories.clone(),
            objects: BTreeMap::new(),
            min_zoom: config.min_zoom,
            zoom: None,
        })
    }

    /// Replaces every object with the contents of the batch. Objects missing from the batch
    /// disappear. Returns how many objects are now tracked.
    pub fn apply_batch(&mut self, batch: &Batch) -> usize {
        let mut objects = BTreeMap::new();
        for record in batch.records() {
            let category = match Category::from_id(record.category_id) {
                Ok(category) => category,
                Err(err) => {
                    error!("Skipping object {}: {}", record.object_id, err);
                    continue;
                }
            };
            let mut object =
                normalize(TrackableObject::new(record.id(), category, record.path()));
            let folded = fold_to_loop(object.path(), &self.loop_params);
            object.swap_path(folded);
            objects.insert(object.id.clone(), object);
        }
        // One swap, so a frame never sees half of the batch
        self.objects = objects;
        debug!("Now tracking {} objects", self.objects.len());
        self.objects.len()
    }

    /// Parses and applies a raw batch. A malformed batch leaves the current objects alone.
    pub fn receive(&mut self, json: &str) -> Result<usize, BatchError> {
        match Batch::parse(json) {
            Ok(batch) => Ok(self.apply_batch(&batch)),
            Err(err) => {
                warn!(
                    "Ignoring batch, still playing {} objects: {}",
                    self.objects.len(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Applies everything waiting in the channel, without blocking. Returns how many batches
    /// arrived.
    pub fn drain(&mut self, rx: &Receiver<Batch>) -> usize {
        let mut count = 0;
        for batch in rx.try_iter() {
            self.apply_batch(&batch);
            count += 1;
        }
        count
    }

    /// Runs the clock forward and figures out where everything is.
    pub fn tick(&mut self, elapsed_ms: f64) -> Frame {
        let timestamp_ms = self.clock.advance(elapsed_ms);
        self.frame_at(timestamp_ms)
    }

    /// Like `tick`, but without moving the clock. Useful while a hand is dragged.
    pub fn frame(&self) -> Frame {
        self.frame_at(self.clock.timestamp_ms())
    }

    fn frame_at(&self, timestamp_ms: f64) -> Frame {
        let virtual_time = self.loop_params.fold(timestamp_ms);
        Frame {
            timestamp_ms,
            virtual_time,
            features: self.render(virtual_time),
        }
    }

    /// A footprint for every object active at this point on the loop.
    pub fn render(&self, virtual_time: f64) -> BTreeMap<ObjectID, Feature> {
        let mut features = BTreeMap::new();
        if !self.is_visible() {
            return features;
        }
        for (id, object) in &self.objects {
            // Hold onto this version of the path, even if a refresh swaps it out meanwhile
            let path = Arc::clone(object.path());
            let placement = match path.interpolate(virtual_time) {
                Some(placement) => placement,
                None => continue,
            };
            let polygon = match self
                .footprints
                .build(placement.pos, placement.bearing, object.category)
            {
                Ok(polygon) => polygon,
                Err(err) => {
                    error!("Can't draw {}: {}", id.0, err);
                    continue;
                }
            };

            let ring = polygon
                .exterior()
                .coords()
                .map(|c| vec![c.x, c.y])
                .collect();
            let mut feature = Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))),
                id: None,
                properties: None,
                foreign_members: None,
            };
            feature.set_property("category", object.category.name());
            feature.set_property("id", id.0.clone());
            if let Some(style) = self.styles.get(&object.category) {
                feature.set_property("color", style.color.clone());
                feature.set_property("height", style.height_meters);
            }
            features.insert(id.clone(), feature);
        }
        features
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = Some(zoom);
    }

    pub fn is_visible(&self) -> bool {
        self.zoom.map(|z| z >= self.min_zoom).unwrap_or(true)
    }

    /// The folded path currently playing for an object.
    pub fn path(&self, id: &ObjectID) -> Option<Arc<Path>> {
        self.objects.get(id).map(|obj| Arc::clone(obj.path()))
    }

    pub fn objects(&self) -> impl Iterator<Item = &TrackableObject> {
        self.objects.values()
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn loop_parameters(&self) -> LoopParameters {
        self.loop_params
    }
}

impl Frame {
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.values().cloned().collect(),
            foreign_members: None,
        }
    }

    pub fn to_geojson(&self) -> GeoJson {
        GeoJson::FeatureCollection(self.to_feature_collection())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    // With a 1 second loop of length 1000, virtual time is just milliseconds past the second
    fn scene() -> Scene {
        let config = Config {
            loop_length: 1000.0,
            animation_speed: 1000.0,
            ..Default::default()
        };
        Scene::new(&config, VirtualClock::from_timestamp_ms(0.0).unwrap()).unwrap()
    }

    const BATCH: &str = r#"[
        {"object_id": "walker", "category_id": 1, "tracklets": [[-73.9, 40.1, 800], [-74.0, 40.0, 0]]},
        {"object_id": "car", "category_id": 3, "tracklets": [[-74.0, 40.0, 500], [-74.0, 40.001, 900]]},
        {"object_id": "bike", "category_id": 2, "tracklets": [[-74.0, 40.0, 0], [-74.0, 40.001, 900]]},
        {"object_id": "parked", "category_id": 3, "tracklets": [[-74.0, 40.0, 100]]}
    ]"#;

    #[test]
    fn unknown_category_skipped() {
        let mut scene = scene();
        assert_eq!(scene.receive(BATCH).unwrap(), 3);
        assert!(scene.path(&ObjectID("bike".to_string())).is_none());
    }

    #[test]
    fn single_point_is_kept_but_never_drawn() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let parked = ObjectID("parked".to_string());
        assert_eq!(scene.path(&parked).map(|p| p.len()), Some(1));
        for elapsed in [0.0, 100.0, 50.0, 300.0, 500.0] {
            let frame = scene.tick(elapsed);
            assert!(!frame.features.contains_key(&parked));
        }
    }

    #[test]
    fn out_of_range_object_rejects_the_batch() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let huge = r#"[
            {"object_id": "walker", "category_id": 1, "tracklets": [[-74.0, 40.0, 0], [-73.9, 40.1, 800]]},
            {"object_id": "broken", "category_id": 3, "tracklets": [[1e300, 40.0, 0], [-74.0, 40.0, 800]]}
        ]"#;
        assert!(matches!(
            scene.receive(huge),
            Err(BatchError::OutOfRange { .. })
        ));
        let polar = r#"[{"object_id": "broken", "category_id": 3, "tracklets": [[500, 95, 0], [501, 95, 800]]}]"#;
        assert!(scene.receive(polar).is_err());

        // The previous objects keep playing
        assert_eq!(scene.num_objects(), 3);
        assert!(scene.path(&ObjectID("broken".to_string())).is_none());
        let frame = scene.tick(400.0);
        assert_eq!(frame.features.len(), 1);
    }

    #[test]
    fn tick_renders_active_objects() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let frame = scene.tick(400.0);
        assert_eq!(frame.timestamp_ms, 400.0);
        assert_relative_eq!(frame.virtual_time, 400.0, epsilon = 1e-9);
        // The car hasn't started yet
        assert_eq!(frame.features.len(), 1);

        let walker = &frame.features[&ObjectID("walker".to_string())];
        assert_eq!(
            walker.property("category").and_then(|x| x.as_str()),
            Some("person")
        );
        assert_eq!(walker.property("id").and_then(|x| x.as_str()), Some("walker"));
        assert_eq!(
            walker.property("color").and_then(|x| x.as_str()),
            Some("rgb(0, 255, 0)")
        );
        assert_eq!(walker.property("height").and_then(|x| x.as_f64()), Some(2.0));
        match walker.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Polygon(rings)) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][0], rings[0][4]);
            }
            x => panic!("not a polygon: {x:?}"),
        }

        let frame = scene.tick(200.0);
        assert_eq!(frame.features.len(), 2);
        let car = &frame.features[&ObjectID("car".to_string())];
        assert_eq!(car.property("category").and_then(|x| x.as_str()), Some("car"));
    }

    #[test]
    fn paths_are_sorted_then_folded() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let path = scene.path(&ObjectID("walker".to_string())).unwrap();
        assert_eq!(path.len(), 2);
        assert_relative_eq!(path.points()[0].time, 0.0);
        assert_relative_eq!(path.points()[1].time, 800.0, epsilon = 1e-9);
        assert_eq!(path.points()[0].lng, -74.0);
    }

    #[test]
    fn malformed_batch_keeps_old_paths() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let before = scene.path(&ObjectID("walker".to_string())).unwrap();
        assert!(scene.receive("[{\"object_id\": 3}]").is_err());
        assert!(scene
            .receive(r#"[{"object_id": "walker", "category_id": 1, "tracklets": [[1, 2]]}]"#)
            .is_err());
        assert_eq!(scene.num_objects(), 3);
        let after = scene.path(&ObjectID("walker".to_string())).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn refresh_replaces_everything() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let old = scene.path(&ObjectID("walker".to_string())).unwrap();
        scene
            .receive(r#"[{"object_id": "walker", "category_id": 1, "tracklets": [[0, 0, 100], [0, 1, 200]]}]"#)
            .unwrap();
        assert_eq!(scene.num_objects(), 1);
        // Whoever grabbed the old path still sees all of it
        assert_eq!(old.len(), 2);
        assert_eq!(old.points()[0].lng, -74.0);
        let new = scene.path(&ObjectID("walker".to_string())).unwrap();
        assert_eq!(new.points()[0].lng, 0.0);
    }

    #[test]
    fn drain_the_channel() {
        let mut scene = scene();
        let (tx, rx) = crossbeam_channel::unbounded();
        assert_eq!(scene.drain(&rx), 0);
        tx.send(Batch::parse(BATCH).unwrap()).unwrap();
        tx.send(Batch::parse("[]").unwrap()).unwrap();
        assert_eq!(scene.drain(&rx), 2);
        // The empty batch came last
        assert_eq!(scene.num_objects(), 0);
    }

    #[test]
    fn zoomed_out() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        scene.clock.advance(400.0);
        scene.set_zoom(9.5);
        assert!(scene.frame().features.is_empty());
        scene.set_zoom(10.0);
        assert_eq!(scene.frame().features.len(), 1);
    }

    #[test]
    fn frozen_while_dragging() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        scene.clock.advance(400.0);
        scene.clock.begin_drag(crate::Hand::Minute, 0.0);
        let frame = scene.tick(5000.0);
        assert_eq!(frame.timestamp_ms, 400.0);
        assert_eq!(frame.features.len(), 1);
    }

    #[test]
    fn missing_template_is_fatal() {
        let mut config = Config::default();
        config.categories.remove(&Category::Vehicle);
        assert_eq!(
            Scene::new(&config, VirtualClock::now()).err(),
            Some(ConfigError::MissingTemplate(Category::Vehicle))
        );
    }

    #[test]
    fn feature_collection() {
        let mut scene = scene();
        scene.receive(BATCH).unwrap();
        let frame = scene.tick(600.0);
        let fc = frame.to_feature_collection();
        assert_eq!(fc.features.len(), 2);
        let text = frame.to_geojson().to_string();
        assert!(text.contains("FeatureCollection"));
    }
}
