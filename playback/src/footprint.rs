//! Ground polygons for tracked objects, oriented along their direction of travel.

use std::collections::BTreeMap;

use geo::{LineString, Point, Polygon};

use crate::ruler::Ruler;
use crate::{Category, CategoryConfig, Config, ConfigError};

/// The size of one kind of object in degrees, figured out once at a reference latitude.
#[derive(Clone, Debug, PartialEq)]
pub struct FootprintTemplate {
    /// Half the extent along the east/west axis, in degrees of longitude
    pub half_width: f64,
    /// Half the extent along the north/south axis, in degrees of latitude
    pub half_length: f64,
    /// Top-right, bottom-right, bottom-left, top-left, relative to the center when heading north
    pub corners: [Corner; 4],
}

/// A corner of the footprint in polar form around its center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    /// Degrees clockwise from north
    pub bearing: f64,
    /// In degrees, treating longitude and latitude as a flat plane
    pub radius: f64,
}

impl Corner {
    /// (longitude, latitude) displacement from the center after the object turns to `heading`.
    pub fn offset(&self, heading: f64) -> (f64, f64) {
        let angle = (self.bearing + heading).to_radians();
        (self.radius * angle.sin(), self.radius * angle.cos())
    }
}

impl FootprintTemplate {
    pub fn from_meters(width: f64, length: f64, ruler: &Ruler) -> Self {
        let (half_width, half_length) = ruler.meters_to_degrees(width / 2.0, length / 2.0);
        let radius = half_width.hypot(half_length);
        let top_right = half_width.atan2(half_length).to_degrees();
        let corners = [
            top_right,
            180.0 - top_right,
            180.0 + top_right,
            360.0 - top_right,
        ]
        .map(|bearing| Corner { bearing, radius });
        Self {
            half_width,
            half_length,
            corners,
        }
    }

    /// The footprint centered on `center`, turned clockwise by `heading` degrees. The rotation
    /// happens in the flat longitude/latitude plane, which is fine over a few meters.
    pub fn polygon(&self, center: Point, heading: f64) -> Polygon {
        let mut ring: Vec<(f64, f64)> = self
            .corners
            .iter()
            .map(|corner| {
                let (dx, dy) = corner.offset(heading);
                (center.x() + dx, center.y() + dy)
            })
            .collect();
        ring.push(ring[0]);
        Polygon::new(LineString::from(ring), Vec::new())
    }
}

/// One template per category, built at startup and never changed.
#[derive(Clone, Debug)]
pub struct Footprints {
    templates: BTreeMap<Category, FootprintTemplate>,
}

impl Footprints {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let ruler = Ruler::new(config.reference_latitude);
        let mut templates = BTreeMap::new();
        for (category, dims) in &config.categories {
            if !valid_dimensions(dims) {
                return Err(ConfigError::BadDimensions(*category));
            }
            templates.insert(
                *category,
                FootprintTemplate::from_meters(dims.width_meters, dims.length_meters, &ruler),
            );
        }
        Ok(Self { templates })
    }

    /// Every category the data feed can send must have a template.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            self.template(category)?;
        }
        Ok(())
    }

    pub fn template(&self, category: Category) -> Result<&FootprintTemplate, ConfigError> {
        self.templates
            .get(&category)
            .ok_or(ConfigError::MissingTemplate(category))
    }

    /// The object's footprint at `pos`, heading along `bearing`.
    pub fn build(&self, pos: Point, bearing: f64, category: Category) -> Result<Polygon, ConfigError> {
        Ok(self.template(category)?.polygon(pos, bearing))
    }
}

fn valid_dimensions(dims: &CategoryConfig) -> bool {
    [dims.width_meters, dims.length_meters, dims.height_meters]
        .iter()
        .all(|x| x.is_finite() && *x > 0.0)
}
