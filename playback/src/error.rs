use thiserror::Error;

use crate::Category;

/// Something wrong with the shape of a tracklet batch. The whole batch gets rejected, and the
/// previous paths keep playing.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("malformed batch: {0}")]
    Json(#[from] serde_json::Error),
    #[error("object {object_id}: tracklet {index} has {len} values, expected [lng, lat, timestamp]")]
    TrackletShape {
        object_id: String,
        index: usize,
        len: usize,
    },
    #[error("object {object_id}: tracklet {index} isn't finite")]
    NonFinite { object_id: String, index: usize },
    #[error("object {object_id}: tracklet {index} at ({lng}, {lat}) isn't a longitude/latitude")]
    OutOfRange {
        object_id: String,
        index: usize,
        lng: f64,
        lat: f64,
    },
    #[error("object {0} appears more than once")]
    DuplicateObject(String),
}

/// Static configuration bugs. These should be caught at startup, never while ticking.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown category id {0}")]
    UnknownCategory(u32),
    #[error("no footprint template for {0:?}")]
    MissingTemplate(Category),
    #[error("bad loop parameters: loop length {loop_length}, animation speed {animation_speed}")]
    BadLoop {
        loop_length: f64,
        animation_speed: f64,
    },
    #[error("bad dimensions for {0:?}")]
    BadDimensions(Category),
}
