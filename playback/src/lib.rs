#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod batch;
pub mod clock;
mod config;
mod error;
pub mod fetch;
pub mod footprint;
mod interpolate;
pub mod ruler;
pub mod scene;
mod tracklet;

pub use self::batch::{Batch, Record};
pub use self::clock::{Hand, HourSystem, VirtualClock};
pub use self::config::{CategoryConfig, Config, LoopParameters};
pub use self::error::{BatchError, ConfigError};
pub use self::fetch::{BatchQuery, FetchPlanner, FetchSettings};
pub use self::footprint::{FootprintTemplate, Footprints};
pub use self::interpolate::Placement;
pub use self::scene::{Frame, Scene};
pub use self::tracklet::{
    fold_to_loop, normalize, Category, ObjectID, Path, TimePoint, TrackableObject,
};
