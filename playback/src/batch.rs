//! Tracklet batches, as the data feed sends them.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{BatchError, BatchQuery, ObjectID, Path, TimePoint};

/// One object's samples. Each tracklet is `[longitude, latitude, timestamp_ms]`, in any order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub object_id: String,
    /// The detector's class ID. Some feeds still call this `detection_class_id`.
    #[serde(alias = "detection_class_id")]
    pub category_id: u32,
    pub tracklets: Vec<Vec<f64>>,
}

impl Record {
    pub fn id(&self) -> ObjectID {
        ObjectID(self.object_id.clone())
    }

    /// The raw path, in the order it was recorded. Only call on validated records.
    pub fn path(&self) -> Path {
        Path::new(
            self.tracklets
                .iter()
                .filter(|t| t.len() == 3)
                .map(|t| TimePoint::new(t[0], t[1], t[2]))
                .collect(),
        )
    }

    fn validate(&self) -> Result<(), BatchError> {
        for (index, tracklet) in self.tracklets.iter().enumerate() {
            if tracklet.len() != 3 {
                return Err(BatchError::TrackletShape {
                    object_id: self.object_id.clone(),
                    index,
                    len: tracklet.len(),
                });
            }
            if !tracklet.iter().all(|x| x.is_finite()) {
                return Err(BatchError::NonFinite {
                    object_id: self.object_id.clone(),
                    index,
                });
            }
            let (lng, lat) = (tracklet[0], tracklet[1]);
            if lng.abs() > 180.0 || lat.abs() > 90.0 {
                return Err(BatchError::OutOfRange {
                    object_id: self.object_id.clone(),
                    index,
                    lng,
                    lat,
                });
            }
        }
        Ok(())
    }
}

/// A validated set of records. Every record has well-formed tracklets and a distinct object ID.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    /// Parses a JSON array of records. Any problem rejects the entire batch.
    pub fn parse(json: &str) -> Result<Self, BatchError> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<Record>) -> Result<Self, BatchError> {
        let mut seen = BTreeSet::new();
        for record in &records {
            record.validate()?;
            if !seen.insert(record.object_id.as_str()) {
                return Err(BatchError::DuplicateObject(record.object_id.clone()));
            }
        }
        Ok(Self { records })
    }

    pub fn load(path: &str) -> Result<Self> {
        let json = fs_err::read_to_string(path)?;
        let batch = Self::parse(&json).with_context(|| format!("parsing {path}"))?;
        info!("Loaded {} records from {path}", batch.records.len());
        Ok(batch)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Combines batches, like several recordings played together. Later batches win when an
    /// object shows up more than once.
    pub fn merge(batches: Vec<Batch>) -> Batch {
        let mut records: Vec<Record> = Vec::new();
        for batch in batches {
            for record in batch.records {
                records.retain(|r| r.object_id != record.object_id);
                records.push(record);
            }
        }
        Batch { records }
    }

    /// The earliest tracklet timestamp anywhere in the batch.
    pub fn start_time(&self) -> Option<f64> {
        self.records
            .iter()
            .flat_map(|r| r.tracklets.iter().map(|t| t[2]))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Only the tracklets with `query.timestamp <= time < query.timestamp + query.range`, dropping
    /// objects with nothing left. This is what a feed sends back for one query.
    pub fn window(&self, query: &BatchQuery) -> Batch {
        let end = query.timestamp + query.range;
        let records = self
            .records
            .iter()
            .filter_map(|r| {
                let tracklets: Vec<Vec<f64>> = r
                    .tracklets
                    .iter()
                    .filter(|t| query.timestamp <= t[2] && t[2] < end)
                    .cloned()
                    .collect();
                if tracklets.is_empty() {
                    None
                } else {
                    Some(Record {
                        object_id: r.object_id.clone(),
                        category_id: r.category_id,
                        tracklets,
                    })
                }
            })
            .collect();
        Batch { records }
    }
}
