//! Pose stream builder.

use hashbrown::HashMap;

use super::validate::Validator;
use crate::frame::{Category, MapOrigin, Pose};

/// Accumulates one [`Pose`] per stream. `stream()` flushes any open entry
/// before switching; the pose fields mutate only the in-progress entry.
#[derive(Debug)]
pub struct PoseBuilder {
    validator: Validator,
    stream_id: Option<String>,
    pending: Pose,
    poses: HashMap<String, Pose>,
}

impl PoseBuilder {
    pub(crate) fn new(validator: Validator) -> Self {
        PoseBuilder {
            validator,
            stream_id: None,
            pending: Pose::default(),
            poses: HashMap::new(),
        }
    }

    pub fn stream(&mut self, stream_id: &str) -> &mut Self {
        if self.stream_id.is_some() {
            self.flush();
        }
        self.stream_id = Some(stream_id.to_owned());
        self
    }

    pub fn timestamp(&mut self, timestamp: f64) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "timestamp",
            self.pending.timestamp.is_some(),
        );
        self.pending.timestamp = Some(timestamp);
        self
    }

    pub fn map_origin(&mut self, longitude: f64, latitude: f64, altitude: f64) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "map_origin",
            self.pending.map_origin.is_some(),
        );
        self.pending.map_origin = Some(MapOrigin {
            longitude,
            latitude,
            altitude,
        });
        self
    }

    pub fn position(&mut self, x: f64, y: f64, z: f64) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "position",
            self.pending.position.is_some(),
        );
        self.pending.position = Some([x, y, z]);
        self
    }

    pub fn orientation(&mut self, roll: f64, pitch: f64, yaw: f64) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "orientation",
            self.pending.orientation.is_some(),
        );
        self.pending.orientation = Some([roll, pitch, yaw]);
        self
    }

    fn has_pending(&self) -> bool {
        self.pending != Pose::default()
    }

    fn flush(&mut self) {
        if !self.has_pending() {
            self.stream_id = None;
            return;
        }
        self.validator.has_stream(self.stream_id.as_deref());
        let Some(stream_id) = self.stream_id.take() else {
            self.pending = Pose::default();
            return;
        };
        self.validator.match_metadata(&stream_id, Category::Pose);
        let pose = std::mem::take(&mut self.pending);
        self.poses.insert(stream_id, pose);
    }

    /// Flush and return the accumulated poses, or `None` when the category
    /// is empty. Does not clear accumulated streams; repeat calls with no
    /// intervening mutation return identical data.
    pub(crate) fn get_data(&mut self) -> Option<HashMap<String, Pose>> {
        if self.stream_id.is_some() {
            self.flush();
        }
        if self.poses.is_empty() {
            None
        } else {
            Some(self.poses.clone())
        }
    }
}
