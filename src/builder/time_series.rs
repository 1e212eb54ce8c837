//! Time-series stream builder.
//!
//! Each entry is one timestamped sample. The value uses the same tagged
//! union as variables, fixed at construction.

use hashbrown::HashMap;

use super::validate::Validator;
use crate::frame::{Category, TimeSeriesEntry, VariableValues};

#[derive(Debug)]
pub struct TimeSeriesBuilder {
    validator: Validator,
    stream_id: Option<String>,
    timestamp: Option<f64>,
    value: Option<VariableValues>,
    object_id: Option<String>,
    data: HashMap<String, Vec<TimeSeriesEntry>>,
}

impl TimeSeriesBuilder {
    pub(crate) fn new(validator: Validator) -> Self {
        TimeSeriesBuilder {
            validator,
            stream_id: None,
            timestamp: None,
            value: None,
            object_id: None,
            data: HashMap::new(),
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
            self.timestamp.is_some(),
        );
        self.timestamp = Some(timestamp);
        self
    }

    pub fn value(&mut self, value: impl Into<VariableValues>) -> &mut Self {
        self.validator
            .prop_set_once(self.stream_id.as_deref(), "value", self.value.is_some());
        self.value = Some(value.into());
        self
    }

    pub fn id(&mut self, object_id: &str) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "object_id",
            self.object_id.is_some(),
        );
        self.object_id = Some(object_id.to_owned());
        self
    }

    fn has_pending(&self) -> bool {
        self.timestamp.is_some() && self.value.is_some()
    }

    fn flush(&mut self) {
        if !self.has_pending() {
            if self.timestamp.is_some() || self.value.is_some() {
                self.validator.warn(&format!(
                    "stream {}: a time-series entry needs both timestamp and value",
                    self.stream_id.as_deref().unwrap_or("<unset>")
                ));
            }
            self.reset_entry();
            return;
        }
        self.validator.has_stream(self.stream_id.as_deref());
        let Some(stream_id) = self.stream_id.clone() else {
            self.reset_entry();
            return;
        };
        self.validator
            .match_metadata(&stream_id, Category::TimeSeries);

        let (Some(timestamp), Some(values)) = (self.timestamp.take(), self.value.take()) else {
            self.reset_entry();
            return;
        };
        self.data.entry(stream_id).or_default().push(TimeSeriesEntry {
            timestamp,
            values,
            object_id: self.object_id.take(),
        });
        self.reset_entry();
    }

    fn reset_entry(&mut self) {
        self.timestamp = None;
        self.value = None;
        self.object_id = None;
    }

    pub(crate) fn get_data(&mut self) -> Option<HashMap<String, Vec<TimeSeriesEntry>>> {
        self.flush();
        self.stream_id = None;
        if self.data.is_empty() {
            None
        } else {
            Some(self.data.clone())
        }
    }
}
