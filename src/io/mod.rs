//! Output: storage sources, the GLB codec and the JSON writer.

pub mod glb;
pub mod json;
pub mod sources;

pub use glb::{GlbWriter, GltfBuilder, XVIZ_GLTF_EXTENSION};
pub use json::{JsonWriter, DEFAULT_PRECISION};
pub use sources::{DirectorySource, MemorySource, Source};

use crate::error::{Result, VizError};
use crate::frame::Metadata;
use crate::value::{Map, Value};

/// Bookkeeping shared by the frame writers: frame naming, per-frame timing
/// and the closed flag.
///
/// Metadata is written as `1-frame.<ext>`; data frames count from 2. The
/// timing index lands in `0-frame.json` at close.
#[derive(Debug)]
pub(crate) struct WriterState {
    counter: u32,
    timing: Vec<(f64, f64, u32, String)>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    closed: bool,
}

impl WriterState {
    pub const INDEX_NAME: &'static str = "0-frame.json";

    pub fn new() -> Self {
        WriterState {
            counter: 2,
            timing: Vec::new(),
            start_time: None,
            end_time: None,
            closed: false,
        }
    }

    pub fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(VizError::WriterClosed);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Next data-frame index: an explicit index bypasses the counter.
    pub fn next_index(&mut self, index: Option<u32>) -> u32 {
        match index {
            Some(i) => i,
            None => {
                let i = self.counter;
                self.counter += 1;
                i
            }
        }
    }

    pub fn record_metadata(&mut self, metadata: &Metadata) {
        if let Some(log_info) = &metadata.log_info {
            self.start_time = log_info.start_time;
            self.end_time = log_info.end_time;
        }
    }

    /// One message carries one update, so its time range collapses to the
    /// frame timestamp.
    pub fn record_frame(&mut self, timestamp: f64, index: u32) {
        self.timing
            .push((timestamp, timestamp, index, format!("{index}-frame")));
    }

    /// The `0-frame.json` document: session bounds plus per-frame timing.
    pub fn index_document(&self) -> Value {
        let mut m = Map::new();
        if let Some(t) = self.start_time {
            m.insert("start_time".to_owned(), Value::Float(t));
        }
        if let Some(t) = self.end_time {
            m.insert("end_time".to_owned(), Value::Float(t));
        }
        let timing = self
            .timing
            .iter()
            .map(|(min, max, index, name)| {
                Value::Array(vec![
                    Value::Float(*min),
                    Value::Float(*max),
                    Value::Int(*index as i64),
                    Value::Str(name.clone()),
                ])
            })
            .collect();
        m.insert("timing".to_owned(), Value::Array(timing));
        Value::Map(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frames_count_from_two() {
        let mut state = WriterState::new();
        assert_eq!(state.next_index(None), 2);
        assert_eq!(state.next_index(None), 3);
        assert_eq!(state.next_index(Some(9)), 9);
        assert_eq!(state.next_index(None), 4);
    }

    #[test]
    fn closed_state_rejects_writes() {
        let mut state = WriterState::new();
        assert!(state.check_open().is_ok());
        state.mark_closed();
        assert!(matches!(state.check_open(), Err(VizError::WriterClosed)));
    }

    #[test]
    fn index_document_collects_timing() {
        let mut state = WriterState::new();
        state.record_frame(1.5, 2);
        state.record_frame(2.5, 3);
        let Value::Map(m) = state.index_document() else {
            panic!("index should be a map");
        };
        let Value::Array(timing) = &m["timing"] else {
            panic!("timing should be an array");
        };
        assert_eq!(timing.len(), 2);
        assert_eq!(
            timing[0],
            Value::Array(vec![
                Value::Float(1.5),
                Value::Float(1.5),
                Value::Int(2),
                Value::Str("2-frame".to_owned()),
            ])
        );
    }
}
