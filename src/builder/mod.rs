//! Fluent construction of frames and metadata.
//!
//! [`FrameBuilder`] owns one builder per category; a category entry point
//! opens the named stream on its sub-builder and hands back a mutable
//! reference, so subsequent fluent calls land on the right builder.
//! Finalization asserts the primary pose stream and assembles the
//! non-empty categories into one SNAPSHOT frame.

mod pose;
mod primitive;
mod time_series;
mod ui_primitive;
mod validate;
mod variable;

pub use pose::PoseBuilder;
pub use primitive::PrimitiveBuilder;
pub use time_series::TimeSeriesBuilder;
pub use ui_primitive::UiPrimitiveBuilder;
pub use variable::VariableBuilder;

use std::sync::Arc;

use validate::Validator;

use crate::convert;
use crate::error::{Result, VizError};
use crate::frame::{Frame, LogInfo, Metadata, StreamMetadata, UpdateType};
use crate::frame::{Category, PrimitiveType};
use crate::style::Style;
use crate::value::Value;

/// Stream that anchors each frame; exactly one pose must exist for it.
pub const PRIMARY_POSE_STREAM: &str = "/vehicle_pose";

pub struct FrameBuilder {
    metadata: Option<Arc<Metadata>>,
    pose: PoseBuilder,
    primitive: PrimitiveBuilder,
    variable: VariableBuilder,
    ui_primitive: UiPrimitiveBuilder,
    time_series: TimeSeriesBuilder,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::with_metadata(None)
    }

    /// Build frames against a shared, read-only metadata registry. Streams
    /// are cross-checked against it and mismatches warn.
    pub fn with_metadata(metadata: Option<Arc<Metadata>>) -> Self {
        let validator = Validator::new(metadata.clone());
        FrameBuilder {
            metadata,
            pose: PoseBuilder::new(validator.clone()),
            primitive: PrimitiveBuilder::new(validator.clone()),
            variable: VariableBuilder::new(validator.clone()),
            ui_primitive: UiPrimitiveBuilder::new(validator.clone()),
            time_series: TimeSeriesBuilder::new(validator),
        }
    }

    /// Open the primary pose stream.
    pub fn pose(&mut self) -> &mut PoseBuilder {
        self.pose_stream(PRIMARY_POSE_STREAM)
    }

    /// Open a named pose stream.
    pub fn pose_stream(&mut self, stream_id: &str) -> &mut PoseBuilder {
        self.pose.stream(stream_id)
    }

    pub fn primitive(&mut self, stream_id: &str) -> &mut PrimitiveBuilder {
        self.primitive.stream(stream_id)
    }

    pub fn variable(&mut self, stream_id: &str) -> &mut VariableBuilder {
        self.variable.stream(stream_id)
    }

    pub fn ui_primitive(&mut self, stream_id: &str) -> &mut UiPrimitiveBuilder {
        self.ui_primitive.stream(stream_id)
    }

    pub fn time_series(&mut self, stream_id: &str) -> &mut TimeSeriesBuilder {
        self.time_series.stream(stream_id)
    }

    /// Flush every sub-builder and assemble the frame.
    ///
    /// Fatal if the primary pose stream is absent. Repeat calls with no
    /// intervening mutation return identical frames.
    pub fn frame(&mut self) -> Result<Frame> {
        let poses = self.pose.get_data().unwrap_or_default();
        let Some(primary) = poses.get(PRIMARY_POSE_STREAM) else {
            return Err(VizError::MissingPrimaryPose(PRIMARY_POSE_STREAM));
        };
        let timestamp = match primary.timestamp {
            Some(t) => t,
            None => {
                tracing::warn!("primary pose has no timestamp, defaulting to 0.0");
                0.0
            }
        };
        Ok(Frame {
            update_type: UpdateType::Snapshot,
            timestamp,
            poses,
            primitives: self.primitive.get_data(),
            variables: self.variable.get_data(),
            ui_primitives: self.ui_primitive.get_data(),
            time_series: self.time_series.get_data(),
        })
    }

    /// Assemble the frame and wrap it in the SNAPSHOT envelope tree.
    pub fn message(&mut self) -> Result<Value> {
        let frame = self.frame()?;
        convert::message_to_value(&frame)
    }

    /// Clear all accumulated state for the next frame, keeping the shared
    /// metadata.
    pub fn reset(&mut self) {
        *self = Self::with_metadata(self.metadata.take());
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent construction of the metadata registry document.
///
/// `stream(id)` opens a declaration; the next `stream()` or `build()`
/// flushes it.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    stream_id: Option<String>,
    current: StreamMetadata,
    streams: hashbrown::HashMap<String, StreamMetadata>,
    log_info: LogInfo,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, stream_id: &str) -> Self {
        self.flush();
        self.stream_id = Some(stream_id.to_owned());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.current.category = Some(category);
        self
    }

    pub fn primitive_type(mut self, t: PrimitiveType) -> Self {
        self.current.primitive_type = Some(t);
        self
    }

    pub fn scalar_type(mut self, t: &str) -> Self {
        self.current.scalar_type = Some(t.to_owned());
        self
    }

    pub fn coordinate(mut self, coordinate: &str) -> Self {
        self.current.coordinate = Some(coordinate.to_owned());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.current.source = Some(source.to_owned());
        self
    }

    pub fn unit(mut self, units: &str) -> Self {
        self.current.units = Some(units.to_owned());
        self
    }

    pub fn stream_style(mut self, style: Style) -> Self {
        self.current.stream_style = Some(style);
        self
    }

    pub fn start_time(mut self, t: f64) -> Self {
        self.log_info.start_time = Some(t);
        self
    }

    pub fn end_time(mut self, t: f64) -> Self {
        self.log_info.end_time = Some(t);
        self
    }

    fn flush(&mut self) {
        if let Some(stream_id) = self.stream_id.take() {
            self.streams
                .insert(stream_id, std::mem::take(&mut self.current));
        }
    }

    pub fn build(mut self) -> Metadata {
        self.flush();
        Metadata {
            version: "2.0.0".to_owned(),
            streams: self.streams,
            log_info: if self.log_info.is_empty() {
                None
            } else {
                Some(self.log_info)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_primary_pose_is_fatal() {
        let mut b = FrameBuilder::new();
        b.pose_stream("/other").timestamp(1.0);
        assert!(matches!(b.frame(), Err(VizError::MissingPrimaryPose(_))));
    }

    #[test]
    fn frame_is_idempotent() {
        let mut b = FrameBuilder::new();
        b.pose().timestamp(1.0).position(1.0, 2.0, 3.0);
        b.primitive("/p").polygon(&[0.0, 0.0, 0.0]);
        let first = b.frame().unwrap();
        let second = b.frame().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_categories_are_omitted() {
        let mut b = FrameBuilder::new();
        b.pose().timestamp(1.0);
        let frame = b.frame().unwrap();
        assert!(frame.primitives.is_none());
        assert!(frame.variables.is_none());
        assert!(frame.ui_primitives.is_none());
        assert!(frame.time_series.is_none());
    }

    #[test]
    fn frame_timestamp_comes_from_primary_pose() {
        let mut b = FrameBuilder::new();
        b.pose().timestamp(42.5);
        b.pose_stream("/other").timestamp(7.0);
        let frame = b.frame().unwrap();
        assert_eq!(frame.timestamp, 42.5);
    }

    #[test]
    fn reset_clears_accumulated_streams() {
        let mut b = FrameBuilder::new();
        b.pose().timestamp(1.0);
        b.frame().unwrap();
        b.reset();
        assert!(matches!(b.frame(), Err(VizError::MissingPrimaryPose(_))));
    }

    #[test]
    fn metadata_builder_collects_streams_and_log_info() {
        let metadata = MetadataBuilder::new()
            .start_time(10.0)
            .end_time(20.0)
            .stream("/vehicle_pose")
            .category(Category::Pose)
            .stream("/lane")
            .category(Category::Primitive)
            .primitive_type(PrimitiveType::Polyline)
            .coordinate("IDENTITY")
            .build();
        assert_eq!(metadata.streams.len(), 2);
        assert_eq!(
            metadata.streams["/lane"].primitive_type,
            Some(PrimitiveType::Polyline)
        );
        assert_eq!(metadata.log_info.unwrap().start_time, Some(10.0));
    }
}
