//! Validation shared by the category builders.
//!
//! Two severities: warnings go to `tracing` and execution continues with
//! best-effort state repair; errors are fatal and abort the in-flight call.
//! Metadata checks are warnings only, so schema-less use stays possible.

use std::sync::Arc;

use crate::error::VizError;
use crate::frame::{Category, Metadata, PrimitiveType};
use crate::style::{allowed_style_properties, Style};

#[derive(Debug, Clone, Default)]
pub(crate) struct Validator {
    metadata: Option<Arc<Metadata>>,
}

impl Validator {
    pub fn new(metadata: Option<Arc<Metadata>>) -> Self {
        Validator { metadata }
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log and build a fatal error for the caller to return.
    pub fn error(&self, msg: impl Into<String>) -> VizError {
        let msg = msg.into();
        tracing::error!("{msg}");
        VizError::BuilderState(msg)
    }

    /// Re-setting a non-empty property warns; the new value then overwrites.
    pub fn prop_set_once(&self, stream_id: Option<&str>, prop: &str, already_set: bool) {
        if already_set {
            self.warn(&format!(
                "stream {}: {prop} has already been set",
                stream_id.unwrap_or("<unset>")
            ));
        }
    }

    /// Required-property presence check; absence is a warning.
    pub fn has_stream(&self, stream_id: Option<&str>) {
        if stream_id.is_none() {
            self.warn("stream id is missing");
        }
    }

    /// Cross-check a stream against the metadata registry. Undeclared
    /// streams and category mismatches warn but never fail.
    pub fn match_metadata(&self, stream_id: &str, category: Category) {
        let Some(metadata) = &self.metadata else {
            return;
        };
        match metadata.streams.get(stream_id) {
            None => self.warn(&format!("{stream_id} is not declared in metadata")),
            Some(declared) => {
                if let Some(declared_category) = declared.category {
                    if declared_category != category {
                        self.warn(&format!(
                            "stream {stream_id} category {} does not match metadata declaration {}",
                            category.as_str(),
                            declared_category.as_str()
                        ));
                    }
                }
            }
        }
    }

    /// Warn about style properties outside the whitelist for the primitive
    /// type. Offenders are named and retained in the output, never stripped.
    pub fn check_style(&self, stream_id: Option<&str>, ptype: PrimitiveType, style: &Style) {
        let allowed = allowed_style_properties(ptype);
        let offenders: Vec<&str> = style
            .property_names()
            .filter(|p| !allowed.contains(p))
            .collect();
        if !offenders.is_empty() {
            self.warn(&format!(
                "invalid style properties [{}] for {} stream {}",
                offenders.join(", "),
                ptype.as_str(),
                stream_id.unwrap_or("<unset>")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StreamMetadata;

    fn metadata_with_pose_stream() -> Arc<Metadata> {
        let mut metadata = Metadata::default();
        metadata.streams.insert(
            "/vehicle_pose".to_owned(),
            StreamMetadata {
                category: Some(Category::Pose),
                ..Default::default()
            },
        );
        Arc::new(metadata)
    }

    #[test]
    fn error_carries_message() {
        let v = Validator::default();
        let err = v.error("bad call");
        assert!(err.to_string().contains("bad call"));
    }

    #[test]
    fn metadata_checks_never_fail() {
        // Undeclared stream and category mismatch both only warn.
        let v = Validator::new(Some(metadata_with_pose_stream()));
        v.match_metadata("/undeclared", Category::Primitive);
        v.match_metadata("/vehicle_pose", Category::Variable);
    }
}
