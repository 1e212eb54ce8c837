//! Variable stream builder.
//!
//! One typed value array per (stream, object id). The value variant is
//! fixed at construction by [`VariableValues`]; a duplicate object id warns
//! and overwrites.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use super::validate::Validator;
use crate::frame::{Category, VariableEntry, VariableValues};

#[derive(Debug)]
pub struct VariableBuilder {
    validator: Validator,
    stream_id: Option<String>,
    object_id: Option<String>,
    values: Option<VariableValues>,
    // Keyed by stream, then object id, so entry order is stable.
    data: HashMap<String, BTreeMap<String, VariableEntry>>,
}

impl VariableBuilder {
    pub(crate) fn new(validator: Validator) -> Self {
        VariableBuilder {
            validator,
            stream_id: None,
            object_id: None,
            values: None,
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

    pub fn id(&mut self, object_id: &str) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "object_id",
            self.object_id.is_some(),
        );
        self.object_id = Some(object_id.to_owned());
        self
    }

    pub fn values(&mut self, values: impl Into<VariableValues>) -> &mut Self {
        self.validator
            .prop_set_once(self.stream_id.as_deref(), "values", self.values.is_some());
        self.values = Some(values.into());
        self
    }

    fn has_pending(&self) -> bool {
        self.values.is_some() && self.object_id.is_some()
    }

    fn flush(&mut self) {
        if !self.has_pending() {
            if self.values.is_some() || self.object_id.is_some() {
                self.validator.warn(&format!(
                    "stream {}: a variable entry needs both values and id",
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
        self.validator.match_metadata(&stream_id, Category::Variable);

        let (Some(object_id), Some(values)) = (self.object_id.take(), self.values.take()) else {
            self.reset_entry();
            return;
        };
        let entries = self.data.entry(stream_id.clone()).or_default();
        if entries.contains_key(&object_id) {
            self.validator.warn(&format!(
                "stream {stream_id}: values already set for id {object_id}, overwriting"
            ));
        }
        entries.insert(
            object_id.clone(),
            VariableEntry {
                values,
                object_id: Some(object_id),
            },
        );
        self.reset_entry();
    }

    fn reset_entry(&mut self) {
        self.object_id = None;
        self.values = None;
    }

    pub(crate) fn get_data(&mut self) -> Option<HashMap<String, Vec<VariableEntry>>> {
        self.flush();
        self.stream_id = None;
        if self.data.is_empty() {
            return None;
        }
        Some(
            self.data
                .iter()
                .map(|(stream_id, entries)| {
                    (stream_id.clone(), entries.values().cloned().collect())
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> VariableBuilder {
        VariableBuilder::new(Validator::default())
    }

    #[test]
    fn first_element_type_fixes_the_variant() {
        let mut b = builder();
        b.stream("/speed").id("car").values(vec![1.0, 2.0]);
        b.stream("/labels").id("car").values(vec!["a", "b"]);
        let data = b.get_data().unwrap();
        assert!(matches!(
            data["/speed"][0].values,
            VariableValues::Doubles(_)
        ));
        assert!(matches!(
            data["/labels"][0].values,
            VariableValues::Strings(_)
        ));
    }

    #[test]
    fn duplicate_id_overwrites_with_warning() {
        let mut b = builder();
        b.stream("/v").id("x").values(vec![1.0]);
        b.stream("/v").id("x").values(vec![2.0]);
        let data = b.get_data().unwrap();
        assert_eq!(data["/v"].len(), 1);
        assert_eq!(data["/v"][0].values, VariableValues::Doubles(vec![2.0]));
    }

    #[test]
    fn partial_entry_is_dropped() {
        let mut b = builder();
        b.stream("/v").values(vec![1.0]);
        assert!(b.get_data().is_none());
    }
}
