//! UI primitive (treetable) builder.
//!
//! `treetable(columns)` is the type-selecting call; `row(...)` appends
//! nodes and is fatal before a treetable is declared.

use hashbrown::HashMap;

use super::validate::Validator;
use crate::error::Result;
use crate::frame::{Category, TreeTable, TreeTableColumn, TreeTableNode};

#[derive(Debug)]
pub struct UiPrimitiveBuilder {
    validator: Validator,
    stream_id: Option<String>,
    columns: Option<Vec<TreeTableColumn>>,
    nodes: Vec<TreeTableNode>,
    data: HashMap<String, TreeTable>,
}

impl UiPrimitiveBuilder {
    pub(crate) fn new(validator: Validator) -> Self {
        UiPrimitiveBuilder {
            validator,
            stream_id: None,
            columns: None,
            nodes: Vec::new(),
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

    /// Declare the column schema for this stream's treetable.
    pub fn treetable(&mut self, columns: Vec<TreeTableColumn>) -> &mut Self {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "columns",
            self.columns.is_some(),
        );
        self.columns = Some(columns);
        self
    }

    /// Append a root-level row.
    pub fn row(&mut self, id: u64, column_values: &[&str]) -> Result<&mut Self> {
        self.push_node(id, None, column_values)
    }

    /// Append a row nested under an existing row.
    pub fn child_row(&mut self, id: u64, parent: u64, column_values: &[&str]) -> Result<&mut Self> {
        self.push_node(id, Some(parent), column_values)
    }

    fn push_node(
        &mut self,
        id: u64,
        parent: Option<u64>,
        column_values: &[&str],
    ) -> Result<&mut Self> {
        let Some(columns) = &self.columns else {
            return Err(self.validator.error("declare a treetable() before adding rows"));
        };
        if column_values.len() != columns.len() {
            self.validator.warn(&format!(
                "stream {}: row has {} values for {} columns",
                self.stream_id.as_deref().unwrap_or("<unset>"),
                column_values.len(),
                columns.len()
            ));
        }
        self.nodes.push(TreeTableNode {
            id,
            parent,
            column_values: column_values.iter().map(|v| (*v).to_owned()).collect(),
        });
        Ok(self)
    }

    fn flush(&mut self) {
        let Some(columns) = self.columns.take() else {
            self.nodes.clear();
            return;
        };
        self.validator.has_stream(self.stream_id.as_deref());
        let Some(stream_id) = self.stream_id.clone() else {
            self.nodes.clear();
            return;
        };
        self.validator
            .match_metadata(&stream_id, Category::UiPrimitive);
        if self.data.contains_key(&stream_id) {
            self.validator.warn(&format!(
                "stream {stream_id}: treetable already set, overwriting"
            ));
        }
        self.data.insert(
            stream_id,
            TreeTable {
                columns,
                nodes: std::mem::take(&mut self.nodes),
            },
        );
    }

    pub(crate) fn get_data(&mut self) -> Option<HashMap<String, TreeTable>> {
        self.flush();
        self.stream_id = None;
        if self.data.is_empty() {
            None
        } else {
            Some(self.data.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<TreeTableColumn> {
        vec![
            TreeTableColumn {
                display_text: "Name".to_owned(),
                column_type: "string".to_owned(),
                unit: None,
            },
            TreeTableColumn {
                display_text: "Age".to_owned(),
                column_type: "int32".to_owned(),
                unit: Some("years".to_owned()),
            },
        ]
    }

    #[test]
    fn rows_nest_under_parents() {
        let mut b = UiPrimitiveBuilder::new(Validator::default());
        b.stream("/table").treetable(columns());
        b.row(0, &["root", "10"]).unwrap();
        b.child_row(1, 0, &["leaf", "2"]).unwrap();
        let data = b.get_data().unwrap();
        let table = &data["/table"];
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.nodes[1].parent, Some(0));
    }

    #[test]
    fn row_before_treetable_is_fatal() {
        let mut b = UiPrimitiveBuilder::new(Validator::default());
        b.stream("/table");
        assert!(b.row(0, &["x"]).is_err());
    }
}
