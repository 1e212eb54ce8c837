//! Data model: streams, categories, primitives, poses, frames, metadata.
//!
//! A [`Frame`] is one timestamped snapshot of every non-empty category,
//! produced by the builders and never mutated afterwards. [`Metadata`] is
//! the process-wide stream registry, consumed read-only for consistency
//! warnings and for the metadata document.

use hashbrown::HashMap;

use crate::style::Style;

/// High-level kind of data a stream carries. Fixed per stream for the
/// session, declared once in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Pose,
    Primitive,
    Variable,
    UiPrimitive,
    TimeSeries,
    Annotation,
    FutureInstance,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pose => "POSE",
            Category::Primitive => "PRIMITIVE",
            Category::Variable => "VARIABLE",
            Category::UiPrimitive => "UI_PRIMITIVE",
            Category::TimeSeries => "TIME_SERIES",
            Category::Annotation => "ANNOTATION",
            Category::FutureInstance => "FUTURE_INSTANCE",
        }
    }
}

/// Geometric primitive kind. Determines required fields and the legal
/// style-property subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Circle,
    Image,
    Point,
    Polygon,
    Polyline,
    Stadium,
    Text,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Circle => "circle",
            PrimitiveType::Image => "image",
            PrimitiveType::Point => "point",
            PrimitiveType::Polygon => "polygon",
            PrimitiveType::Polyline => "polyline",
            PrimitiveType::Stadium => "stadium",
            PrimitiveType::Text => "text",
        }
    }

    /// Key the entries of this type group under in a stream's output.
    pub fn group_key(&self) -> &'static str {
        match self {
            PrimitiveType::Circle => "circles",
            PrimitiveType::Image => "images",
            PrimitiveType::Point => "points",
            PrimitiveType::Polygon => "polygons",
            PrimitiveType::Polyline => "polylines",
            PrimitiveType::Stadium => "stadiums",
            PrimitiveType::Text => "texts",
        }
    }
}

/// Frame update semantics. Only complete snapshots are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateType {
    #[default]
    Snapshot,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        "SNAPSHOT"
    }
}

/// Geographic anchor of a pose.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapOrigin {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

/// Per-stream, per-frame vehicle pose.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub timestamp: Option<f64>,
    pub map_origin: Option<MapOrigin>,
    pub position: Option<[f64; 3]>,
    pub orientation: Option<[f64; 3]>,
}

/// Optional identity/styling attached to a primitive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimitiveBase {
    pub object_id: Option<String>,
    pub style: Option<Style>,
    pub classes: Option<Vec<String>>,
}

impl PrimitiveBase {
    pub fn is_empty(&self) -> bool {
        self.object_id.is_none() && self.style.is_none() && self.classes.is_none()
    }
}

/// Geometry payload of one primitive, in its wire shape.
///
/// Vertex and color arrays are kept flattened here; conversion regroups
/// them into fixed-width tuples (width 3 for positions, 4 for colors).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon {
        vertices: Vec<f64>,
        colors: Option<Vec<u8>>,
    },
    Polyline {
        vertices: Vec<f64>,
        colors: Option<Vec<u8>>,
    },
    Point {
        points: Vec<f64>,
        colors: Option<Vec<u8>>,
    },
    Text {
        position: [f64; 3],
        text: String,
    },
    Circle {
        center: [f64; 3],
        radius: f64,
    },
    Stadium {
        start: [f64; 3],
        end: [f64; 3],
        radius: f64,
    },
    Image {
        data: Vec<u8>,
        width_px: Option<u32>,
        height_px: Option<u32>,
        position: Option<[f64; 3]>,
    },
}

impl Geometry {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Geometry::Polygon { .. } => PrimitiveType::Polygon,
            Geometry::Polyline { .. } => PrimitiveType::Polyline,
            Geometry::Point { .. } => PrimitiveType::Point,
            Geometry::Text { .. } => PrimitiveType::Text,
            Geometry::Circle { .. } => PrimitiveType::Circle,
            Geometry::Stadium { .. } => PrimitiveType::Stadium,
            Geometry::Image { .. } => PrimitiveType::Image,
        }
    }
}

/// One finalized visual object.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub geometry: Geometry,
    pub base: PrimitiveBase,
}

/// Typed value array; the variant is fixed at construction, so
/// heterogeneous arrays are unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValues {
    Doubles(Vec<f64>),
    Strings(Vec<String>),
    Bools(Vec<bool>),
}

impl VariableValues {
    /// Field name the values serialize under.
    pub fn field_name(&self) -> &'static str {
        match self {
            VariableValues::Doubles(_) => "doubles",
            VariableValues::Strings(_) => "strings",
            VariableValues::Bools(_) => "bools",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VariableValues::Doubles(v) => v.len(),
            VariableValues::Strings(v) => v.len(),
            VariableValues::Bools(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<f64>> for VariableValues {
    fn from(v: Vec<f64>) -> Self {
        VariableValues::Doubles(v)
    }
}

impl From<Vec<String>> for VariableValues {
    fn from(v: Vec<String>) -> Self {
        VariableValues::Strings(v)
    }
}

impl From<Vec<&str>> for VariableValues {
    fn from(v: Vec<&str>) -> Self {
        VariableValues::Strings(v.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<bool>> for VariableValues {
    fn from(v: Vec<bool>) -> Self {
        VariableValues::Bools(v)
    }
}

impl From<f64> for VariableValues {
    fn from(v: f64) -> Self {
        VariableValues::Doubles(vec![v])
    }
}

impl From<bool> for VariableValues {
    fn from(v: bool) -> Self {
        VariableValues::Bools(vec![v])
    }
}

impl From<&str> for VariableValues {
    fn from(v: &str) -> Self {
        VariableValues::Strings(vec![v.to_owned()])
    }
}

/// One typed value array for one object id within a variable stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableEntry {
    pub values: VariableValues,
    pub object_id: Option<String>,
}

/// One sample in a time-series stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesEntry {
    pub timestamp: f64,
    pub values: VariableValues,
    pub object_id: Option<String>,
}

/// Column schema of a treetable UI primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeTableColumn {
    pub display_text: String,
    pub column_type: String,
    pub unit: Option<String>,
}

/// One row node of a treetable.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeTableNode {
    pub id: u64,
    pub parent: Option<u64>,
    pub column_values: Vec<String>,
}

/// Treetable UI primitive: column schema plus row nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeTable {
    pub columns: Vec<TreeTableColumn>,
    pub nodes: Vec<TreeTableNode>,
}

/// One timestamped snapshot of every non-empty category.
///
/// Empty categories are `None`, never empty maps. The timestamp is taken
/// from the primary pose stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub update_type: UpdateType,
    pub timestamp: f64,
    pub poses: HashMap<String, Pose>,
    pub primitives: Option<HashMap<String, Vec<Primitive>>>,
    pub variables: Option<HashMap<String, Vec<VariableEntry>>>,
    pub ui_primitives: Option<HashMap<String, TreeTable>>,
    pub time_series: Option<HashMap<String, Vec<TimeSeriesEntry>>>,
}

/// Per-stream declaration in the metadata registry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamMetadata {
    pub category: Option<Category>,
    pub coordinate: Option<String>,
    pub source: Option<String>,
    pub units: Option<String>,
    pub primitive_type: Option<PrimitiveType>,
    pub scalar_type: Option<String>,
    pub stream_style: Option<Style>,
}

/// Session time bounds recorded in metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogInfo {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl LogInfo {
    pub fn is_empty(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }
}

/// Process-wide, read-only stream registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub version: String,
    pub streams: HashMap<String, StreamMetadata>,
    pub log_info: Option<LogInfo>,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            version: "2.0.0".to_owned(),
            streams: HashMap::new(),
            log_info: None,
        }
    }
}
