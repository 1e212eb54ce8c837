//! Primitive styling: packed color storage and the per-type style whitelist.
//!
//! Color properties are stored as packed 3/4-byte RGBA sequences, never as
//! loose numbers. They are unpacked into per-channel integer lists only at
//! the API/document boundary (see [`Style::to_value`]).

use std::collections::BTreeMap;

use crate::error::{Result, VizError};
use crate::frame::PrimitiveType;
use crate::value::{Map, Value};

/// Style properties that carry packed color bytes.
pub const COLOR_PROPERTIES: [&str; 2] = ["fill_color", "stroke_color"];

/// One style property value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Packed RGB or RGBA bytes.
    Color(Vec<u8>),
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Mapping of style property name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    props: BTreeMap<String, StyleValue>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a color property from loose channel values. Packs into bytes;
    /// rejects anything but 3 (RGB) or 4 (RGBA) channels.
    pub fn color(mut self, prop: &str, channels: &[u8]) -> Result<Self> {
        self.props
            .insert(prop.to_owned(), StyleValue::Color(pack_color(channels)?));
        Ok(self)
    }

    pub fn number(mut self, prop: &str, v: f64) -> Self {
        self.props.insert(prop.to_owned(), StyleValue::Number(v));
        self
    }

    pub fn flag(mut self, prop: &str, v: bool) -> Self {
        self.props.insert(prop.to_owned(), StyleValue::Flag(v));
        self
    }

    pub fn text(mut self, prop: &str, v: &str) -> Self {
        self.props
            .insert(prop.to_owned(), StyleValue::Text(v.to_owned()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    /// Decode to the generic tree: packed colors unravel into per-channel
    /// integer lists, everything else passes through.
    pub fn to_value(&self) -> Value {
        let mut m = Map::new();
        for (prop, v) in &self.props {
            let out = match v {
                StyleValue::Color(packed) => Value::Array(unpack_color(packed)),
                StyleValue::Number(n) => Value::Float(*n),
                StyleValue::Flag(b) => Value::Bool(*b),
                StyleValue::Text(s) => Value::Str(s.clone()),
            };
            m.insert(prop.clone(), out);
        }
        Value::Map(m)
    }
}

/// Pack loose color channels into wire bytes.
pub fn pack_color(channels: &[u8]) -> Result<Vec<u8>> {
    if channels.len() != 3 && channels.len() != 4 {
        return Err(VizError::BadColor(channels.len()));
    }
    Ok(channels.to_vec())
}

/// Unpack wire bytes into per-channel integer values.
pub fn unpack_color(packed: &[u8]) -> Vec<Value> {
    packed.iter().map(|&c| Value::Int(c as i64)).collect()
}

/// Style properties legal for each primitive type. Unknown properties are
/// warned about and retained in the output, never stripped.
pub fn allowed_style_properties(t: PrimitiveType) -> &'static [&'static str] {
    match t {
        PrimitiveType::Circle => &[
            "fill_color",
            "stroke_color",
            "stroke_width",
            "radius",
            "stroked",
            "filled",
        ],
        PrimitiveType::Point => &[
            "fill_color",
            "radius_pixels",
            "point_color_mode",
            "point_color_domain",
        ],
        PrimitiveType::Polygon => &[
            "fill_color",
            "stroke_color",
            "stroke_width",
            "height",
            "extruded",
            "stroked",
            "filled",
        ],
        PrimitiveType::Polyline => &["stroke_color", "stroke_width"],
        PrimitiveType::Stadium => &[
            "fill_color",
            "stroke_color",
            "stroke_width",
            "radius",
            "stroked",
            "filled",
        ],
        PrimitiveType::Text => &[
            "fill_color",
            "font_family",
            "font_weight",
            "text_size",
            "text_rotation",
            "text_anchor",
            "text_baseline",
        ],
        PrimitiveType::Image => &[],
    }
}
