//! Frame and metadata conversion to the generic tree ("unravel").
//!
//! Flattened vertex arrays regroup into width-3 tuples, flattened colors
//! into width-4 tuples, and packed style colors decode into per-channel
//! integer lists. The output tree feeds both the JSON writer and the GLB
//! codec.

use crate::error::Result;
use crate::frame::{
    Frame, Geometry, LogInfo, Metadata, Pose, Primitive, PrimitiveBase, TimeSeriesEntry, TreeTable,
    VariableEntry, VariableValues,
};
use crate::value::{unravel_list, ImageData, Map, Value};

const VERTEX_WIDTH: usize = 3;
const COLOR_WIDTH: usize = 4;

/// Wrap a frame in the one-update SNAPSHOT envelope.
pub fn message_to_value(frame: &Frame) -> Result<Value> {
    let mut envelope = Map::new();
    envelope.insert(
        "update_type".to_owned(),
        Value::Str(frame.update_type.as_str().to_owned()),
    );
    envelope.insert("updates".to_owned(), Value::Array(vec![frame_to_value(frame)?]));
    Ok(Value::Map(envelope))
}

/// Convert one frame into the generic tree. Absent categories are omitted.
pub fn frame_to_value(frame: &Frame) -> Result<Value> {
    let mut m = Map::new();
    m.insert("timestamp".to_owned(), Value::Float(frame.timestamp));

    let mut poses = Map::new();
    for (stream_id, pose) in &frame.poses {
        poses.insert(stream_id.clone(), pose_to_value(pose));
    }
    m.insert("poses".to_owned(), Value::Map(poses));

    if let Some(primitives) = &frame.primitives {
        let mut streams = Map::new();
        for (stream_id, entries) in primitives {
            streams.insert(stream_id.clone(), primitive_stream_to_value(entries)?);
        }
        m.insert("primitives".to_owned(), Value::Map(streams));
    }

    if let Some(variables) = &frame.variables {
        let mut streams = Map::new();
        for (stream_id, entries) in variables {
            let list = entries.iter().map(variable_entry_to_value).collect();
            let mut wrapper = Map::new();
            wrapper.insert("variables".to_owned(), Value::Array(list));
            streams.insert(stream_id.clone(), Value::Map(wrapper));
        }
        m.insert("variables".to_owned(), Value::Map(streams));
    }

    if let Some(ui_primitives) = &frame.ui_primitives {
        let mut streams = Map::new();
        for (stream_id, table) in ui_primitives {
            streams.insert(stream_id.clone(), treetable_to_value(table));
        }
        m.insert("ui_primitives".to_owned(), Value::Map(streams));
    }

    if let Some(time_series) = &frame.time_series {
        let mut streams = Map::new();
        for (stream_id, entries) in time_series {
            let list = entries.iter().map(time_series_entry_to_value).collect();
            streams.insert(stream_id.clone(), Value::Array(list));
        }
        m.insert("time_series".to_owned(), Value::Map(streams));
    }

    Ok(Value::Map(m))
}

fn pose_to_value(pose: &Pose) -> Value {
    let mut m = Map::new();
    if let Some(t) = pose.timestamp {
        m.insert("timestamp".to_owned(), Value::Float(t));
    }
    if let Some(origin) = &pose.map_origin {
        let mut o = Map::new();
        o.insert("longitude".to_owned(), Value::Float(origin.longitude));
        o.insert("latitude".to_owned(), Value::Float(origin.latitude));
        o.insert("altitude".to_owned(), Value::Float(origin.altitude));
        m.insert("map_origin".to_owned(), Value::Map(o));
    }
    if let Some(p) = pose.position {
        m.insert("position".to_owned(), float_array(&p));
    }
    if let Some(o) = pose.orientation {
        m.insert("orientation".to_owned(), float_array(&o));
    }
    Value::Map(m)
}

/// Group a stream's primitives under `<type>s` keys, preserving append order.
fn primitive_stream_to_value(entries: &[Primitive]) -> Result<Value> {
    let mut groups = Map::new();
    for primitive in entries {
        let key = primitive.geometry.primitive_type().group_key();
        let entry = primitive_to_value(primitive)?;
        match groups
            .entry(key.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(list) => list.push(entry),
            _ => unreachable!("group values are always arrays"),
        }
    }
    Ok(Value::Map(groups))
}

fn primitive_to_value(primitive: &Primitive) -> Result<Value> {
    let mut m = Map::new();
    match &primitive.geometry {
        Geometry::Polygon { vertices, colors } | Geometry::Polyline { vertices, colors } => {
            m.insert("vertices".to_owned(), unravel_floats(vertices, VERTEX_WIDTH)?);
            if let Some(colors) = colors {
                m.insert("colors".to_owned(), unravel_colors(colors)?);
            }
        }
        Geometry::Point { points, colors } => {
            m.insert("points".to_owned(), unravel_floats(points, VERTEX_WIDTH)?);
            if let Some(colors) = colors {
                m.insert("colors".to_owned(), unravel_colors(colors)?);
            }
        }
        Geometry::Text { position, text } => {
            m.insert("position".to_owned(), float_array(position));
            m.insert("text".to_owned(), Value::Str(text.clone()));
        }
        Geometry::Circle { center, radius } => {
            m.insert("center".to_owned(), float_array(center));
            m.insert("radius".to_owned(), Value::Float(*radius));
        }
        Geometry::Stadium { start, end, radius } => {
            m.insert("start".to_owned(), float_array(start));
            m.insert("end".to_owned(), float_array(end));
            m.insert("radius".to_owned(), Value::Float(*radius));
        }
        Geometry::Image {
            data,
            width_px,
            height_px,
            position,
        } => {
            m.insert(
                "data".to_owned(),
                Value::Image(ImageData {
                    data: data.clone(),
                    mime_type: None,
                    width: *width_px,
                    height: *height_px,
                }),
            );
            if let Some(w) = width_px {
                m.insert("width_px".to_owned(), Value::Int(*w as i64));
            }
            if let Some(h) = height_px {
                m.insert("height_px".to_owned(), Value::Int(*h as i64));
            }
            if let Some(p) = position {
                m.insert("position".to_owned(), float_array(p));
            }
        }
    }

    if let Some(base) = base_to_value(&primitive.base) {
        m.insert("base".to_owned(), base);
    }
    Ok(Value::Map(m))
}

fn base_to_value(base: &PrimitiveBase) -> Option<Value> {
    if base.is_empty() {
        return None;
    }
    let mut m = Map::new();
    if let Some(id) = &base.object_id {
        m.insert("object_id".to_owned(), Value::Str(id.clone()));
    }
    if let Some(style) = &base.style {
        m.insert("style".to_owned(), style.to_value());
    }
    if let Some(classes) = &base.classes {
        m.insert(
            "classes".to_owned(),
            Value::Array(classes.iter().map(|c| Value::Str(c.clone())).collect()),
        );
    }
    Some(Value::Map(m))
}

fn variable_values_to_value(values: &VariableValues) -> Value {
    let list = match values {
        VariableValues::Doubles(v) => v.iter().map(|&x| Value::Float(x)).collect(),
        VariableValues::Strings(v) => v.iter().map(|s| Value::Str(s.clone())).collect(),
        VariableValues::Bools(v) => v.iter().map(|&b| Value::Bool(b)).collect(),
    };
    let mut m = Map::new();
    m.insert(values.field_name().to_owned(), Value::Array(list));
    Value::Map(m)
}

fn variable_entry_to_value(entry: &VariableEntry) -> Value {
    let mut m = Map::new();
    m.insert("values".to_owned(), variable_values_to_value(&entry.values));
    if let Some(id) = &entry.object_id {
        let mut base = Map::new();
        base.insert("object_id".to_owned(), Value::Str(id.clone()));
        m.insert("base".to_owned(), Value::Map(base));
    }
    Value::Map(m)
}

fn time_series_entry_to_value(entry: &TimeSeriesEntry) -> Value {
    let mut m = Map::new();
    m.insert("timestamp".to_owned(), Value::Float(entry.timestamp));
    m.insert("values".to_owned(), variable_values_to_value(&entry.values));
    if let Some(id) = &entry.object_id {
        m.insert("object_id".to_owned(), Value::Str(id.clone()));
    }
    Value::Map(m)
}

fn treetable_to_value(table: &TreeTable) -> Value {
    let columns = table
        .columns
        .iter()
        .map(|c| {
            let mut m = Map::new();
            m.insert("display_text".to_owned(), Value::Str(c.display_text.clone()));
            m.insert("type".to_owned(), Value::Str(c.column_type.clone()));
            if let Some(unit) = &c.unit {
                m.insert("unit".to_owned(), Value::Str(unit.clone()));
            }
            Value::Map(m)
        })
        .collect();
    let nodes = table
        .nodes
        .iter()
        .map(|n| {
            let mut m = Map::new();
            m.insert("id".to_owned(), Value::Int(n.id as i64));
            if let Some(parent) = n.parent {
                m.insert("parent".to_owned(), Value::Int(parent as i64));
            }
            m.insert(
                "column_values".to_owned(),
                Value::Array(n.column_values.iter().map(|v| Value::Str(v.clone())).collect()),
            );
            Value::Map(m)
        })
        .collect();

    let mut table_value = Map::new();
    table_value.insert("columns".to_owned(), Value::Array(columns));
    table_value.insert("nodes".to_owned(), Value::Array(nodes));
    let mut m = Map::new();
    m.insert("treetable".to_owned(), Value::Map(table_value));
    Value::Map(m)
}

/// Convert the metadata registry into its document tree. Stream styles get
/// the same color unpacking as primitive styles.
pub fn metadata_to_value(metadata: &Metadata) -> Value {
    let mut m = Map::new();
    m.insert("version".to_owned(), Value::Str(metadata.version.clone()));

    let mut streams = Map::new();
    for (stream_id, sm) in &metadata.streams {
        let mut s = Map::new();
        if let Some(category) = sm.category {
            s.insert("category".to_owned(), Value::Str(category.as_str().to_owned()));
        }
        if let Some(coordinate) = &sm.coordinate {
            s.insert("coordinate".to_owned(), Value::Str(coordinate.clone()));
        }
        if let Some(source) = &sm.source {
            s.insert("source".to_owned(), Value::Str(source.clone()));
        }
        if let Some(units) = &sm.units {
            s.insert("units".to_owned(), Value::Str(units.clone()));
        }
        if let Some(t) = sm.primitive_type {
            s.insert(
                "primitive_type".to_owned(),
                Value::Str(t.as_str().to_ascii_uppercase()),
            );
        }
        if let Some(t) = &sm.scalar_type {
            s.insert("scalar_type".to_owned(), Value::Str(t.to_ascii_uppercase()));
        }
        if let Some(style) = &sm.stream_style {
            s.insert("stream_style".to_owned(), style.to_value());
        }
        streams.insert(stream_id.clone(), Value::Map(s));
    }
    m.insert("streams".to_owned(), Value::Map(streams));

    if let Some(log_info) = &metadata.log_info {
        if let Some(v) = log_info_to_value(log_info) {
            m.insert("log_info".to_owned(), v);
        }
    }
    Value::Map(m)
}

fn log_info_to_value(log_info: &LogInfo) -> Option<Value> {
    if log_info.is_empty() {
        return None;
    }
    let mut m = Map::new();
    if let Some(t) = log_info.start_time {
        m.insert("start_time".to_owned(), Value::Float(t));
    }
    if let Some(t) = log_info.end_time {
        m.insert("end_time".to_owned(), Value::Float(t));
    }
    Some(Value::Map(m))
}

fn float_array(values: &[f64]) -> Value {
    Value::Array(values.iter().map(|&v| Value::Float(v)).collect())
}

fn unravel_floats(flat: &[f64], width: usize) -> Result<Value> {
    let tuples = unravel_list(flat, width)?;
    Ok(Value::Array(tuples.iter().map(|t| float_array(t)).collect()))
}

fn unravel_colors(flat: &[u8]) -> Result<Value> {
    let as_floats: Vec<f64> = flat.iter().map(|&c| c as f64).collect();
    let tuples = unravel_list(&as_floats, COLOR_WIDTH)?;
    Ok(Value::Array(
        tuples
            .iter()
            .map(|t| Value::Array(t.iter().map(|&c| Value::Int(c as i64)).collect()))
            .collect(),
    ))
}
