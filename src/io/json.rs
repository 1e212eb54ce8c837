//! Compact JSON emission with fixed-precision floats.
//!
//! Every floating-point literal is truncated to a fixed decimal precision
//! as a textual, emission-time rounding step; all other tokens pass through
//! unchanged. Binary fields stay inline on this path (typed arrays as plain
//! numeric arrays, images as base64) rather than becoming index pointers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::sources::Source;
use super::WriterState;
use crate::convert;
use crate::error::Result;
use crate::frame::{Frame, Metadata};
use crate::value::Value;

/// Default number of decimal places for float literals.
pub const DEFAULT_PRECISION: usize = 10;

/// Serialize a generic tree as compact JSON text.
pub fn to_json_string(value: &Value, precision: usize) -> String {
    let mut out = String::new();
    write_value(&mut out, value, precision);
    out
}

fn write_value(out: &mut String, value: &Value, precision: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) => write_float(out, *f, precision),
        Value::Str(s) => escape_into(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, precision);
            }
            out.push(']');
        }
        Value::Map(m) => {
            out.push('{');
            for (i, (k, v)) in m.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                escape_into(out, k);
                out.push(':');
                write_value(out, v, precision);
            }
            out.push('}');
        }
        Value::TypedArray(array) => {
            let values = array.to_values();
            write_value(out, &Value::Array(values), precision);
        }
        Value::Image(image) => {
            escape_into(out, &BASE64.encode(&image.data));
        }
    }
}

/// Emit a float truncated to `precision` decimals, trailing zeros trimmed
/// down to one fractional digit so floats stay distinguishable from ints.
///
/// At precision 0 there is no fractional part, so the formatted integer
/// text is emitted untrimmed.
fn write_float(out: &mut String, v: f64, precision: usize) {
    if !v.is_finite() {
        out.push_str("null");
        return;
    }
    let formatted = format!("{v:.precision$}");
    if precision == 0 {
        out.push_str(&formatted);
        return;
    }
    let trimmed = formatted.trim_end_matches('0');
    let trimmed = if trimmed.ends_with('.') {
        &formatted[..trimmed.len() + 1]
    } else {
        trimmed
    };
    out.push_str(trimmed);
}

/// JSON string escaping per RFC 8259.
fn escape_into(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Writes one JSON-encoded message per frame to a storage source.
pub struct JsonWriter<S: Source> {
    source: S,
    state: WriterState,
    precision: usize,
}

impl<S: Source> JsonWriter<S> {
    pub fn new(source: S) -> Self {
        JsonWriter {
            source,
            state: WriterState::new(),
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn write_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.state.check_open()?;
        self.state.record_metadata(metadata);
        let value = convert::metadata_to_value(metadata);
        let text = to_json_string(&value, self.precision);
        self.source.write("1-frame.json", text.as_bytes())
    }

    /// Encode one frame. `index` overrides the running frame counter.
    pub fn write_frame(&mut self, frame: &Frame, index: Option<u32>) -> Result<()> {
        self.state.check_open()?;
        let index = self.state.next_index(index);
        self.state.record_frame(frame.timestamp, index);
        let value = convert::message_to_value(frame)?;
        let text = to_json_string(&value, self.precision);
        self.source.write(&format!("{index}-frame.json"), text.as_bytes())
    }

    /// Write the timing index and close the source. Further writes fail.
    pub fn close(&mut self) -> Result<()> {
        if self.state.is_closed() {
            return Ok(());
        }
        let index_doc = self.state.index_document();
        self.source.write(
            WriterState::INDEX_NAME,
            to_json_string(&index_doc, self.precision).as_bytes(),
        )?;
        self.state.mark_closed();
        self.source.close();
        Ok(())
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ImageData, Map, ScalarArray};

    #[test]
    fn floats_truncate_to_precision() {
        let v = Value::Float(0.123_456_789_012_345);
        assert_eq!(to_json_string(&v, 10), "0.123456789");
        assert_eq!(to_json_string(&v, 3), "0.123");
    }

    #[test]
    fn integral_floats_keep_one_fractional_digit() {
        assert_eq!(to_json_string(&Value::Float(1.0), 10), "1.0");
        assert_eq!(to_json_string(&Value::Float(-3.0), 10), "-3.0");
    }

    #[test]
    fn precision_zero_keeps_integer_digits() {
        assert_eq!(to_json_string(&Value::Float(10.0), 0), "10");
        assert_eq!(to_json_string(&Value::Float(100.0), 0), "100");
        assert_eq!(to_json_string(&Value::Float(10.4), 0), "10");
        assert_eq!(to_json_string(&Value::Float(0.0), 0), "0");
    }

    #[test]
    fn non_numeric_tokens_pass_through() {
        let mut m = Map::new();
        m.insert("name".to_owned(), Value::Str("line \"a\"".to_owned()));
        m.insert("ok".to_owned(), Value::Bool(true));
        m.insert("n".to_owned(), Value::Int(42));
        assert_eq!(
            to_json_string(&Value::Map(m), 10),
            r#"{"n":42,"name":"line \"a\"","ok":true}"#
        );
    }

    #[test]
    fn typed_arrays_stay_plain_arrays() {
        let v = Value::TypedArray(ScalarArray::U8(vec![1, 2, 3]));
        assert_eq!(to_json_string(&v, 10), "[1,2,3]");
    }

    #[test]
    fn images_emit_base64() {
        let v = Value::Image(ImageData {
            data: vec![1, 2, 3],
            mime_type: None,
            width: None,
            height: None,
        });
        assert_eq!(to_json_string(&v, 10), "\"AQID\"");
    }

    #[test]
    fn strings_are_never_pointer_escaped() {
        // The `#` escape belongs to the GLB path only.
        let v = Value::Str("plain".to_owned());
        assert_eq!(to_json_string(&v, 10), "\"plain\"");
    }

    #[test]
    fn output_parses_as_json() {
        let mut m = Map::new();
        m.insert(
            "vertices".to_owned(),
            Value::Array(vec![Value::Float(1.5), Value::Float(2.0)]),
        );
        let text = to_json_string(&Value::Map(m), 10);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["vertices"][0], serde_json::json!(1.5));
    }
}
