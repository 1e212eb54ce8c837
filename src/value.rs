//! Generic nested-object tree shared by the JSON and GLB output paths.
//!
//! `serde_json::Value` cannot carry raw bytes or typed arrays, which the GLB
//! codec extracts into the BIN chunk, so the tree is crate-local. The JSON
//! writer renders `TypedArray` as a plain numeric array and `Image` as
//! base64; the GLB packer replaces both with index pointer strings.

use std::collections::BTreeMap;

use crate::error::{Result, VizError};

/// Map type backing [`Value::Map`]. BTree-backed so emitted documents have
/// deterministic key order regardless of builder-internal hash maps.
pub type Map = BTreeMap<String, Value>;

/// One node of the generic tree produced by frame/metadata conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Map(Map),
    /// Flat numeric array eligible for BIN-chunk extraction.
    TypedArray(ScalarArray),
    /// Image payload eligible for BIN-chunk extraction.
    Image(ImageData),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Flat numeric array with a known element type.
///
/// The variant determines the glTF accessor `componentType`; the tuple arity
/// is supplied separately when the array is appended to a container.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarArray {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl ScalarArray {
    pub fn len(&self) -> usize {
        match self {
            ScalarArray::I8(v) => v.len(),
            ScalarArray::U8(v) => v.len(),
            ScalarArray::I16(v) => v.len(),
            ScalarArray::U16(v) => v.len(),
            ScalarArray::U32(v) => v.len(),
            ScalarArray::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// glTF accessor `componentType` code for the element type.
    pub fn component_type(&self) -> u32 {
        match self {
            ScalarArray::I8(_) => 5120,
            ScalarArray::U8(_) => 5121,
            ScalarArray::I16(_) => 5122,
            ScalarArray::U16(_) => 5123,
            ScalarArray::U32(_) => 5125,
            ScalarArray::F32(_) => 5126,
        }
    }

    /// Raw element bytes for the BIN chunk.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ScalarArray::I8(v) => bytemuck::cast_slice(v),
            ScalarArray::U8(v) => v,
            ScalarArray::I16(v) => bytemuck::cast_slice(v),
            ScalarArray::U16(v) => bytemuck::cast_slice(v),
            ScalarArray::U32(v) => bytemuck::cast_slice(v),
            ScalarArray::F32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Elements widened to `Value` scalars, for the plain-JSON path.
    pub fn to_values(&self) -> Vec<Value> {
        match self {
            ScalarArray::I8(v) => v.iter().map(|&x| Value::Int(x as i64)).collect(),
            ScalarArray::U8(v) => v.iter().map(|&x| Value::Int(x as i64)).collect(),
            ScalarArray::I16(v) => v.iter().map(|&x| Value::Int(x as i64)).collect(),
            ScalarArray::U16(v) => v.iter().map(|&x| Value::Int(x as i64)).collect(),
            ScalarArray::U32(v) => v.iter().map(|&x| Value::Int(x as i64)).collect(),
            ScalarArray::F32(v) => v.iter().map(|&x| Value::Float(x as f64)).collect(),
        }
    }
}

/// Image payload carried through the generic tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Regroup a flattened numeric array into fixed-width tuples.
///
/// Width 3 is used for positions/vertices/points, width 4 for colors.
pub fn unravel_list(flat: &[f64], width: usize) -> Result<Vec<Vec<f64>>> {
    if width == 0 || flat.len() % width != 0 {
        return Err(VizError::BadShape {
            len: flat.len(),
            width,
        });
    }
    Ok(flat.chunks_exact(width).map(|c| c.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unravel_divides_evenly() {
        let flat = [0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 4.0, 3.0, 0.0];
        let tuples = unravel_list(&flat, 3).unwrap();
        assert_eq!(tuples.len(), 3);
        assert_eq!(tuples[1], vec![4.0, 0.0, 0.0]);
    }

    #[test]
    fn unravel_rejects_ragged_input() {
        let flat = [0.0; 10];
        assert!(matches!(
            unravel_list(&flat, 3),
            Err(VizError::BadShape { len: 10, width: 3 })
        ));
    }

    #[test]
    fn component_types_match_gltf_codes() {
        assert_eq!(ScalarArray::U8(vec![1]).component_type(), 5121);
        assert_eq!(ScalarArray::F32(vec![1.0]).component_type(), 5126);
    }

    #[test]
    fn f32_bytes_are_little_endian_on_wire() {
        let arr = ScalarArray::F32(vec![1.0]);
        assert_eq!(arr.as_bytes(), 1.0f32.to_le_bytes());
    }
}
