//! GLB container codec.
//!
//! Emits the three-chunk glTF 2.0 binary layout: a 12-byte header, a JSON
//! chunk and a BIN chunk, both padded to 4-byte boundaries. Per the glTF
//! 2.0 binary rules the JSON chunk pads with spaces (`0x20`) and the BIN
//! chunk with zeros; some other GLB emitters pad both with zeros, which
//! strict glTF parsers reject. Binary-eligible
//! values (images, typed arrays) are extracted from the generic tree into
//! indexed buffer views and replaced by `#/...` pointer strings; plain
//! strings are `#`-escaped so pointers stay distinguishable.

use serde::Serialize;
use serde_json::json;

use super::json::{to_json_string, DEFAULT_PRECISION};
use super::sources::Source;
use super::WriterState;
use crate::convert;
use crate::error::{Result, VizError};
use crate::frame::{Frame, Metadata};
use crate::value::{ImageData, ScalarArray, Value};

const MAGIC_GLTF: u32 = 0x4654_6C67; // "glTF"
const MAGIC_JSON: u32 = 0x4E4F_534A; // "JSON"
const MAGIC_BIN: u32 = 0x004E_4942; // "BIN\0"
const GLTF_VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Registered glTF extension name the frame payload attaches under.
pub const XVIZ_GLTF_EXTENSION: &str = "AVS_xviz";

fn pad_to_4(len: usize) -> usize {
    (len + 3) & !3
}

#[derive(Debug, Serialize)]
struct BufferView {
    buffer: u32,
    #[serde(rename = "byteOffset")]
    byte_offset: u32,
    #[serde(rename = "byteLength")]
    byte_length: u32,
}

#[derive(Debug, Serialize)]
struct Accessor {
    #[serde(rename = "bufferView")]
    buffer_view: u32,
    #[serde(rename = "type")]
    type_: &'static str,
    #[serde(rename = "componentType")]
    component_type: u32,
    count: u32,
}

#[derive(Debug, Serialize)]
struct ImageEntry {
    #[serde(rename = "bufferView")]
    buffer_view: u32,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

/// Accessor `type` from tuple arity (1 => SCALAR, ..., 4 => VEC4).
fn accessor_type_from_arity(arity: usize) -> Result<&'static str> {
    match arity {
        1 => Ok("SCALAR"),
        2 => Ok("VEC2"),
        3 => Ok("VEC3"),
        4 => Ok("VEC4"),
        _ => Err(VizError::Unsupported("accessor arity above 4")),
    }
}

/// Incrementally builds one GLB container.
///
/// Buffer views are appended in call order, each at the running total of
/// previously appended 4-byte-padded lengths; they are never reordered or
/// coalesced.
#[derive(Debug, Default)]
pub struct GltfBuilder {
    byte_length: usize,
    source_buffers: Vec<Vec<u8>>,
    buffer_views: Vec<BufferView>,
    accessors: Vec<Accessor>,
    images: Vec<ImageEntry>,
    extensions: serde_json::Map<String, serde_json::Value>,
    extensions_used: Vec<String>,
    extensions_required: Vec<String>,
    extras: serde_json::Map<String, serde_json::Value>,
    app_data: serde_json::Map<String, serde_json::Value>,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one untyped buffer, create its `bufferView` and return the
    /// view index.
    pub fn add_buffer_view(&mut self, buffer: &[u8]) -> usize {
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: self.byte_length as u32,
            byte_length: buffer.len() as u32,
        });

        let padded_len = pad_to_4(buffer.len());
        let mut padded = buffer.to_vec();
        padded.resize(padded_len, 0);
        self.byte_length += padded_len;
        self.source_buffers.push(padded);

        self.buffer_views.len() - 1
    }

    /// Add an accessor over an existing buffer view; returns its index.
    pub fn add_accessor(
        &mut self,
        buffer_view: usize,
        arity: usize,
        component_type: u32,
        count: usize,
    ) -> Result<usize> {
        self.accessors.push(Accessor {
            buffer_view: buffer_view as u32,
            type_: accessor_type_from_arity(arity)?,
            component_type,
            count: count as u32,
        });
        Ok(self.accessors.len() - 1)
    }

    /// Add a typed array as buffer view + accessor; returns the accessor
    /// index.
    pub fn add_buffer(&mut self, array: &ScalarArray, arity: usize) -> Result<usize> {
        let buffer_view = self.add_buffer_view(array.as_bytes());
        self.add_accessor(buffer_view, arity, array.component_type(), array.len())
    }

    /// Add an image payload; returns the image index.
    pub fn add_image(&mut self, image: &ImageData) -> usize {
        let buffer_view = self.add_buffer_view(&image.data) as u32;
        self.images.push(ImageEntry {
            buffer_view,
            mime_type: image.mime_type.clone(),
            width: image.width,
            height: image.height,
        });
        self.images.len() - 1
    }

    /// Attach application data as a top-level key.
    pub fn add_application_data(&mut self, key: &str, data: serde_json::Value) {
        self.app_data.insert(key.to_owned(), data);
    }

    /// Attach application data under `extras`.
    pub fn add_extra_data(&mut self, key: &str, data: serde_json::Value) {
        self.extras.insert(key.to_owned(), data);
    }

    /// Attach a named extension and record it in `extensionsUsed`.
    pub fn add_extension(&mut self, name: &str, data: serde_json::Value) {
        self.extensions.insert(name.to_owned(), data);
        self.register_used_extension(name);
    }

    /// Attach an extension a reader must understand; also records it in
    /// `extensionsRequired`.
    pub fn add_required_extension(&mut self, name: &str, data: serde_json::Value) {
        self.add_extension(name, data);
        self.register_required_extension(name);
    }

    fn register_used_extension(&mut self, name: &str) {
        if !self.extensions_used.iter().any(|e| e == name) {
            self.extensions_used.push(name.to_owned());
        }
    }

    fn register_required_extension(&mut self, name: &str) {
        if !self.extensions_required.iter().any(|e| e == name) {
            self.extensions_required.push(name.to_owned());
        }
    }

    /// Mesh payloads are outside this container's scope.
    pub fn add_mesh(&mut self) -> Result<usize> {
        Err(VizError::Unsupported("mesh payloads"))
    }

    /// Point-cloud payloads are outside this container's scope.
    pub fn add_point_cloud(&mut self) -> Result<usize> {
        Err(VizError::Unsupported("point-cloud payloads"))
    }

    /// Walk the generic tree, extracting binary-eligible values into the
    /// BIN chunk and rebuilding everything else with identical shape.
    ///
    /// Strings that do not already contain the pointer marker `#/` are
    /// prefixed with `#`; pointer replacements use the unescaped form.
    pub fn pack_binary_json(&mut self, value: &Value) -> Result<serde_json::Value> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::Str(s) => {
                if s.contains("#/") {
                    json!(s)
                } else {
                    json!(format!("#{s}"))
                }
            }
            Value::Array(items) => {
                let packed: Result<Vec<_>> =
                    items.iter().map(|v| self.pack_binary_json(v)).collect();
                serde_json::Value::Array(packed?)
            }
            Value::Map(m) => {
                let mut packed = serde_json::Map::with_capacity(m.len());
                for (k, v) in m {
                    packed.insert(k.clone(), self.pack_binary_json(v)?);
                }
                serde_json::Value::Object(packed)
            }
            Value::Image(image) => {
                let index = self.add_image(image);
                json!(format!("#/images/{index}"))
            }
            Value::TypedArray(array) => {
                let index = self.add_buffer(array, 1)?;
                json!(format!("#/accessors/{index}"))
            }
        })
    }

    /// Total length of the BIN chunk accumulated so far (already padded).
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Assemble the final GLB container.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut root = serde_json::Map::new();
        root.insert("asset".to_owned(), json!({ "version": "2" }));
        root.insert("buffers".to_owned(), json!([{ "byteLength": self.byte_length }]));
        if !self.buffer_views.is_empty() {
            root.insert(
                "bufferViews".to_owned(),
                serde_json::to_value(&self.buffer_views)?,
            );
        }
        if !self.accessors.is_empty() {
            root.insert("accessors".to_owned(), serde_json::to_value(&self.accessors)?);
        }
        if !self.images.is_empty() {
            root.insert("images".to_owned(), serde_json::to_value(&self.images)?);
        }
        if !self.extensions.is_empty() {
            root.insert(
                "extensions".to_owned(),
                serde_json::Value::Object(self.extensions.clone()),
            );
        }
        if !self.extensions_used.is_empty() {
            root.insert("extensionsUsed".to_owned(), json!(self.extensions_used));
        }
        if !self.extensions_required.is_empty() {
            root.insert(
                "extensionsRequired".to_owned(),
                json!(self.extensions_required),
            );
        }
        if !self.extras.is_empty() {
            root.insert(
                "extras".to_owned(),
                serde_json::Value::Object(self.extras.clone()),
            );
        }
        for (k, v) in &self.app_data {
            root.insert(k.clone(), v.clone());
        }

        let json_bytes = serde_json::to_vec(&serde_json::Value::Object(root))?;
        let json_chunk_len = pad_to_4(json_bytes.len());

        // Source buffers are individually padded, so the BIN chunk is
        // already aligned.
        let bin_chunk_len = self.byte_length;
        debug_assert_eq!(bin_chunk_len, pad_to_4(bin_chunk_len));

        let total_len =
            HEADER_LEN + CHUNK_HEADER_LEN + json_chunk_len + CHUNK_HEADER_LEN + bin_chunk_len;

        let mut glb = Vec::with_capacity(total_len);

        // Header
        glb.extend_from_slice(&MAGIC_GLTF.to_le_bytes());
        glb.extend_from_slice(&GLTF_VERSION.to_le_bytes());
        glb.extend_from_slice(&(total_len as u32).to_le_bytes());

        // JSON chunk, padded with spaces
        glb.extend_from_slice(&(json_chunk_len as u32).to_le_bytes());
        glb.extend_from_slice(&MAGIC_JSON.to_le_bytes());
        glb.extend_from_slice(&json_bytes);
        glb.resize(glb.len() + (json_chunk_len - json_bytes.len()), 0x20);

        // BIN chunk, buffers pre-padded with zeros
        glb.extend_from_slice(&(bin_chunk_len as u32).to_le_bytes());
        glb.extend_from_slice(&MAGIC_BIN.to_le_bytes());
        for buffer in &self.source_buffers {
            glb.extend_from_slice(buffer);
        }

        debug_assert_eq!(glb.len(), total_len);
        Ok(glb)
    }
}

/// Writes one GLB-encoded message per frame to a storage source.
pub struct GlbWriter<S: Source> {
    source: S,
    state: WriterState,
    use_extension: bool,
}

impl<S: Source> GlbWriter<S> {
    pub fn new(source: S) -> Self {
        GlbWriter {
            source,
            state: WriterState::new(),
            use_extension: true,
        }
    }

    /// Attach the payload as a plain `xviz` application key instead of the
    /// registered extension.
    pub fn without_extension(mut self) -> Self {
        self.use_extension = false;
        self
    }

    pub fn write_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.state.check_open()?;
        self.state.record_metadata(metadata);
        let value = convert::metadata_to_value(metadata);
        self.encode_and_write(&value, "1-frame.glb")
    }

    /// Encode one frame. `index` overrides the running frame counter.
    pub fn write_frame(&mut self, frame: &Frame, index: Option<u32>) -> Result<()> {
        self.state.check_open()?;
        let index = self.state.next_index(index);
        self.state.record_frame(frame.timestamp, index);
        let value = convert::message_to_value(frame)?;
        self.encode_and_write(&value, &format!("{index}-frame.glb"))
    }

    fn encode_and_write(&mut self, value: &Value, name: &str) -> Result<()> {
        let mut gltf = GltfBuilder::new();
        let packed = gltf.pack_binary_json(value)?;
        if self.use_extension {
            gltf.add_extension(XVIZ_GLTF_EXTENSION, packed);
        } else {
            gltf.add_application_data("xviz", packed);
        }
        let bytes = gltf.build()?;
        self.source.write(name, &bytes)
    }

    /// Write the timing index and close the source. Further writes fail.
    pub fn close(&mut self) -> Result<()> {
        if self.state.is_closed() {
            return Ok(());
        }
        let index_doc = self.state.index_document();
        self.source.write(
            WriterState::INDEX_NAME,
            to_json_string(&index_doc, DEFAULT_PRECISION).as_bytes(),
        )?;
        self.state.mark_closed();
        self.source.close();
        Ok(())
    }

    /// Access the underlying source, e.g. to inspect written blobs.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;

    #[test]
    fn offsets_accumulate_padded_lengths() {
        let mut b = GltfBuilder::new();
        b.add_buffer_view(&[1, 2, 3]); // pads to 4
        b.add_buffer_view(&[1, 2, 3, 4, 5]); // pads to 8
        b.add_buffer_view(&[9]);
        assert_eq!(b.buffer_views[0].byte_offset, 0);
        assert_eq!(b.buffer_views[1].byte_offset, 4);
        assert_eq!(b.buffer_views[2].byte_offset, 12);
        assert_eq!(b.byte_length(), 16);
        // View lengths record the unpadded sizes.
        assert_eq!(b.buffer_views[1].byte_length, 5);
    }

    #[test]
    fn strings_escape_unless_already_pointers() {
        let mut b = GltfBuilder::new();
        assert_eq!(
            b.pack_binary_json(&Value::Str("plain".to_owned())).unwrap(),
            json!("#plain")
        );
        assert_eq!(
            b.pack_binary_json(&Value::Str("#/accessors/0".to_owned()))
                .unwrap(),
            json!("#/accessors/0")
        );
    }

    #[test]
    fn typed_arrays_become_accessor_pointers() {
        let mut b = GltfBuilder::new();
        let mut m = Map::new();
        m.insert(
            "samples".to_owned(),
            Value::TypedArray(ScalarArray::F32(vec![1.0, 2.0, 3.0])),
        );
        let packed = b.pack_binary_json(&Value::Map(m)).unwrap();
        assert_eq!(packed["samples"], json!("#/accessors/0"));
        assert_eq!(b.accessors[0].component_type, 5126);
        assert_eq!(b.accessors[0].count, 3);
        assert_eq!(b.byte_length(), 12);
    }

    #[test]
    fn images_become_image_pointers() {
        let mut b = GltfBuilder::new();
        let image = Value::Image(ImageData {
            data: vec![0xFF; 6],
            mime_type: Some("image/png".to_owned()),
            width: Some(2),
            height: Some(3),
        });
        let packed = b.pack_binary_json(&image).unwrap();
        assert_eq!(packed, json!("#/images/0"));
        assert_eq!(b.images[0].width, Some(2));
    }

    #[test]
    fn build_produces_aligned_chunks() {
        let mut b = GltfBuilder::new();
        b.add_buffer_view(&[1, 2, 3, 4, 5]);
        b.add_extension("AVS_xviz", json!({"k": "v"}));
        let glb = b.build().unwrap();

        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
        let total = u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize;
        assert_eq!(total, glb.len());

        let json_len = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(&glb[16..20], b"JSON");

        let bin_start = 20 + json_len;
        let bin_len =
            u32::from_le_bytes(glb[bin_start..bin_start + 4].try_into().unwrap()) as usize;
        assert_eq!(bin_len % 4, 0);
        assert_eq!(&glb[bin_start + 4..bin_start + 7], b"BIN");
        assert_eq!(total, 12 + 8 + json_len + 8 + bin_len);
    }

    #[test]
    fn extension_registration_deduplicates() {
        let mut b = GltfBuilder::new();
        b.add_extension("AVS_xviz", json!({}));
        b.add_required_extension("AVS_xviz", json!({}));
        assert_eq!(b.extensions_used.len(), 1);
        assert_eq!(b.extensions_required, vec!["AVS_xviz"]);
    }

    #[test]
    fn unsupported_payloads_fail_loudly() {
        let mut b = GltfBuilder::new();
        assert!(matches!(b.add_mesh(), Err(VizError::Unsupported(_))));
        assert!(matches!(b.add_point_cloud(), Err(VizError::Unsupported(_))));
    }
}
