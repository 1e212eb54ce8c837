//! Geometric primitive builder.
//!
//! The first type-selecting call (`polygon`, `circle`, `image`, ...) fixes
//! the in-progress entry's type; a second one flushes the entry and starts
//! the next, so several primitives can land on one stream. Modifiers
//! (`id`, `style`, `classes`, `position`, ...) are fatal before any
//! type-selecting call.

use hashbrown::HashMap;

use super::validate::Validator;
use crate::error::Result;
use crate::frame::{Category, Geometry, Primitive, PrimitiveBase, PrimitiveType};
use crate::style::Style;

#[derive(Debug)]
pub struct PrimitiveBuilder {
    validator: Validator,
    stream_id: Option<String>,

    // In-progress entry
    ptype: Option<PrimitiveType>,
    vertices: Option<Vec<f64>>,
    radius: Option<f64>,
    text: Option<String>,
    colors: Option<Vec<u8>>,
    image_data: Option<Vec<u8>>,
    width_px: Option<u32>,
    height_px: Option<u32>,
    base: PrimitiveBase,

    primitives: HashMap<String, Vec<Primitive>>,
}

impl PrimitiveBuilder {
    pub(crate) fn new(validator: Validator) -> Self {
        PrimitiveBuilder {
            validator,
            stream_id: None,
            ptype: None,
            vertices: None,
            radius: None,
            text: None,
            colors: None,
            image_data: None,
            width_px: None,
            height_px: None,
            base: PrimitiveBase::default(),
            primitives: HashMap::new(),
        }
    }

    pub fn stream(&mut self, stream_id: &str) -> &mut Self {
        if self.stream_id.is_some() {
            self.flush();
        }
        self.stream_id = Some(stream_id.to_owned());
        self
    }

    /// Start a polygon from flattened `[x, y, z, x, y, z, ...]` vertices.
    pub fn polygon(&mut self, vertices: &[f64]) -> &mut Self {
        self.begin_entry(PrimitiveType::Polygon);
        self.set_vertices(vertices);
        self
    }

    /// Start a polyline from flattened vertices.
    pub fn polyline(&mut self, vertices: &[f64]) -> &mut Self {
        self.begin_entry(PrimitiveType::Polyline);
        self.set_vertices(vertices);
        self
    }

    /// Start a point set from flattened vertices.
    pub fn points(&mut self, points: &[f64]) -> &mut Self {
        self.begin_entry(PrimitiveType::Point);
        self.set_vertices(points);
        self
    }

    pub fn circle(&mut self, center: [f64; 3], radius: f64) -> &mut Self {
        self.begin_entry(PrimitiveType::Circle);
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "radius",
            self.radius.is_some(),
        );
        self.vertices = Some(center.to_vec());
        self.radius = Some(radius);
        self
    }

    pub fn stadium(&mut self, start: [f64; 3], end: [f64; 3], radius: f64) -> &mut Self {
        self.begin_entry(PrimitiveType::Stadium);
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "radius",
            self.radius.is_some(),
        );
        let mut vertices = start.to_vec();
        vertices.extend_from_slice(&end);
        self.vertices = Some(vertices);
        self.radius = Some(radius);
        self
    }

    pub fn text(&mut self, message: &str) -> &mut Self {
        self.begin_entry(PrimitiveType::Text);
        self.validator
            .prop_set_once(self.stream_id.as_deref(), "text", self.text.is_some());
        self.text = Some(message.to_owned());
        self
    }

    pub fn image(&mut self, data: &[u8]) -> &mut Self {
        self.begin_entry(PrimitiveType::Image);
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "image",
            self.image_data.is_some(),
        );
        self.image_data = Some(data.to_vec());
        self
    }

    /// Pixel dimensions of the in-progress image.
    pub fn dimensions(&mut self, width_px: u32, height_px: u32) -> Result<&mut Self> {
        if self.ptype != Some(PrimitiveType::Image) {
            return Err(self.validator.error("an image must be set first"));
        }
        self.width_px = Some(width_px);
        self.height_px = Some(height_px);
        Ok(self)
    }

    /// Anchor position for text and image primitives.
    pub fn position(&mut self, point: [f64; 3]) -> Result<&mut Self> {
        self.require_type()?;
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "position",
            self.vertices.is_some(),
        );
        self.vertices = Some(point.to_vec());
        Ok(self)
    }

    /// Per-vertex flattened RGBA colors, width 4. Legal for point, polygon
    /// and polyline entries.
    pub fn colors(&mut self, colors: &[u8]) -> Result<&mut Self> {
        self.require_type()?;
        if !matches!(
            self.ptype,
            Some(PrimitiveType::Point | PrimitiveType::Polygon | PrimitiveType::Polyline)
        ) {
            return Err(self
                .validator
                .error("colors apply to point, polygon and polyline primitives"));
        }
        self.validator
            .prop_set_once(self.stream_id.as_deref(), "colors", self.colors.is_some());
        self.colors = Some(colors.to_vec());
        Ok(self)
    }

    pub fn id(&mut self, object_id: &str) -> Result<&mut Self> {
        self.require_type()?;
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "object_id",
            self.base.object_id.is_some(),
        );
        self.base.object_id = Some(object_id.to_owned());
        Ok(self)
    }

    pub fn style(&mut self, style: Style) -> Result<&mut Self> {
        self.require_type()?;
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "style",
            self.base.style.is_some(),
        );
        self.base.style = Some(style);
        Ok(self)
    }

    pub fn classes(&mut self, class_list: &[&str]) -> Result<&mut Self> {
        self.require_type()?;
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "classes",
            self.base.classes.is_some(),
        );
        self.base.classes = Some(class_list.iter().map(|c| (*c).to_owned()).collect());
        Ok(self)
    }

    fn require_type(&self) -> Result<()> {
        if self.ptype.is_none() {
            return Err(self
                .validator
                .error("start from a primitive first, e.g. polygon() or image()"));
        }
        Ok(())
    }

    /// A type-selecting call on an entry that already has a type finalizes
    /// the current entry and starts the next one.
    fn begin_entry(&mut self, ptype: PrimitiveType) {
        if self.ptype.is_some() {
            self.flush();
        }
        self.ptype = Some(ptype);
    }

    fn set_vertices(&mut self, vertices: &[f64]) {
        self.validator.prop_set_once(
            self.stream_id.as_deref(),
            "vertices",
            self.vertices.is_some(),
        );
        self.vertices = Some(vertices.to_vec());
    }

    fn flush(&mut self) {
        let Some(ptype) = self.ptype else {
            // Nothing pending.
            return;
        };
        self.validator.has_stream(self.stream_id.as_deref());
        let Some(stream_id) = self.stream_id.clone() else {
            self.reset_entry();
            return;
        };
        self.validator.match_metadata(&stream_id, Category::Primitive);
        if let Some(style) = &self.base.style {
            self.validator
                .check_style(Some(&stream_id), ptype, style);
        }

        if let Some(primitive) = self.format_entry(ptype, &stream_id) {
            self.primitives.entry(stream_id).or_default().push(primitive);
        }
        self.reset_entry();
    }

    /// Produce the wire shape for the pending entry, or `None` (with a
    /// warning) when required geometry is missing.
    fn format_entry(&mut self, ptype: PrimitiveType, stream_id: &str) -> Option<Primitive> {
        let geometry = match ptype {
            PrimitiveType::Polygon => Geometry::Polygon {
                vertices: self.take_vertices(stream_id)?,
                colors: self.colors.take(),
            },
            PrimitiveType::Polyline => Geometry::Polyline {
                vertices: self.take_vertices(stream_id)?,
                colors: self.colors.take(),
            },
            PrimitiveType::Point => Geometry::Point {
                points: self.take_vertices(stream_id)?,
                colors: self.colors.take(),
            },
            PrimitiveType::Text => Geometry::Text {
                position: self.take_position(stream_id)?,
                text: self.text.take().unwrap_or_default(),
            },
            PrimitiveType::Circle => Geometry::Circle {
                center: self.take_position(stream_id)?,
                radius: self.radius.take().unwrap_or_default(),
            },
            PrimitiveType::Stadium => {
                let vertices = self.take_vertices(stream_id)?;
                if vertices.len() != 6 {
                    self.validator.warn(&format!(
                        "stream {stream_id}: stadium needs start and end positions"
                    ));
                    return None;
                }
                Geometry::Stadium {
                    start: [vertices[0], vertices[1], vertices[2]],
                    end: [vertices[3], vertices[4], vertices[5]],
                    radius: self.radius.take().unwrap_or_default(),
                }
            }
            PrimitiveType::Image => {
                let Some(data) = self.image_data.take() else {
                    self.validator
                        .warn(&format!("stream {stream_id}: image data is not provided"));
                    return None;
                };
                let position = self.vertices.take().and_then(|v| {
                    if v.len() == 3 {
                        Some([v[0], v[1], v[2]])
                    } else {
                        None
                    }
                });
                Geometry::Image {
                    data,
                    width_px: self.width_px.take(),
                    height_px: self.height_px.take(),
                    position,
                }
            }
        };
        Some(Primitive {
            geometry,
            base: std::mem::take(&mut self.base),
        })
    }

    fn take_vertices(&mut self, stream_id: &str) -> Option<Vec<f64>> {
        let vertices = self.vertices.take();
        if vertices.is_none() {
            self.validator
                .warn(&format!("stream {stream_id}: vertices are not provided"));
        }
        vertices
    }

    fn take_position(&mut self, stream_id: &str) -> Option<[f64; 3]> {
        let vertices = self.take_vertices(stream_id)?;
        if vertices.len() != 3 {
            self.validator.warn(&format!(
                "stream {stream_id}: a position must be of the form [x, y, z]"
            ));
            return None;
        }
        Some([vertices[0], vertices[1], vertices[2]])
    }

    fn reset_entry(&mut self) {
        self.ptype = None;
        self.vertices = None;
        self.radius = None;
        self.text = None;
        self.colors = None;
        self.image_data = None;
        self.width_px = None;
        self.height_px = None;
        self.base = PrimitiveBase::default();
    }

    /// Flush and return the accumulated primitives per stream, or `None`
    /// when the category is empty.
    pub(crate) fn get_data(&mut self) -> Option<HashMap<String, Vec<Primitive>>> {
        if self.ptype.is_some() {
            self.flush();
        }
        if self.primitives.is_empty() {
            None
        } else {
            Some(self.primitives.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PrimitiveBuilder {
        PrimitiveBuilder::new(Validator::default())
    }

    #[test]
    fn stream_switch_flushes_into_previous_stream() {
        let mut b = builder();
        b.stream("/a").polygon(&[0.0, 0.0, 0.0]);
        b.stream("/b").polyline(&[1.0, 1.0, 1.0]);
        let data = b.get_data().unwrap();
        assert_eq!(data["/a"].len(), 1);
        assert_eq!(
            data["/a"][0].geometry.primitive_type(),
            PrimitiveType::Polygon
        );
        assert_eq!(data["/b"].len(), 1);
    }

    #[test]
    fn second_type_call_starts_a_new_entry() {
        let mut b = builder();
        b.stream("/s")
            .circle([0.0, 0.0, 0.0], 1.0)
            .circle([1.0, 0.0, 0.0], 2.0);
        let data = b.get_data().unwrap();
        assert_eq!(data["/s"].len(), 2);
    }

    #[test]
    fn modifier_before_type_selection_is_fatal() {
        let mut b = builder();
        b.stream("/s");
        assert!(b.id("1").is_err());
        assert!(b.colors(&[0, 0, 0, 255]).is_err());
        assert!(b.position([0.0; 3]).is_err());
    }

    #[test]
    fn colors_carry_through_on_polylines_and_polygons() {
        let mut b = builder();
        b.stream("/lane").polyline(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0]);
        b.colors(&[255, 0, 0, 255, 0, 255, 0, 255]).unwrap();
        b.stream("/zone").polygon(&[0.0; 9]);
        b.colors(&[0, 0, 255, 255, 0, 0, 255, 255, 0, 0, 255, 255]).unwrap();
        let data = b.get_data().unwrap();
        match &data["/lane"][0].geometry {
            Geometry::Polyline { colors, .. } => {
                assert_eq!(colors.as_deref(), Some(&[255, 0, 0, 255, 0, 255, 0, 255][..]));
            }
            other => panic!("expected polyline geometry, got {other:?}"),
        }
        match &data["/zone"][0].geometry {
            Geometry::Polygon { colors, .. } => assert!(colors.is_some()),
            other => panic!("expected polygon geometry, got {other:?}"),
        }
    }

    #[test]
    fn colors_reject_unsupported_primitive_types() {
        let mut b = builder();
        b.stream("/s").circle([0.0; 3], 1.0);
        assert!(b.colors(&[255, 0, 0, 255]).is_err());
        b.stream("/t").text("hi");
        assert!(b.colors(&[255, 0, 0, 255]).is_err());
    }

    #[test]
    fn dimensions_require_an_image() {
        let mut b = builder();
        b.stream("/s").polygon(&[0.0; 3]);
        assert!(b.dimensions(4, 4).is_err());
    }

    #[test]
    fn image_entry_carries_dimensions_and_position() {
        let mut b = builder();
        b.stream("/camera").image(&[1, 2, 3, 4]);
        b.dimensions(2, 2).unwrap();
        b.position([5.0, 6.0, 7.0]).unwrap();
        let data = b.get_data().unwrap();
        match &data["/camera"][0].geometry {
            Geometry::Image {
                data,
                width_px,
                height_px,
                position,
            } => {
                assert_eq!(data, &[1, 2, 3, 4]);
                assert_eq!(*width_px, Some(2));
                assert_eq!(*height_px, Some(2));
                assert_eq!(*position, Some([5.0, 6.0, 7.0]));
            }
            other => panic!("expected image geometry, got {other:?}"),
        }
    }

    #[test]
    fn missing_geometry_warns_and_drops_entry() {
        let mut b = builder();
        b.stream("/s").text("hello");
        // No position set; the entry is dropped with a warning.
        assert!(b.get_data().is_none());
    }

    #[test]
    fn base_present_iff_any_field_set() {
        let mut b = builder();
        b.stream("/s").polygon(&[0.0, 0.0, 0.0]);
        b.id("7").unwrap();
        b.stream("/t").polygon(&[1.0, 1.0, 1.0]);
        let data = b.get_data().unwrap();
        assert_eq!(data["/s"][0].base.object_id.as_deref(), Some("7"));
        assert!(data["/t"][0].base.is_empty());
    }
}
