//! vizstream
//!
//! Builds time-synchronized visualization frames (vehicle pose, geometric
//! primitives, scalar variables, UI widgets) through fluent per-category
//! builders, and serializes them as compact JSON or as a GLB (glTF 2.0
//! binary) container for streaming to a remote renderer.
//!
//! Typical flow: fluent calls on a [`FrameBuilder`] accumulate per-stream
//! entries, `frame()` assembles an immutable [`Frame`], conversion turns it
//! into a generic tree, and a writer encodes that tree to a storage
//! [`Source`](io::Source).
//!
//! ```no_run
//! use vizstream::{FrameBuilder, Style};
//! use vizstream::io::{GlbWriter, MemorySource};
//!
//! # fn main() -> vizstream::Result<()> {
//! let mut builder = FrameBuilder::new();
//! builder
//!     .pose()
//!     .timestamp(1.0)
//!     .position(11.0, 22.0, 33.0)
//!     .orientation(0.11, 0.22, 0.33);
//! builder
//!     .primitive("/lane/boundary")
//!     .polyline(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0])
//!     .style(Style::new().color("stroke_color", &[255, 0, 0])?)?;
//!
//! let frame = builder.frame()?;
//! let mut writer = GlbWriter::new(MemorySource::new());
//! writer.write_frame(&frame, None)?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod convert;
pub mod error;
pub mod frame;
pub mod io;
pub mod style;
pub mod value;

pub use builder::{FrameBuilder, MetadataBuilder, PRIMARY_POSE_STREAM};
pub use error::{Result, VizError};
pub use frame::{Category, Frame, Metadata, PrimitiveType, UpdateType};
pub use style::Style;
pub use value::Value;
