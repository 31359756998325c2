//! # Folio Schema
//!
//! The document model behind the folio editing engine: a frozen manifest of
//! node and mark types, the [`Document`] tree with flat position addressing,
//! and the codec between that tree and canonical HTML.
//!
//! ```
//! use folio_schema::{parse, serialize};
//!
//! let doc = parse("<p>Hello <b>world</b></p>");
//! assert_eq!(serialize(&doc), "<p>Hello <strong>world</strong></p>");
//! ```

pub mod document;
pub mod error;
pub mod node;
pub mod parser;
pub mod position;
pub mod serializer;
pub mod spec;
pub mod tokenizer;
pub mod validate;

pub use document::{inline_text, Document, BLOCK_SEPARATOR};
pub use error::{SchemaError, SchemaResult};
pub use node::{split_chars, Attrs, Mark, MarkSet, MarkType, Node, NodeId, NodeKind};
pub use parser::{parse, parse_with_report, ParseReport};
pub use position::{NodeLocation, ResolvedPos, TextAnchor, TextblockInfo};
pub use serializer::{serialize, Serializer};
pub use spec::{
    AttrSpec, MarkSpec, NodeGroup, NodeSpec, Schema, DEFAULT_HIGHLIGHT_COLOR, EMBED_VIDEO_ATTR,
    MAX_HEADING_LEVEL,
};
pub use validate::{canonical_attr, validate};
