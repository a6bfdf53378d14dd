//! # bioc
//!
//! Streaming reader and structural validator for the BioC biomedical
//! text-annotation interchange format.
//!
//! - **Data model**: [`Collection`] → [`Document`] → [`Passage`] →
//!   [`Sentence`], with offset-anchored [`Annotation`]s and [`Relation`]s
//!   attachable at document, passage, or sentence level.
//! - **Streaming reader**: [`DocumentReader`] makes one forward pass over a
//!   BioC XML stream, exposing the collection metadata up front and yielding
//!   documents one at a time with a single-document lookahead.
//! - **Validator**: [`check_document`] and friends reconstruct a scope's text
//!   from its offsets and verify every annotation span and relation
//!   reference against it.
//!
//! ## Quick Start
//!
//! ```rust
//! use bioc::{check_collection, DocumentReader};
//!
//! # fn main() -> bioc::Result<()> {
//! let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE collection SYSTEM "BioC.dtd" []>
//! <collection>
//!   <source>PubMed</source>
//!   <date>20260830</date>
//!   <key>example.key</key>
//!   <document>
//!     <id>8557975</id>
//!     <passage>
//!       <offset>0</offset>
//!       <text>Active Raf-1 phosphorylates MEK1.</text>
//!       <annotation id="T1">
//!         <infon key="type">Protein</infon>
//!         <location offset="7" length="5"/>
//!         <text>Raf-1</text>
//!       </annotation>
//!     </passage>
//!   </document>
//! </collection>"#;
//!
//! let mut reader = DocumentReader::new(xml.as_bytes())?;
//! let mut collection = reader.read_collection_info()?;
//! assert_eq!(collection.source, "PubMed");
//! assert!(collection.documents.is_empty());
//!
//! while let Some(document) = reader.read_document()? {
//!     collection.add_document(document);
//! }
//! reader.close();
//!
//! check_collection(&collection)?;
//! assert_eq!(collection.documents.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Offsets
//!
//! All offsets and lengths are absolute character positions within a
//! document's reconstructed text, counted in Unicode scalar values (chars).
//! Gaps implied by the offsets (blank lines between passages or sentences)
//! are reconstructed as newline padding, so annotation spans stay valid
//! across elements that do not carry the intervening whitespace themselves.

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod reader;
pub mod validate;

pub use error::{Error, Result};
pub use model::{
    Annotation, Collection, Document, Infons, Location, Node, NodeBuilder, Passage, Relation,
    Sentence,
};
pub use reader::DocumentReader;
pub use validate::{
    check_collection, check_document, check_passage, check_sentence, document_text, passage_text,
    ValidationError,
};
