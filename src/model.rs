//! Data containers for the BioC interchange format.
//!
//! A [`Collection`] owns an ordered sequence of [`Document`]s; documents nest
//! [`Passage`]s, passages nest [`Sentence`]s, and annotations/relations attach
//! at any of the three levels (the "scope" they are validated against).
//!
//! All offsets are absolute character positions within the enclosing
//! document's reconstructed text, counted in Unicode scalar values (chars),
//! not bytes.
//!
//! The containers are plain value aggregates: construction via `new` plus
//! `&mut self` mutators, no invariant checking. Invariants (span/text
//! agreement, relation references, required text) are the
//! [`validate`](crate::validate) module's job.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Error, Result};

/// Key-unique string property bag attached to every container.
///
/// Insertion order is irrelevant; keys are unique by construction.
pub type Infons = HashMap<String, String>;

// ============================================================================
// Collection
// ============================================================================

/// A collection of documents plus collection-level metadata.
///
/// When produced by
/// [`DocumentReader::read_collection_info`](crate::DocumentReader::read_collection_info),
/// `documents` is always empty: the reader hands back metadata only, and the
/// caller appends documents as it pulls them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Originating corpus or database, e.g. `"PubMed"`.
    pub source: String,
    /// Date the collection was produced.
    pub date: String,
    /// Name of the key file describing the infon semantics.
    pub key: String,
    /// Character encoding from the XML declaration, if read from a stream.
    pub encoding: Option<String>,
    /// XML version from the XML declaration, if read from a stream.
    pub version: Option<String>,
    /// Verbatim DTD declaration preceding the root element, if any.
    pub dtd: Option<String>,
    /// Collection-level metadata.
    pub infons: Infons,
    /// The documents, in stream order.
    pub documents: Vec<Document>,
}

impl Collection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Set the date.
    pub fn set_date(&mut self, date: impl Into<String>) {
        self.date = date.into();
    }

    /// Set the key.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// Set an infon, replacing any previous value for the key.
    pub fn set_infon(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infons.insert(key.into(), value.into());
    }

    /// Look up an infon by key.
    #[must_use]
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons.get(key).map(String::as_str)
    }

    /// Append a document.
    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }
}

// ============================================================================
// Document
// ============================================================================

/// One document: an id, passages, and document-level annotations/relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique id, typically a document identifier like a PMID.
    pub id: String,
    /// Document-level metadata.
    pub infons: Infons,
    /// The passages, in offset order.
    pub passages: Vec<Passage>,
    /// Annotations attached directly to the document (not inside a passage).
    pub annotations: Vec<Annotation>,
    /// Relations attached directly to the document.
    pub relations: Vec<Relation>,
}

impl Document {
    /// Create a document with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set an infon, replacing any previous value for the key.
    pub fn set_infon(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infons.insert(key.into(), value.into());
    }

    /// Look up an infon by key.
    #[must_use]
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons.get(key).map(String::as_str)
    }

    /// Append a passage.
    pub fn add_passage(&mut self, passage: Passage) {
        self.passages.push(passage);
    }

    /// Append a document-level annotation.
    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// Append a document-level relation.
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Look up a document-level annotation by id.
    #[must_use]
    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

// ============================================================================
// Passage
// ============================================================================

/// One passage of a document.
///
/// A passage either carries its own inline `text` or nests sentences that
/// together supply the text; the two are mutually exclusive at the semantic
/// level, though the container does not enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Absolute character offset of the passage's first character.
    pub offset: usize,
    /// Inline text, when the passage is not split into sentences.
    pub text: Option<String>,
    /// Passage-level metadata.
    pub infons: Infons,
    /// The sentences, in offset order (empty when `text` is inline).
    pub sentences: Vec<Sentence>,
    /// Annotations in passage scope.
    pub annotations: Vec<Annotation>,
    /// Relations in passage scope.
    pub relations: Vec<Relation>,
}

impl Passage {
    /// Create a passage at the given absolute offset.
    #[must_use]
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Set the inline text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Set an infon, replacing any previous value for the key.
    pub fn set_infon(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infons.insert(key.into(), value.into());
    }

    /// Look up an infon by key.
    #[must_use]
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons.get(key).map(String::as_str)
    }

    /// Append a sentence.
    pub fn add_sentence(&mut self, sentence: Sentence) {
        self.sentences.push(sentence);
    }

    /// Append a passage-level annotation.
    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// Append a passage-level relation.
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Look up a passage-level annotation by id.
    #[must_use]
    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

// ============================================================================
// Sentence
// ============================================================================

/// One sentence of a passage. The validator requires `text` to be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Absolute character offset of the sentence's first character.
    pub offset: usize,
    /// The sentence text. Optional in the container, required by validation.
    pub text: Option<String>,
    /// Sentence-level metadata.
    pub infons: Infons,
    /// Annotations in sentence scope.
    pub annotations: Vec<Annotation>,
    /// Relations in sentence scope.
    pub relations: Vec<Relation>,
}

impl Sentence {
    /// Create a sentence at the given absolute offset.
    #[must_use]
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Set the text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Set an infon, replacing any previous value for the key.
    pub fn set_infon(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infons.insert(key.into(), value.into());
    }

    /// Look up an infon by key.
    #[must_use]
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons.get(key).map(String::as_str)
    }

    /// Append a sentence-level annotation.
    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// Append a sentence-level relation.
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Look up a sentence-level annotation by id.
    #[must_use]
    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

// ============================================================================
// Annotation & Location
// ============================================================================

/// A span-anchored annotation: declared text plus one or more locations.
///
/// Multiple locations describe a discontinuous annotation; each location's
/// slice of the reconstructed text must equal `text` for validation to pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Id, unique within its scope; relation nodes refer to it.
    pub id: String,
    /// Annotation-level metadata, e.g. the annotation type.
    pub infons: Infons,
    /// The annotated text. Required for the span/text equality check.
    pub text: Option<String>,
    /// The character spans this annotation covers.
    pub locations: Vec<Location>,
}

impl Annotation {
    /// Create an annotation with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the annotated text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Set an infon, replacing any previous value for the key.
    pub fn set_infon(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infons.insert(key.into(), value.into());
    }

    /// Look up an infon by key.
    #[must_use]
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons.get(key).map(String::as_str)
    }

    /// Append a location.
    pub fn add_location(&mut self, location: Location) {
        self.locations.push(location);
    }
}

/// A half-open character span `[offset, offset + length)` in the enclosing
/// document's reconstructed text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Absolute character offset of the first covered character.
    pub offset: usize,
    /// Number of characters covered.
    pub length: usize,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// One past the last covered character offset, saturating at
    /// `usize::MAX` so degenerate locations compare as out of range instead
    /// of wrapping.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }
}

// ============================================================================
// Relation & Node
// ============================================================================

/// A relation linking annotations (and, in the format, other relations)
/// within one scope via [`Node`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Id, unique within its scope.
    pub id: String,
    /// Relation-level metadata, e.g. the relation type.
    pub infons: Infons,
    /// The participants, in declaration order.
    pub nodes: Vec<Node>,
}

impl Relation {
    /// Create a relation with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set an infon, replacing any previous value for the key.
    pub fn set_infon(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.infons.insert(key.into(), value.into());
    }

    /// Look up an infon by key.
    #[must_use]
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons.get(key).map(String::as_str)
    }

    /// Append a node.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

/// One participant of a relation: which annotation, and in what role.
///
/// Both fields are mandatory. [`Node::new`] is total by construction; the
/// staged [`NodeBuilder`] fails at `build()` when a field was never set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Id of the referenced annotation in the same scope.
    pub refid: String,
    /// How the referenced annotation participates, e.g. `"theme"`.
    pub role: String,
}

impl Node {
    /// Create a node.
    #[must_use]
    pub fn new(refid: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            refid: refid.into(),
            role: role.into(),
        }
    }

    /// Start building a node field by field.
    #[must_use]
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }
}

/// Staged construction of a [`Node`] with required-field enforcement.
///
/// # Example
///
/// ```rust
/// use bioc::Node;
///
/// let node = Node::builder().refid("T1").role("theme").build()?;
/// assert_eq!(node.refid, "T1");
///
/// // A node with an unset field does not build.
/// assert!(Node::builder().refid("T1").build().is_err());
/// # Ok::<(), bioc::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder {
    refid: Option<String>,
    role: Option<String>,
}

impl NodeBuilder {
    /// Set the referenced annotation id.
    #[must_use]
    pub fn refid(mut self, refid: impl Into<String>) -> Self {
        self.refid = Some(refid.into());
        self
    }

    /// Set the role label.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Build the node, failing if `refid` or `role` was never set.
    pub fn build(self) -> Result<Node> {
        let refid = self
            .refid
            .ok_or_else(|| Error::invalid_input("node is missing required field 'refid'"))?;
        let role = self
            .role
            .ok_or_else(|| Error::invalid_input("node is missing required field 'role'"))?;
        Ok(Node { refid, role })
    }
}
