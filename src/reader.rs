//! Streaming pull reader for BioC XML.
//!
//! [`DocumentReader`] wraps a single forward-only source and makes one pass
//! over it: construction primes the reader past the collection-level metadata
//! (and parses the first document, if any, into a one-element lookahead
//! slot), after which [`DocumentReader::read_document`] pulls documents one
//! at a time. The lookahead is what makes end-of-stream detection work over a
//! stream with no length prefix: the reader only learns "there is another
//! document" by parsing it, so it always stays exactly one document ahead of
//! the caller and never buffers more than that.
//!
//! ```rust
//! use bioc::DocumentReader;
//!
//! # fn main() -> bioc::Result<()> {
//! let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <collection>
//!   <source>PubMed</source>
//!   <date>20260830</date>
//!   <key>example.key</key>
//!   <document>
//!     <id>8557975</id>
//!     <passage><offset>0</offset><text>Active Raf-1 phosphorylates MEK1.</text></passage>
//!   </document>
//! </collection>"#;
//!
//! let mut reader = DocumentReader::new(xml.as_bytes())?;
//! let mut collection = reader.read_collection_info()?;
//! while let Some(document) = reader.read_document()? {
//!     collection.add_document(document);
//! }
//! reader.close();
//! assert_eq!(collection.documents.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::model::{
    Annotation, Collection, Document, Location, Node, Passage, Relation, Sentence,
};
use crate::{Error, Result};

/// Streaming one-pass reader yielding collection metadata, then documents.
///
/// State machine: priming happens entirely inside [`DocumentReader::new`], so
/// a constructed reader is always ready; the runtime state is the lookahead
/// slot plus the closed flag (the source is dropped on [`close`]).
///
/// [`close`]: DocumentReader::close
pub struct DocumentReader<B: BufRead> {
    /// `None` once closed; the source is dropped with it.
    xml: Option<Reader<B>>,
    /// Metadata-only snapshot gathered during priming; `documents` stays empty.
    collection: Collection,
    /// The next document, parsed ahead of the caller.
    lookahead: Option<Document>,
    /// A read-ahead failure, deferred to the call that asks for that document.
    pending: Option<Error>,
}

impl<B: BufRead> std::fmt::Debug for DocumentReader<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentReader")
            .field("closed", &self.xml.is_none())
            .field("collection", &self.collection)
            .field("lookahead", &self.lookahead)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<B: BufRead> DocumentReader<B> {
    /// Create a reader and prime it.
    ///
    /// Priming consumes the XML declaration and optional DTD, fails with
    /// [`Error::StreamFormat`] if no opening `<collection>` element is found
    /// or the collection-level metadata is malformed (empty or broken
    /// input), gathers the scalars and infons, and parses the first document
    /// (if any) into the lookahead slot. A malformed first *document* does
    /// not fail construction; the error surfaces on the first
    /// [`read_document`] call, mirroring how later malformed documents
    /// surface.
    ///
    /// [`read_document`]: DocumentReader::read_document
    pub fn new(source: B) -> Result<Self> {
        let mut xml = Reader::from_reader(source);
        let mut collection = Collection::new();

        read_preamble(&mut xml, &mut collection)?;

        let mut lookahead = None;
        let mut pending = None;
        if read_metadata(&mut xml, &mut collection)? {
            match parse_document(&mut xml) {
                Ok(document) => lookahead = Some(document),
                Err(e) => pending = Some(e),
            }
        }

        log::debug!(
            "primed reader: source='{}', key='{}', dtd={}, first document={}",
            collection.source,
            collection.key,
            collection.dtd.is_some(),
            lookahead.is_some(),
        );

        Ok(Self {
            xml: Some(xml),
            collection,
            lookahead,
            pending,
        })
    }

    /// Return a snapshot of the collection metadata gathered during priming.
    ///
    /// The snapshot's document sequence is always empty; the caller appends
    /// documents as it pulls them. Idempotent: never advances the cursor.
    pub fn read_collection_info(&self) -> Result<Collection> {
        if self.xml.is_none() {
            return Err(Error::ClosedStream);
        }
        Ok(self.collection.clone())
    }

    /// Pull the next document, or `Ok(None)` at end of stream.
    ///
    /// Returning a document triggers the parse of the one after it into the
    /// lookahead slot. A failure of that read-ahead is deferred: document N
    /// is returned successfully and the error surfaces on the call that asks
    /// for document N+1, after which the slot is empty and further calls
    /// keep returning `Ok(None)` without touching the source again.
    pub fn read_document(&mut self) -> Result<Option<Document>> {
        let xml = self.xml.as_mut().ok_or(Error::ClosedStream)?;
        if let Some(err) = self.pending.take() {
            return Err(err);
        }
        let Some(document) = self.lookahead.take() else {
            return Ok(None);
        };
        match read_next_document(xml) {
            Ok(slot) => self.lookahead = slot,
            Err(e) => self.pending = Some(e),
        }
        log::debug!(
            "read document '{}' ({} passages)",
            document.id,
            document.passages.len(),
        );
        Ok(Some(document))
    }

    /// Release the underlying source. Closing twice is a no-op; reads after
    /// close fail with [`Error::ClosedStream`].
    pub fn close(&mut self) {
        self.xml = None;
    }

    /// The verbatim DTD declaration captured during priming, if any.
    /// Remains readable after [`close`](DocumentReader::close).
    #[must_use]
    pub fn dtd(&self) -> Option<&str> {
        self.collection.dtd.as_deref()
    }
}

/// `for document in reader` sugar over [`DocumentReader::read_document`].
/// A closed reader iterates as exhausted.
impl<B: BufRead> Iterator for DocumentReader<B> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.xml.is_none() {
            return None;
        }
        self.read_document().transpose()
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Consume everything before the root element: the XML declaration (capturing
/// encoding/version) and an optional DTD (captured verbatim). Stops on
/// `<collection>`; anything else is a format error.
fn read_preamble<B: BufRead>(xml: &mut Reader<B>, collection: &mut Collection) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Decl(decl) => {
                collection.version =
                    Some(String::from_utf8_lossy(&decl.version()?).into_owned());
                if let Some(encoding) = decl.encoding() {
                    collection.encoding =
                        Some(String::from_utf8_lossy(&encoding?).into_owned());
                }
            }
            Event::DocType(text) => {
                collection.dtd = Some(format!("<!DOCTYPE {}>", text.unescape()?.trim()));
            }
            Event::Start(e) if e.name().as_ref() == b"collection" => return Ok(()),
            Event::Start(e) | Event::Empty(e) => {
                return Err(Error::stream_format(format!(
                    "expected <collection>, found <{}>",
                    String::from_utf8_lossy(e.name().as_ref()),
                )));
            }
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text before <collection>"));
                }
            }
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => {
                return Err(Error::stream_format(
                    "no <collection> element found in input",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup before <collection>")),
        }
    }
}

/// Gather the collection-level scalar elements and infons. Returns `true`
/// when positioned just inside the first `<document>` start tag (whose body
/// the caller parses, so a malformed document does not fail the metadata
/// phase), `false` at `</collection>` (no documents). Malformed metadata is
/// an immediate error.
fn read_metadata<B: BufRead>(xml: &mut Reader<B>, collection: &mut Collection) -> Result<bool> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"source" => collection.source = read_text_content(xml, b"source")?,
                b"date" => collection.date = read_text_content(xml, b"date")?,
                b"key" => collection.key = read_text_content(xml, b"key")?,
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    let value = read_text_content(xml, b"infon")?;
                    collection.infons.insert(key, value);
                }
                b"document" => return Ok(true),
                other => return Err(unexpected_element(other, "collection")),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"source" | b"date" | b"key" => {}
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    collection.infons.insert(key, String::new());
                }
                other => return Err(unexpected_element(other, "collection")),
            },
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <collection>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"collection" => return Ok(false),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <collection>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <collection>")),
        }
    }
}

/// Advance past inter-document whitespace to the next `<document>` and parse
/// it, or return `None` at `</collection>`.
fn read_next_document<B: BufRead>(xml: &mut Reader<B>) -> Result<Option<Document>> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"document" => {
                return Ok(Some(parse_document(xml)?));
            }
            Event::Start(e) | Event::Empty(e) => {
                return Err(unexpected_element(e.name().as_ref(), "collection"));
            }
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <collection>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"collection" => return Ok(None),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <collection>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <collection>")),
        }
    }
}

/// Parse one `<document>` body (the start tag is already consumed).
fn parse_document<B: BufRead>(xml: &mut Reader<B>) -> Result<Document> {
    let mut document = Document::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"id" => document.id = read_text_content(xml, b"id")?,
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    let value = read_text_content(xml, b"infon")?;
                    document.infons.insert(key, value);
                }
                b"passage" => document.passages.push(parse_passage(xml)?),
                b"annotation" => {
                    let id = require_attr(&e, b"id", "annotation")?;
                    document.annotations.push(parse_annotation(xml, id)?);
                }
                b"relation" => {
                    let id = require_attr(&e, b"id", "relation")?;
                    document.relations.push(parse_relation(xml, id)?);
                }
                other => return Err(unexpected_element(other, "document")),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    document.infons.insert(key, String::new());
                }
                other => return Err(unexpected_element(other, "document")),
            },
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <document>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"document" => return Ok(document),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <document>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <document>")),
        }
    }
}

fn parse_passage<B: BufRead>(xml: &mut Reader<B>) -> Result<Passage> {
    let mut passage = Passage::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"offset" => {
                    passage.offset = parse_offset(&read_text_content(xml, b"offset")?, "passage")?;
                }
                b"text" => passage.text = Some(read_text_content(xml, b"text")?),
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    let value = read_text_content(xml, b"infon")?;
                    passage.infons.insert(key, value);
                }
                b"sentence" => passage.sentences.push(parse_sentence(xml)?),
                b"annotation" => {
                    let id = require_attr(&e, b"id", "annotation")?;
                    passage.annotations.push(parse_annotation(xml, id)?);
                }
                b"relation" => {
                    let id = require_attr(&e, b"id", "relation")?;
                    passage.relations.push(parse_relation(xml, id)?);
                }
                other => return Err(unexpected_element(other, "passage")),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"text" => passage.text = Some(String::new()),
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    passage.infons.insert(key, String::new());
                }
                other => return Err(unexpected_element(other, "passage")),
            },
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <passage>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"passage" => return Ok(passage),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <passage>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <passage>")),
        }
    }
}

fn parse_sentence<B: BufRead>(xml: &mut Reader<B>) -> Result<Sentence> {
    let mut sentence = Sentence::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"offset" => {
                    sentence.offset =
                        parse_offset(&read_text_content(xml, b"offset")?, "sentence")?;
                }
                b"text" => sentence.text = Some(read_text_content(xml, b"text")?),
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    let value = read_text_content(xml, b"infon")?;
                    sentence.infons.insert(key, value);
                }
                b"annotation" => {
                    let id = require_attr(&e, b"id", "annotation")?;
                    sentence.annotations.push(parse_annotation(xml, id)?);
                }
                b"relation" => {
                    let id = require_attr(&e, b"id", "relation")?;
                    sentence.relations.push(parse_relation(xml, id)?);
                }
                other => return Err(unexpected_element(other, "sentence")),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"text" => sentence.text = Some(String::new()),
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    sentence.infons.insert(key, String::new());
                }
                other => return Err(unexpected_element(other, "sentence")),
            },
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <sentence>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"sentence" => return Ok(sentence),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <sentence>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <sentence>")),
        }
    }
}

fn parse_annotation<B: BufRead>(xml: &mut Reader<B>, id: String) -> Result<Annotation> {
    let mut annotation = Annotation::new(id);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"text" => annotation.text = Some(read_text_content(xml, b"text")?),
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    let value = read_text_content(xml, b"infon")?;
                    annotation.infons.insert(key, value);
                }
                b"location" => {
                    annotation.locations.push(parse_location(&e)?);
                    skip_to_end(xml, b"location")?;
                }
                other => return Err(unexpected_element(other, "annotation")),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"text" => annotation.text = Some(String::new()),
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    annotation.infons.insert(key, String::new());
                }
                b"location" => annotation.locations.push(parse_location(&e)?),
                other => return Err(unexpected_element(other, "annotation")),
            },
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <annotation>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"annotation" => return Ok(annotation),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <annotation>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <annotation>")),
        }
    }
}

fn parse_relation<B: BufRead>(xml: &mut Reader<B>, id: String) -> Result<Relation> {
    let mut relation = Relation::new(id);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    let value = read_text_content(xml, b"infon")?;
                    relation.infons.insert(key, value);
                }
                b"node" => {
                    relation.nodes.push(parse_node(&e)?);
                    skip_to_end(xml, b"node")?;
                }
                other => return Err(unexpected_element(other, "relation")),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"infon" => {
                    let key = require_attr(&e, b"key", "infon")?;
                    relation.infons.insert(key, String::new());
                }
                b"node" => relation.nodes.push(parse_node(&e)?),
                other => return Err(unexpected_element(other, "relation")),
            },
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format("stray text inside <relation>"));
                }
            }
            Event::Comment(_) => {}
            Event::End(e) if e.name().as_ref() == b"relation" => return Ok(relation),
            Event::Eof => {
                return Err(Error::stream_format(
                    "unexpected end of input inside <relation>",
                ));
            }
            _ => return Err(Error::stream_format("unexpected markup inside <relation>")),
        }
    }
}

fn parse_location(e: &BytesStart) -> Result<Location> {
    let offset = parse_offset(&require_attr(e, b"offset", "location")?, "location")?;
    let length = parse_offset(&require_attr(e, b"length", "location")?, "location")?;
    Ok(Location::new(offset, length))
}

fn parse_node(e: &BytesStart) -> Result<Node> {
    Node::builder()
        .refid(require_attr(e, b"refid", "node")?)
        .role(require_attr(e, b"role", "node")?)
        .build()
}

// ============================================================================
// Low-level helpers
// ============================================================================

/// Read the text content of the element just opened, up to its end tag.
/// Character data and CDATA are captured exactly, with no trimming.
fn read_text_content<B: BufRead>(xml: &mut Reader<B>, element: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut content = String::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Text(t) => content.push_str(&t.unescape()?),
            Event::CData(c) => {
                let bytes = c.into_inner();
                content.push_str(std::str::from_utf8(&bytes).map_err(|e| {
                    Error::stream_format(format!("CDATA is not valid UTF-8: {e}"))
                })?);
            }
            Event::End(e) if e.name().as_ref() == element => return Ok(content),
            Event::Comment(_) => {}
            Event::Eof => {
                return Err(Error::stream_format(format!(
                    "unexpected end of input inside <{}>",
                    String::from_utf8_lossy(element),
                )));
            }
            _ => {
                return Err(Error::stream_format(format!(
                    "unexpected markup inside <{}>",
                    String::from_utf8_lossy(element),
                )));
            }
        }
    }
}

/// Consume up to the end tag of an element whose content is attribute-only.
fn skip_to_end<B: BufRead>(xml: &mut Reader<B>, element: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::End(e) if e.name().as_ref() == element => return Ok(()),
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(Error::stream_format(format!(
                        "unexpected text inside <{}>",
                        String::from_utf8_lossy(element),
                    )));
                }
            }
            Event::Comment(_) => {}
            Event::Eof => {
                return Err(Error::stream_format(format!(
                    "unexpected end of input inside <{}>",
                    String::from_utf8_lossy(element),
                )));
            }
            _ => {
                return Err(Error::stream_format(format!(
                    "unexpected markup inside <{}>",
                    String::from_utf8_lossy(element),
                )));
            }
        }
    }
}

fn require_attr(e: &BytesStart, name: &[u8], element: &str) -> Result<String> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Err(Error::stream_format(format!(
        "<{element}> is missing required attribute '{}'",
        String::from_utf8_lossy(name),
    )))
}

fn parse_offset(value: &str, element: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::stream_format(format!("{element} has non-numeric offset/length '{value}'"))
    })
}

fn unexpected_element(name: &[u8], parent: &str) -> Error {
    Error::stream_format(format!(
        "unexpected element <{}> inside <{parent}>",
        String::from_utf8_lossy(name),
    ))
}
