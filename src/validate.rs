//! Structural validation of document trees.
//!
//! Pure checks over an already-built tree: reconstruct the text a scope's
//! offsets describe, then verify every annotation's claimed character span
//! against it and every relation node against the annotations actually
//! present in that scope. Nothing is mutated and nothing is auto-corrected;
//! the first violated invariant is returned with enough context to locate
//! the offending element.
//!
//! Entry points mirror the scopes annotations attach at:
//! [`check_sentence`], [`check_passage`], [`check_document`],
//! [`check_collection`]. Text reconstruction is public as [`document_text`]
//! and [`passage_text`].
//!
//! All offsets and lengths count Unicode scalar values (chars), not bytes.

use thiserror::Error;

use crate::model::{Annotation, Collection, Document, Passage, Relation, Sentence};

/// A violated structural invariant, naming the offending entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The text at an annotation's span differs from its declared text.
    #[error("annotation '{id}': text mismatch at [{start}, {end}): expected '{expected}', got '{actual}'")]
    TextMismatch {
        /// Id of the offending annotation.
        id: String,
        /// Absolute start offset of the checked location.
        start: usize,
        /// Absolute end offset (exclusive) of the checked location.
        end: usize,
        /// The annotation's declared text.
        expected: String,
        /// The text actually found at the span.
        actual: String,
    },
    /// An annotation's span falls outside its scope's reconstructed text.
    #[error("annotation '{id}': span [{start}, {end}) outside scope text (base {base}, {text_len} chars)")]
    OffsetOutOfRange {
        /// Id of the offending annotation.
        id: String,
        /// Absolute start offset of the location.
        start: usize,
        /// Absolute end offset (exclusive) of the location.
        end: usize,
        /// Base offset of the scope the location was checked against.
        base: usize,
        /// Char length of the scope's reconstructed text.
        text_len: usize,
    },
    /// A relation node's refid resolves to no annotation in its scope.
    #[error("relation '{relation_id}': node refid '{refid}' (role '{role}') not found among in-scope annotations")]
    DanglingReference {
        /// Id of the relation holding the node.
        relation_id: String,
        /// The unresolved annotation reference.
        refid: String,
        /// The node's role label.
        role: String,
    },
    /// A container that must carry text does not.
    #[error("{target} has no text")]
    MissingText {
        /// Description of the container, e.g. `"sentence at offset 27"`.
        target: String,
    },
}

/// Validate a sentence: its text must be present, its annotations must match
/// that text in the sentence's own offset frame, and its relation nodes must
/// resolve against the sentence's own annotations.
pub fn check_sentence(sentence: &Sentence) -> Result<(), ValidationError> {
    let text = sentence_text(sentence)?;
    check_annotations(&sentence.annotations, text, sentence.offset)?;
    check_relations(&sentence.relations, &sentence.annotations)
}

/// Validate a passage: every child sentence first, then the passage's own
/// annotations and relations against its reconstructed text.
pub fn check_passage(passage: &Passage) -> Result<(), ValidationError> {
    for sentence in &passage.sentences {
        check_sentence(sentence)?;
    }
    let text = passage_text(passage)?;
    check_annotations(&passage.annotations, &text, passage.offset)?;
    check_relations(&passage.relations, &passage.annotations)
}

/// Validate a document: every child passage first, then the document's
/// directly-attached annotations and relations against the full reconstructed
/// document text at base offset 0.
pub fn check_document(document: &Document) -> Result<(), ValidationError> {
    for passage in &document.passages {
        check_passage(passage)?;
    }
    let text = document_text(document)?;
    check_annotations(&document.annotations, &text, 0)?;
    check_relations(&document.relations, &document.annotations)
}

/// Validate every document of a collection, in order.
pub fn check_collection(collection: &Collection) -> Result<(), ValidationError> {
    for document in &collection.documents {
        check_document(document)?;
    }
    Ok(())
}

/// Reconstruct the full text of a document from its passages.
///
/// Each passage's contribution is placed at its absolute offset, padding the
/// gap from the previous passage with newlines.
pub fn document_text(document: &Document) -> Result<String, ValidationError> {
    let mut text = String::new();
    let mut len = 0;
    for passage in &document.passages {
        pad_to(&mut text, &mut len, passage.offset);
        let contribution = passage_text(passage)?;
        len += contribution.chars().count();
        text.push_str(&contribution);
    }
    Ok(text)
}

/// Reconstruct the text of a passage.
///
/// Non-empty inline text wins; otherwise the sentences are concatenated, each
/// padded with newlines up to its offset relative to the passage. A passage
/// with neither inline text nor sentences fails with
/// [`ValidationError::MissingText`].
pub fn passage_text(passage: &Passage) -> Result<String, ValidationError> {
    if let Some(text) = &passage.text {
        if !text.is_empty() {
            return Ok(text.clone());
        }
    }
    if passage.sentences.is_empty() {
        return Err(ValidationError::MissingText {
            target: format!("passage at offset {}", passage.offset),
        });
    }
    let mut text = String::new();
    let mut len = 0;
    for sentence in &passage.sentences {
        pad_to(&mut text, &mut len, sentence.offset.saturating_sub(passage.offset));
        let contribution = sentence_text(sentence)?;
        len += contribution.chars().count();
        text.push_str(contribution);
    }
    Ok(text)
}

fn sentence_text(sentence: &Sentence) -> Result<&str, ValidationError> {
    match &sentence.text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ValidationError::MissingText {
            target: format!("sentence at offset {}", sentence.offset),
        }),
    }
}

/// Pad `text` with newlines until it is `target` chars long. Monotonic: an
/// already-longer buffer is left untouched, never truncated.
fn pad_to(text: &mut String, len: &mut usize, target: usize) {
    while *len < target {
        text.push('\n');
        *len += 1;
    }
}

/// Check every location of every annotation against the scope text, whose
/// first char sits at absolute offset `base`.
fn check_annotations(
    annotations: &[Annotation],
    text: &str,
    base: usize,
) -> Result<(), ValidationError> {
    let text_len = text.chars().count();
    for annotation in annotations {
        let expected = annotation.text.as_deref().ok_or_else(|| {
            ValidationError::MissingText {
                target: format!("annotation '{}'", annotation.id),
            }
        })?;
        for location in &annotation.locations {
            if location.offset < base || location.end() - base > text_len {
                return Err(ValidationError::OffsetOutOfRange {
                    id: annotation.id.clone(),
                    start: location.offset,
                    end: location.end(),
                    base,
                    text_len,
                });
            }
            let actual: String = text
                .chars()
                .skip(location.offset - base)
                .take(location.length)
                .collect();
            if actual != expected {
                return Err(ValidationError::TextMismatch {
                    id: annotation.id.clone(),
                    start: location.offset,
                    end: location.end(),
                    expected: expected.to_owned(),
                    actual,
                });
            }
        }
    }
    Ok(())
}

/// Check that every relation node resolves to an annotation declared in the
/// same scope. Annotations nested in child containers do not count.
fn check_relations(
    relations: &[Relation],
    annotations: &[Annotation],
) -> Result<(), ValidationError> {
    for relation in relations {
        for node in &relation.nodes {
            if !annotations.iter().any(|a| a.id == node.refid) {
                return Err(ValidationError::DanglingReference {
                    relation_id: relation.id.clone(),
                    refid: node.refid.clone(),
                    role: node.role.clone(),
                });
            }
        }
    }
    Ok(())
}
