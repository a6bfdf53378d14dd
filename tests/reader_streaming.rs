//! End-to-end tests for the streaming document reader protocol.
//!
//! Covers the priming contract (metadata before any document body), the
//! one-document lookahead, idempotent end-of-stream behavior, DTD capture,
//! deferred malformed-document errors, and the closed-reader state.

use bioc::{check_document, DocumentReader, Error};

/// A simplified PubMed abstract: one document, one passage, seven sentences.
const PUBMED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE collection SYSTEM "BioC.dtd" []>
<collection>
  <source>PubMed</source>
  <date>20260830</date>
  <key>PMID-8557975-simplified-sentences.key</key>
  <document>
    <id>8557975</id>
    <passage>
      <offset>0</offset>
      <sentence>
        <offset>0</offset>
        <text>Active Raf-1 phosphorylates MEK1.</text>
        <annotation id="T1">
          <infon key="type">Protein</infon>
          <location offset="7" length="5"/>
          <text>Raf-1</text>
        </annotation>
      </sentence>
      <sentence>
        <offset>34</offset>
        <text>MEK1 activates ERK2.</text>
      </sentence>
      <sentence>
        <offset>55</offset>
        <text>ERK2 enters the nucleus.</text>
      </sentence>
      <sentence>
        <offset>80</offset>
        <text>Raf-1 is a kinase.</text>
      </sentence>
      <sentence>
        <offset>99</offset>
        <text>MEK1 is a kinase.</text>
      </sentence>
      <sentence>
        <offset>117</offset>
        <text>ERK2 is a kinase.</text>
      </sentence>
      <sentence>
        <offset>135</offset>
        <text>This concludes the abstract.</text>
      </sentence>
    </passage>
  </document>
</collection>"#;

/// Build a collection with `n` minimal documents.
fn collection_with_documents(n: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <collection><source>test</source><date>20260830</date><key>test.key</key>",
    );
    for i in 0..n {
        xml.push_str(&format!(
            "<document><id>doc-{i}</id><passage><offset>0</offset>\
             <text>document number {i}</text></passage></document>"
        ));
    }
    xml.push_str("</collection>");
    xml
}

#[test]
fn collection_metadata_is_available_before_any_document() {
    let reader = DocumentReader::new(PUBMED_XML.as_bytes()).unwrap();
    let collection = reader.read_collection_info().unwrap();

    assert_eq!(collection.source, "PubMed");
    assert_eq!(collection.date, "20260830");
    assert_eq!(collection.key, "PMID-8557975-simplified-sentences.key");
    assert_eq!(collection.encoding.as_deref(), Some("UTF-8"));
    assert_eq!(collection.version.as_deref(), Some("1.0"));
    assert!(
        collection.documents.is_empty(),
        "reader must hand back metadata only, never documents"
    );
}

#[test]
fn streams_the_document_with_its_full_structure() {
    let mut reader = DocumentReader::new(PUBMED_XML.as_bytes()).unwrap();
    let mut collection = reader.read_collection_info().unwrap();

    while let Some(document) = reader.read_document().unwrap() {
        collection.add_document(document);
    }
    reader.close();

    assert_eq!(collection.documents.len(), 1);
    let document = &collection.documents[0];
    assert_eq!(document.id, "8557975");
    assert_eq!(document.passages.len(), 1);
    assert_eq!(document.passages[0].sentences.len(), 7);

    let sentence = &document.passages[0].sentences[0];
    assert_eq!(sentence.annotations.len(), 1);
    assert_eq!(sentence.annotations[0].infon("type"), Some("Protein"));

    // The streamed tree also satisfies the structural invariants.
    check_document(document).unwrap();
}

#[test]
fn captures_the_dtd_verbatim() {
    let reader = DocumentReader::new(PUBMED_XML.as_bytes()).unwrap();
    assert_eq!(
        reader.dtd(),
        Some("<!DOCTYPE collection SYSTEM \"BioC.dtd\" []>")
    );
}

#[test]
fn no_dtd_means_none() {
    let xml = collection_with_documents(1);
    let reader = DocumentReader::new(xml.as_bytes()).unwrap();
    assert_eq!(reader.dtd(), None);
}

#[test]
fn zero_document_collection_hits_end_of_stream_immediately() {
    let xml = collection_with_documents(0);
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();

    let collection = reader.read_collection_info().unwrap();
    assert_eq!(collection.source, "test");
    assert!(collection.documents.is_empty());

    assert!(reader.read_document().unwrap().is_none());
}

#[test]
fn exactly_n_documents_then_idempotent_tail() {
    for n in [1usize, 2, 5] {
        let xml = collection_with_documents(n);
        let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();

        for i in 0..n {
            let document = reader
                .read_document()
                .unwrap()
                .unwrap_or_else(|| panic!("document {i} of {n} missing"));
            assert_eq!(document.id, format!("doc-{i}"));
        }

        // The (N+1)-th and every later call return end-of-stream.
        assert!(reader.read_document().unwrap().is_none());
        assert!(reader.read_document().unwrap().is_none());
        assert!(reader.read_document().unwrap().is_none());
    }
}

#[test]
fn metadata_snapshot_is_stable_across_consumption() {
    let mut reader = DocumentReader::new(PUBMED_XML.as_bytes()).unwrap();
    let before = reader.read_collection_info().unwrap();

    while reader.read_document().unwrap().is_some() {}

    let after = reader.read_collection_info().unwrap();
    assert_eq!(before, after, "snapshot must not change as documents are consumed");
    assert!(after.documents.is_empty());
    assert!(reader.read_document().unwrap().is_none());
}

#[test]
fn empty_input_fails_at_construction() {
    let err = DocumentReader::new(&b""[..]).unwrap_err();
    assert!(matches!(err, Error::StreamFormat(_)), "got {err:?}");
}

#[test]
fn whitespace_only_input_fails_at_construction() {
    let err = DocumentReader::new(&b"   \n  "[..]).unwrap_err();
    assert!(matches!(err, Error::StreamFormat(_)), "got {err:?}");
}

#[test]
fn wrong_root_element_fails_at_construction() {
    let err = DocumentReader::new(&b"<corpus></corpus>"[..]).unwrap_err();
    match err {
        Error::StreamFormat(msg) => {
            assert!(msg.contains("corpus"), "error should name the element: {msg}");
        }
        other => panic!("expected StreamFormat, got {other:?}"),
    }
}

#[test]
fn malformed_collection_metadata_fails_at_construction() {
    // The error sits before the first <document>, so there is no partial
    // metadata snapshot to hand out: construction itself fails.
    let xml = "<?xml version=\"1.0\"?><collection><bogus/>\
               <source>s</source><key>k</key></collection>";
    let err = DocumentReader::new(xml.as_bytes()).unwrap_err();
    match err {
        Error::StreamFormat(msg) => {
            assert!(msg.contains("bogus"), "error should name the element: {msg}");
        }
        other => panic!("expected StreamFormat, got {other:?}"),
    }
}

#[test]
fn malformed_first_document_surfaces_on_the_first_read() {
    // Metadata is intact, so construction succeeds and the snapshot is
    // complete; the document error is deferred to the call that asks for it.
    let xml = "<?xml version=\"1.0\"?><collection><source>s</source><key>k</key>\
               <document><id>1</id><bogus/></document></collection>";
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();

    let collection = reader.read_collection_info().unwrap();
    assert_eq!(collection.source, "s");
    assert_eq!(collection.key, "k");

    let err = reader.read_document().unwrap_err();
    assert!(matches!(err, Error::StreamFormat(_)), "got {err:?}");
    assert!(reader.read_document().unwrap().is_none());
}

#[test]
fn malformed_second_document_surfaces_on_the_second_read() {
    let xml = "<?xml version=\"1.0\"?><collection><source>s</source>\
               <document><id>1</id></document>\
               <document><id>2</id><bogus/></document>\
               </collection>";
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();

    // Document 1 is returned successfully even though document 2 is broken.
    let first = reader.read_document().unwrap().unwrap();
    assert_eq!(first.id, "1");

    let err = reader.read_document().unwrap_err();
    assert!(matches!(err, Error::StreamFormat(_)), "got {err:?}");

    // The lookahead slot is empty afterwards: end-of-stream, not a retry.
    assert!(reader.read_document().unwrap().is_none());
    assert!(reader.read_document().unwrap().is_none());
}

#[test]
fn truncated_stream_is_a_format_error() {
    let xml = "<?xml version=\"1.0\"?><collection><source>s</source>\
               <document><id>1</id><passage><offset>0</offset>";
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();
    let err = reader.read_document().unwrap_err();
    assert!(matches!(err, Error::StreamFormat(_) | Error::Xml(_)), "got {err:?}");
}

#[test]
fn closed_reader_rejects_reads_but_close_stays_safe() {
    let mut reader = DocumentReader::new(PUBMED_XML.as_bytes()).unwrap();
    reader.close();
    reader.close(); // no-op

    assert!(matches!(reader.read_document(), Err(Error::ClosedStream)));
    assert!(matches!(reader.read_collection_info(), Err(Error::ClosedStream)));

    // The DTD was captured during priming and stays readable.
    assert!(reader.dtd().is_some());
}

#[test]
fn reader_iterates_documents_in_order() {
    let xml = collection_with_documents(3);
    let reader = DocumentReader::new(xml.as_bytes()).unwrap();

    let ids: Vec<String> = reader.map(|doc| doc.unwrap().id).collect();
    assert_eq!(ids, ["doc-0", "doc-1", "doc-2"]);
}

#[test]
fn closed_reader_iterates_as_exhausted() {
    let xml = collection_with_documents(3);
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();
    reader.close();
    assert!(reader.next().is_none());
}

#[test]
fn collection_and_document_infons_are_read() {
    let xml = "<?xml version=\"1.0\"?><collection><source>s</source>\
               <infon key=\"tool\">bioc</infon>\
               <infon key=\"empty\"/>\
               <document><id>1</id><infon key=\"license\">CC-BY</infon></document>\
               </collection>";
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();

    let collection = reader.read_collection_info().unwrap();
    assert_eq!(collection.infon("tool"), Some("bioc"));
    assert_eq!(collection.infon("empty"), Some(""));

    let document = reader.read_document().unwrap().unwrap();
    assert_eq!(document.infon("license"), Some("CC-BY"));
}

#[test]
fn annotations_and_relations_attach_at_every_level() {
    let xml = r#"<?xml version="1.0"?>
<collection><source>s</source>
  <document>
    <id>1</id>
    <passage>
      <offset>0</offset>
      <sentence>
        <offset>0</offset>
        <text>Raf binds MEK.</text>
        <annotation id="S1"><location offset="0" length="3"/><text>Raf</text></annotation>
        <relation id="SR1"><node refid="S1" role="theme"/></relation>
      </sentence>
      <annotation id="P1"><location offset="10" length="3"/><text>MEK</text></annotation>
      <relation id="PR1"><node refid="P1" role="theme"/></relation>
    </passage>
    <annotation id="D1"><location offset="0" length="3"/><text>Raf</text></annotation>
    <relation id="DR1"><node refid="D1" role="theme"/></relation>
  </document>
</collection>"#;
    let mut reader = DocumentReader::new(xml.as_bytes()).unwrap();
    let document = reader.read_document().unwrap().unwrap();

    assert_eq!(document.annotations.len(), 1);
    assert_eq!(document.relations.len(), 1);
    let passage = &document.passages[0];
    assert_eq!(passage.annotations.len(), 1);
    assert_eq!(passage.relations.len(), 1);
    let sentence = &passage.sentences[0];
    assert_eq!(sentence.annotations.len(), 1);
    assert_eq!(sentence.relations.len(), 1);

    check_document(&document).unwrap();
}
