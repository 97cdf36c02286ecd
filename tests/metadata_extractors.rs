use std::fs::File;
use std::io::Write;

use lopdf::{dictionary, Document, Object, StringFormat};
use lss::metadata::scan_metadata;
use tempfile::tempdir;
use zip::write::FileOptions;
use zip::ZipWriter;

const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                    xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:creator>Alice Example</dc:creator>
  <cp:lastModifiedBy>Bob Example</cp:lastModifiedBy>
  <cp:category>Internal</cp:category>
  <dc:description>Quarterly numbers, contact alice@example.com</dc:description>
</cp:coreProperties>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
  <Company>Acme Corp</Company>
</Properties>"#;

fn write_ooxml_fixture(path: &std::path::Path) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    zip.start_file("docProps/core.xml", options).unwrap();
    zip.write_all(CORE_XML.as_bytes()).unwrap();

    zip.start_file("docProps/app.xml", options).unwrap();
    zip.write_all(APP_XML.as_bytes()).unwrap();

    zip.finish().unwrap();
}

#[test]
fn docx_metadata_extraction_covers_all_mapped_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.docx");
    write_ooxml_fixture(&path);

    let findings = scan_metadata(&path, 1_000_000);

    for expected in ["docx_author", "docx_company", "docx_comments", "docx_category", "docx_last_modified_by"] {
        assert!(
            findings.iter().any(|f| f.kind == expected),
            "missing finding kind {expected}"
        );
    }
    // The companion text pass also runs over the raw bytes, picking up the
    // embedded email address in the description field.
    assert!(findings.iter().any(|f| f.kind == "email_in_text"));
}

#[test]
fn xlsx_metadata_extraction_reads_core_properties() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    write_ooxml_fixture(&path);

    let findings = scan_metadata(&path, 1_000_000);
    assert!(findings.iter().any(|f| f.kind == "xlsx_creator"));
    assert!(findings.iter().any(|f| f.kind == "xlsx_last_modified_by"));
}

#[test]
fn pdf_metadata_extraction_reads_info_dictionary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.pdf");

    let mut doc = Document::with_version("1.5");
    let info_id = doc.add_object(dictionary! {
        "Author" => Object::String("Carol Example".as_bytes().to_vec(), StringFormat::Literal),
        "Producer" => Object::String("Test Suite".as_bytes().to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Info", Object::Reference(info_id));
    doc.save(&path).unwrap();

    let findings = scan_metadata(&path, 1_000_000);
    assert!(findings.iter().any(|f| f.kind == "pdf_author"));
    assert!(findings.iter().any(|f| f.kind == "pdf_producer"));
}

#[test]
fn oversized_file_is_never_opened_for_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("big.docx");
    write_ooxml_fixture(&path);

    let findings = scan_metadata(&path, 1);
    assert!(findings.is_empty());
}
