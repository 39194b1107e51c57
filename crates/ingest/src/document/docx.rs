use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{ExtractionError, PageContent};

/// Extract plain text from a DOCX archive.
///
/// A .docx file is a zip containing `word/document.xml`; text lives in
/// `<w:t>` elements and paragraphs end at `</w:p>`.
pub fn extract_docx(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a valid docx archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(format!("failed to read document.xml: {e}")))?;

    let text = document_xml_to_text(&xml)?;

    Ok(vec![PageContent {
        page_number: 1,
        text: text.trim().to_string(),
    }])
}

fn document_xml_to_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut out = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::Docx(format!("bad XML entity: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => out.push('\n'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => out.push(' '),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Docx(format!("malformed XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn make_docx(document_xml: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_paragraph_text() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Admissions open in June.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Contact the office for details.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let pages = extract_docx(&make_docx(xml)).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.contains("Admissions open in June."));
        assert!(pages[0]
            .text
            .lines()
            .any(|l| l.trim() == "Contact the office for details."));
    }

    #[test]
    fn unescapes_entities() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Fees &amp; scholarships</w:t></w:r></w:p></w:body></w:document>"#;
        let pages = extract_docx(&make_docx(xml)).unwrap();
        assert_eq!(pages[0].text, "Fees & scholarships");
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let err = extract_docx(b"this is not a zip").unwrap_err();
        assert!(matches!(err, ExtractionError::Docx(_)));
    }

    #[test]
    fn rejects_zip_without_document_xml() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("unrelated.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"nothing here").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx(&bytes).unwrap_err();
        assert!(matches!(err, ExtractionError::Docx(_)));
    }
}
