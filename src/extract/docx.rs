//! DOCX raw-text extraction from `word/document.xml`.
//!
//! Formatting is discarded. Each paragraph is followed by a blank line;
//! tabs and breaks inside runs become `\t` and `\n`.

use quick_xml::events::Event;
use std::io::{Cursor, Read};

use super::ExtractError;

const DOCUMENT_XML: &str = "word/document.xml";
const FAILURE_MESSAGE: &str = "Failed to extract text from DOCX";
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_xml(bytes).map_err(|detail| {
        tracing::warn!(error = %detail, "DOCX container unreadable");
        ExtractError::corrupted(FAILURE_MESSAGE, detail)
    })?;
    paragraphs_text(&xml).map_err(|detail| {
        tracing::warn!(error = %detail, "DOCX XML unreadable");
        ExtractError::corrupted(FAILURE_MESSAGE, detail)
    })
}

fn read_document_xml(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let entry = archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| format!("{}: {}", DOCUMENT_XML, e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            DOCUMENT_XML, MAX_XML_ENTRY_BYTES
        ));
    }
    Ok(out)
}

fn paragraphs_text(xml: &[u8]) -> Result<String, String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_run = false;
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_run => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                out.push_str(&text);
            }
            Ok(Event::CData(cd)) if in_text => {
                out.push_str(&String::from_utf8_lossy(&cd.into_inner()));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(DOCUMENT_XML, zip::write::SimpleFileOptions::default())
                .unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>First</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r></w:p>",
        );
        assert_eq!(extract_docx(&bytes).unwrap(), "First\n\nSecond\n\n");
    }

    #[test]
    fn runs_keep_inner_spaces_and_entities() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t xml:space=\"preserve\">Fish </w:t></w:r><w:r><w:t>&amp; chips</w:t></w:r></w:p>",
        );
        assert_eq!(extract_docx(&bytes).unwrap(), "Fish & chips\n\n");
    }

    #[test]
    fn tabs_and_breaks_inside_runs() {
        let bytes = docx_with_body(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>",
        );
        assert_eq!(extract_docx(&bytes).unwrap(), "a\tb\nc\n\n");
    }

    #[test]
    fn missing_document_xml_is_corrupted() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_docx(&buf).unwrap_err();
        assert!(matches!(err, ExtractError::Corrupted { .. }));
        assert!(err.detail().unwrap().contains(DOCUMENT_XML));
    }
}
