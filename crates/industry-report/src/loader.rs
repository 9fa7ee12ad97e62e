/// Loader for `.docx` industry reports.
///
/// A `.docx` file is a zip archive whose main part is `word/document.xml`. The body is a
/// sequence of `w:p` paragraphs and `w:tbl` tables; table cells (`w:tc`) hold their own
/// paragraphs. Parser approach: single pass over quick-xml events with a small amount of
/// state (table nesting depth, the open paragraph, the open row and cell).
///
/// Only run-level text counts: `w:t`, plus `w:tab`/`w:br`/`w:cr` inside a `w:r`. Text-box
/// content (`w:txbxContent`) carries its own paragraphs and is skipped entirely.
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::AppError;
use crate::model::{Document, Table};

const DOCUMENT_PART: &str = "word/document.xml";

/// Source of parsed report documents.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Document, AppError>;
}

/// Reads `.docx` files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn load(&self, path: &Path) -> Result<Document, AppError> {
        if !path.exists() {
            return Err(AppError::DocumentNotFound(path.to_path_buf()));
        }

        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::DocumentNotFound(path.to_path_buf())
            } else {
                AppError::InvalidDocument(format!("{}: {e}", path.display()))
            }
        })?;

        let mut archive = zip::ZipArchive::new(std::io::BufReader::new(file))
            .map_err(|e| AppError::InvalidDocument(format!("{}: {e}", path.display())))?;
        let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| {
            AppError::InvalidDocument(format!("{}: {DOCUMENT_PART}: {e}", path.display()))
        })?;
        let mut xml = String::new();
        part.read_to_string(&mut xml).map_err(|e| {
            AppError::InvalidDocument(format!("{}: {DOCUMENT_PART}: {e}", path.display()))
        })?;

        let document = parse_document_xml(&xml)?;
        debug!(
            path = %path.display(),
            paragraphs = document.paragraphs.len(),
            tables = document.tables.len(),
            "document loaded"
        );
        Ok(document)
    }
}

#[derive(Default)]
struct ParseState {
    document: Document,
    /// 0 = body, 1 = top-level table, >1 = table nested in a cell.
    table_depth: usize,
    /// >0 while inside `w:txbxContent`; everything there is ignored.
    textbox_depth: usize,
    run_depth: usize,
    in_text: bool,
    paragraph: Option<String>,
    table: Table,
    row: Option<Vec<String>>,
    cell: Option<Vec<String>>,
}

impl ParseState {
    fn start(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name();
        if name.as_ref() == b"txbxContent" {
            self.textbox_depth += 1;
        }
        if self.textbox_depth > 0 {
            return;
        }
        match name.as_ref() {
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = Table::default();
                }
            }
            b"tr" if self.table_depth == 1 => self.row = Some(Vec::new()),
            b"tc" if self.table_depth == 1 => self.cell = Some(Vec::new()),
            b"p" => self.paragraph = Some(String::new()),
            b"r" => self.run_depth += 1,
            b"t" => self.in_text = true,
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        if self.textbox_depth > 0 {
            if local_name == b"txbxContent" {
                self.textbox_depth -= 1;
            }
            return;
        }
        match local_name {
            b"tbl" => {
                if self.table_depth == 1 {
                    let table = std::mem::take(&mut self.table);
                    self.document.tables.push(table);
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            b"tr" if self.table_depth == 1 => {
                if let Some(row) = self.row.take() {
                    self.table.rows.push(row);
                }
            }
            b"tc" if self.table_depth == 1 => {
                if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                    row.push(cell.join("\n").trim().to_string());
                }
            }
            b"p" => {
                let text = self.paragraph.take().unwrap_or_default();
                self.finish_paragraph(text);
            }
            b"r" => self.run_depth = self.run_depth.saturating_sub(1),
            b"t" => self.in_text = false,
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        if self.textbox_depth > 0 {
            return;
        }
        match e.local_name().as_ref() {
            b"p" => self.finish_paragraph(String::new()),
            b"tc" if self.table_depth == 1 => {
                if let Some(row) = self.row.as_mut() {
                    row.push(String::new());
                }
            }
            // Outside a run, `w:tab` is a tab-stop definition in the paragraph properties.
            b"tab" if self.run_depth > 0 => self.push_text("\t"),
            b"br" | b"cr" if self.run_depth > 0 => self.push_text("\n"),
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.push_str(text);
        }
    }

    fn finish_paragraph(&mut self, text: String) {
        match self.table_depth {
            0 => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    self.document.paragraphs.push(trimmed.to_string());
                }
            }
            1 => {
                if let Some(cell) = self.cell.as_mut() {
                    cell.push(text);
                }
            }
            // Nested tables belong to neither the body nor the enclosing cell.
            _ => {}
        }
    }
}

/// Parse the main document part of a `.docx` archive.
pub fn parse_document_xml(xml: &str) -> Result<Document, AppError> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParseState::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            AppError::InvalidDocument(format!(
                "malformed {DOCUMENT_PART} at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(e) => state.start(&e),
            Event::End(e) => state.end(e.local_name().as_ref()),
            Event::Empty(e) => state.empty(&e),
            Event::Text(t) if state.in_text && state.textbox_depth == 0 => {
                let text = t
                    .unescape()
                    .map_err(|e| AppError::InvalidDocument(format!("bad text node: {e}")))?;
                state.push_text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(state.document)
}
