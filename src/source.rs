//! Per-page text for an input file: one optional string per page, in page
//! order, with one line per visual line of the page.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};

/// Separates pages in plain-text inputs.
const PAGE_BREAK: char = '\x0C';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Text,
}

impl InputKind {
    pub fn of(path: &Path) -> Option<InputKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(InputKind::Pdf),
            "txt" => Some(InputKind::Text),
            _ => None,
        }
    }
}

pub fn load_pages(path: &Path) -> Result<Vec<Option<String>>> {
    match InputKind::of(path) {
        Some(InputKind::Pdf) => pdf_pages(path),
        Some(InputKind::Text) => text_pages(path),
        None => Err(ExtractError::Unsupported(path.to_path_buf())),
    }
}

fn pdf_pages(path: &Path) -> Result<Vec<Option<String>>> {
    let doc = Document::load(path).map_err(|source| ExtractError::Pdf {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = doc.get_pages();
    debug!("{}: {} pages", path.display(), pages.len());

    Ok(pages
        .iter()
        .map(|(&page_num, &page_id)| match page_text(&doc, page_id) {
            Ok(text) => non_empty(text),
            Err(e) => {
                warn!("{}: no text on page {}: {}", path.display(), page_num, e);
                None
            }
        })
        .collect())
}

/// Page text with one output line per visual line. A text block may hold
/// several lines, so `Td`/`TD`/`Tm` vertical moves, `T*` and the quote
/// operators end a line as well as `ET`.
fn page_text(doc: &Document, page_id: ObjectId) -> lopdf::Result<String> {
    let encodings: BTreeMap<Vec<u8>, &str> = doc
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect();
    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut text = PageText::default();
    let mut encoding = None;
    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => text.line_y = None,
            "ET" => text.end_line(),
            "Tf" => {
                encoding = operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| encodings.get(name).copied());
            }
            "Td" | "TD" => {
                if number(operands, 1) != 0.0 {
                    text.end_line();
                } else if number(operands, 0) != 0.0 {
                    text.gap();
                }
            }
            "Tm" => {
                let y = number(operands, 5);
                if text.line_y.is_some_and(|prev| prev != y) {
                    text.end_line();
                } else {
                    text.gap();
                }
                text.line_y = Some(y);
            }
            "T*" => text.end_line(),
            "'" => {
                text.end_line();
                text.show(encoding, operands);
            }
            "\"" => {
                text.end_line();
                text.show(encoding, operands.get(2..).unwrap_or_default());
            }
            "Tj" | "TJ" => text.show(encoding, operands),
            _ => {}
        }
    }
    Ok(text.out)
}

fn number(operands: &[Object], i: usize) -> f32 {
    operands.get(i).and_then(|o| o.as_float().ok()).unwrap_or(0.0)
}

#[derive(Default)]
struct PageText {
    out: String,
    /// Baseline of the last `Tm` inside the current text block.
    line_y: Option<f32>,
}

impl PageText {
    fn end_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn gap(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn show(&mut self, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => self.out.push_str(&Document::decode_text(encoding, bytes)),
                Object::Array(items) => self.show(encoding, items),
                // Kerning wider than a glyph reads as a word space.
                Object::Integer(_) | Object::Real(_) => {
                    if operand.as_float().is_ok_and(|adjust| adjust < -100.0) {
                        self.gap();
                    }
                }
                _ => {}
            }
        }
    }
}

fn text_pages(path: &Path) -> Result<Vec<Option<String>>> {
    let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(split_pages(&text))
}

pub fn split_pages(text: &str) -> Vec<Option<String>> {
    text.split(PAGE_BREAK)
        .map(|page| non_empty(page.replace("\r\n", "\n")))
        .collect()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    #[test]
    fn kinds_by_extension() {
        assert_eq!(InputKind::of(Path::new("a/B.PDF")), Some(InputKind::Pdf));
        assert_eq!(InputKind::of(Path::new("notes.txt")), Some(InputKind::Text));
        assert_eq!(InputKind::of(Path::new("scan.tiff")), None);
        assert_eq!(InputKind::of(Path::new("README")), None);
    }

    #[test]
    fn form_feed_pages() {
        let pages = split_pages("one\r\nline\x0C\x0Cthree");
        assert_eq!(
            pages,
            vec![Some("one\nline".to_string()), None, Some("three".to_string())]
        );
    }

    #[test]
    fn fixture_has_three_pages() {
        let pages = load_pages(Path::new("tests/fixtures/contract.txt")).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(Option::is_some));
    }

    #[test]
    fn unsupported_and_missing() {
        assert!(matches!(
            load_pages(Path::new("x.docx")),
            Err(ExtractError::Unsupported(_))
        ));
        assert!(matches!(
            load_pages(Path::new("tests/fixtures/missing.txt")),
            Err(ExtractError::Io { .. })
        ));
    }

    /// One page whose text operations are `ops`, written to `dir/name`.
    fn write_pdf(dir: &Path, name: &str, ops: Vec<Operation>) -> std::path::PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = dir.join(name);
        doc.save(&path).unwrap();
        path
    }

    fn tj(text: &str) -> Operation {
        Operation::new("Tj", vec![Object::string_literal(text)])
    }

    const WIDGET_PAGE: [&str; 3] = [
        "SCHEDULE OF SUPPLIES/SERVICES",
        "0001AA Widget Kit, Model X 10 EA $5.00 $50.00",
        "Qty Remarks: none",
    ];

    fn widget_items(path: &Path) -> Vec<crate::parser::model::LineItem> {
        let pages = load_pages(path).unwrap();
        crate::parser::process_document("w.pdf", &pages, &crate::parser::events::Silent).line_items
    }

    #[test]
    fn pdf_lines_in_one_text_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for (i, line) in WIDGET_PAGE.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("Td", vec![0.into(), (-14).into()]));
            }
            ops.push(tj(line));
        }
        ops.push(Operation::new("ET", vec![]));
        let path = write_pdf(dir.path(), "block.pdf", ops);

        let pages = load_pages(&path).unwrap();
        let lines: Vec<&str> = pages[0].as_deref().unwrap().lines().collect();
        assert_eq!(lines, WIDGET_PAGE);

        let items = widget_items(&path);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Widget Kit, Model X");
        assert_eq!(items[0].amount.to_string(), "50.00");
    }

    #[test]
    fn pdf_line_operators() {
        let dir = tempfile::tempdir().unwrap();
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 720.into()]),
            tj(WIDGET_PAGE[0]),
            Operation::new("T*", vec![]),
            tj("0001AA"),
            Operation::new("Td", vec![60.into(), 0.into()]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Widget Kit, Model X"),
                    (-250).into(),
                    Object::string_literal("10 EA $5.00 $50.00"),
                ])],
            ),
            Operation::new("'", vec![Object::string_literal(WIDGET_PAGE[2])]),
            Operation::new("ET", vec![]),
        ];
        let path = write_pdf(dir.path(), "ops.pdf", ops);

        let pages = load_pages(&path).unwrap();
        let lines: Vec<&str> = pages[0].as_deref().unwrap().lines().collect();
        assert_eq!(lines, WIDGET_PAGE);
        assert_eq!(widget_items(&path)[0].title, "Widget Kit, Model X");
    }

    #[test]
    fn pdf_blocks_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut ops = Vec::new();
        for (i, line) in WIDGET_PAGE.iter().enumerate() {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            ops.push(Operation::new("Td", vec![72.into(), (720 - 14 * i as i64).into()]));
            ops.push(tj(line));
            ops.push(Operation::new("ET", vec![]));
        }
        let path = write_pdf(dir.path(), "blocks.pdf", ops);
        assert_eq!(widget_items(&path).len(), 1);
    }

    #[test]
    fn garbage_pdf_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        assert!(matches!(load_pages(&path), Err(ExtractError::Pdf { .. })));
    }
}
