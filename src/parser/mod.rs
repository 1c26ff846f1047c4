pub mod document;
pub mod events;
pub mod fields;
pub mod lines;
pub mod model;
pub mod title;
pub mod units;

use events::{Event, Observer};
use model::{DocumentFields, DocumentRecord, LineItem};

/// Run every page through the pipeline and collect one record for the file.
/// Pages without text contribute nothing.
pub fn process_document<S: AsRef<str>>(
    source_file: &str,
    pages: &[Option<S>],
    observer: &dyn Observer,
) -> DocumentRecord {
    let mut fields = DocumentFields::default();
    let mut line_items = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        let text = page.as_ref().map(AsRef::<str>::as_ref);
        observer.observe(&Event::PageStart { page: i + 1, text });
        let Some(text) = text else { continue };

        let (page_fields, items) = process_page(text, observer);
        fields.merge(page_fields);
        line_items.extend(items);
    }

    DocumentRecord {
        source_file: source_file.to_string(),
        fields,
        line_items,
    }
}

/// Extract document fields and line items from one page of text.
pub fn process_page(text: &str, observer: &dyn Observer) -> (DocumentFields, Vec<LineItem>) {
    let lines: Vec<&str> = text.split('\n').collect();
    let doc_fields = document::extract(&lines, observer);

    let mut items = Vec::new();
    for candidate in lines::candidates(&lines) {
        let line_fields = fields::extract(&candidate);
        let title = title::reconstruct(&lines, candidate.index, &line_fields, observer);
        let item = line_fields.into_line_item(title);
        observer.observe(&Event::LineItemExtracted(&item));
        items.push(item);
    }

    (doc_fields, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::events::{Recorder, Silent};
    use crate::parser::model::{Field, Flag, Money};

    fn fixture(name: &str) -> Vec<Option<String>> {
        let text = std::fs::read_to_string(format!("tests/fixtures/{}.txt", name)).unwrap();
        text.split('\x0C').map(|p| Some(p.to_string())).collect()
    }

    #[test]
    fn widget_kit_end_to_end() {
        let page = "SCHEDULE OF SUPPLIES/SERVICES\n0001AA Widget Kit, Model X 10 EA $5.00 $50.00\nQty Remarks: none";
        let record = process_document("a.pdf", &[Some(page)], &Silent);
        assert_eq!(record.line_items.len(), 1);
        let item = &record.line_items[0];
        assert_eq!(item.code.clin, "0001");
        assert_eq!(item.code.slin, Field::Found("0001AA".to_string()));
        assert_eq!(item.quantity, Field::Found("10".to_string()));
        assert_eq!(item.unit.to_string(), "EA");
        assert_eq!(item.unit_price, Field::Found(Money::Amount("5.00".into())));
        assert_eq!(item.amount, Field::Found(Money::Amount("50.00".into())));
        assert_eq!(item.title, "Widget Kit, Model X");
        assert!(item.flags.is_empty());
    }

    #[test]
    fn no_trigger_no_items() {
        let page = "REQUISITION NUMBER\nRCS-77\n0001 Widget 1 EA $5.00";
        let record = process_document("b.pdf", &[Some(page)], &Silent);
        assert!(record.line_items.is_empty());
        assert_eq!(record.fields.requisition_number(), "RCS-77");
        assert_eq!(record.fields.pr_title(), "N/A");
    }

    #[test]
    fn empty_document_defaults() {
        let record = process_document::<&str>("c.pdf", &[None, None], &Silent);
        assert!(record.line_items.is_empty());
        assert_eq!(record.fields.requisition_number(), "N/A");
        assert_eq!(record.source_file, "c.pdf");
    }

    #[test]
    fn capture_resets_each_page() {
        let pages = [
            Some("ITEM NO.\n0001 First 1 EA $1.00\nQty"),
            Some("0002 Orphan 1 EA $2.00\nQty"),
            Some("ITEM NO.\n0003 Third 1 EA $3.00\nQty"),
        ];
        let record = process_document("d.pdf", &pages, &Silent);
        let codes: Vec<&str> = record.line_items.iter().map(|i| i.code.source_code()).collect();
        assert_eq!(codes, vec!["0001", "0003"]);
    }

    #[test]
    fn requisition_survives_later_pages() {
        let pages = [Some("REQUISITION NUMBER\nRCS-1"), None, Some("nothing")];
        let record = process_document("e.pdf", &pages, &Silent);
        assert_eq!(record.fields.requisition_number(), "RCS-1");
    }

    #[test]
    fn events_in_order() {
        let rec = Recorder::new();
        process_document(
            "f.pdf",
            &[Some("ITEM NO.\n0001 Widget 1 EA $1.00\nQty")],
            &rec,
        );
        let messages = rec.into_messages();
        assert!(messages[0].starts_with("========== PAGE 1"));
        assert!(messages.iter().any(|m| m.starts_with("--- Title Cleanup Start ---")));
        assert!(messages.last().unwrap().starts_with("Line Item Extracted from Text:"));
    }

    #[test]
    fn contract_fixture() {
        let pages = fixture("contract");
        let record = process_document("contract.txt", &pages, &Silent);
        assert_eq!(record.fields.requisition_number(), "RCS-2024-0417");

        let codes: Vec<&str> = record.line_items.iter().map(|i| i.code.source_code()).collect();
        assert_eq!(codes, vec!["0001", "0001AA", "0001AB", "0002", "1001"]);

        let base = &record.line_items[0];
        assert_eq!(base.title, "Base Year Field Engineering Support 10/01/2024 09/30/2025");
        assert_eq!(base.quantity, Field::Found("12".into()));
        assert_eq!(base.unit.to_string(), "MO");
        assert_eq!(base.unit_price.to_string(), "15,000.00");
        assert_eq!(base.amount.to_string(), "180,000.00");
        assert_eq!(base.pop_start.to_string(), "10/01/2024");
        assert_eq!(base.pop_end.to_string(), "09/30/2025");

        let data = &record.line_items[2];
        assert_eq!(data.title, "Contract Data Requirements List Not Separately Priced");
        assert_eq!(data.amount, Field::Found(Money::Nsp));
        assert!(data.flags.contains(&Flag::Nsp));
        assert!(data.nsp);
        assert_eq!(data.unit_price.to_string(), "N/A");

        let travel = &record.line_items[3];
        assert_eq!(travel.quantity.to_string(), "N/A");
        assert_eq!(travel.unit.to_string(), "N/A");
        assert_eq!(travel.amount.to_string(), "25,000.00");
        assert_eq!(travel.not_to_exceed.to_string(), "Price");
        assert_eq!(
            travel.title,
            "Travel Not To Exceed Price in support of CLIN 0001 as directed by the COR"
        );

        let option = &record.line_items[4];
        assert_eq!(option.optional.to_string(), "Option Period");
        assert_eq!(option.title, "Option Period 1 Field Engineering Support");
    }
}
