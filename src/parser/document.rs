use std::sync::LazyLock;

use regex::Regex;

use super::events::{Event, Observer};
use super::model::DocumentFields;

static REQUISITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RCS-[A-Z0-9\-]+").unwrap());

const REQUISITION_TRIGGER: &str = "REQUISITION NUMBER";
/// How many lines after the label to look for the number.
const REQUISITION_WINDOW: usize = 3;

pub fn extract(lines: &[&str], observer: &dyn Observer) -> DocumentFields {
    let requisition_number = requisition_number(lines);
    report(observer, "PR Number", requisition_number.as_deref());
    let pr_title = pr_title(lines);
    report(observer, "PR Title", pr_title.as_deref());

    DocumentFields {
        requisition_number,
        pr_title,
    }
}

fn report(observer: &dyn Observer, field: &'static str, value: Option<&str>) {
    match value {
        Some(value) => observer.observe(&Event::FieldExtracted { field, value }),
        None => observer.observe(&Event::FieldUnavailable { field }),
    }
}

pub fn requisition_number(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.to_uppercase().contains(REQUISITION_TRIGGER))
        .find_map(|(i, _)| {
            lines
                .iter()
                .skip(i + 1)
                .take(REQUISITION_WINDOW)
                .find_map(|candidate| REQUISITION_RE.find(candidate.trim()))
                .map(|m| m.as_str().to_string())
        })
}

/// Not located in any known form layout yet.
pub fn pr_title(_lines: &[&str]) -> Option<String> {
    None
}
