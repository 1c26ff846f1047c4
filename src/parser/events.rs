//! Diagnostic events raised while extracting a document.
//!
//! The extractor never writes logs itself. It reports each decision to an
//! [`Observer`], and the caller decides where (or whether) the messages go.

use std::cell::RefCell;
use std::fmt;

use super::model::{Flags, LineItem};

#[derive(Debug)]
pub enum Event<'a> {
    PageStart { page: usize, text: Option<&'a str> },
    FieldExtracted { field: &'static str, value: &'a str },
    FieldUnavailable { field: &'static str },
    TitleCleanupStart {
        raw_lines: &'a [&'a str],
        code: &'a str,
        quantity: &'a str,
        unit: &'a str,
        unit_price: &'a str,
        amount: &'a str,
        flags: &'a Flags,
    },
    TokenRemoved { token: &'a str },
    TitleCleaned { title: &'a str },
    LineItemExtracted(&'a LineItem),
    RowWritten { row: &'a str },
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PageStart { page, text } => {
                writeln!(f, "========== PAGE {} ==========", page)?;
                writeln!(f, "Text Content:")?;
                f.write_str(text.unwrap_or("[No text extracted]"))
            }
            Event::FieldExtracted { field, value } => write!(f, "Extracted {}: {}", field, value),
            Event::FieldUnavailable { field } => write!(f, "No value found for {}", field),
            Event::TitleCleanupStart {
                raw_lines,
                code,
                quantity,
                unit,
                unit_price,
                amount,
                flags,
            } => {
                let flags: Vec<&str> = flags.iter().map(|fl| fl.literal()).collect();
                writeln!(f, "--- Title Cleanup Start ---")?;
                writeln!(f, "Raw Title Lines: {}", raw_lines.join(" | "))?;
                write!(
                    f,
                    "Parsed values: quantity={}, unit={}, unit_price={}, amount={}, flags=[{}], clin={}",
                    quantity,
                    unit,
                    unit_price,
                    amount,
                    flags.join(", "),
                    code
                )
            }
            Event::TokenRemoved { token } => write!(f, "Removing token from title: {}", token),
            Event::TitleCleaned { title } => {
                writeln!(f, "Cleaned Title: {}", title)?;
                f.write_str("--- Title Cleanup End ---")
            }
            Event::LineItemExtracted(item) => {
                writeln!(f, "Line Item Extracted from Text:")?;
                for (label, value) in item.labeled_values() {
                    writeln!(f, "  {:30}: {}", label, value)?;
                }
                f.write_str("----------------------------------------")
            }
            Event::RowWritten { row } => write!(f, "CSV Row Written: {}", row),
        }
    }
}

pub trait Observer {
    fn observe(&self, event: &Event<'_>);
}

/// Discards everything.
pub struct Silent;

impl Observer for Silent {
    fn observe(&self, _event: &Event<'_>) {}
}

/// Forwards events to `tracing` at debug level.
pub struct Trace;

impl Observer for Trace {
    fn observe(&self, event: &Event<'_>) {
        tracing::debug!(target: "clin_extract::events", "{}", event);
    }
}

/// Buffers rendered messages for one document so they can be written out in
/// a single append.
#[derive(Default)]
pub struct Recorder {
    messages: RefCell<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a free-form line alongside the events.
    pub fn note(&self, message: impl Into<String>) {
        self.messages.borrow_mut().push(message.into());
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages.into_inner()
    }
}

impl Observer for Recorder {
    fn observe(&self, event: &Event<'_>) {
        self.messages.borrow_mut().push(event.to_string());
    }
}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn observe(&self, event: &Event<'_>) {
        self.0.observe(event);
        self.1.observe(event);
    }
}

impl<O: Observer + ?Sized> Observer for &O {
    fn observe(&self, event: &Event<'_>) {
        (**self).observe(event);
    }
}
