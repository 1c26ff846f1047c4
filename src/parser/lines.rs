use std::sync::LazyLock;

use regex::Regex;

static OPENING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}[A-Z]{0,2})\s+(.*)").unwrap());

const TRIGGERS: &[&str] = &["ITEM NO.", "SCHEDULE OF SUPPLIES/SERVICES"];
const PAGE_BREAK: &str = "Continued ...";

/// A schedule line that opens a new line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Position of the line within the page.
    pub index: usize,
    /// The trimmed line, code included.
    pub line: &'a str,
    pub code: &'a str,
    pub rest: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Before the schedule header.
    Preamble,
    /// A schedule header line; turns capture on.
    Trigger,
    /// "Continued ..." banner inside the schedule.
    PageBreak,
    Opening(Candidate<'a>),
    /// Inside the schedule but not an opening line (continuations, footers).
    Other,
}

/// Lazily classifies page lines. Capture latches on at the first trigger and
/// stays on for the rest of the page.
pub struct Classifier<'a> {
    lines: &'a [&'a str],
    pos: usize,
    capturing: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(lines: &'a [&'a str]) -> Self {
        Classifier {
            lines,
            pos: 0,
            capturing: false,
        }
    }

    fn classify(&mut self, index: usize, raw: &'a str) -> LineKind<'a> {
        if TRIGGERS.iter().any(|t| raw.contains(t)) {
            self.capturing = true;
            return LineKind::Trigger;
        }
        if !self.capturing {
            return LineKind::Preamble;
        }
        if raw.contains(PAGE_BREAK) {
            return LineKind::PageBreak;
        }
        let line = raw.trim();
        match OPENING_RE.captures(line) {
            Some(caps) => {
                let (Some(code), Some(rest)) = (caps.get(1), caps.get(2)) else {
                    return LineKind::Other;
                };
                LineKind::Opening(Candidate {
                    index,
                    line,
                    code: code.as_str(),
                    rest: rest.as_str(),
                })
            }
            None => LineKind::Other,
        }
    }
}

impl<'a> Iterator for Classifier<'a> {
    type Item = (usize, LineKind<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.pos;
        let raw = *self.lines.get(index)?;
        self.pos += 1;
        Some((index, self.classify(index, raw)))
    }
}

/// Opening lines of the page's line-item schedule, in order.
pub fn candidates<'a>(lines: &'a [&'a str]) -> impl Iterator<Item = Candidate<'a>> + 'a {
    Classifier::new(lines).filter_map(|(_, kind)| match kind {
        LineKind::Opening(c) => Some(c),
        _ => None,
    })
}
