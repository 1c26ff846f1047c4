use super::events::{Event, Observer};
use super::fields::LineFields;
use super::model::Flags;

/// Lines starting with any of these end a line item's title block.
pub const STOP_PREFIXES: &[&str] = &[
    "Qty",
    "Award Type",
    "Obligated Amount",
    "Continued",
    "FOB",
    "Delivery",
    "Packaging",
    "Inspection",
    "Period of Performance",
    "Ceiling Amount",
    "Accounting Info",
    "Signature",
];

/// Values already pulled out of the opening line, normalized for comparison
/// against title tokens.
#[derive(Debug, Clone)]
pub struct KnownTokens {
    pub code: String,
    pub quantity: String,
    pub unit: String,
    pub unit_price: String,
    pub amount: String,
    pub flags: Flags,
}

impl KnownTokens {
    pub fn from_fields(fields: &LineFields) -> Self {
        KnownTokens {
            code: fields.code.source_code().trim().to_string(),
            quantity: fields.quantity.to_string().trim().to_string(),
            unit: fields.unit.to_string().trim().to_string(),
            unit_price: normalize_money(&fields.unit_price.to_string()),
            amount: normalize_money(&fields.amount.to_string()),
            flags: fields.flags.clone(),
        }
    }

    fn matches(&self, token: &str) -> bool {
        let normalized = normalize_money(token);
        normalized == self.quantity
            || normalized == self.unit_price
            || normalized == self.amount
            || self.flags.iter().any(|f| f.literal() == token)
            || token == self.unit
    }
}

fn normalize_money(s: &str) -> String {
    s.replace([',', '$'], "").trim().to_string()
}

/// Trimmed lines from `start` up to, not including, the first stop line.
pub fn continuation_lines<'a>(lines: &[&'a str], start: usize) -> Vec<&'a str> {
    lines
        .iter()
        .skip(start)
        .map(|&l| l.trim())
        .take_while(|l| !STOP_PREFIXES.iter().any(|p| l.starts_with(p)))
        .collect()
}

/// Rebuild the title of the item opened at `start`, minus the tokens the
/// field extractor already claimed.
pub fn reconstruct(
    lines: &[&str],
    start: usize,
    fields: &LineFields,
    observer: &dyn Observer,
) -> String {
    let raw = continuation_lines(lines, start);
    let joined = raw.join(" ");
    let known = KnownTokens::from_fields(fields);

    observer.observe(&Event::TitleCleanupStart {
        raw_lines: &raw,
        code: &known.code,
        quantity: &known.quantity,
        unit: &known.unit,
        unit_price: &known.unit_price,
        amount: &known.amount,
        flags: &known.flags,
    });

    let mut title = joined.trim();
    if !known.code.is_empty() {
        if let Some(rest) = title.strip_prefix(known.code.as_str()) {
            title = rest.trim();
        }
    }

    let cleaned = strip_tokens(title, &known, observer);
    observer.observe(&Event::TitleCleaned { title: &cleaned });
    cleaned
}

/// Drop whole tokens equal to a known value. Substrings are never touched.
pub fn strip_tokens(title: &str, known: &KnownTokens, observer: &dyn Observer) -> String {
    title
        .split_whitespace()
        .filter(|&token| {
            if known.matches(token) {
                observer.observe(&Event::TokenRemoved { token });
                false
            } else {
                true
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
