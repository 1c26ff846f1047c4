//! Field extraction for a single opening line of the schedule.
//!
//! Nothing here is positional: quantity is the number that sits directly in
//! front of a unit code, amounts are found by pattern, and the title is
//! recovered separately by the reconstructor.

use std::sync::LazyLock;

use regex::Regex;

use super::lines::Candidate;
use super::model::{
    Field, Flag, Flags, LineCode, LineItem, LineItemType, Money, NotToExceed, OptionalKind,
};
use super::units::{self, Unit};

static MONEY_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$?\d{1,3}(?:,\d{3})*\.\d{2}|NSP").unwrap());
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:,\d{3})*\.\d{2}$").unwrap());
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\d{1,3}(?:,\d{3})*\.\d{2}").unwrap());
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,4}$").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").unwrap());
static CLIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static SLIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}[A-Z]+$").unwrap());

/// Everything derivable from the opening line alone.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFields {
    pub code: LineCode,
    pub quantity: Field<String>,
    pub unit: Field<Unit>,
    pub unit_price: Field<Money>,
    pub amount: Field<Money>,
    pub flags: Flags,
    pub optional: OptionalKind,
    pub not_to_exceed: NotToExceed,
    pub description: String,
    pub pop_start: Field<String>,
    pub pop_end: Field<String>,
    pub line_item_type: LineItemType,
    pub nsp: bool,
}

impl LineFields {
    pub fn into_line_item(self, title: String) -> LineItem {
        LineItem {
            code: self.code,
            title,
            quantity: self.quantity,
            unit: self.unit,
            unit_price: self.unit_price,
            amount: self.amount,
            flags: self.flags,
            amount_committed: Field::Unavailable,
            amount_reserved: Field::Unavailable,
            optional: self.optional,
            not_to_exceed: self.not_to_exceed,
            description: self.description,
            pop_start: self.pop_start,
            pop_end: self.pop_end,
            group: Field::Unavailable,
            line_item_type: self.line_item_type,
            nsp: self.nsp,
            place_of_performance: Field::Unavailable,
        }
    }
}

pub fn extract(candidate: &Candidate<'_>) -> LineFields {
    let line = candidate.line;
    let unit_price = unit_price(line);
    let amount = amount(line);
    let flags = flags(&unit_price, &amount);
    let (pop_start, pop_end) = pop_dates(line);

    LineFields {
        code: split_code(candidate.code),
        quantity: quantity(candidate.rest),
        unit: unit(candidate.rest),
        unit_price,
        amount,
        flags,
        optional: optional_kind(line),
        not_to_exceed: not_to_exceed(line),
        description: line.trim().to_string(),
        pop_start,
        pop_end,
        line_item_type: line_item_type(line),
        nsp: says_not_separately_priced(line),
    }
}

pub fn split_code(code: &str) -> LineCode {
    if CLIN_RE.is_match(code) {
        LineCode {
            clin: code.to_string(),
            slin: Field::Unavailable,
        }
    } else if SLIN_RE.is_match(code) {
        LineCode {
            clin: code.chars().take(4).collect(),
            slin: Field::Found(code.to_string()),
        }
    } else {
        LineCode {
            clin: code.to_string(),
            slin: Field::Unavailable,
        }
    }
}

/// First 1-4 digit token immediately followed by a unit code.
pub fn quantity(rest: &str) -> Field<String> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    Field::from_option(
        tokens
            .windows(2)
            .find(|pair| QUANTITY_RE.is_match(pair[0]) && units::is_unit(pair[1]))
            .map(|pair| pair[0].to_string()),
    )
}

pub fn unit(rest: &str) -> Field<Unit> {
    Field::from_option(rest.split_whitespace().find_map(Unit::lookup))
}

/// Second-to-last money-shaped match on the line; a lone match is the amount.
pub fn unit_price(line: &str) -> Field<Money> {
    let matches: Vec<&str> = MONEY_TOKEN_RE
        .find_iter(line)
        .map(|m| m.as_str())
        .collect();
    if matches.len() < 2 {
        return Field::Unavailable;
    }
    let token = matches[matches.len() - 2];
    if token.eq_ignore_ascii_case("NSP") {
        Field::Found(Money::Nsp)
    } else {
        Field::Found(Money::Amount(token.replace('$', "")))
    }
}

/// Last whitespace token that is NSP or a full currency amount.
pub fn amount(line: &str) -> Field<Money> {
    for token in line.split_whitespace().rev() {
        let cleaned = token.replace('$', "");
        let cleaned = cleaned.trim();
        if cleaned.eq_ignore_ascii_case("NSP") {
            return Field::Found(Money::Nsp);
        }
        if AMOUNT_RE.is_match(cleaned) {
            return Field::Found(Money::Amount(cleaned.to_string()));
        }
    }
    Field::Unavailable
}

pub fn flags(unit_price: &Field<Money>, amount: &Field<Money>) -> Flags {
    let mut flags = Flags::new();
    let priced_nsp = |m: &Field<Money>| m.found().is_some_and(Money::is_nsp);
    if priced_nsp(unit_price) || priced_nsp(amount) {
        flags.insert(Flag::Nsp);
    }
    flags
}

pub fn optional_kind(line: &str) -> OptionalKind {
    let lower = line.to_lowercase();
    if lower.contains("option period") {
        OptionalKind::OptionPeriod
    } else if lower.contains("optional goods or services") {
        OptionalKind::OptionalGoodsOrServices
    } else if lower.contains("alternate") {
        OptionalKind::Alternate
    } else {
        OptionalKind::NotApplicable
    }
}

pub fn not_to_exceed(line: &str) -> NotToExceed {
    let lower = line.to_lowercase();
    if lower.contains("not to exceed quantity and price") {
        NotToExceed::Both
    } else if lower.contains("not to exceed quantity") {
        NotToExceed::Quantity
    } else if lower.contains("not to exceed price") {
        NotToExceed::Price
    } else {
        NotToExceed::NotApplicable
    }
}

pub fn line_item_type(line: &str) -> LineItemType {
    let lower = line.to_lowercase();
    if lower.contains("nsn") || lower.contains("not separately priced") {
        LineItemType::Informational
    } else if CURRENCY_RE.is_match(&lower) {
        LineItemType::Deliverable
    } else {
        LineItemType::Informational
    }
}

pub fn says_not_separately_priced(line: &str) -> bool {
    line.to_lowercase().contains("not separately priced")
}

pub fn pop_dates(line: &str) -> (Field<String>, Field<String>) {
    let mut dates = DATE_RE.find_iter(line).map(|m| m.as_str().to_string());
    let start = Field::from_option(dates.next());
    let end = Field::from_option(dates.next());
    (start, end)
}
