use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::units::Unit;

/// Placeholder rendered for any value the text gave no signal for.
pub const NOT_AVAILABLE: &str = "N/A";

/// Outcome of deriving one field: a value, or an explicit "no signal" marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Found(T),
    Unavailable,
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Found(v) => v.serialize(s),
            Field::Unavailable => s.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<T> Field<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Found(v),
            None => Field::Unavailable,
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Field::Found(v) => Some(v),
            Field::Unavailable => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Found(v) => v.fmt(f),
            Field::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// A priced value: a currency amount (kept as written, minus any `$`) or NSP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Money {
    Amount(String),
    Nsp,
}

impl Money {
    pub fn is_nsp(&self) -> bool {
        matches!(self, Money::Nsp)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Money::Amount(a) => f.write_str(a),
            Money::Nsp => f.write_str("NSP"),
        }
    }
}

impl From<Money> for String {
    fn from(m: Money) -> String {
        m.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Flag {
    #[serde(rename = "NSP")]
    Nsp,
}

impl Flag {
    pub fn literal(&self) -> &'static str {
        match self {
            Flag::Nsp => "NSP",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

pub type Flags = BTreeSet<Flag>;

/// CLIN, plus the full code when the line is a sub-line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineCode {
    pub clin: String,
    pub slin: Field<String>,
}

impl LineCode {
    /// The code as it appeared on the opening line.
    pub fn source_code(&self) -> &str {
        match &self.slin {
            Field::Found(slin) => slin,
            Field::Unavailable => &self.clin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionalKind {
    #[serde(rename = "Option Period")]
    OptionPeriod,
    #[serde(rename = "Optional Goods or Services")]
    OptionalGoodsOrServices,
    Alternate,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl fmt::Display for OptionalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptionalKind::OptionPeriod => "Option Period",
            OptionalKind::OptionalGoodsOrServices => "Optional Goods or Services",
            OptionalKind::Alternate => "Alternate",
            OptionalKind::NotApplicable => "Not Applicable",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotToExceed {
    Both,
    Quantity,
    Price,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl fmt::Display for NotToExceed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotToExceed::Both => "Both",
            NotToExceed::Quantity => "Quantity",
            NotToExceed::Price => "Price",
            NotToExceed::NotApplicable => "Not Applicable",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineItemType {
    Deliverable,
    Informational,
}

impl fmt::Display for LineItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineItemType::Deliverable => "Deliverable",
            LineItemType::Informational => "Informational",
        })
    }
}

/// One contract line item, built in a single pass from its opening line and
/// the continuation lines after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub code: LineCode,
    pub title: String,
    pub quantity: Field<String>,
    pub unit: Field<Unit>,
    pub unit_price: Field<Money>,
    pub amount: Field<Money>,
    pub flags: Flags,
    pub amount_committed: Field<String>,
    pub amount_reserved: Field<String>,
    pub optional: OptionalKind,
    pub not_to_exceed: NotToExceed,
    pub description: String,
    pub pop_start: Field<String>,
    pub pop_end: Field<String>,
    pub group: Field<String>,
    pub line_item_type: LineItemType,
    /// Line text says "not separately priced".
    pub nsp: bool,
    pub place_of_performance: Field<String>,
}

/// Column labels for the per-item part of an output row, in output order.
pub const LINE_ITEM_COLUMNS: [&str; 18] = [
    "CLIN",
    "SLIN",
    "Title",
    "Quantity",
    "Estimated Unit Price ($)",
    "Unit",
    "Amount ($)",
    "Amount Committed ($)",
    "Amount Reserved ($)",
    "Optional",
    "Not to Exceed",
    "Description",
    "POP Start Date",
    "POP End Date",
    "Group",
    "Line Item Type",
    "NSP",
    "Place of Performance",
];

impl LineItem {
    pub fn labeled_values(&self) -> [(&'static str, String); 18] {
        let values = [
            self.code.clin.clone(),
            self.code.slin.to_string(),
            self.title.clone(),
            self.quantity.to_string(),
            self.unit_price.to_string(),
            self.unit.to_string(),
            self.amount.to_string(),
            self.amount_committed.to_string(),
            self.amount_reserved.to_string(),
            self.optional.to_string(),
            self.not_to_exceed.to_string(),
            self.description.clone(),
            self.pop_start.to_string(),
            self.pop_end.to_string(),
            self.group.to_string(),
            self.line_item_type.to_string(),
            if self.nsp { "Yes" } else { "No" }.to_string(),
            self.place_of_performance.to_string(),
        ];
        let mut values = values.into_iter();
        LINE_ITEM_COLUMNS.map(|label| (label, values.next().unwrap_or_default()))
    }
}

/// Fields found once per document rather than per line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentFields {
    pub requisition_number: Option<String>,
    pub pr_title: Option<String>,
}

impl DocumentFields {
    /// Later pages win, but only with a value they actually found. A page
    /// reporting "N/A" never replaces an earlier value, unlike the legacy
    /// script where the placeholder overwrote it.
    pub fn merge(&mut self, page: DocumentFields) {
        if page.requisition_number.is_some() {
            self.requisition_number = page.requisition_number;
        }
        if page.pr_title.is_some() {
            self.pr_title = page.pr_title;
        }
    }

    pub fn requisition_number(&self) -> &str {
        self.requisition_number.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn pr_title(&self) -> &str {
        self.pr_title.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub source_file: String,
    pub fields: DocumentFields,
    pub line_items: Vec<LineItem>,
}
