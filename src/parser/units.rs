use phf::phf_set;

/// Two-character unit-of-measure codes accepted on schedule lines.
static VALID_UNITS: phf::Set<&'static str> = phf_set! {
    "AL", "BG", "BJ", "OC", "BO", "BX", "CT", "CS", "CH", "CF", "CO", "CY", "DA", "DY", "A8",
    "EA", "EC", "EX", "FL", "FT", "1G", "GA", "GL", "HR", "FF", "HS", "HE", "JO", "JB", "KW",
    "KH", "LH", "LL", "LF", "LP", "LT", "LD", "NL", "LO", "LS", "M0", "PU", "MG", "MT", "MN",
    "MW", "MH", "MM", "MB", "BZ", "MJ", "MO", "TN", "OT", "PH", "ZP", "PR", "PB", "PL", "P1",
    "PI", "LB", "PJ", "PE", "PO", "QT", "Q1", "RM", "RE", "RT", "1O", "ST", "SU", "SV", "SQ",
    "SF", "SY", "YT", "TD", "TH", "NT", "TO", "UN", "WK", "WM", "YD", "YR",
};

/// A unit-of-measure code known to be in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Unit(&'static str);

impl Unit {
    /// Exact, case-sensitive lookup. `"ea"` is not a unit.
    pub fn lookup(token: &str) -> Option<Unit> {
        VALID_UNITS.get_key(token).map(|&code| Unit(code))
    }

    pub fn code(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

pub fn is_unit(token: &str) -> bool {
    VALID_UNITS.contains(token)
}
