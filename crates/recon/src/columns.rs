//! Column resolution by semantic role.
//!
//! Every logical field the pipeline needs is described once, in [`FIELD_RULES`],
//! as an ordered list of header predicates. [`resolve`] scans headers left to
//! right and returns the first one any rule accepts. Headers are compared
//! trimmed and upper-cased.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A logical column the pipeline looks up by role rather than by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Register: source scheme descriptor (`From`).
    From,
    /// Register: destination scheme descriptor (`Scheme :`).
    SchemeOut,
    /// Reference master: scheme code key.
    SchemeCodeReference,
    /// Reference master: parent subfund code.
    ParentSubfundCode,
    /// Reference master: asset class.
    AssetClass,
    /// Schedule: broker / distributor code.
    ConsCode,
    /// Schedule: subfund code.
    SchemeCodeSchedule,
    InvestmentPeriodFrom,
    InvestmentPeriodTo,
    /// Schedule: trail rate for holding year 1..=5.
    TrailRateYear(u8),
    /// Register: broker / dealer code.
    Broker,
    /// Register: transaction date.
    TransactionDate,
}

impl Field {
    /// Human label used in warnings.
    pub fn label(&self) -> String {
        match self {
            Self::From => "From".into(),
            Self::SchemeOut => "Scheme :".into(),
            Self::SchemeCodeReference => "Scheme_code".into(),
            Self::ParentSubfundCode => "PARENT_SUB_FUND_CODE".into(),
            Self::AssetClass => "ASSET_CLASS".into(),
            Self::ConsCode => "Cons Code".into(),
            Self::SchemeCodeSchedule => "Scheme Code".into(),
            Self::InvestmentPeriodFrom => "Investment Period From".into(),
            Self::InvestmentPeriodTo => "Investment Period To".into(),
            Self::TrailRateYear(y) => format!("Trail Rate {y} year"),
            Self::Broker => "Broker (BROK_DLR_N or similar)".into(),
            Self::TransactionDate => "Transaction Date".into(),
        }
    }
}

pub const TRAIL_YEARS: std::ops::RangeInclusive<u8> = 1..=5;

/// Register fields.
pub const REGISTER_FIELDS: &[Field] = &[
    Field::From,
    Field::SchemeOut,
    Field::Broker,
    Field::TransactionDate,
];

/// Reference master fields.
pub const REFERENCE_FIELDS: &[Field] = &[
    Field::SchemeCodeReference,
    Field::ParentSubfundCode,
    Field::AssetClass,
];

/// Schedule fields, trail years included.
pub const SCHEDULE_FIELDS: &[Field] = &[
    Field::ConsCode,
    Field::SchemeCodeSchedule,
    Field::InvestmentPeriodFrom,
    Field::InvestmentPeriodTo,
    Field::TrailRateYear(1),
    Field::TrailRateYear(2),
    Field::TrailRateYear(3),
    Field::TrailRateYear(4),
    Field::TrailRateYear(5),
];

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One way a normalized header can satisfy a field.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Header equals one of these names.
    Exact(&'static [&'static str]),
    /// Header contains every `all` token, at least one `any` token (when
    /// non-empty), and none of the `none` tokens.
    Contains {
        all: &'static [&'static str],
        any: &'static [&'static str],
        none: &'static [&'static str],
    },
    /// Header contains every `all` token, at least one `any` token, and the
    /// given number as a standalone digit run (`TRAIL 1 YR`, `Trail_Rate_Year1`).
    Numbered {
        all: &'static [&'static str],
        any: &'static [&'static str],
        number: u8,
    },
}

impl Rule {
    fn accepts(&self, header: &str) -> bool {
        match self {
            Rule::Exact(names) => names.iter().any(|n| *n == header),
            Rule::Contains { all, any, none } => {
                all.iter().all(|t| header.contains(t))
                    && (any.is_empty() || any.iter().any(|t| header.contains(t)))
                    && !none.iter().any(|t| header.contains(t))
            }
            Rule::Numbered { all, any, number } => {
                all.iter().all(|t| header.contains(t))
                    && (any.is_empty() || any.iter().any(|t| header.contains(t)))
                    && digit_runs(header).any(|run| run.parse::<u32>().ok() == Some(*number as u32))
            }
        }
    }
}

/// Maximal runs of ASCII digits in `s`.
fn digit_runs(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_ascii_digit()).filter(|run| !run.is_empty())
}

const fn contains(all: &'static [&'static str]) -> Rule {
    Rule::Contains { all, any: &[], none: &[] }
}

const fn trail(number: u8) -> Rule {
    Rule::Numbered {
        all: &["TRAIL"],
        any: &["YEAR", "YR"],
        number,
    }
}

/// The declarative (field, predicates) table. A header matches a field when
/// any of the field's rules accepts it.
pub const FIELD_RULES: &[(Field, &[Rule])] = &[
    (Field::From, &[Rule::Exact(&["FROM"])]),
    (Field::SchemeOut, &[Rule::Exact(&["SCHEME :", "SCHEME:", "SCHEME"])]),
    (Field::SchemeCodeReference, &[Rule::Exact(&["SCHEME_CODE", "SCHEME CODE"])]),
    (
        Field::ParentSubfundCode,
        &[Rule::Exact(&["PARENT_SUB_FUND_CODE", "PARENT SUB FUND CODE"])],
    ),
    (
        Field::AssetClass,
        &[Rule::Exact(&["ASSET_CLASS", "ASSET CLASS"]), contains(&["ASSET", "CLASS"])],
    ),
    (
        Field::ConsCode,
        &[contains(&["CONS", "CODE"]), Rule::Exact(&["CONS_CODE", "CONS"])],
    ),
    (
        Field::SchemeCodeSchedule,
        &[contains(&["SCHEME", "CODE"]), Rule::Exact(&["SCHEME_CODE", "SCHEME"])],
    ),
    (Field::InvestmentPeriodFrom, &[contains(&["INVESTMENT", "PERIOD", "FROM"])]),
    (
        Field::InvestmentPeriodTo,
        &[Rule::Contains {
            all: &["INVESTMENT", "PERIOD", "TO"],
            any: &[],
            none: &["FROM"],
        }],
    ),
    (Field::TrailRateYear(1), &[trail(1)]),
    (Field::TrailRateYear(2), &[trail(2)]),
    (Field::TrailRateYear(3), &[trail(3)]),
    (Field::TrailRateYear(4), &[trail(4)]),
    (Field::TrailRateYear(5), &[trail(5)]),
    (
        Field::Broker,
        &[
            Rule::Contains {
                all: &["BROK"],
                any: &["DLR", "DEALER"],
                none: &[],
            },
            Rule::Exact(&["BROKER", "BROKER CODE", "BROKER_CODE"]),
        ],
    ),
    (
        Field::TransactionDate,
        &[
            contains(&["TRAN", "DATE"]),
            Rule::Exact(&["TRANSACTION DATE", "TRANSACTION_DATE", "DATE"]),
        ],
    ),
];

/// Rules for a field (empty for a trail year outside 1..=5).
pub fn rules_for(field: Field) -> &'static [Rule] {
    FIELD_RULES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, rules)| *rules)
        .unwrap_or(&[])
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_uppercase()
}

/// Does this header play the given role?
pub fn header_matches(header: &str, field: Field) -> bool {
    let norm = normalize_header(header);
    rules_for(field).iter().any(|r| r.accepts(&norm))
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Index of the first header (left to right) playing `field`, or `None`.
pub fn resolve<S: AsRef<str>>(headers: &[S], field: Field) -> Option<usize> {
    headers.iter().position(|h| header_matches(h.as_ref(), field))
}

/// A field together with the header it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub field: Field,
    pub label: String,
    pub column: Option<String>,
    pub index: Option<usize>,
}

/// Resolve every field in `fields` against `headers`.
pub fn resolve_all<S: AsRef<str>>(headers: &[S], fields: &[Field]) -> Vec<Resolution> {
    fields
        .iter()
        .map(|&field| {
            let index = resolve(headers, field);
            Resolution {
                field,
                label: field.label(),
                column: index.map(|i| headers[i].as_ref().to_string()),
                index,
            }
        })
        .collect()
}
