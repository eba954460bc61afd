use crate::model::Value;

/// Text of a raised flag.
pub const CHECK_TEXT: &str = "Check";

/// Outcome of a consistency check. `Blank` covers both "consistent" and
/// "could not be compared".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Check,
    Blank,
}

impl Flag {
    pub fn raised(cond: bool) -> Self {
        if cond {
            Flag::Check
        } else {
            Flag::Blank
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(self, Flag::Check)
    }

    pub fn to_value(self) -> Value {
        match self {
            Flag::Check => Value::text(CHECK_TEXT),
            Flag::Blank => Value::Empty,
        }
    }
}

/// Numeric reading of a rate cell. `%` and `,` are ignored; anything else that
/// does not parse as a number is `None`.
pub fn rate_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != '%' && *c != ',').collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// `Check` when the switch-in rate is strictly higher than the switch-out rate.
pub fn compare_rates(rate_in: &Value, rate_out: &Value) -> Flag {
    match (rate_number(rate_in), rate_number(rate_out)) {
        (Some(a), Some(b)) => Flag::raised(a > b),
        _ => Flag::Blank,
    }
}
