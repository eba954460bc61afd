//! Regular-vs-Direct plan check: flags a switch between the Regular and Direct
//! plans of the same underlying scheme.

use crate::codes::strip_code_prefix;
use crate::compare::Flag;
use crate::model::Value;

/// Plan and option tokens removed from a scheme name, in this order.
const PLAN_TOKENS: &[&str] = &[
    "REGULAR GROWTH",
    "REG GROWTH",
    "REGULAR",
    "REG PLAN",
    "REG",
    "GROWTH",
    "DIRECT GROWTH",
    "DIRECT",
    "-",
];

const REGULAR_MARKERS: &[&str] = &["REGULAR", "REG GROWTH", "REG PLAN", "REG "];
const DIRECT_MARKER: &str = "DIRECT";

/// Scheme name with the code prefix and plan tokens removed, upper-cased and
/// whitespace-collapsed.
pub fn normalize_scheme_name(descriptor: &str) -> String {
    let mut name = strip_code_prefix(descriptor.trim()).trim().to_uppercase();
    for token in PLAN_TOKENS {
        name = name.replace(token, "");
    }
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_regular(upper: &str) -> bool {
    REGULAR_MARKERS.iter().any(|m| upper.contains(m))
}

fn has_direct(upper: &str) -> bool {
    upper.contains(DIRECT_MARKER)
}

/// `Check` when both descriptors name the same scheme and one is the Regular
/// plan while the other is Direct. Markers are looked for in the full
/// descriptor, code prefix included.
pub fn check_plan(switch_in: &Value, switch_out: &Value) -> Flag {
    let (Some(inp), Some(out)) = (switch_in.as_trimmed(), switch_out.as_trimmed()) else {
        return Flag::Blank;
    };
    if normalize_scheme_name(&inp) != normalize_scheme_name(&out) {
        return Flag::Blank;
    }
    let (inp, out) = (inp.to_uppercase(), out.to_uppercase());
    Flag::raised(
        (has_regular(&inp) && has_direct(&out)) || (has_direct(&inp) && has_regular(&out)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(a: &str, b: &str) -> Flag {
        check_plan(&Value::text(a), &Value::text(b))
    }

    #[test]
    fn regular_to_direct_of_same_scheme() {
        assert_eq!(
            check("129B/ABSL Fund Regular Growth", "129B/ABSL Fund Direct Growth"),
            Flag::Check
        );
        assert_eq!(
            check("129B/ABSL Fund - Direct Plan", "129C/ABSL Fund - Reg Plan"),
            Flag::Blank
        );
        assert_eq!(check("X/Alpha Fund Direct", "Y/Alpha Fund Reg Growth"), Flag::Check);
    }

    #[test]
    fn different_schemes_or_same_plan_are_blank() {
        assert_eq!(check("129B/ABSL Fund Growth", "130C/Other Fund Growth"), Flag::Blank);
        assert_eq!(
            check("129B/ABSL Fund Regular Growth", "129B/ABSL Fund Regular Growth"),
            Flag::Blank
        );
        assert_eq!(check("A/Fund Direct", "B/Fund Direct Growth"), Flag::Blank);
    }

    #[test]
    fn blank_sides() {
        assert_eq!(check_plan(&Value::Empty, &Value::text("A/Fund")), Flag::Blank);
        assert_eq!(check_plan(&Value::text("A/Fund"), &Value::text("  ")), Flag::Blank);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_scheme_name("129B/ABSL  Flexi-Cap Regular Growth"), "ABSL FLEXICAP");
        assert_eq!(normalize_scheme_name("No Prefix Direct"), "NO PREFIX");
    }
}
