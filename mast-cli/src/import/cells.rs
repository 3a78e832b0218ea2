//! Cell normalizers
//!
//! Pure conversions from raw calamine cells into the typed fields used by the
//! record types. None of these fail: a cell that does not fit the expected
//! shape becomes `None` (or `false` for yes/no flags).

use calamine::Data;
use serde_json::{Number, Value, json};

/// Stand-in for cells outside the used range
pub static EMPTY: Data = Data::Empty;

/// Check whether a cell carries no value at all
///
/// Empty strings and error cells (`#N/A`, ...) count as empty. A string of
/// spaces is a value.
pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.is_empty(),
        Data::Float(f) => f.is_nan(),
        _ => false,
    }
}

/// Check whether every cell of a row is blank
pub fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(is_blank)
}

/// Numeric cleanup
///
/// Numbers pass through, everything else (text, dates, NaN) becomes `None`.
/// Whole floats are emitted as integers so that `2019.0` serializes as `2019`.
pub fn number(cell: &Data) -> Option<Number> {
    match cell {
        Data::Int(i) => Some(Number::from(*i)),
        Data::Float(f) if f.is_nan() || f.is_infinite() => None,
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Some(Number::from(*f as i64))
            } else {
                Number::from_f64(*f)
            }
        }
        _ => None,
    }
}

/// List cleanup
///
/// Text is split on newlines and `/`, each element trimmed and empty elements
/// dropped. Any other non-blank scalar becomes a one-element list.
pub fn list(cell: &Data) -> Option<Vec<String>> {
    if is_blank(cell) {
        return None;
    }

    match cell {
        Data::String(s) => {
            let items: Vec<String> = s
                .trim()
                .split(['\n', '/'])
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
            if items.is_empty() { None } else { Some(items) }
        }
        other => Some(vec![display(other)?]),
    }
}

/// Yes/No cleanup
///
/// Only a blank cell or the exact text `No` is false.
pub fn yes_no(cell: &Data) -> bool {
    match cell {
        Data::String(s) if s == "No" => false,
        other => !is_blank(other),
    }
}

/// String cleanup: non-string cells become `None`
pub fn text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Render any non-blank cell as text
///
/// Used for descriptive columns that authors fill with either words or
/// numbers (e.g. "Scale of test" holding `0.5`).
pub fn display(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.trim().to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.is_nan() => None,
        Data::Float(f) => {
            if f.fract() == 0.0 {
                Some((*f as i64).to_string())
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Empty | Data::Error(_) => None,
    }
}

/// Read a cell as a positive integer identifier (e.g. "Building #")
pub fn integer(cell: &Data) -> Option<u32> {
    match cell {
        Data::Int(i) => u32::try_from(*i).ok(),
        Data::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 => {
            Some(*f as u32)
        }
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Convert a cell to a JSON value without any coercion beyond the cell type
pub fn raw(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(_) | Data::Float(_) => number(cell).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => json!(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn test_list_splits_on_newline_and_slash() {
        assert_eq!(
            list(&s("X\nY/Z")),
            Some(vec!["X".to_string(), "Y".to_string(), "Z".to_string()])
        );
        assert_eq!(
            list(&s(" Brick / Stone \n Adobe ")),
            Some(vec!["Brick".to_string(), "Stone".to_string(), "Adobe".to_string()])
        );
    }

    #[test]
    fn test_list_single_and_empty() {
        assert_eq!(list(&s("X")), Some(vec!["X".to_string()]));
        assert_eq!(list(&Data::Empty), None);
        assert_eq!(list(&Data::Float(f64::NAN)), None);
        assert_eq!(list(&s("  ")), None);
    }

    #[test]
    fn test_list_wraps_scalars() {
        assert_eq!(list(&Data::Float(250.0)), Some(vec!["250".to_string()]));
        assert_eq!(list(&Data::Float(0.25)), Some(vec!["0.25".to_string()]));
    }

    #[test]
    fn test_yes_no() {
        assert!(!yes_no(&s("No")));
        assert!(!yes_no(&Data::Empty));
        assert!(yes_no(&s("Yes")));
        assert!(yes_no(&s("Partial")));
        // Only the exact spelling counts as a negative
        assert!(yes_no(&s("no")));
        assert!(yes_no(&s("https://zenodo.org/record/1")));
        assert!(yes_no(&s(" ")));
        assert!(!yes_no(&s("")));
    }

    #[test]
    fn test_whitespace_is_not_blank() {
        assert!(!is_blank(&s("  ")));
        assert!(is_blank(&s("")));
        assert!(!is_blank_row(&[Data::Empty, s(" ")]));
        assert!(is_blank_row(&[Data::Empty, Data::Error(calamine::CellErrorType::NA)]));
    }

    #[test]
    fn test_number() {
        assert_eq!(number(&Data::Int(3)), Some(Number::from(3)));
        assert_eq!(number(&Data::Float(2019.0)), Some(Number::from(2019)));
        assert_eq!(number(&Data::Float(0.35)), Number::from_f64(0.35));
        assert_eq!(number(&Data::Float(f64::NAN)), None);
        assert_eq!(number(&s("0.35")), None);
        assert_eq!(number(&Data::Empty), None);
    }

    #[test]
    fn test_text() {
        assert_eq!(text(&s("Validate models")), Some("Validate models".to_string()));
        assert_eq!(text(&Data::Float(1.0)), None);
        assert_eq!(text(&Data::Empty), None);
        assert_eq!(text(&s(" ")), Some(" ".to_string()));
    }

    #[test]
    fn test_blank_row() {
        assert!(is_blank_row(&[Data::Empty, s(""), Data::Float(f64::NAN)]));
        assert!(!is_blank_row(&[Data::Empty, s("x")]));
        assert!(is_blank_row(&[]));
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer(&Data::Float(12.0)), Some(12));
        assert_eq!(integer(&s(" 7 ")), Some(7));
        assert_eq!(integer(&Data::Float(1.5)), None);
        assert_eq!(integer(&Data::Int(-1)), None);
    }
}
