//! Cell values and records.
//!
//! A [`Record`] is the user-supplied row: an opaque mapping from field name to
//! [`CellValue`]. The row model never mutates a record in place; updates
//! replace the whole record through a transaction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value stored in a record field, a group key or an aggregate.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::CellValue;
///
/// let value = CellValue::from(42);
/// assert_eq!(value.as_f64(), Some(42.0));
/// assert!(CellValue::Null.is_null());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    String(String),
}

pub(crate) static NULL_VALUE: CellValue = CellValue::Null;

impl CellValue {
    /// Returns `true` if this is `CellValue::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns `true` for null values and empty or whitespace-only strings.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the numeric value for `Int` and `Float`.
    ///
    /// Strings are not parsed; a non-numeric value is excluded from numeric
    /// aggregation rather than coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(n) => Some(*n as f64),
            CellValue::Float(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text used for group ids, pivot column ids and the quick filter.
    pub fn to_key_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Bool(_) => 1,
            CellValue::Int(_) | CellValue::Float(_) => 2,
            CellValue::String(_) => 3,
        }
    }

    /// Total order over values.
    ///
    /// Numbers compare numerically across `Int` and `Float`. Values of
    /// different kinds order as null, bool, number, string.
    pub fn total_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::String(a), CellValue::String(b)) => a.cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }
}

/// Identity of a group key.
///
/// Two values land in the same group exactly when their `GroupKey`s are
/// equal. Values of different kinds never share a key: `Null`, `""`, `1` and
/// `"1"` are four groups. `Int` and integral `Float` values are the same
/// number and share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Null,
    Bool(bool),
    Int(i64),
    /// Bit pattern of a non-integral float. All NaNs share one pattern.
    Float(u64),
    Text(String),
}

impl From<&CellValue> for GroupKey {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Null => GroupKey::Null,
            CellValue::Bool(b) => GroupKey::Bool(*b),
            CellValue::Int(n) => GroupKey::Int(*n),
            CellValue::Float(n) if n.is_nan() => GroupKey::Float(f64::NAN.to_bits()),
            CellValue::Float(n)
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
            {
                GroupKey::Int(*n as i64)
            }
            CellValue::Float(n) => GroupKey::Float(n.to_bits()),
            CellValue::String(s) => GroupKey::Text(s.clone()),
        }
    }
}

impl GroupKey {
    /// The key as one segment of a generated row id.
    ///
    /// `-` and `~` are escaped with `~`, so a segment never contains a bare
    /// `-`. Text that would read as another kind of key (empty, a number,
    /// `true` or `false`) is marked with a leading `~s`. Distinct keys always
    /// produce distinct segments, and `Null` is the empty segment.
    pub fn id_segment(&self) -> String {
        match self {
            GroupKey::Null => String::new(),
            GroupKey::Bool(b) => b.to_string(),
            GroupKey::Int(n) => escape_id_text(&n.to_string(), '-'),
            GroupKey::Float(bits) => escape_id_text(&f64::from_bits(*bits).to_string(), '-'),
            GroupKey::Text(s) => {
                let escaped = escape_id_text(s, '-');
                let reads_as_other_kind =
                    s.is_empty() || s == "true" || s == "false" || s.parse::<f64>().is_ok();
                if reads_as_other_kind {
                    format!("~s{escaped}")
                } else {
                    escaped
                }
            }
        }
    }
}

/// Escapes `~` and `separator` with a leading `~`.
pub(crate) fn escape_id_text(text: &str, separator: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '~' || c == separator {
            out.push('~');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Int(i64::from(n))
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Int(i64::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(CellValue::Null, Into::into)
    }
}

/// A user-supplied row record.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{CellValue, Record};
///
/// let record = Record::new().with("country", "US").with("v", 1);
/// assert_eq!(record.value("country"), &CellValue::from("US"));
/// assert!(record.value("missing").is_null());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, CellValue>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns the value of a field if present.
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    /// Returns the value of a field, `Null` when absent.
    pub fn value(&self, field: &str) -> &CellValue {
        self.fields.get(field).unwrap_or(&NULL_VALUE)
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses a JSON array of objects into records.
    pub fn list_from_json(json: &str) -> Result<Vec<Record>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cross_type_compare() {
        assert_eq!(
            CellValue::Int(2).total_cmp(&CellValue::Float(2.5)),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Float(3.0).total_cmp(&CellValue::Int(3)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_mixed_type_rank() {
        assert_eq!(
            CellValue::Int(100).total_cmp(&CellValue::from("a")),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Null.total_cmp(&CellValue::Bool(false)),
            Ordering::Less
        );
    }

    #[test]
    fn test_blank_values() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::from("  ").is_blank());
        assert!(!CellValue::from(0).is_blank());
    }

    #[test]
    fn test_non_numeric_excluded() {
        assert_eq!(CellValue::from("12").as_f64(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_f64(), None);
    }

    #[test]
    fn test_key_string() {
        assert_eq!(CellValue::Null.to_key_string(), "");
        assert_eq!(CellValue::Float(3.0).to_key_string(), "3");
        assert_eq!(CellValue::from("US").to_key_string(), "US");
    }

    #[test]
    fn test_group_keys_keep_kinds_apart() {
        let keys: Vec<GroupKey> = [
            CellValue::Null,
            CellValue::from(""),
            CellValue::Int(1),
            CellValue::from("1"),
            CellValue::Bool(true),
            CellValue::from("true"),
        ]
        .iter()
        .map(GroupKey::from)
        .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(a.id_segment(), b.id_segment());
            }
        }
        assert_eq!(GroupKey::from(&CellValue::Float(2.0)), GroupKey::Int(2));
        assert_eq!(GroupKey::from(&CellValue::Float(-0.0)), GroupKey::Int(0));
    }

    #[test]
    fn test_id_segments() {
        let segment = |v: CellValue| GroupKey::from(&v).id_segment();
        assert_eq!(segment(CellValue::Null), "");
        assert_eq!(segment(CellValue::from("US")), "US");
        assert_eq!(segment(CellValue::Int(2020)), "2020");
        assert_eq!(segment(CellValue::Int(-5)), "~-5");
        assert_eq!(segment(CellValue::from("-5")), "~s~-5");
        assert_eq!(segment(CellValue::from("")), "~s");
        assert_eq!(segment(CellValue::from("x-b-y")), "x~-b~-y");
        assert_eq!(segment(CellValue::from("a~b")), "a~~b");
        assert_eq!(segment(CellValue::Float(1.5)), "1.5");
    }

    #[test]
    fn test_records_from_json() {
        let records =
            Record::list_from_json(r#"[{"id": 1, "g": "A", "v": 10.5, "ok": true, "x": null}]"#)
                .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.value("id"), &CellValue::Int(1));
        assert_eq!(record.value("v"), &CellValue::Float(10.5));
        assert_eq!(record.value("ok"), &CellValue::Bool(true));
        assert!(record.value("x").is_null());
    }

    #[test]
    fn test_record_from_iter() {
        let record: Record = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(record.len(), 2);
        assert_eq!(record.value("b"), &CellValue::Int(2));
    }
}
