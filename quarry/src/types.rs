use serde::{Deserialize, Serialize};

/// Whether a clause must, may, or must not match.
///
/// `NotSet` is a placeholder meaning "inherit from the enclosing group". The
/// builder replaces it as soon as a node is attached, so a built model never
/// carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    Always,
    Sometimes,
    Never,
    #[default]
    NotSet,
}

impl Occurrence {
    #[inline]
    pub const fn is_set(self) -> bool {
        !matches!(self, Occurrence::NotSet)
    }

    /// Returns `self`, or `fallback` when unset.
    #[inline]
    pub const fn or(self, fallback: Occurrence) -> Occurrence {
        match self {
            Occurrence::NotSet => fallback,
            other => other,
        }
    }
}

/// A field/value pair. Identity is by value, never by reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub value: String,
}

impl Term {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Lowercases the value unless `case_sensitive` is set. Fields are left untouched.
    pub(crate) fn folded(field: impl Into<String>, value: impl Into<String>, case_sensitive: bool) -> Self {
        let value = value.into();
        Self {
            field: field.into(),
            value: if case_sensitive { value } else { value.to_lowercase() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    Score,
    DocumentOrder,
    #[default]
    String,
    Int,
    Long,
    Float,
    Double,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub sort_type: SortType,
    #[serde(default)]
    pub descending: bool,
}

impl SortField {
    pub fn new(field: impl Into<String>, descending: bool, sort_type: SortType) -> Self {
        Self {
            field: field.into(),
            sort_type,
            descending,
        }
    }
}

/// Ordered sort descriptor; the first field is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub fields: Vec<SortField>,
}

impl Sort {
    /// `None` when there is nothing to sort by.
    pub fn from_fields(fields: &[SortField]) -> Option<Self> {
        if fields.is_empty() {
            None
        } else {
            Some(Self { fields: fields.to_vec() })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Literal carried by a [`Filter`]. Backends quote text and leave numbers bare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A single comparison applied alongside the query, independent of the AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: FilterValue,
    pub comparator: Comparator,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<FilterValue>, comparator: Comparator) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            comparator,
        }
    }

    #[inline]
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, value, Comparator::Eq)
    }
}

/// Formats a float without a trailing `.0` for whole numbers.
pub(crate) fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrence_fallback_only_applies_to_not_set() {
        assert_eq!(Occurrence::NotSet.or(Occurrence::Sometimes), Occurrence::Sometimes);
        assert_eq!(Occurrence::Never.or(Occurrence::Always), Occurrence::Never);
        assert!(!Occurrence::default().is_set());
    }

    #[test]
    fn folding_leaves_field_alone() {
        let term = Term::folded("_Name", "VaLue", false);
        assert_eq!(term, Term::new("_Name", "value"));

        let term = Term::folded("_Name", "VaLue", true);
        assert_eq!(term.value, "VaLue");
    }

    #[test]
    fn empty_sort_fields_produce_no_sort() {
        assert!(Sort::from_fields(&[]).is_none());
        let sort = Sort::from_fields(&[SortField::new("title", true, SortType::String)]).unwrap();
        assert_eq!(sort.fields.len(), 1);
    }

    #[test]
    fn numeric_formatting_drops_whole_fraction() {
        assert_eq!(format_numeric(10.0), "10");
        assert_eq!(format_numeric(1.5), "1.5");
        assert_eq!(format_numeric(-3.0), "-3");
    }
}
