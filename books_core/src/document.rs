use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A raw page record as found in a book document
pub type Record = serde_json::Map<String, Value>;

/// JSON shape of a book file
///
/// Table documents additionally carry `Die`, and optionally `forced_roll`
/// and `rop`. Required fields are checked when the document is turned into
/// a book so that the error can name the book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookDocument {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<i64>,
    #[serde(rename = "Pages", default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Record>>,
    #[serde(rename = "Die", default, skip_serializing_if = "Option::is_none")]
    pub die: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_roll: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rop: Option<String>,
}

/// A table entry record
#[derive(Debug, Deserialize)]
pub(crate) struct EntryDocument {
    #[serde(rename = "Id")]
    pub id: Scalar,
    #[serde(rename = "Details")]
    pub details: String,
    #[serde(rename = "Number", default)]
    pub number: Option<Scalar>,
    #[serde(rename = "Table", default)]
    pub table: Option<BookDocument>,
}

/// A field value that authors write either as a string or as a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Empty strings count as "not set"
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl BookDocument {
    /// Build a table document with one entry per non-blank line, rolled with `1dN`
    ///
    /// Returns `None` when there is no non-blank line to roll on.
    pub fn table_from_lines<'a>(
        id: &str,
        title: &str,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Option<Self> {
        let pages: Vec<Record> = lines
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| {
                let mut record = Record::new();
                record.insert("Id".to_string(), Value::String((i + 1).to_string()));
                record.insert("Details".to_string(), Value::String(line.to_string()));
                record
            })
            .collect();
        if pages.is_empty() {
            return None;
        }

        Some(BookDocument {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            kind: Some(2),
            die: Some(format!("1d{}", pages.len())),
            pages: Some(pages),
            ..Default::default()
        })
    }

    /// Pretty-printed JSON, the on-disk book format
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
