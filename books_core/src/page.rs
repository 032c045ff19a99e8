use crate::config::LoadOptions;
use crate::document::{Record, Scalar};
use crate::LoadError;
use serde_json::Value;
use std::fmt;

/// Inclusive range of numeric page ids, parsed from `"N"` or `"A-B"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IdRange {
    start: i64,
    end: i64,
}

impl IdRange {
    pub fn new(start: i64, end: i64) -> Result<Self, LoadError> {
        if start > end {
            return Err(LoadError::InvalidId {
                id: format!("{}-{}", start, end),
                reason: "reverse range",
            });
        }
        Ok(IdRange { start, end })
    }

    /// Parse a page id
    pub fn parse(id: &str) -> Result<Self, LoadError> {
        let invalid = |reason: &'static str| LoadError::InvalidId {
            id: id.to_string(),
            reason,
        };

        let parts: Vec<&str> = id.split('-').map(str::trim).collect();
        let number = |s: &str| s.parse::<i64>().map_err(|_| invalid("not an integer"));

        match parts[..] {
            [single] if single.is_empty() => Err(invalid("empty id")),
            [single] => {
                let n = number(single)?;
                Ok(IdRange { start: n, end: n })
            }
            [start, end] => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(invalid("reverse range"));
                }
                Ok(IdRange { start, end })
            }
            _ => Err(invalid("too many range separators")),
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn contains(&self, id: i64) -> bool {
        self.start <= id && id <= self.end
    }

    /// Number of ids covered, never zero
    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start) + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.start..=self.end
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// State threaded through page construction
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    /// Id of the book being loaded, for error messages
    pub book: &'a str,
    pub options: &'a LoadOptions,
    /// Nesting level of the book (0 for top level documents)
    pub depth: usize,
}

/// A single entry of a book
pub trait PageLike: Sized {
    /// Build the page from its raw record
    fn from_record(record: Record, ctx: &LoadContext<'_>) -> Result<Self, LoadError>;

    /// The id exactly as written in the document
    fn id(&self) -> &str;

    fn id_range(&self) -> IdRange;
}

/// A schema-less page: the id plus every other field as raw JSON
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    id: String,
    range: IdRange,
    fields: Record,
}

impl Page {
    pub fn new(mut record: Record) -> Result<Self, LoadError> {
        let id = match record.remove("Id") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(LoadError::InvalidId {
                    id: String::new(),
                    reason: "missing id",
                })
            }
        };
        let range = IdRange::parse(&id)?;
        Ok(Page {
            id,
            range,
            fields: record,
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }
}

impl PageLike for Page {
    fn from_record(record: Record, _ctx: &LoadContext<'_>) -> Result<Self, LoadError> {
        Page::new(record)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn id_range(&self) -> IdRange {
        self.range
    }
}

/// Resolve a page id written as a string or a bare number
pub(crate) fn scalar_id(id: &Scalar) -> Result<(String, IdRange), LoadError> {
    let id = id.to_string();
    let range = IdRange::parse(&id)?;
    Ok((id, range))
}

/// Two or more pages sharing one id, in load order
#[derive(Debug, Clone)]
pub struct PageGroup<P> {
    id: String,
    range: IdRange,
    pages: Vec<P>,
}

impl<P: PageLike> PageGroup<P> {
    pub fn new(first: P, second: P) -> Self {
        PageGroup {
            id: first.id().to_string(),
            range: first.id_range(),
            pages: vec![first, second],
        }
    }

    pub(crate) fn add(&mut self, page: P) {
        debug_assert_eq!(page.id(), self.id);
        self.pages.push(page);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_range(&self) -> IdRange {
        self.range
    }

    pub fn pages(&self) -> &[P] {
        &self.pages
    }
}

/// What a book stores under one id
#[derive(Debug, Clone)]
pub enum PageSlot<P> {
    Single(P),
    Group(PageGroup<P>),
}

impl<P: PageLike> PageSlot<P> {
    pub fn id(&self) -> &str {
        match self {
            PageSlot::Single(page) => page.id(),
            PageSlot::Group(group) => group.id(),
        }
    }

    pub fn id_range(&self) -> IdRange {
        match self {
            PageSlot::Single(page) => page.id_range(),
            PageSlot::Group(group) => group.id_range(),
        }
    }

    /// The constituent pages; a single page expands to itself
    pub fn pages(&self) -> &[P] {
        match self {
            PageSlot::Single(page) => std::slice::from_ref(page),
            PageSlot::Group(group) => group.pages(),
        }
    }

    pub fn as_single(&self) -> Option<&P> {
        match self {
            PageSlot::Single(page) => Some(page),
            PageSlot::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&PageGroup<P>> {
        match self {
            PageSlot::Single(_) => None,
            PageSlot::Group(group) => Some(group),
        }
    }

    /// Add another page with the same id, promoting a single page to a group
    pub(crate) fn push(&mut self, page: P) {
        match *self {
            PageSlot::Group(ref mut group) => group.add(page),
            PageSlot::Single(_) => {
                let placeholder = PageSlot::Group(PageGroup {
                    id: String::new(),
                    range: IdRange::default(),
                    pages: Vec::new(),
                });
                if let PageSlot::Single(first) = std::mem::replace(self, placeholder) {
                    *self = PageSlot::Group(PageGroup::new(first, page));
                }
            }
        }
    }
}
