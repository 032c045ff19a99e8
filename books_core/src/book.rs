use crate::config::LoadOptions;
use crate::document::BookDocument;
use crate::page::{LoadContext, PageLike, PageSlot};
use crate::LoadError;
use std::collections::HashMap;
use std::fmt;

/// Declared kind of a book document (`Type` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookKind {
    MonsterManual,
    Table,
}

impl TryFrom<i64> for BookKind {
    type Error = LoadError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(BookKind::MonsterManual),
            2 => Ok(BookKind::Table),
            other => Err(LoadError::UnknownBookType(other)),
        }
    }
}

impl fmt::Display for BookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookKind::MonsterManual => write!(f, "monster manual"),
            BookKind::Table => write!(f, "table"),
        }
    }
}

/// Identity of a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookHeader {
    pub id: String,
    pub title: String,
    pub kind: BookKind,
}

impl BookHeader {
    /// Read only `Id`, `Title` and `Type` from a document
    pub fn from_document(doc: &BookDocument) -> Result<Self, LoadError> {
        let id = doc.id.clone().ok_or_else(|| LoadError::MissingField {
            book: "<unknown>".to_string(),
            field: "Id",
        })?;
        let missing = |field: &'static str| LoadError::MissingField {
            book: id.clone(),
            field,
        };
        let title = doc.title.clone().ok_or_else(|| missing("Title"))?;
        let kind = BookKind::try_from(doc.kind.ok_or_else(|| missing("Type"))?)?;
        Ok(BookHeader { id, title, kind })
    }
}

/// A book: pages keyed by id, kept in load order
#[derive(Debug, Clone)]
pub struct Book<P> {
    header: BookHeader,
    slots: Vec<PageSlot<P>>,
    by_id: HashMap<String, usize>,
}

impl<P: PageLike> Book<P> {
    /// Build a book from its document; pages are only parsed when `load_pages` is set
    pub fn load(doc: BookDocument, load_pages: bool, options: &LoadOptions) -> Result<Self, LoadError> {
        Self::load_at(doc, load_pages, options, 0)
    }

    pub(crate) fn load_at(
        doc: BookDocument,
        load_pages: bool,
        options: &LoadOptions,
        depth: usize,
    ) -> Result<Self, LoadError> {
        let header = BookHeader::from_document(&doc)?;
        let mut book = Book {
            header,
            slots: Vec::new(),
            by_id: HashMap::new(),
        };

        if !load_pages {
            return Ok(book);
        }

        let records = doc.pages.ok_or_else(|| LoadError::MissingField {
            book: book.header.id.clone(),
            field: "Pages",
        })?;

        let ctx = LoadContext {
            book: &book.header.id,
            options,
            depth,
        };
        let pages = records
            .into_iter()
            .map(|record| P::from_record(record, &ctx))
            .collect::<Result<Vec<_>, _>>()?;

        for page in pages {
            book.insert(page);
        }
        Ok(book)
    }

    /// Add a page, grouping it with any page already stored under the same id
    fn insert(&mut self, page: P) {
        match self.by_id.get(page.id()) {
            Some(&i) => self.slots[i].push(page),
            None => {
                self.by_id.insert(page.id().to_string(), self.slots.len());
                self.slots.push(PageSlot::Single(page));
            }
        }
    }

    /// Exact id lookup
    pub fn search(&self, id: &str) -> Option<&PageSlot<P>> {
        if id.is_empty() {
            return None;
        }
        self.by_id.get(id).map(|&i| &self.slots[i])
    }

    /// All entries in load order
    pub fn index(&self) -> impl Iterator<Item = &PageSlot<P>> {
        self.slots.iter()
    }
}

impl<P> Book<P> {
    pub fn header(&self) -> &BookHeader {
        &self.header
    }

    pub fn id(&self) -> &str {
        &self.header.id
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn kind(&self) -> BookKind {
        self.header.kind
    }

    /// Number of distinct ids
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use serde_json::json;

    fn document(value: serde_json::Value) -> BookDocument {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> BookDocument {
        document(json!({
            "Id": "mmtest",
            "Title": "Test Manual",
            "Type": 1,
            "Pages": [
                {"Id": "1", "Name": "Orc"},
                {"Id": "2", "Name": "Goblin"},
                {"Id": "1", "Name": "Orc chief"},
                {"Id": "3", "Name": "Kobold"},
                {"Id": "1", "Name": "Orc shaman"}
            ]
        }))
    }

    #[test]
    fn test_load_groups_duplicate_ids() {
        let book: Book<Page> = Book::load(sample(), true, &LoadOptions::default()).unwrap();
        assert_eq!(book.id(), "mmtest");
        assert_eq!(book.kind(), BookKind::MonsterManual);
        assert_eq!(book.len(), 3);

        let slot = book.search("1").unwrap();
        let group = slot.as_group().expect("id 1 should be a group");
        let names: Vec<_> = group
            .pages()
            .iter()
            .map(|p| p.get("Name").and_then(|v| v.as_str()).unwrap())
            .collect();
        assert_eq!(names, vec!["Orc", "Orc chief", "Orc shaman"]);

        assert!(book.search("2").unwrap().as_single().is_some());
    }

    #[test]
    fn test_index_keeps_load_order() {
        let book: Book<Page> = Book::load(sample(), true, &LoadOptions::default()).unwrap();
        let ids: Vec<_> = book.index().map(|slot| slot.id()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_search_not_found_is_none() {
        let book: Book<Page> = Book::load(sample(), true, &LoadOptions::default()).unwrap();
        assert!(book.search("99").is_none());
        assert!(book.search("").is_none());
    }

    #[test]
    fn test_header_only_load() {
        let book: Book<Page> = Book::load(sample(), false, &LoadOptions::default()).unwrap();
        assert_eq!(book.title(), "Test Manual");
        assert!(book.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let no_title = document(json!({"Id": "x", "Type": 1, "Pages": []}));
        assert!(matches!(
            BookHeader::from_document(&no_title),
            Err(LoadError::MissingField { field: "Title", .. })
        ));

        let no_pages = document(json!({"Id": "x", "Title": "X", "Type": 1}));
        assert!(matches!(
            Book::<Page>::load(no_pages, true, &LoadOptions::default()),
            Err(LoadError::MissingField { field: "Pages", .. })
        ));

        let bad_type = document(json!({"Id": "x", "Title": "X", "Type": 7}));
        assert!(matches!(
            BookHeader::from_document(&bad_type),
            Err(LoadError::UnknownBookType(7))
        ));
    }

    #[test]
    fn test_bad_page_id_fails_the_book() {
        let doc = document(json!({
            "Id": "x", "Title": "X", "Type": 1,
            "Pages": [{"Id": "9-2", "Name": "Backwards"}]
        }));
        assert!(matches!(
            Book::<Page>::load(doc, true, &LoadOptions::default()),
            Err(LoadError::InvalidId { .. })
        ));
    }
}
