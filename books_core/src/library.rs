use crate::book::{Book, BookHeader, BookKind};
use crate::config::LoadOptions;
use crate::document::BookDocument;
use crate::monster::MonsterBook;
use crate::table::Table;
use crate::LoadError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A loaded book of either kind
#[derive(Debug, Clone)]
pub enum LoadedBook {
    Monsters(MonsterBook),
    Table(Table),
}

impl LoadedBook {
    /// Build the right kind of book for the document's `Type`
    pub fn from_document(doc: BookDocument, options: &LoadOptions) -> Result<Self, LoadError> {
        let header = BookHeader::from_document(&doc)?;
        match header.kind {
            BookKind::MonsterManual => Ok(LoadedBook::Monsters(Book::load(doc, true, options)?)),
            BookKind::Table => Ok(LoadedBook::Table(Table::from_document(doc, options)?)),
        }
    }

    /// Parse a book from JSON text
    pub fn from_json(json: &str, options: &LoadOptions) -> Result<Self, LoadError> {
        let doc: BookDocument =
            serde_json::from_str(json).map_err(|error| LoadError::Parse { error, path: None })?;
        Self::from_document(doc, options)
    }

    pub fn id(&self) -> &str {
        match self {
            LoadedBook::Monsters(book) => book.id(),
            LoadedBook::Table(table) => table.id(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            LoadedBook::Monsters(book) => book.title(),
            LoadedBook::Table(table) => table.title(),
        }
    }

    pub fn kind(&self) -> BookKind {
        match self {
            LoadedBook::Monsters(_) => BookKind::MonsterManual,
            LoadedBook::Table(_) => BookKind::Table,
        }
    }

    /// Number of distinct page ids
    pub fn len(&self) -> usize {
        match self {
            LoadedBook::Monsters(book) => book.len(),
            LoadedBook::Table(table) => table.book().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_monsters(&self) -> Option<&MonsterBook> {
        match self {
            LoadedBook::Monsters(book) => Some(book),
            LoadedBook::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            LoadedBook::Monsters(_) => None,
            LoadedBook::Table(table) => Some(table),
        }
    }
}

/// A document that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: LoadError,
}

/// All books found under the configured directories, keyed by book id
#[derive(Debug, Default)]
pub struct Library {
    books: HashMap<String, LoadedBook>,
    failures: Vec<LoadFailure>,
}

impl Library {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` book in each directory, in the order given
    ///
    /// Documents that fail to load are logged and skipped; see [`Library::failures`].
    pub fn load<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> Self {
        let mut library = Self::new();
        for dir in paths {
            library.load_dir(dir.as_ref(), options);
        }
        tracing::info!(
            "Library loaded {} books ({} failed)",
            library.books.len(),
            library.failures.len()
        );
        library
    }

    /// Replace the whole library with a fresh load
    pub fn reload<P: AsRef<Path>>(&mut self, paths: &[P], options: &LoadOptions) {
        *self = Self::load(paths, options);
    }

    fn load_dir(&mut self, dir: &Path, options: &LoadOptions) {
        if !dir.is_dir() {
            tracing::warn!("Library path {:?} is not a directory, skipping", dir);
            return;
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) => {
                self.record_failure(dir, LoadError::Io {
                    error,
                    path: dir.to_path_buf(),
                });
                return;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        for path in files {
            tracing::info!("loading book {:?}", path);
            match Self::load_file(&path, options) {
                Ok(book) => {
                    tracing::info!("  book \"{} [{}]\" loaded", book.title(), book.id());
                    if let Some(previous) = self.books.insert(book.id().to_string(), book) {
                        tracing::warn!(
                            "  book id \"{}\" loaded again from {:?}, replacing the earlier one",
                            previous.id(),
                            path
                        );
                    }
                }
                Err(error) => self.record_failure(&path, error),
            }
        }
    }

    fn load_file(path: &Path, options: &LoadOptions) -> Result<LoadedBook, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|error| LoadError::Io {
            error,
            path: path.to_path_buf(),
        })?;

        let doc: BookDocument = serde_json::from_str(&content).map_err(|error| LoadError::Parse {
            error,
            path: Some(path.to_path_buf()),
        })?;

        LoadedBook::from_document(doc, options)
    }

    fn record_failure(&mut self, path: &Path, error: LoadError) {
        tracing::warn!("failed to load {:?}: {}", path, error);
        self.failures.push(LoadFailure {
            path: path.to_path_buf(),
            error,
        });
    }

    /// Add an already built book, replacing any book with the same id
    pub fn insert(&mut self, book: LoadedBook) {
        self.books.insert(book.id().to_string(), book);
    }

    /// The single book whose id starts with `prefix`
    ///
    /// Returns `None` when no book or more than one book matches.
    pub fn search(&self, prefix: &str) -> Option<&LoadedBook> {
        let mut matches = self.books.iter().filter(|(id, _)| id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some((_, book)), None) => {
                tracing::info!("found \"{} [{}]\" in the library", book.title(), book.id());
                Some(book)
            }
            _ => None,
        }
    }

    /// Exact id lookup
    pub fn get(&self, id: &str) -> Option<&LoadedBook> {
        self.books.get(id)
    }

    /// All books, sorted by id
    pub fn index(&self) -> Vec<&LoadedBook> {
        let mut books: Vec<&LoadedBook> = self.books.values().collect();
        books.sort_by(|a, b| a.id().cmp(b.id()));
        books
    }

    /// Documents skipped during the last load
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_book(dir: &Path, name: &str, content: &str) {
        let path = dir.join(format!("{}.json", name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn table_json(id: &str) -> String {
        format!(
            r#"{{"Id": "{}", "Title": "Table {}", "Type": 2, "Die": "1d4",
                "Pages": [{{"Id": "1-4", "Details": "x"}}]}}"#,
            id, id
        )
    }

    #[test]
    fn test_search_unique_prefix() {
        let mut library = Library::new();
        let options = LoadOptions::default();
        library.insert(LoadedBook::from_json(&table_json("mmbecmi"), &options).unwrap());
        assert_eq!(library.search("mm").map(|b| b.id()), Some("mmbecmi"));
        assert_eq!(library.search("mmbecmi").map(|b| b.id()), Some("mmbecmi"));
        assert!(library.search("x").is_none());

        library.insert(LoadedBook::from_json(&table_json("mmose"), &options).unwrap());
        assert!(library.search("mm").is_none());
        assert_eq!(library.search("mmo").map(|b| b.id()), Some("mmose"));
    }

    #[test]
    fn test_load_skips_non_json_and_missing_dirs() {
        let dir = TempDir::new().unwrap();
        create_test_book(dir.path(), "weather", &table_json("weather"));
        std::fs::write(dir.path().join("notes.txt"), "not a book").unwrap();

        let missing = dir.path().join("missing");
        let library = Library::load(&[dir.path().to_path_buf(), missing], &LoadOptions::default());
        assert_eq!(library.len(), 1);
        assert!(library.failures().is_empty());
        assert_eq!(library.get("weather").unwrap().kind(), BookKind::Table);
    }

    #[test]
    fn test_later_path_replaces_same_id() {
        let base = TempDir::new().unwrap();
        let overlay = TempDir::new().unwrap();
        create_test_book(base.path(), "a", &table_json("shared"));
        create_test_book(
            overlay.path(),
            "b",
            r#"{"Id": "shared", "Title": "Overlay", "Type": 2, "Die": "1",
                "Pages": [{"Id": "1", "Details": "y"}]}"#,
        );

        let library = Library::load(&[base.path(), overlay.path()], &LoadOptions::default());
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("shared").unwrap().title(), "Overlay");
    }

    #[test]
    fn test_reload_replaces_everything() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        create_test_book(first.path(), "one", &table_json("one"));
        create_test_book(second.path(), "two", &table_json("two"));

        let mut library = Library::load(&[first.path()], &LoadOptions::default());
        assert!(library.get("one").is_some());

        library.reload(&[second.path()], &LoadOptions::default());
        assert!(library.get("one").is_none());
        assert!(library.get("two").is_some());
    }

    #[test]
    fn test_index_sorted_by_id() {
        let mut library = Library::new();
        let options = LoadOptions::default();
        for id in ["zeta", "alpha", "mid"] {
            library.insert(LoadedBook::from_json(&table_json(id), &options).unwrap());
        }
        let ids: Vec<_> = library.index().iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(
            LoadedBook::from_json("{ not json", &LoadOptions::default()),
            Err(LoadError::Parse { path: None, .. })
        ));
    }
}
