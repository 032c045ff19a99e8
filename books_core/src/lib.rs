//! books_core - Monster manuals and random tables
//!
//! Books are JSON documents loaded from one or more directories into a
//! [`Library`]. A book is either a monster manual (stat blocks keyed by id)
//! or a [`Table`] whose entries are rolled on, optionally chaining into
//! nested sub-tables.
//!
//! ```rust,ignore
//! use books_core::{Library, LibraryConfig};
//!
//! let config = LibraryConfig::load_from_path(Path::new("books.toml"))?;
//! let library = Library::load(&config.library_paths(), &config.load_options());
//! if let Some(table) = library.search("treasure").and_then(|b| b.as_table()) {
//!     let roll = table.roll(&mut rand::thread_rng())?;
//!     println!("{}\n{}", roll.result, roll.explanation.join("\n"));
//! }
//! ```

mod book;
mod config;
mod document;
mod library;
mod monster;
mod page;
mod table;
mod template;

pub use book::{Book, BookHeader, BookKind};
pub use config::{LibraryConfig, LoadOptions};
pub use document::{BookDocument, Record, Scalar};
pub use library::{Library, LoadFailure, LoadedBook};
pub use monster::{MonsterBook, MonsterPage};
pub use page::{IdRange, LoadContext, Page, PageGroup, PageLike, PageSlot};
pub use table::{CombinePolicy, Table, TableEntry, TableRoll, MAX_NESTING};
pub use template::resolve_details;

use dice_core::DiceError;
use std::path::PathBuf;
use thiserror::Error;

/// Error loading a book document
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading '{path:?}': {error}")]
    Io {
        error: std::io::Error,
        path: PathBuf,
    },
    #[error("Parse error in '{path:?}': {error}")]
    Parse {
        error: serde_json::Error,
        path: Option<PathBuf>,
    },
    #[error("Book '{book}' is missing required field '{field}'")]
    MissingField { book: String, field: &'static str },
    #[error("Invalid page in book '{book}': {error}")]
    InvalidPage {
        book: String,
        error: serde_json::Error,
    },
    #[error("Invalid id '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },
    #[error("Unknown book type: {0}")]
    UnknownBookType(i64),
    #[error("Book '{book}' is a {kind} where a table was expected")]
    UnexpectedBookType { book: String, kind: BookKind },
    #[error("Invalid dice expression '{expr}' in book '{book}': {error}")]
    InvalidDice {
        book: String,
        expr: String,
        error: DiceError,
    },
    #[error("Invalid forced roll '{value}' in table '{book}'")]
    InvalidForcedRoll { book: String, value: String },
    #[error("Unknown result operation '{value}' in table '{book}'")]
    InvalidCombinePolicy { book: String, value: String },
    #[error("Table '{0}' nests sub-tables too deeply")]
    NestingTooDeep(String),
}

/// Error rolling on a table or a monster entry
#[derive(Debug, Error)]
pub enum RollError {
    #[error(transparent)]
    Dice(#[from] DiceError),
    #[error("Monster '{0}' has no hit dice")]
    MissingHitDice(String),
}

/// Error loading library configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
