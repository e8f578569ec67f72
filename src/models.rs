//! Domain models passed between the persistence layer and the TUI. The types
//! stay light-weight data holders; parsing helpers that turn raw form input
//! into typed fields live next to them so every write path shares one policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder shown when a book has no author.
pub const UNKNOWN_AUTHOR: &str = "Unknown author";
/// Placeholder shown when a book has no publication year.
pub const NO_YEAR: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single catalog entry. The serialized shape is the on-disk format of the
/// whole collection, so field names must not change.
pub struct Book {
    /// Stringified creation timestamp in milliseconds. Never changes after
    /// the record is created.
    pub id: String,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Trimmed author, empty when unknown. Older records may omit the field.
    #[serde(default)]
    pub author: String,
    /// Publication year. Serialized as `null` when absent.
    #[serde(default)]
    pub year: Option<i64>,
}

impl Book {
    /// `"{author} • {year}"` with placeholders for the missing parts. Used as
    /// the secondary line of every book card.
    pub fn meta_line(&self) -> String {
        let author = if self.author.is_empty() {
            UNKNOWN_AUTHOR
        } else {
            self.author.as_str()
        };
        match self.year {
            Some(year) => format!("{author} • {year}"),
            None => format!("{author} • {NO_YEAR}"),
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Raw form input before validation. Every field is the text exactly as the
/// user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub year: String,
}

impl BookDraft {
    pub fn new(title: impl Into<String>, author: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year: year.into(),
        }
    }

    /// Prefill a draft from an existing record for the edit form. The year is
    /// only rendered when present.
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year.map(|year| year.to_string()).unwrap_or_default(),
        }
    }
}

/// Parse a year the way the input field has always been interpreted: skip
/// leading whitespace, accept an optional sign and the longest run of digits,
/// ignore anything after it. No digits, overflow, or zero all mean "no year".
pub fn parse_year(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude = rest[..digits_len].parse::<i64>().ok()?;
    let year = if negative { -magnitude } else { magnitude };
    (year != 0).then_some(year)
}
