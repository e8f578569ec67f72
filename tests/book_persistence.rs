use std::rc::Rc;

use bookshelf::db::MemoryStore;
use bookshelf::{ensure_schema, Book, BookDraft, BookError, BookStore, KeyValueStore, SharedStore, BOOKS_KEY};

fn persisted(store: &dyn KeyValueStore) -> Vec<Book> {
    match store.get_item(BOOKS_KEY).unwrap() {
        Some(raw) => serde_json::from_str(&raw).unwrap(),
        None => Vec::new(),
    }
}

#[test]
fn collection_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store: SharedStore = Rc::new(ensure_schema(dir.path()).unwrap());
        let mut books = BookStore::new(store);
        books.load_books();
        books.create(&BookDraft::new("Emma", "Austen", "1815")).unwrap();
        books.create(&BookDraft::new("Dune", "Herbert", "1965")).unwrap();
    }

    let store: SharedStore = Rc::new(ensure_schema(dir.path()).unwrap());
    let mut books = BookStore::new(store);
    books.load_books();

    let titles: Vec<_> = books.books().into_iter().map(|b| b.title).collect();
    assert_eq!(titles, ["Dune", "Emma"]);
}

#[test]
fn fresh_install_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store: SharedStore = Rc::new(ensure_schema(dir.path()).unwrap());
    let mut books = BookStore::new(store);
    books.load_books();
    assert!(books.is_empty());
}

#[test]
fn dune_example_lands_at_the_front() {
    let memory = Rc::new(MemoryStore::new());
    let shared: SharedStore = memory.clone();
    let mut books = BookStore::new(shared);
    books.load_books();
    books.create(&BookDraft::new("Older", "", "")).unwrap();

    books.create(&BookDraft::new("Dune", "Herbert", "1965")).unwrap();

    let first = books.get(0).unwrap();
    assert_eq!(
        (first.title.as_str(), first.author.as_str(), first.year),
        ("Dune", "Herbert", Some(1965))
    );
}

#[test]
fn empty_or_garbage_years_are_stored_as_null() {
    let memory = Rc::new(MemoryStore::new());
    let shared: SharedStore = memory.clone();
    let mut books = BookStore::new(shared);
    books.load_books();

    books.create(&BookDraft::new("No year", "", "")).unwrap();
    books.create(&BookDraft::new("Bad year", "", "abc")).unwrap();

    let raw = memory.get_item(BOOKS_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for record in value.as_array().unwrap() {
        assert!(record["year"].is_null());
    }
}

/// Every step of a mixed create/update/delete sequence leaves storage equal
/// to the in-memory collection.
#[test]
fn storage_tracks_memory_through_a_mixed_sequence() {
    let memory = Rc::new(MemoryStore::new());
    let shared: SharedStore = memory.clone();
    let mut books = BookStore::new(shared);
    books.load_books();

    for round in 0..30u32 {
        match round % 5 {
            0 | 1 | 3 => {
                let title = format!("Book {round}");
                let year = (1900 + round).to_string();
                books.create(&BookDraft::new(title, "Author", year)).unwrap();
            }
            2 => {
                let target = books.get((round as usize) % books.len()).unwrap();
                let before: Vec<_> = books.books().into_iter().map(|b| b.id).collect();
                books
                    .update(&target.id, &BookDraft::new("Renamed", "", "0"))
                    .unwrap();
                let after: Vec<_> = books.books().into_iter().map(|b| b.id).collect();
                assert_eq!(before, after, "update must not reorder");
            }
            _ => {
                let target = books.get(books.len() - 1).unwrap();
                let count = books.len();
                books.delete(&target.id).unwrap();
                assert_eq!(books.len(), count - 1);
                assert!(books.find(&target.id).is_none());
            }
        }
        assert_eq!(persisted(&*memory), books.books());
    }
}

#[test]
fn whitespace_title_is_rejected_everywhere() {
    let memory = Rc::new(MemoryStore::new());
    let shared: SharedStore = memory.clone();
    let mut books = BookStore::new(shared);
    books.load_books();
    let book = books.create(&BookDraft::new("Keep", "", "")).unwrap();

    let err = books.update(&book.id, &BookDraft::new("\t ", "", "")).unwrap_err();
    assert!(matches!(err, BookError::Validation(_)));
    assert_eq!(books.find(&book.id).unwrap().title, "Keep");
    assert_eq!(persisted(&*memory), books.books());
}
