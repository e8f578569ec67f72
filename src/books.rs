//! Book collection manager. The whole collection is one serialized value
//! under a fixed key: every mutation rewrites it, loads read it back in one go.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, error, info};
use thiserror::Error;

use crate::db::{SharedStore, StoreError};
use crate::models::{parse_year, Book, BookDraft};
use crate::state::{Observable, Subscription};

/// Storage key owning the serialized collection.
pub const BOOKS_KEY: &str = "@books_storage_v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("{0}")]
    Validation(String),
    #[error("Book {0} not found")]
    NotFound(String),
}

/// Issues identifiers from the wall clock in milliseconds. Two calls inside
/// the same millisecond (or after the clock stepped back) still get distinct,
/// increasing ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: u128,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never issue an id at or below `floor`.
    pub fn observe(&mut self, floor: u128) {
        self.last = self.last.max(floor);
    }

    pub fn next_id(&mut self) -> String {
        self.next_at(now_millis())
    }

    fn next_at(&mut self, millis: u128) -> String {
        let id = if millis > self.last {
            millis
        } else {
            self.last.checked_add(1).unwrap_or(millis)
        };
        self.last = id;
        id.to_string()
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

/// Validated fields shared by create and update.
struct BookFields {
    title: String,
    author: String,
    year: Option<i64>,
}

fn validate(draft: &BookDraft) -> Result<BookFields, BookError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(BookError::Validation("Please enter title".to_string()));
    }
    Ok(BookFields {
        title: title.to_string(),
        author: draft.author.trim().to_string(),
        year: parse_year(&draft.year),
    })
}

/// CRUD over the ordered collection, newest first.
pub struct BookStore {
    store: SharedStore,
    books: Observable<Vec<Book>>,
    ids: IdGenerator,
}

impl BookStore {
    /// Start with an empty collection; call [`BookStore::load_books`] once the
    /// book screen is mounted.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            books: Observable::default(),
            ids: IdGenerator::new(),
        }
    }

    pub fn books(&self) -> Vec<Book> {
        self.books.get()
    }

    pub fn len(&self) -> usize {
        self.books.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Book> {
        self.books.borrow().get(index).cloned()
    }

    pub fn find(&self, id: &str) -> Option<Book> {
        self.books.borrow().iter().find(|book| book.id == id).cloned()
    }

    pub fn subscribe(&self) -> Subscription<Vec<Book>> {
        self.books.subscribe()
    }

    /// Read the persisted collection. A missing value and any read or decode
    /// failure both leave an empty collection; failures are only logged.
    pub fn load_books(&mut self) {
        let books = match self.read_persisted() {
            Ok(Some(books)) => {
                info!(
                    "event=books_load module=books status=ok count={}",
                    books.len()
                );
                books
            }
            Ok(None) => {
                info!("event=books_load module=books status=ok count=0 reason=absent");
                Vec::new()
            }
            Err(err) => {
                error!("event=books_load module=books status=error error={err:?}");
                Vec::new()
            }
        };

        let highest = books
            .iter()
            .filter_map(|book| book.id.parse::<u128>().ok())
            .max()
            .unwrap_or_default();
        self.ids.observe(highest);

        self.books.set(books);
    }

    fn read_persisted(&self) -> Result<Option<Vec<Book>>, StoreError> {
        let Some(raw) = self.store.get_item(BOOKS_KEY)? else {
            return Ok(None);
        };
        let books = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            key: BOOKS_KEY.to_string(),
            source,
        })?;
        Ok(Some(books))
    }

    /// The only write path. Memory advances first; a failed write is logged
    /// and memory is not rolled back.
    pub fn save_books(&mut self, books: Vec<Book>) {
        let count = books.len();
        let encoded = serde_json::to_string(&books).map_err(|source| StoreError::Encode {
            key: BOOKS_KEY.to_string(),
            source,
        });
        self.books.set(books);

        let written = encoded.and_then(|raw| self.store.set_item(BOOKS_KEY, &raw));
        match written {
            Ok(()) => debug!("event=books_save module=books status=ok count={count}"),
            Err(err) => error!("event=books_save module=books status=error error={err:?}"),
        }
    }

    /// Prepend a new record built from `draft`.
    pub fn create(&mut self, draft: &BookDraft) -> Result<Book, BookError> {
        let fields = validate(draft)?;
        let book = Book {
            id: self.ids.next_id(),
            title: fields.title,
            author: fields.author,
            year: fields.year,
        };

        let mut books = Vec::with_capacity(self.len() + 1);
        books.push(book.clone());
        books.extend(self.books.borrow().iter().cloned());
        self.save_books(books);
        Ok(book)
    }

    /// Replace the record with `id` in place, keeping its position.
    pub fn update(&mut self, id: &str, draft: &BookDraft) -> Result<Book, BookError> {
        let fields = validate(draft)?;
        let mut books = self.books();
        let slot = books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;

        slot.title = fields.title;
        slot.author = fields.author;
        slot.year = fields.year;
        let updated = slot.clone();

        self.save_books(books);
        Ok(updated)
    }

    /// Remove the record with `id`. Confirmation happens in the UI before this
    /// is called.
    pub fn delete(&mut self, id: &str) -> Result<Book, BookError> {
        let mut books = self.books();
        let index = books
            .iter()
            .position(|book| book.id == id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;
        let removed = books.remove(index);

        self.save_books(books);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::db::{KeyValueStore, MemoryStore};

    fn store_with(raw: Option<&str>) -> (Rc<MemoryStore>, BookStore) {
        let memory = Rc::new(MemoryStore::new());
        if let Some(raw) = raw {
            memory.set_item(BOOKS_KEY, raw).unwrap();
        }
        let shared: SharedStore = memory.clone();
        (memory, BookStore::new(shared))
    }

    fn persisted(memory: &MemoryStore) -> Vec<Book> {
        let raw = memory.get_item(BOOKS_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn id_generator_is_monotonic_within_a_millisecond() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_at(1_000), "1000");
        assert_eq!(ids.next_at(1_000), "1001");
        assert_eq!(ids.next_at(999), "1002");
        assert_eq!(ids.next_at(5_000), "5000");
    }

    #[test]
    fn id_generator_respects_observed_floor() {
        let mut ids = IdGenerator::new();
        ids.observe(10_000);
        assert_eq!(ids.next_at(500), "10001");
    }

    #[test]
    fn id_generator_falls_back_to_the_clock_at_the_top_of_the_range() {
        let mut ids = IdGenerator::new();
        ids.observe(u128::MAX);
        assert_eq!(ids.next_at(1_000), "1000");
        assert_eq!(ids.next_at(1_000), "1001");
    }

    #[test]
    fn create_after_loading_the_largest_possible_id() {
        let raw = format!(r#"[{{"id":"{}","title":"Edge","author":"","year":null}}]"#, u128::MAX);
        let (memory, mut books) = store_with(Some(&raw));
        books.load_books();

        let created = books.create(&BookDraft::new("New", "", "")).unwrap();

        assert_ne!(created.id, u128::MAX.to_string());
        assert_eq!(books.len(), 2);
        assert_eq!(persisted(&memory), books.books());
    }

    #[test]
    fn load_with_nothing_persisted_is_empty() {
        let (_, mut books) = store_with(None);
        books.load_books();
        assert!(books.is_empty());
    }

    #[test]
    fn load_with_corrupt_value_is_empty() {
        let (_, mut books) = store_with(Some("{not json"));
        books.load_books();
        assert!(books.is_empty());
    }

    #[test]
    fn load_seeds_ids_above_existing_records() {
        let far_future = "99999999999999";
        let raw = format!(r#"[{{"id":"{far_future}","title":"Old","author":"","year":null}}]"#);
        let (_, mut books) = store_with(Some(&raw));
        books.load_books();

        let created = books.create(&BookDraft::new("New", "", "")).unwrap();
        assert_eq!(created.id, "100000000000000");
    }

    #[test]
    fn create_rejects_blank_title_without_touching_state() {
        let (memory, mut books) = store_with(None);
        books.load_books();

        let err = books.create(&BookDraft::new("   ", "Someone", "2000")).unwrap_err();
        assert_eq!(err, BookError::Validation("Please enter title".to_string()));
        assert!(books.is_empty());
        assert_eq!(memory.get_item(BOOKS_KEY).unwrap(), None);
    }

    #[test]
    fn create_trims_and_prepends() {
        let (memory, mut books) = store_with(None);
        books.load_books();

        books.create(&BookDraft::new("Emma", "Austen", "1815")).unwrap();
        let dune = books
            .create(&BookDraft::new(" Dune ", " Herbert ", "1965"))
            .unwrap();

        assert_eq!(dune.title, "Dune");
        assert_eq!(dune.author, "Herbert");
        assert_eq!(dune.year, Some(1965));
        assert_eq!(books.get(0), Some(dune));
        assert_eq!(persisted(&memory), books.books());
    }

    #[test]
    fn update_keeps_position_and_id() {
        let (memory, mut books) = store_with(None);
        books.load_books();
        let first = books.create(&BookDraft::new("A", "", "")).unwrap();
        books.create(&BookDraft::new("B", "", "")).unwrap();
        books.create(&BookDraft::new("C", "", "")).unwrap();

        let updated = books
            .update(&first.id, &BookDraft::new("A2", "Anon", "abc"))
            .unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.year, None);
        let titles: Vec<_> = books.books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, ["C", "B", "A2"]);
        assert_eq!(persisted(&memory), books.books());
    }

    #[test]
    fn update_of_unknown_id_fails() {
        let (_, mut books) = store_with(None);
        books.load_books();
        let err = books.update("404", &BookDraft::new("X", "", "")).unwrap_err();
        assert_eq!(err, BookError::NotFound("404".to_string()));
    }

    #[test]
    fn delete_removes_only_the_target() {
        let (memory, mut books) = store_with(None);
        books.load_books();
        let a = books.create(&BookDraft::new("A", "", "")).unwrap();
        let b = books.create(&BookDraft::new("B", "", "")).unwrap();

        let removed = books.delete(&a.id).unwrap();
        assert_eq!(removed, a);
        assert_eq!(books.books(), vec![b]);
        assert_eq!(persisted(&memory), books.books());
        assert!(books.delete(&a.id).is_err());
    }

    #[test]
    fn failed_write_keeps_memory_advanced() {
        let (memory, mut books) = store_with(None);
        books.load_books();
        books.create(&BookDraft::new("Kept", "", "")).unwrap();

        memory.set_fail_writes(true);
        books.create(&BookDraft::new("Memory only", "", "")).unwrap();

        assert_eq!(books.len(), 2);
        assert_eq!(persisted(&memory).len(), 1);
    }

    #[test]
    fn subscribers_see_mutations() {
        let (_, mut books) = store_with(None);
        let mut sub = books.subscribe();
        books.load_books();
        assert_eq!(sub.poll_with(Vec::len), Some(0));

        books.create(&BookDraft::new("A", "", "")).unwrap();
        assert_eq!(sub.poll_with(Vec::len), Some(1));
        assert_eq!(sub.poll_with(Vec::len), None);
    }
}
