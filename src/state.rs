//! Observable values for UI state.
//!
//! `Observable<T>` owns a value plus a version counter. Mutations bump the
//! version; subscribers poll and see each change once. Everything runs on the
//! single UI thread, so the shared state lives behind `Rc<RefCell<_>>`.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

struct Inner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
}

/// A value that can be observed for changes. Clones share the same value.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                version: Cell::new(0),
            }),
        }
    }

    /// Borrow the current value. The borrow must end before the next `set`.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.value.borrow()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.bump();
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.borrow_mut());
        self.bump();
        result
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            source: Rc::clone(&self.inner),
            last_version: self.inner.version.get(),
        }
    }

    fn bump(&self) {
        self.inner.version.set(self.inner.version.get().wrapping_add(1));
    }
}

impl<T: Clone> Observable<T> {
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

/// Poll handle returned by [`Observable::subscribe`]. Only changes made after
/// the subscription was created (or last polled) are reported.
pub struct Subscription<T> {
    source: Rc<Inner<T>>,
    last_version: u64,
}

impl<T> Subscription<T> {
    /// Run `f` against the current value if it changed since the last poll.
    /// Several changes between polls collapse into one notification.
    pub fn poll_with<R>(&mut self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let current = self.source.version.get();
        if current == self.last_version {
            return None;
        }
        self.last_version = current;
        Some(f(&self.source.value.borrow()))
    }
}

impl<T: Clone> Subscription<T> {
    pub fn poll(&mut self) -> Option<T> {
        self.poll_with(T::clone)
    }
}
