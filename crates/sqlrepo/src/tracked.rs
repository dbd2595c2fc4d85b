//! Change tracking for materialized entities.

use std::ops::{Deref, DerefMut};

/// An entity plus a single dirty flag.
///
/// The flag is `true` for values built by the caller, `false` for values just
/// loaded by the repository, and becomes `true` on any mutable access. It
/// never resets on its own.
///
/// ```ignore
/// let mut user = repo.get_tracked::<User>(1).await?.unwrap();
/// assert!(!repo.update_tracked(&user).await?); // nothing written
/// user.name = "renamed".into();
/// assert!(repo.update_tracked(&user).await?);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    inner: T,
    dirty: bool,
}

impl<T> Tracked<T> {
    /// Wrap a caller-built value; it starts dirty.
    pub fn new(inner: T) -> Self {
        Self { inner, dirty: true }
    }

    /// Wrap a value freshly populated from a row; it starts clean.
    pub fn loaded(inner: T) -> Self {
        Self {
            inner,
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mutate through a closure.
    pub fn set<F: FnOnce(&mut T)>(&mut self, f: F) -> &mut Self {
        f(&mut self.inner);
        self.dirty = true;
        self
    }

    /// Replace the wrapped value, returning the old one.
    pub fn replace(&mut self, value: T) -> T {
        self.dirty = true;
        std::mem::replace(&mut self.inner, value)
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Tracked<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.inner
    }
}

impl<T> From<T> for Tracked<T> {
    fn from(inner: T) -> Self {
        Self::new(inner)
    }
}

/// A fresh default entity wrapped for tracking (dirty).
pub fn make_tracked<T: Default>() -> Tracked<T> {
    Tracked::new(T::default())
}
