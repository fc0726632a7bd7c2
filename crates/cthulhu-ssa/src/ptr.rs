//! Pointer-identity wrapper around `Rc`.
//!
//! The data model (`spec.md` §3) keys maps and sets by *symbol identity*,
//! the way the original C backend keys `map_t`/`set_t` by the `tree_t *`
//! pointer. `Rc<T>`'s derived `Hash`/`Eq` compare the pointee's value, not
//! the allocation, so cross-references that need identity semantics (the
//! dependency graph, the emitter's module/step lookup tables) go through
//! this wrapper instead.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

pub struct ByPtr<T>(Rc<T>);

impl<T> ByPtr<T> {
    pub fn new(value: T) -> Self {
        ByPtr(Rc::new(value))
    }

    pub fn from_rc(rc: Rc<T>) -> Self {
        ByPtr(rc)
    }

    pub fn as_ptr(&self) -> *const T {
        Rc::as_ptr(&self.0)
    }
}

impl<T> Clone for ByPtr<T> {
    fn clone(&self) -> Self {
        ByPtr(Rc::clone(&self.0))
    }
}

impl<T> Deref for ByPtr<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> PartialEq for ByPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for ByPtr<T> {}

impl<T> Hash for ByPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.as_ptr() as usize).hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for ByPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
