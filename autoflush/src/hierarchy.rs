//! Statically declared "is-a" relation between error kinds.
//!
//! Recovery actions are registered per kind. When a batch fails, the kind of
//! the failure is looked up first, then each of its ancestors in turn, and the
//! first registered action wins. The relation is declared by [`Hierarchy::parent`]
//! rather than discovered at runtime.

use std::fmt::Debug;
use std::hash::Hash;

/// Upper bound on ancestry walks. Guards against a `parent` relation that
/// loops back on itself.
pub const MAX_DEPTH: usize = 64;

/// A kind with a declared parent.
pub trait Hierarchy: Copy + Eq + Hash + Debug {
    /// Returns the next more general kind, or `None` at the root.
    fn parent(&self) -> Option<Self>;

    /// Iterates from this kind up to the root, starting with `self`.
    fn ancestry(&self) -> Ancestry<Self> {
        Ancestry {
            next: Some(*self),
            seen: Vec::new(),
        }
    }

    /// Returns true if `self` is `other` or descends from it.
    fn is_a(&self, other: &Self) -> bool {
        self.ancestry().any(|k| k == *other)
    }
}

/// Iterator returned by [`Hierarchy::ancestry`].
///
/// Stops at the root, at a kind it has already yielded, or after
/// [`MAX_DEPTH`] steps.
#[derive(Debug, Clone)]
pub struct Ancestry<K> {
    next: Option<K>,
    seen: Vec<K>,
}

impl<K: Hierarchy> Iterator for Ancestry<K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let current = self.next.take()?;
        if self.seen.len() >= MAX_DEPTH || self.seen.contains(&current) {
            return None;
        }
        self.seen.push(current);
        self.next = current.parent();
        Some(current)
    }
}

/// Errors that can be classified into a [`Hierarchy`] kind.
///
/// Implement this for your own batch error type to use custom kinds.
pub trait Classify {
    /// The kind type used as recovery map key.
    type Kind: Hierarchy;

    /// Returns the concrete kind of this error.
    fn kind(&self) -> Self::Kind;
}

/// Built-in error kinds.
///
/// ```text
/// Any
/// ├── Runtime
/// │   ├── InvalidArgument
/// │   ├── InvalidState
/// │   ├── Unsupported
/// │   └── NotFound
/// └── Io
///     └── Timeout
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Root of the hierarchy. Matches every failure.
    Any,
    Runtime,
    InvalidArgument,
    InvalidState,
    Unsupported,
    NotFound,
    Io,
    Timeout,
}

impl Hierarchy for ErrorKind {
    fn parent(&self) -> Option<Self> {
        match self {
            ErrorKind::Any => None,
            ErrorKind::Runtime | ErrorKind::Io => Some(ErrorKind::Any),
            ErrorKind::InvalidArgument
            | ErrorKind::InvalidState
            | ErrorKind::Unsupported
            | ErrorKind::NotFound => Some(ErrorKind::Runtime),
            ErrorKind::Timeout => Some(ErrorKind::Io),
        }
    }
}
