//! Error classes: the type hierarchy failures are resolved against.
//!
//! Each class is a `'static` descriptor naming its parent, so an application
//! declares its hierarchy once as `static` items:
//!
//! ```
//! use macrobase_core::{ErrorClass, EXCEPTION};
//!
//! static STORAGE_ERROR: ErrorClass = ErrorClass::derived("StorageError", &EXCEPTION);
//! static NOT_FOUND: ErrorClass = ErrorClass::derived("NotFound", &STORAGE_ERROR);
//!
//! assert!(NOT_FOUND.is_a(&STORAGE_ERROR));
//! assert!(NOT_FOUND.is_a(&EXCEPTION));
//! assert!(!STORAGE_ERROR.is_a(&NOT_FOUND));
//! ```
//!
//! Class names identify a class and must be unique within a process.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Root of every error class hierarchy.
pub static EXCEPTION: ErrorClass = ErrorClass::root("Exception");

/// Failures that carry their own HTTP status.
pub static HTTP_ERROR: ErrorClass = ErrorClass::derived("HttpError", &EXCEPTION);

/// Internal routing failures, always answered with 500.
pub static ROUTING_ERROR: ErrorClass = ErrorClass::derived("RoutingError", &HTTP_ERROR);

/// I/O failures raised inside hooks or handlers.
pub static IO_ERROR: ErrorClass = ErrorClass::derived("IoError", &EXCEPTION);

/// JSON (de)serialization failures raised inside hooks or handlers.
pub static JSON_ERROR: ErrorClass = ErrorClass::derived("JsonError", &EXCEPTION);

/// A named node in an error class hierarchy.
#[derive(Debug)]
pub struct ErrorClass {
    name: &'static str,
    parent: Option<&'static ErrorClass>,
}

impl ErrorClass {
    /// Create a class with no parent.
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Create a class deriving from `parent`.
    #[must_use]
    pub const fn derived(name: &'static str, parent: &'static ErrorClass) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The direct parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&'static ErrorClass> {
        self.parent
    }

    /// Returns `true` if `self` equals `other` or derives from it.
    #[must_use]
    pub fn is_a(&self, other: &ErrorClass) -> bool {
        self.distance_to(other).is_some()
    }

    /// Number of parent hops from `self` up to `ancestor`.
    ///
    /// `Some(0)` means the classes are equal; `None` means `ancestor` is not
    /// in the chain.
    #[must_use]
    pub fn distance_to(&self, ancestor: &ErrorClass) -> Option<usize> {
        let mut current = Some(self);
        let mut hops = 0;
        while let Some(class) = current {
            if class == ancestor {
                return Some(hops);
            }
            current = class.parent;
            hops += 1;
        }
        None
    }

    /// Iterate over `self` and then each ancestor up to the root.
    pub fn lineage(&self) -> impl Iterator<Item = &ErrorClass> {
        std::iter::successors(Some(self), |class| class.parent)
    }
}

impl PartialEq for ErrorClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ErrorClass {}

impl Hash for ErrorClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static BASE: ErrorClass = ErrorClass::derived("TestBase", &EXCEPTION);
    static CHILD: ErrorClass = ErrorClass::derived("TestChild", &BASE);
    static SIBLING: ErrorClass = ErrorClass::derived("TestSibling", &BASE);

    #[test]
    fn test_should_match_self_and_ancestors() {
        assert!(CHILD.is_a(&CHILD));
        assert!(CHILD.is_a(&BASE));
        assert!(CHILD.is_a(&EXCEPTION));
    }

    #[test]
    fn test_should_not_match_descendants_or_siblings() {
        assert!(!BASE.is_a(&CHILD));
        assert!(!CHILD.is_a(&SIBLING));
        assert!(!EXCEPTION.is_a(&BASE));
    }

    #[test]
    fn test_should_count_hops_to_ancestor() {
        assert_eq!(CHILD.distance_to(&CHILD), Some(0));
        assert_eq!(CHILD.distance_to(&BASE), Some(1));
        assert_eq!(CHILD.distance_to(&EXCEPTION), Some(2));
        assert_eq!(CHILD.distance_to(&SIBLING), None);
    }

    #[test]
    fn test_should_walk_lineage_to_root() {
        let names: Vec<_> = ROUTING_ERROR.lineage().map(ErrorClass::name).collect();
        assert_eq!(names, ["RoutingError", "HttpError", "Exception"]);
    }
}
