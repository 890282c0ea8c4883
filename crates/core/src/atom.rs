//! Atoms: name-interned tokens
//!
//! An atom is a token identified by its name, distinct from any string with
//! the same text. `Atom::new("ok")` always returns the same atom within a
//! process, so equality is a pointer comparison.
//!
//! ## Interning
//!
//! Names live in a process-wide set of `Arc<str>`. Interned names are never
//! released; the set only grows, like a symbol table. Each context process
//! has its own set, and atoms travel between processes by name (see
//! `marshal`), so identity is recovered on the receiving side by re-interning.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

static INTERNER: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();

fn interner() -> &'static Mutex<HashSet<Arc<str>>> {
    INTERNER.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Interned atom
#[derive(Clone)]
pub struct Atom(Arc<str>);

impl Atom {
    /// Intern `name` and return its atom
    pub fn new(name: &str) -> Atom {
        // A poisoned lock still holds a consistent set: inserts are atomic
        let mut set = interner()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = set.get(name) {
            return Atom(Arc::clone(existing));
        }
        let interned: Arc<str> = Arc::from(name);
        set.insert(Arc::clone(&interned));
        Atom(interned)
    }

    /// The atom's name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Number of distinct atoms interned so far in this process
    pub fn interned_count() -> usize {
        interner()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal names share one allocation, so hashing the name agrees with ptr_eq
        self.0.hash(state);
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Self {
        Atom::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_atom() {
        let a = Atom::new("ready");
        let b = Atom::new("ready");
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn test_different_names_differ() {
        assert_ne!(Atom::new("left"), Atom::new("right"));
    }

    #[test]
    fn test_interned_across_threads() {
        let here = Atom::new("shared-across-threads");
        let there = std::thread::spawn(|| Atom::new("shared-across-threads"))
            .join()
            .unwrap();
        assert_eq!(here, there);
        assert!(Atom::interned_count() >= 1);
    }

    #[test]
    fn test_display_matches_symbol_form() {
        assert_eq!(Atom::new("foo").to_string(), "Symbol(foo)");
        assert_eq!(format!("{:?}", Atom::new("foo")), ":foo");
    }
}
