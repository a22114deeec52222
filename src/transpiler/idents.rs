//! Identifier access observers.

use std::collections::BTreeSet;

use crate::ast::Expr;

/// Observes every variable or field path the converter emits.
///
/// `root` is `None` when `path` starts at a declared variable. It is the
/// base expression when the path hangs off something else, such as an
/// indexed element or a comprehension's iteration variable. The returned
/// path is what the observer recorded; emission always uses the original.
pub trait IdentTracker {
    fn add_ident_access(&mut self, root: Option<&Expr>, path: &[String]) -> Vec<String>;
}

impl<T: IdentTracker + ?Sized> IdentTracker for &mut T {
    fn add_ident_access(&mut self, root: Option<&Expr>, path: &[String]) -> Vec<String> {
        (**self).add_ident_access(root, path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIdentTracker;

impl IdentTracker for NoopIdentTracker {
    fn add_ident_access(&mut self, _root: Option<&Expr>, path: &[String]) -> Vec<String> {
        path.to_vec()
    }
}

/// Collects dotted paths. Paths with a root expression get a leading `.`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathSet {
    paths: BTreeSet<String>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.paths.into_iter().collect()
    }
}

impl IdentTracker for PathSet {
    fn add_ident_access(&mut self, root: Option<&Expr>, path: &[String]) -> Vec<String> {
        let joined = path.join(".");
        match root {
            None => self.paths.insert(joined),
            Some(_) => self.paths.insert(format!(".{}", joined)),
        };
        path.to_vec()
    }
}
