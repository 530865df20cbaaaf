//! Identifier model
//!
//! Names come in two flavors: the bare text the programmer wrote, and the
//! dot-delimited absolute path the resolver assigns.

use std::fmt;

use serde::Serialize;

/// A name as written in source, before resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnresolvedName(String);

impl UnresolvedName {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnresolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dot-delimited absolute name, e.g. `somelang.Main.add`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FullyQualifiedName(String);

impl FullyQualifiedName {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last dot; empty when there is no dot
    pub fn qualifying_segment(&self) -> FullyQualifiedName {
        match self.0.rfind('.') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self(String::new()),
        }
    }

    /// Everything after the last dot; the whole name when there is no dot
    pub fn final_segment(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Append a new final segment
    pub fn join(&self, segment: &str) -> FullyQualifiedName {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{}", self.0, segment))
        }
    }

    /// The final segment as a bare source name
    pub fn as_unresolved(&self) -> UnresolvedName {
        UnresolvedName::new(self.final_segment())
    }
}

impl std::ops::Add<&str> for &FullyQualifiedName {
    type Output = FullyQualifiedName;

    fn add(self, segment: &str) -> FullyQualifiedName {
        self.join(segment)
    }
}

impl fmt::Display for FullyQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either kind of name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    Unresolved(UnresolvedName),
    Qualified(FullyQualifiedName),
}

impl Name {
    /// Shorthand for an unresolved name
    pub fn unresolved(text: impl Into<String>) -> Self {
        Self::Unresolved(UnresolvedName::new(text))
    }

    /// The raw text of the name
    pub fn text(&self) -> &str {
        match self {
            Self::Unresolved(name) => name.as_str(),
            Self::Qualified(name) => name.as_str(),
        }
    }

    /// The name as it would appear in source: the final segment of a
    /// qualified name, or the text itself
    pub fn as_unresolved(&self) -> UnresolvedName {
        match self {
            Self::Unresolved(name) => name.clone(),
            Self::Qualified(name) => name.as_unresolved(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        let fqn = FullyQualifiedName::new("com.somelang.TheFile");
        assert_eq!(fqn.final_segment(), "TheFile");
        assert_eq!(fqn.qualifying_segment(), FullyQualifiedName::new("com.somelang"));
    }

    #[test]
    fn test_segments_without_dot() {
        let fqn = FullyQualifiedName::new("Main");
        assert_eq!(fqn.final_segment(), "Main");
        assert_eq!(fqn.qualifying_segment().as_str(), "");
    }

    #[test]
    fn test_trailing_dot_has_empty_final_segment() {
        let fqn = FullyQualifiedName::new("a.b.");
        assert_eq!(fqn.final_segment(), "");
        assert_eq!(fqn.qualifying_segment().as_str(), "a.b");
    }

    #[test]
    fn test_join() {
        let file = FullyQualifiedName::new("com.somelang.TheFile");
        let sibling = &file.qualifying_segment() + "Foo";
        assert_eq!(sibling.as_str(), "com.somelang.Foo");
        assert_eq!(FullyQualifiedName::new("").join("x").as_str(), "x");
    }

    #[test]
    fn test_as_unresolved() {
        let name = Name::Qualified(FullyQualifiedName::new("a.b.echo"));
        assert_eq!(name.as_unresolved(), UnresolvedName::new("echo"));
        assert_eq!(Name::unresolved("x").text(), "x");
    }
}
