//! DM type paths (`/mob/player`, `.relative`, `..upward`) and declarator
//! modifier parsing (`var/const/mob/x`).

use std::fmt;

use bitflags::bitflags;

/// How a path is anchored: absolute from root, relative to the enclosing
/// scope, or an upward search through ancestor scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PathRoot {
    Absolute,
    Relative,
    UpwardSearch,
}

/// A DM type path: a root anchor plus an ordered list of name segments.
///
/// Value-typed: equality is root-kind-plus-segments, and the type is
/// hashable so it can key `ObjectTree::path_index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Path {
    pub root: PathRoot,
    pub segments: Vec<String>,
}

impl Path {
    #[must_use]
    pub fn new(root: PathRoot, segments: Vec<String>) -> Self {
        Self { root, segments }
    }

    #[must_use]
    pub fn root() -> Self {
        Self::new(PathRoot::Absolute, Vec::new())
    }

    #[must_use]
    pub fn absolute(segments: &[&str]) -> Self {
        Self::new(PathRoot::Absolute, segments.iter().map(|s| (*s).to_owned()).collect())
    }

    /// Parses a `/`-separated path string such as `/mob/player`, `.x`, `..y`.
    ///
    /// An empty string yields the absolute root path, matching the original
    /// reference's `DreamPath::ParseFromString`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        let bytes = s.as_bytes();
        let (root, skip) = if bytes[0] == b'/' {
            (PathRoot::Absolute, 1)
        } else if bytes[0] == b'.' {
            if bytes.len() > 1 && bytes[1] == b'.' {
                (PathRoot::UpwardSearch, 2)
            } else {
                (PathRoot::Relative, 1)
            }
        } else {
            (PathRoot::Relative, 0)
        };
        let segments = s[skip..]
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        Self::new(root, segments)
    }

    #[must_use]
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    #[must_use]
    pub fn without_last_segment(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self::new(self.root, segments)
    }

    #[must_use]
    pub fn with_segment(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Self::new(self.root, segments)
    }

    /// Combines `self` (the enclosing scope) with `other`: an absolute
    /// `other` replaces `self` entirely; otherwise segments are appended.
    ///
    /// This is the exact rule the original object-tree builder uses to
    /// resolve a relative object-definition path against its enclosing type.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        if matches!(other.root, PathRoot::Absolute) {
            return other.clone();
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self::new(self.root, segments)
    }

    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        if !matches!((self.root, ancestor.root), (PathRoot::Absolute, PathRoot::Absolute)) {
            return false;
        }
        if ancestor.segments.len() > self.segments.len() {
            return false;
        }
        ancestor.segments.iter().zip(self.segments.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            PathRoot::Absolute => write!(f, "/")?,
            PathRoot::Relative => write!(f, ".")?,
            PathRoot::UpwardSearch => write!(f, "..")?,
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

bitflags! {
    /// Declarator modifier flags parsed from a `var` path
    /// (`/var/const/mob/x` yields `CONST` plus remaining type `/mob`).
    ///
    /// `STATIC` is kept distinct in the bitset but is an alias for `GLOBAL`
    /// when interpreted by the object-tree builder (§3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct VarModifierFlags: u8 {
        const CONST  = 1 << 0;
        const FINAL  = 1 << 1;
        const TMP    = 1 << 2;
        const GLOBAL = 1 << 3;
        const STATIC = 1 << 4;
    }
}

/// The parsed result of a declarator path: modifier flags plus the
/// remaining type path once `var` and the modifier segments are stripped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VarModifiers {
    pub flags: VarModifierFlags,
    pub type_path: Path,
}

impl VarModifiers {
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.flags.intersects(VarModifierFlags::GLOBAL | VarModifierFlags::STATIC)
    }

    #[must_use]
    pub fn is_const(&self) -> bool {
        self.flags.contains(VarModifierFlags::CONST)
    }

    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(VarModifierFlags::FINAL)
    }

    #[must_use]
    pub fn is_tmp(&self) -> bool {
        self.flags.contains(VarModifierFlags::TMP)
    }

    /// Strips a leading `var` segment (a declaration modifier) and any
    /// recognized modifier keywords, returning the remaining type path and
    /// the accumulated flags.
    #[must_use]
    pub fn from_declarator_path(path: &Path) -> Self {
        let mut flags = VarModifierFlags::empty();
        let mut segments = path.segments.as_slice();
        if segments.first().map(String::as_str) == Some("var") {
            segments = &segments[1..];
        }
        let mut start = 0;
        for segment in segments {
            let flag = match segment.as_str() {
                "const" => VarModifierFlags::CONST,
                "final" => VarModifierFlags::FINAL,
                "tmp" => VarModifierFlags::TMP,
                "global" => VarModifierFlags::GLOBAL,
                "static" => VarModifierFlags::STATIC,
                _ => break,
            };
            flags |= flag;
            start += 1;
        }
        let type_path = Path::new(path.root, segments[start..].to_vec());
        Self { flags, type_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_relative_upward() {
        assert_eq!(Path::parse("/mob/player").root, PathRoot::Absolute);
        assert_eq!(Path::parse(".x").root, PathRoot::Relative);
        assert_eq!(Path::parse("..y").root, PathRoot::UpwardSearch);
        assert_eq!(Path::parse("/mob/player").segments, vec!["mob", "player"]);
    }

    #[test]
    fn combine_absolute_replaces_relative_appends() {
        let base = Path::parse("/mob");
        let absolute_child = Path::parse("/obj/item");
        assert_eq!(base.combine(&absolute_child), absolute_child);

        let relative_child = Path::new(PathRoot::Relative, vec!["player".to_owned()]);
        assert_eq!(base.combine(&relative_child), Path::parse("/mob/player"));
    }

    #[test]
    fn var_modifiers_strip_var_and_flags() {
        let declarator = Path::parse("/var/const/mob");
        let modifiers = VarModifiers::from_declarator_path(&declarator);
        assert!(modifiers.is_const());
        assert!(!modifiers.is_global());
        assert_eq!(modifiers.type_path, Path::absolute(&["mob"]));
    }

    #[test]
    fn static_is_recognized_as_global_alias() {
        let declarator = Path::parse("/var/static/list");
        let modifiers = VarModifiers::from_declarator_path(&declarator);
        assert!(modifiers.is_global());
    }
}
