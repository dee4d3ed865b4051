//! Folder paths and breadcrumbs
//!
//! A `FolderPath` is an ordered list of non-empty segments; the empty list is
//! the shared root. Any string normalizes to a valid path, so there is no
//! invalid-path error.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::types::ROOT_LABEL;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FolderPath {
    segments: Vec<String>,
}

/// One step of the root-to-current trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    pub path: FolderPath,
    /// The displayed folder itself; rendered as plain text, not a link
    pub is_current: bool,
}

impl Breadcrumb {
    /// Navigation target, or `None` for the current folder
    pub fn target(&self) -> Option<&FolderPath> {
        (!self.is_current).then_some(&self.path)
    }
}

impl FolderPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Split on `/` and drop empty segments
    pub fn normalize(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, `None` at the root
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent of root is root
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Append a child; `name` is normalized, so `"a/b"` appends two segments
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(Self::normalize(name).segments);
        Self { segments }
    }

    /// Wire form: `/a/b`, or empty for the root
    pub fn remote_path(&self) -> String {
        self.segments.iter().map(|s| format!("/{}", s)).collect()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let last = self.segments.len();
        let mut crumbs = Vec::with_capacity(last + 1);
        crumbs.push(Breadcrumb {
            label: ROOT_LABEL.to_string(),
            path: Self::root(),
            is_current: last == 0,
        });
        for (i, segment) in self.segments.iter().enumerate() {
            crumbs.push(Breadcrumb {
                label: segment.clone(),
                path: Self { segments: self.segments[..=i].to_vec() },
                is_current: i + 1 == last,
            });
        }
        crumbs
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for FolderPath {
    fn from(path: &str) -> Self {
        Self::normalize(path)
    }
}

impl Serialize for FolderPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.remote_path())
    }
}

impl<'de> Deserialize<'de> for FolderPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_empty_segments() {
        let p = FolderPath::normalize("//Reports///2023/");
        assert_eq!(p.segments(), ["Reports", "2023"]);
        assert_eq!(p.to_string(), "Reports/2023");
        assert_eq!(p.remote_path(), "/Reports/2023");
        assert!(FolderPath::normalize("").is_root());
        assert!(FolderPath::normalize("///").is_root());
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["", "/", "a", "/a/b/", "a//b", "  /x", "Отчёты/2023", "a b/c%20d"] {
            let once = FolderPath::normalize(raw);
            let twice = FolderPath::normalize(&once.to_string());
            assert_eq!(once, twice, "input {:?}", raw);
            assert_eq!(once, FolderPath::normalize(&once.remote_path()));
        }
    }

    #[test]
    fn test_parent() {
        assert_eq!(FolderPath::normalize("a/b/c").parent(), FolderPath::normalize("a/b"));
        assert_eq!(FolderPath::normalize("a").parent(), FolderPath::root());
        assert_eq!(FolderPath::root().parent(), FolderPath::root());
    }

    #[test]
    fn test_child() {
        let p = FolderPath::root().child("Reports").child("/2023/Q1/");
        assert_eq!(p.to_string(), "Reports/2023/Q1");
        assert_eq!(p.name(), Some("Q1"));
    }

    #[test]
    fn test_breadcrumbs_root() {
        let crumbs = FolderPath::root().breadcrumbs();
        assert_eq!(crumbs.len(), 1);
        assert_eq!(crumbs[0].label, ROOT_LABEL);
        assert!(crumbs[0].is_current);
        assert!(crumbs[0].target().is_none());
    }

    #[test]
    fn test_breadcrumbs_nested() {
        let path = FolderPath::normalize("/Reports/2023/Q1");
        let crumbs = path.breadcrumbs();
        assert_eq!(crumbs.len(), path.depth() + 1);

        let labels: Vec<_> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, [ROOT_LABEL, "Reports", "2023", "Q1"]);

        assert_eq!(crumbs.iter().filter(|c| c.is_current).count(), 1);
        assert!(crumbs.last().is_some_and(|c| c.is_current));

        assert_eq!(crumbs[0].target(), Some(&FolderPath::root()));
        assert_eq!(crumbs[2].target(), Some(&FolderPath::normalize("Reports/2023")));
        assert_eq!(crumbs[3].path, path);
    }

    #[test]
    fn test_serde_uses_remote_form() {
        let p = FolderPath::normalize("a/b");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: FolderPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
