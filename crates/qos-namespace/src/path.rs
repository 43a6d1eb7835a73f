//! Logical paths spanning the grid namespace and the local filesystem.
//!
//! A `local:`-prefixed path names an OS path; anything else (optionally
//! `grid:`-prefixed) names a node in the grid namespace.

/// Which namespace a logical path lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Grid,
    Local,
}

/// A parsed logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPath {
    kind: PathKind,
    path: String,
}

impl GridPath {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("local:") {
            Self {
                kind: PathKind::Local,
                path: rest.to_string(),
            }
        } else {
            let rest = raw.strip_prefix("grid:").unwrap_or(raw);
            Self {
                kind: PathKind::Grid,
                path: rest.to_string(),
            }
        }
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// The path with any namespace prefix stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_grid(&self) -> bool {
        self.kind == PathKind::Grid
    }

    /// The parent path, or `None` at the root.
    pub fn parent(&self) -> Option<String> {
        let trimmed = self.path.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        if idx == 0 {
            if trimmed.len() > 1 {
                Some("/".to_string())
            } else {
                None
            }
        } else {
            Some(trimmed[..idx].to_string())
        }
    }
}
