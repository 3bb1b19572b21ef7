//! Safe-root membership checks.
//!
//! Destructive operations are only auto-approvable when every target sits
//! inside one of the configured safe roots. Membership is component-wise
//! (`/safe2` is never inside `/safe`), resolution is purely lexical (no
//! filesystem access — targets typically do not exist yet), and anything
//! containing substitution syntax is treated as outside.

use std::path::{Component, Path, PathBuf};

/// Whether a target contains shell substitution syntax (`$` or backtick).
///
/// Such targets cannot be resolved without running the shell, so the policy
/// treats them as outside every safe root.
#[must_use]
pub fn contains_substitution(target: &str) -> bool {
    target.contains('$') || target.contains('`')
}

/// The configured set of safe directory roots.
#[derive(Debug, Clone)]
pub struct SafeRoots {
    roots: Vec<PathBuf>,
    home: Option<PathBuf>,
}

impl SafeRoots {
    /// Build from configured root strings. `~` references are expanded
    /// against the current user's home directory; roots are normalized.
    #[must_use]
    pub fn new(roots: &[String]) -> Self {
        let home = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf());
        Self::with_home_dir(roots, home)
    }

    /// Build with an explicit home directory (test seam).
    #[must_use]
    pub fn with_home_dir(roots: &[String], home: Option<PathBuf>) -> Self {
        let mut this = Self {
            roots: Vec::new(),
            home,
        };
        let resolved: Vec<PathBuf> = roots
            .iter()
            .map(|r| normalize(&this.expand_home(r)))
            .collect();
        this.roots = resolved;
        this
    }

    /// The normalized safe roots.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether a deletion target resolves inside some safe root.
    ///
    /// Surrounding quotes are stripped, `~` is expanded, relative paths
    /// resolve against `workspace`. Substitution syntax means outside,
    /// always.
    #[must_use]
    pub fn target_is_inside(&self, raw_target: &str, workspace: &Path) -> bool {
        let stripped = strip_quotes(raw_target);
        if stripped.is_empty() || contains_substitution(stripped) {
            return false;
        }
        let expanded = self.expand_home(stripped);
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            workspace.join(expanded)
        };
        self.path_is_inside(&normalize(&absolute))
    }

    /// Whether an already-resolved path sits inside some safe root.
    #[must_use]
    pub fn path_is_inside(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        self.roots.iter().any(|root| normalized.starts_with(root))
    }

    fn expand_home(&self, raw: &str) -> PathBuf {
        if let Some(home) = &self.home {
            if raw == "~" {
                return home.clone();
            }
            if let Some(rest) = raw.strip_prefix("~/") {
                return home.join(rest);
            }
        }
        PathBuf::from(raw)
    }
}

/// Strip one pair of matching surrounding quotes, if present.
fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        return inner;
    }
    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return inner;
    }
    trimmed
}

/// Lexical path normalization: resolves `.` and `..` components without
/// touching the filesystem. `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                out.pop();
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
