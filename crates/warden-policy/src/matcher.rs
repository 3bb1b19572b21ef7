//! Pattern compilation and matching.
//!
//! Two pattern forms are accepted from configuration:
//!
//! - `/body/flags` — a regular expression. Flags must be a subset of the
//!   familiar flag alphabet (`i m s x u g y`); only `i m s x` carry meaning
//!   here, the rest are tolerated and ignored.
//! - anything else — a literal, matched case-insensitively as a whole word
//!   (`rm` matches `rm -rf /tmp` and `/bin/rm x`, never `permission`).
//!
//! Compilation never fails: a bad regex body or an unknown flag degrades the
//! whole pattern to its literal word form, logged at debug level only.

use regex::Regex;
use tracing::debug;

/// Flags tolerated on a `/body/flags` pattern.
const ACCEPTED_FLAGS: &str = "imsxugy";

/// Flags forwarded to the regex engine as inline flags.
const FORWARDED_FLAGS: &str = "imsx";

/// A raw pattern string paired with its compiled matcher.
///
/// Compiled fresh for each policy evaluation and shared across the commands
/// in that batch; never kept between evaluations.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    raw: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile one pattern string. Infallible: degraded forms fall back to
    /// the literal word match.
    #[must_use]
    pub fn compile(raw: &str) -> Self {
        if let Some(regex) = try_custom_regex(raw) {
            return Self {
                raw: raw.to_string(),
                regex,
            };
        }
        Self {
            raw: raw.to_string(),
            regex: literal_word_regex(raw),
        }
    }

    /// The pattern string as configured.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern matches anywhere in `command`.
    ///
    /// An empty pattern never matches (its degenerate regex would otherwise
    /// match everything).
    #[must_use]
    pub fn is_match(&self, command: &str) -> bool {
        !self.raw.is_empty() && self.regex.is_match(command)
    }
}

/// Parse and compile the `/body/flags` form, if `raw` has that shape and
/// both the flags and the body are valid. Any defect returns `None` so the
/// caller degrades to the literal form.
fn try_custom_regex(raw: &str) -> Option<Regex> {
    let rest = raw.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let body = &rest[..close];
    if body.is_empty() {
        return None;
    }
    #[allow(clippy::arithmetic_side_effects)] // close < rest.len(), found by rfind
    let flags = &rest[close + 1..];

    if !flags.chars().all(|c| ACCEPTED_FLAGS.contains(c)) {
        debug!(pattern = raw, "unknown regex flags, using literal match");
        return None;
    }

    let inline: String = flags.chars().filter(|c| FORWARDED_FLAGS.contains(*c)).collect();
    let source = if inline.is_empty() {
        body.to_string()
    } else {
        format!("(?{inline}){body}")
    };

    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(pattern = raw, error = %e, "regex failed to compile, using literal match");
            None
        },
    }
}

/// Build the case-insensitive word-boundary regex for a literal pattern.
///
/// `\b` is only anchored against edges that are word characters; a literal
/// like `rm -rf /` ends in a non-word character that separates itself.
fn literal_word_regex(raw: &str) -> Regex {
    let escaped = regex::escape(raw);
    let lead = if raw.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let trail = if raw.chars().last().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let source = format!("(?i){lead}{escaped}{trail}");
    Regex::new(&source).expect("escaped literal regex always compiles")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Compile a configured pattern list.
#[must_use]
pub fn compile_patterns(patterns: &[String]) -> Vec<CompiledPattern> {
    patterns.iter().map(|p| CompiledPattern::compile(p)).collect()
}

/// Whether any pattern in `patterns` matches `command`.
///
/// An empty pattern list never matches.
#[must_use]
pub fn matches_any(command: &str, patterns: &[CompiledPattern]) -> bool {
    patterns.iter().any(|p| p.is_match(command))
}
