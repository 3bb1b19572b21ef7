//! POSIX-like shell parsing for policy checks.
//!
//! This is not a shell implementation. It tokenizes just enough to find
//! statement boundaries and `rm` invocations inside a proposed command
//! string, including commands wrapped in `sh -c '...'`. Substitution is
//! never expanded — targets that contain substitution syntax are handled
//! conservatively by the caller.

/// Maximum `sh -c` nesting depth to recurse into.
const MAX_SHELL_RECURSION: usize = 8;

/// Command basenames recognized as shells for `-c`/`-lc` recursion.
const SHELL_NAMES: &[&str] = &["sh", "bash", "zsh", "dash", "ksh"];

/// Split a command line into statements at unquoted `&&`, `||`, `;`, `|`,
/// `&` and newlines.
#[must_use]
pub fn split_statements(command: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = command.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            },
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            },
            '&' | '|' if !in_single && !in_double => {
                // Consume the doubled form (&, && and |, || all separate).
                if chars.peek() == Some(&c) {
                    chars.next();
                }
                push_statement(&mut statements, &mut current);
            },
            ';' | '\n' if !in_single && !in_double => {
                push_statement(&mut statements, &mut current);
            },
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// Tokenize one statement into words, honoring single quotes, double quotes
/// and backslash escapes. Quotes are stripped from the produced tokens;
/// nothing is expanded.
#[must_use]
pub fn tokenize(statement: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut chars = statement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                started = true;
                for inner in chars.by_ref() {
                    if inner == '\'' {
                        break;
                    }
                    current.push(inner);
                }
            },
            '"' => {
                started = true;
                while let Some(inner) = chars.next() {
                    match inner {
                        '"' => break,
                        '\\' => {
                            // Inside double quotes, backslash escapes only a
                            // few characters; otherwise it is literal.
                            match chars.peek() {
                                Some(&n @ ('"' | '\\' | '$' | '`')) => {
                                    current.push(n);
                                    chars.next();
                                },
                                _ => current.push('\\'),
                            }
                        },
                        _ => current.push(inner),
                    }
                }
            },
            '\\' => {
                started = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            c if c.is_whitespace() => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            },
            _ => {
                started = true;
                current.push(c);
            },
        }
    }
    if started {
        tokens.push(current);
    }
    tokens
}

/// Extract every deletion target from a command string.
///
/// Walks each statement, finds `rm` invocations (bare or path-qualified)
/// and collects their non-flag arguments; arguments after a literal `--`
/// are never treated as flags. Statements that invoke a shell with
/// `-c`/`-lc` are recursed into.
#[must_use]
pub fn extract_deletion_targets(command: &str) -> Vec<String> {
    let mut targets = Vec::new();
    collect_targets(command, 0, &mut targets);
    targets
}

fn collect_targets(command: &str, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_SHELL_RECURSION {
        return;
    }
    for statement in split_statements(command) {
        let tokens = tokenize(&statement);
        let Some(head) = tokens.first() else {
            continue;
        };
        let name = basename(head);

        if SHELL_NAMES.contains(&name) {
            let mut iter = tokens.iter().skip(1);
            while let Some(tok) = iter.next() {
                if tok == "-c" || tok == "-lc" {
                    if let Some(script) = iter.next() {
                        collect_targets(script, depth.saturating_add(1), out);
                    }
                    break;
                }
            }
        } else if name == "rm" {
            let mut flags_done = false;
            for tok in tokens.iter().skip(1) {
                if !flags_done {
                    if tok == "--" {
                        flags_done = true;
                        continue;
                    }
                    if tok.starts_with('-') && tok.len() > 1 {
                        continue;
                    }
                }
                out.push(tok.clone());
            }
        }
    }
}

/// Final path component of a command word (`/bin/rm` → `rm`).
fn basename(word: &str) -> &str {
    word.rsplit('/').next().unwrap_or(word)
}
