//! Section-delimited scanning of the proposal envelope.
//!
//! A label is an all-caps word at the start of a line followed by a colon.
//! Agents writing Chinese habitually use the full-width colon `：`, so both
//! colon forms are accepted after every label. A section runs until the next
//! labeled line or the end of the text.

use warden_core::ids::new_approval_id;

/// A structured proposal recovered from agent output.
///
/// Transient: folded into policy evaluation and discarded, never persisted.
/// The id here is disposable; the durable id a user ends up confirming is
/// assigned by the approval store when a record is created.
#[derive(Debug, Clone)]
pub struct ProposalResult {
    /// The agent's own answer to whether a human should sign off.
    pub needs_approval: bool,
    /// One-line description of the intended change.
    pub summary: String,
    /// Conversational text intended for the user.
    pub response: String,
    /// Freshly minted per parse, not stable across retries.
    pub approval_id: String,
    /// Shell commands the agent intends to run, in order.
    pub commands: Vec<String>,
    /// Files the agent intends to modify, in order.
    pub files: Vec<String>,
}

#[derive(Clone, Copy)]
enum Section {
    None,
    Summary,
    Commands,
    Files,
    Response,
}

#[derive(Default)]
struct Buffers<'a> {
    summary: Vec<&'a str>,
    commands: Vec<&'a str>,
    files: Vec<&'a str>,
    response: Vec<&'a str>,
}

impl<'a> Buffers<'a> {
    fn push(&mut self, section: Section, line: &'a str) {
        match section {
            Section::Summary => self.summary.push(line),
            Section::Commands => self.commands.push(line),
            Section::Files => self.files.push(line),
            Section::Response => self.response.push(line),
            Section::None => {},
        }
    }
}

/// Parse agent output into a [`ProposalResult`].
///
/// Returns `None` when no well-formed `NEEDS_APPROVAL: yes|no` line exists;
/// the caller then treats the whole output as plain unstructured text.
#[must_use]
pub fn parse(raw: &str) -> Option<ProposalResult> {
    let mut needs_approval: Option<bool> = None;
    let mut buffers = Buffers::default();
    let mut current = Section::None;

    for line in raw.lines() {
        if let Some((label, rest)) = split_label(line) {
            current = match label {
                "NEEDS_APPROVAL" => {
                    // First well-formed marker wins.
                    if needs_approval.is_none() {
                        needs_approval = parse_flag(rest);
                    }
                    Section::None
                },
                "SUMMARY" => Section::Summary,
                "COMMANDS" => Section::Commands,
                "FILES" => Section::Files,
                "RESPONSE" => Section::Response,
                _ => Section::None,
            };
            if !rest.trim().is_empty() {
                buffers.push(current, rest);
            }
        } else {
            buffers.push(current, line);
        }
    }

    let needs_approval = needs_approval?;
    Some(ProposalResult {
        needs_approval,
        summary: join_text(&buffers.summary),
        response: join_text(&buffers.response),
        approval_id: new_approval_id(),
        commands: collect_items(&buffers.commands),
        files: collect_items(&buffers.files),
    })
}

/// Split `LABEL: rest` when the part before the first colon is all-caps.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let idx = trimmed.find([':', '：'])?;
    let label = &trimmed[..idx];
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return None;
    }
    let rest = trimmed[idx..]
        .strip_prefix(':')
        .or_else(|| trimmed[idx..].strip_prefix('：'))?;
    Some((label, rest))
}

/// Read the yes/no value after `NEEDS_APPROVAL`. Trailing sentence
/// punctuation is tolerated; anything else is not a valid marker.
fn parse_flag(rest: &str) -> Option<bool> {
    let value = rest.trim().trim_end_matches(['.', '!', '。']).trim();
    if value.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if value.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

fn join_text(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

/// Turn section lines into list entries: strip one `- ` bullet, drop blank
/// lines and lines reading `none`.
fn collect_items(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let trimmed = line.trim();
            trimmed.strip_prefix("- ").unwrap_or(trimmed).trim()
        })
        .filter(|item| !item.is_empty() && !item.eq_ignore_ascii_case("none"))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "NEEDS_APPROVAL: yes\n\
                        SUMMARY: rotate the api key\n\
                        COMMANDS:\n\
                        - rm old.key\n\
                        - ssh-keygen -f new.key\n\
                        FILES:\n\
                        - config/keys.toml\n\
                        RESPONSE:\n\
                        I will rotate the key now.";

    #[test]
    fn full_envelope_parses() {
        let parsed = parse(FULL).unwrap();
        assert!(parsed.needs_approval);
        assert_eq!(parsed.summary, "rotate the api key");
        assert_eq!(parsed.commands, vec!["rm old.key", "ssh-keygen -f new.key"]);
        assert_eq!(parsed.files, vec!["config/keys.toml"]);
        assert_eq!(parsed.response, "I will rotate the key now.");
    }

    #[test]
    fn missing_marker_returns_none() {
        assert!(parse("just some chatty text").is_none());
        assert!(parse("").is_none());
        assert!(parse("SUMMARY: no marker here\nRESPONSE: hi").is_none());
    }

    #[test]
    fn marker_alone_is_enough() {
        let parsed = parse("NEEDS_APPROVAL: no").unwrap();
        assert!(!parsed.needs_approval);
        assert!(parsed.summary.is_empty());
        assert!(parsed.response.is_empty());
        assert!(parsed.commands.is_empty());
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn fullwidth_colon_is_accepted() {
        let parsed = parse("NEEDS_APPROVAL：yes\nSUMMARY：部署服务\nRESPONSE：好的。").unwrap();
        assert!(parsed.needs_approval);
        assert_eq!(parsed.summary, "部署服务");
        assert_eq!(parsed.response, "好的。");
    }

    #[test]
    fn flag_value_is_case_insensitive() {
        assert!(parse("NEEDS_APPROVAL: Yes").unwrap().needs_approval);
        assert!(!parse("NEEDS_APPROVAL: NO").unwrap().needs_approval);
    }

    #[test]
    fn trailing_punctuation_on_flag_is_tolerated() {
        assert!(parse("NEEDS_APPROVAL: yes.").unwrap().needs_approval);
    }

    #[test]
    fn malformed_flag_value_fails_the_parse() {
        assert!(parse("NEEDS_APPROVAL: maybe").is_none());
    }

    #[test]
    fn first_well_formed_marker_wins() {
        let text = "NEEDS_APPROVAL: perhaps\nNEEDS_APPROVAL: no\nNEEDS_APPROVAL: yes";
        assert!(!parse(text).unwrap().needs_approval);
    }

    #[test]
    fn bullets_blanks_and_none_lines_are_dropped() {
        let text = "NEEDS_APPROVAL: no\nCOMMANDS:\n- ls\n\n- None\ncargo check\nFILES:\n- none";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.commands, vec!["ls", "cargo check"]);
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn unknown_caps_label_ends_a_section() {
        let text = "NEEDS_APPROVAL: no\nRESPONSE:\nvisible\nNOTES:\nhidden";
        assert_eq!(parse(text).unwrap().response, "visible");
    }

    #[test]
    fn lowercase_colon_lines_stay_in_the_section() {
        let text = "NEEDS_APPROVAL: no\nRESPONSE:\nnote: this stays\nDone.";
        assert_eq!(parse(text).unwrap().response, "note: this stays\nDone.");
    }

    #[test]
    fn inline_section_content_is_kept() {
        let parsed = parse("NEEDS_APPROVAL: no\nCOMMANDS: - ls\nRESPONSE: all good").unwrap();
        assert_eq!(parsed.commands, vec!["ls"]);
        assert_eq!(parsed.response, "all good");
    }

    #[test]
    fn multi_line_response_is_preserved() {
        let text = "NEEDS_APPROVAL: no\nRESPONSE:\nline one\nline two\n";
        assert_eq!(parse(text).unwrap().response, "line one\nline two");
    }

    #[test]
    fn each_parse_mints_a_fresh_id() {
        let a = parse(FULL).unwrap();
        let b = parse(FULL).unwrap();
        assert!(a.approval_id.starts_with("appr_"));
        assert_ne!(a.approval_id, b.approval_id);
    }

    #[test]
    fn structure_is_stable_across_parses() {
        let a = parse(FULL).unwrap();
        let b = parse(FULL).unwrap();
        assert_eq!(a.needs_approval, b.needs_approval);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.commands, b.commands);
        assert_eq!(a.files, b.files);
        assert_eq!(a.response, b.response);
    }
}
