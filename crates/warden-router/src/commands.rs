//! Slash command parsing.
//!
//! Parsing is split from dispatch so the command surface stays testable
//! without a live router. The grammar is flat: a command word, then
//! positional words, with `--flags` allowed where noted.

/// Access level selected with `/cli`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliAccess {
    /// Policy-clean proposals may execute without confirmation.
    Write,
    /// Every action goes through an approval record.
    Safe,
}

/// A recognized slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// `/confirm [--last]` — approve the pending record.
    Confirm,
    /// `/cancel` — reject the pending record.
    Cancel,
    /// `/reset [--hard]` — clear session state; `--hard` wipes every
    /// stored session mapping, not just this chat's.
    Reset {
        /// Whether to wipe all stored session mappings.
        hard: bool,
    },
    /// `/dir [set <path>]` — show or change the chat's workspace.
    Dir {
        /// New workspace path, when setting.
        set: Option<String>,
    },
    /// `/model [set [--global] <name>]` — show or change the model.
    Model {
        /// New model name, when setting.
        set: Option<String>,
        /// Whether the change applies to every chat.
        global: bool,
    },
    /// `/resume <id>` — pin an agent session id to this chat.
    Resume {
        /// Session id to pin.
        session_id: String,
    },
    /// `/cli [--write|--safe]` — use the CLI backend, optionally changing
    /// the access level.
    Cli {
        /// Requested access level, if any.
        access: Option<CliAccess>,
    },
    /// `/use <plugin>` — enter a plugin.
    Use {
        /// Plugin name.
        plugin: String,
    },
    /// `/exit` — leave the active plugin.
    Exit,
    /// `/plugin enable|disable <name>` — request a governance change.
    Plugin {
        /// `true` to enable, `false` to disable.
        enable: bool,
        /// Plugin name.
        name: String,
    },
    /// `/status` — report the chat's routing state.
    Status,
    /// `/help` — list commands.
    Help,
}

/// Outcome of parsing a slash-prefixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParse {
    /// A well-formed command.
    Ok(SlashCommand),
    /// Known command, wrong shape; reply with its usage line.
    Usage(&'static str),
    /// Unknown command word.
    Unknown(String),
}

/// Parse a message as a slash command.
///
/// Returns `None` for anything that does not start with `/`, which the
/// router then treats as plain conversation.
#[must_use]
pub fn parse(text: &str) -> Option<CommandParse> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut words = trimmed.split_whitespace();
    let head = words.next()?.to_lowercase();
    let rest: Vec<&str> = words.collect();

    let parsed = match head.as_str() {
        "/confirm" | "/approve" => CommandParse::Ok(SlashCommand::Confirm),
        "/cancel" | "/reject" => CommandParse::Ok(SlashCommand::Cancel),
        "/reset" => CommandParse::Ok(SlashCommand::Reset {
            hard: rest.contains(&"--hard"),
        }),
        "/dir" => parse_dir(&rest),
        "/model" => parse_model(&rest),
        "/resume" => match rest.as_slice() {
            [id] => CommandParse::Ok(SlashCommand::Resume {
                session_id: (*id).to_string(),
            }),
            _ => CommandParse::Usage("usage: /resume <session-id>"),
        },
        "/cli" => match rest.as_slice() {
            [] => CommandParse::Ok(SlashCommand::Cli { access: None }),
            ["--write"] => CommandParse::Ok(SlashCommand::Cli {
                access: Some(CliAccess::Write),
            }),
            ["--safe"] => CommandParse::Ok(SlashCommand::Cli {
                access: Some(CliAccess::Safe),
            }),
            _ => CommandParse::Usage("usage: /cli [--write|--safe]"),
        },
        "/use" => match rest.as_slice() {
            [plugin] => CommandParse::Ok(SlashCommand::Use {
                plugin: plugin.to_lowercase(),
            }),
            _ => CommandParse::Usage("usage: /use <plugin>"),
        },
        "/exit" => CommandParse::Ok(SlashCommand::Exit),
        "/plugin" => match rest.as_slice() {
            ["enable", name] => CommandParse::Ok(SlashCommand::Plugin {
                enable: true,
                name: name.to_lowercase(),
            }),
            ["disable", name] => CommandParse::Ok(SlashCommand::Plugin {
                enable: false,
                name: name.to_lowercase(),
            }),
            _ => CommandParse::Usage("usage: /plugin <enable|disable> <name>"),
        },
        "/status" => CommandParse::Ok(SlashCommand::Status),
        "/help" => CommandParse::Ok(SlashCommand::Help),
        _ => CommandParse::Unknown(head),
    };
    Some(parsed)
}

fn parse_dir(rest: &[&str]) -> CommandParse {
    match rest {
        [] => CommandParse::Ok(SlashCommand::Dir { set: None }),
        ["set", path @ ..] if !path.is_empty() => CommandParse::Ok(SlashCommand::Dir {
            // Paths may contain spaces; everything after `set` is the path.
            set: Some(path.join(" ")),
        }),
        _ => CommandParse::Usage("usage: /dir or /dir set <path>"),
    }
}

fn parse_model(rest: &[&str]) -> CommandParse {
    match rest {
        [] => CommandParse::Ok(SlashCommand::Model {
            set: None,
            global: false,
        }),
        ["set", "--global", name] => CommandParse::Ok(SlashCommand::Model {
            set: Some((*name).to_string()),
            global: true,
        }),
        ["set", name] if !name.starts_with("--") => CommandParse::Ok(SlashCommand::Model {
            set: Some((*name).to_string()),
            global: false,
        }),
        _ => CommandParse::Usage("usage: /model or /model set [--global] <name>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(text: &str) -> SlashCommand {
        match parse(text) {
            Some(CommandParse::Ok(cmd)) => cmd,
            other => panic!("expected command for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn non_slash_text_is_not_a_command() {
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("please /confirm for me"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(ok("/confirm"), SlashCommand::Confirm);
        assert_eq!(ok("/confirm --last"), SlashCommand::Confirm);
        assert_eq!(ok("/approve"), SlashCommand::Confirm);
        assert_eq!(ok("/cancel"), SlashCommand::Cancel);
        assert_eq!(ok("/exit"), SlashCommand::Exit);
        assert_eq!(ok("/status"), SlashCommand::Status);
        assert_eq!(ok("/help"), SlashCommand::Help);
    }

    #[test]
    fn reset_reads_hard_flag() {
        assert_eq!(ok("/reset"), SlashCommand::Reset { hard: false });
        assert_eq!(ok("/reset --hard"), SlashCommand::Reset { hard: true });
    }

    #[test]
    fn dir_keeps_spaces_in_paths() {
        assert_eq!(ok("/dir"), SlashCommand::Dir { set: None });
        assert_eq!(
            ok("/dir set /work/my project"),
            SlashCommand::Dir {
                set: Some("/work/my project".to_string())
            }
        );
        assert_eq!(
            parse("/dir set"),
            Some(CommandParse::Usage("usage: /dir or /dir set <path>"))
        );
    }

    #[test]
    fn model_parses_global_flag() {
        assert_eq!(
            ok("/model"),
            SlashCommand::Model {
                set: None,
                global: false
            }
        );
        assert_eq!(
            ok("/model set o4-mini"),
            SlashCommand::Model {
                set: Some("o4-mini".to_string()),
                global: false
            }
        );
        assert_eq!(
            ok("/model set --global o4-mini"),
            SlashCommand::Model {
                set: Some("o4-mini".to_string()),
                global: true
            }
        );
        assert!(matches!(
            parse("/model set"),
            Some(CommandParse::Usage(_))
        ));
    }

    #[test]
    fn cli_access_flags_parse() {
        assert_eq!(ok("/cli"), SlashCommand::Cli { access: None });
        assert_eq!(
            ok("/cli --write"),
            SlashCommand::Cli {
                access: Some(CliAccess::Write)
            }
        );
        assert_eq!(
            ok("/cli --safe"),
            SlashCommand::Cli {
                access: Some(CliAccess::Safe)
            }
        );
        assert!(matches!(parse("/cli --both"), Some(CommandParse::Usage(_))));
    }

    #[test]
    fn plugin_governance_parses() {
        assert_eq!(
            ok("/plugin enable codex"),
            SlashCommand::Plugin {
                enable: true,
                name: "codex".to_string()
            }
        );
        assert_eq!(
            ok("/plugin disable Codex"),
            SlashCommand::Plugin {
                enable: false,
                name: "codex".to_string()
            }
        );
        assert!(matches!(parse("/plugin codex"), Some(CommandParse::Usage(_))));
    }

    #[test]
    fn resume_and_use_take_one_argument() {
        assert_eq!(
            ok("/resume sess-42"),
            SlashCommand::Resume {
                session_id: "sess-42".to_string()
            }
        );
        assert_eq!(
            ok("/use Codex"),
            SlashCommand::Use {
                plugin: "codex".to_string()
            }
        );
        assert!(matches!(parse("/resume"), Some(CommandParse::Usage(_))));
        assert!(matches!(parse("/use"), Some(CommandParse::Usage(_))));
    }

    #[test]
    fn head_is_case_insensitive_and_unknowns_surface() {
        assert_eq!(ok("/STATUS"), SlashCommand::Status);
        assert_eq!(
            parse("/frobnicate now"),
            Some(CommandParse::Unknown("/frobnicate".to_string()))
        );
    }
}
