//! Exit tokens and slash commands for the chat application.
//!
//! A line that is an exit token ends the conversation without a request.  A
//! line starting with `/` controls the session and is never sent to the
//! provider.  Everything else is a user message.

use crate::types::ReasoningFormat;

/// Words that end the conversation when typed on their own.
pub const EXIT_TOKENS: &[&str] = &["exit", "leave", "stop"];

/// Returns true if `input` is an exit token, ignoring case and surrounding whitespace.
pub fn is_exit_token(input: &str) -> bool {
    let input = input.trim();
    EXIT_TOKENS
        .iter()
        .any(|token| input.eq_ignore_ascii_case(token))
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start over with only the system prompt.
    Clear,

    /// Change the model.
    Model(String),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Add a stop sequence.
    AddStopSequence(String),

    /// Clear all stop sequences.
    ClearStopSequences,

    /// List stop sequences.
    ListStopSequences,

    /// Set the reasoning format.
    Reasoning(ReasoningFormat),

    /// Toggle streaming.
    Stream(bool),

    /// Toggle markup stripping.
    Sanitize(bool),

    /// Set the auto-save transcript path.
    TranscriptPath(String),

    /// Clear the auto-save transcript path.
    ClearTranscriptPath,

    /// Save the transcript to a specific file immediately.
    SaveTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use chatline::commands::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model qwen/qwen3-32b").is_some());
/// assert!(parse_command("Where is my order?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let command_line = input.trim().strip_prefix('/')?;

    let (command, argument) = match command_line.split_once(' ') {
        Some((command, argument)) => (command, Some(argument.trim())),
        None => (command_line, None),
    };
    let command = command.to_lowercase();
    let argument = argument.filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "reset" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "max_tokens" => match argument.map(str::parse::<u32>) {
            Some(Ok(value)) if value > 0 => ChatCommand::MaxTokens(value),
            Some(_) => ChatCommand::Invalid("/max_tokens expects a positive integer".to_string()),
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "temperature" => match argument {
            Some(arg) => match parse_f32_in_range(arg, 0.0, 2.0) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "stop" => parse_stop_command(argument),
        "reasoning" => match argument.map(str::parse::<ReasoningFormat>) {
            Some(Ok(format)) => ChatCommand::Reasoning(format),
            Some(Err(err)) => ChatCommand::Invalid(err),
            None => ChatCommand::Invalid(
                "/reasoning expects 'hidden', 'raw', or 'parsed'".to_string(),
            ),
        },
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "sanitize" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Sanitize(value),
            None => ChatCommand::Invalid("/sanitize expects 'on' or 'off'".to_string()),
        },
        "transcript" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTranscriptPath,
            Some(arg) => ChatCommand::TranscriptPath(arg.to_string()),
            None => ChatCommand::Invalid("/transcript requires a file path".to_string()),
        },
        "save" => match argument {
            Some(arg) => ChatCommand::SaveTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_stop_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid(
            "/stop requires 'add <sequence>', 'clear', or 'list'".to_string(),
        );
    };

    let (action, rest) = arg.split_once(' ').unwrap_or((arg, ""));
    match action.to_lowercase().as_str() {
        "add" => {
            let sequence = rest.trim();
            if sequence.is_empty() {
                return ChatCommand::Invalid("/stop add requires a sequence".to_string());
            }
            ChatCommand::AddStopSequence(sequence.to_string())
        }
        "clear" => ChatCommand::ClearStopSequences,
        "list" => ChatCommand::ListStopSequences,
        _ => {
            ChatCommand::Invalid("Unrecognized /stop action (use add, clear, or list)".to_string())
        }
    }
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() && parsed >= min && parsed <= max => Ok(parsed),
        _ => Err(format!("expects a value between {min} and {max}")),
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Type a message to chat; type exit, leave, or stop to end the conversation.

Available commands:
  /clear                 Start over, keeping the system prompt
  /model <name>          Change the model (e.g., /model qwen/qwen3-32b)
  /max_tokens <n>        Set maximum response tokens
  /temperature <v>       Set temperature 0.0-2.0
  /stop add <seq>        Add a stop sequence
  /stop clear            Clear all stop sequences
  /stop list             List current stop sequences
  /reasoning <format>    Set reasoning format: hidden, raw, parsed
  /stream on|off         Stream replies or wait for them whole
  /sanitize on|off       Strip <...> markup from streamed replies
  /transcript <file>     Enable auto-saving transcripts (or 'clear')
  /save <file>           Save the current transcript immediately
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_tokens() {
        assert!(is_exit_token("exit"));
        assert!(is_exit_token("EXIT"));
        assert!(is_exit_token("Stop"));
        assert!(is_exit_token("  leave \n"));
        assert!(!is_exit_token("exit now"));
        assert!(!is_exit_token("/exit"));
        assert!(!is_exit_token("stopping"));
        assert!(!is_exit_token(""));
    }

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model qwen/qwen3-32b"),
            Some(ChatCommand::Model("qwen/qwen3-32b".to_string()))
        );
        assert_eq!(
            parse_command("/model   llama-3.1-8b-instant  "),
            Some(ChatCommand::Model("llama-3.1-8b-instant".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_max_tokens() {
        assert_eq!(
            parse_command("/max_tokens 256"),
            Some(ChatCommand::MaxTokens(256))
        );
        assert!(matches!(
            parse_command("/max_tokens 0"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("positive")
        ));
        assert!(matches!(
            parse_command("/max_tokens"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_temperature() {
        assert_eq!(
            parse_command("/temperature 0.5"),
            Some(ChatCommand::Temperature(0.5))
        );
        assert_eq!(
            parse_command("/temperature 1.8"),
            Some(ChatCommand::Temperature(1.8))
        );
        assert!(matches!(
            parse_command("/temperature 2.5"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("between")
        ));
        assert!(matches!(
            parse_command("/temperature"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_stop_commands() {
        assert_eq!(
            parse_command("/stop add END"),
            Some(ChatCommand::AddStopSequence("END".to_string()))
        );
        assert_eq!(
            parse_command("/stop add two words"),
            Some(ChatCommand::AddStopSequence("two words".to_string()))
        );
        assert_eq!(
            parse_command("/stop clear"),
            Some(ChatCommand::ClearStopSequences)
        );
        assert_eq!(
            parse_command("/stop list"),
            Some(ChatCommand::ListStopSequences)
        );
        assert!(matches!(
            parse_command("/stop add"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(parse_command("/stop"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn parse_toggles() {
        assert_eq!(
            parse_command("/reasoning parsed"),
            Some(ChatCommand::Reasoning(ReasoningFormat::Parsed))
        );
        assert!(matches!(
            parse_command("/reasoning loud"),
            Some(ChatCommand::Invalid(_))
        ));
        assert_eq!(parse_command("/stream off"), Some(ChatCommand::Stream(false)));
        assert_eq!(parse_command("/sanitize on"), Some(ChatCommand::Sanitize(true)));
        assert!(matches!(
            parse_command("/stream maybe"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn parse_transcript_commands() {
        assert_eq!(
            parse_command("/transcript chat.json"),
            Some(ChatCommand::TranscriptPath("chat.json".to_string()))
        );
        assert_eq!(
            parse_command("/transcript clear"),
            Some(ChatCommand::ClearTranscriptPath)
        );
        assert_eq!(
            parse_command("/save session.json"),
            Some(ChatCommand::SaveTranscript("session.json".to_string()))
        );
    }

    #[test]
    fn parse_stats_and_config() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert!(matches!(
            parse_command("/bogus"),
            Some(ChatCommand::Invalid(msg)) if msg == "Unknown command: /bogus"
        ));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Where is my order?"), None);
        assert_eq!(parse_command("exit"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/model"));
        assert!(help.contains("/temperature"));
        assert!(help.contains("leave"));
    }
}
