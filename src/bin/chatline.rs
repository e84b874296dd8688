//! Interactive chat application for hosted chat-completion endpoints.
//!
//! This binary provides a REPL that sends the whole conversation with every
//! message and prints the reply as it streams in.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings (reads GROQ_API_KEY)
//! chatline
//!
//! # Specify a model
//! chatline --model qwen/qwen3-32b --reasoning parsed
//!
//! # Keep an audit log and resume an earlier conversation
//! chatline --log chat.log --resume chat.json --transcript chat.json
//!
//! # Disable colors (useful for piping output)
//! chatline --no-color
//! ```
//!
//! Type `exit`, `leave` or `stop` to end the conversation, or `/help` for
//! the slash commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use chatline::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, CompletionProvider, FileAuditLog, Groq,
    PlainTextRenderer, Renderer, Reply, Transcript, help_text, is_exit_token, parse_command,
};

/// Main entry point for the chatline application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatline [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let client = Groq::with_options(None, config.base_url.clone(), config.request_timeout)?;
    let audit = match &config.audit_log_path {
        Some(path) => Some(Arc::new(FileAuditLog::open(path)?)),
        None => None,
    };
    let mut session = match config.resume_path.clone() {
        Some(path) => {
            let transcript = Transcript::load_from(&path)?;
            ChatSession::with_transcript(client, config, transcript)
        }
        None => ChatSession::new(client, config),
    };
    if let Some(audit) = audit {
        session = session.with_audit_log(audit);
    }

    // Flag for interrupt handling while a request or stream is in flight
    let interrupted = Arc::new(AtomicBool::new(false));
    session = session.with_interrupt(interrupted.clone());
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("chatline (model: {})", session.model());
    if session.message_count() > 1 {
        println!("Resumed {} messages.", session.message_count());
    }
    println!("Type /help for commands, exit to quit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if is_exit_token(line) {
                    println!("Goodbye!");
                    break;
                }

                if let Some(cmd) = parse_command(line) {
                    if !run_command(cmd, &mut session, &mut renderer) {
                        println!("Goodbye!");
                        break;
                    }
                    continue;
                }

                println!("Assistant:");
                interrupted.store(false, Ordering::Relaxed);
                match respond(&mut session, line, &mut renderer).await {
                    Ok(()) => {}
                    Err(e) if e.is_abort() => renderer.print_interrupted(),
                    Err(e) => renderer.print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

async fn respond<P: CompletionProvider>(
    session: &mut ChatSession<P>,
    line: &str,
    renderer: &mut PlainTextRenderer,
) -> chatline::Result<()> {
    if session.options().stream {
        session.send_streaming(line, renderer).await?;
        return Ok(());
    }
    match session.send_default(line).await? {
        Reply::Complete(completion) => {
            renderer.print_text(&completion.content);
            renderer.finish_response();
            if let Some(err) = session.take_save_error() {
                renderer.print_error(&format!("failed to save transcript: {err}"));
            }
        }
        Reply::Stream(pending) => {
            session.drain_and_commit(pending, renderer).await?;
        }
    }
    Ok(())
}

/// Applies a slash command; returns false when the user asked to quit.
fn run_command<P: CompletionProvider>(
    cmd: ChatCommand,
    session: &mut ChatSession<P>,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => return false,
        ChatCommand::Clear => {
            session.reset();
            renderer.print_info("Conversation cleared.");
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {line}");
            }
        }
        ChatCommand::Model(model_name) => {
            session.set_model(model_name.as_str().into());
            renderer.print_info(&format!("Model changed to: {model_name}"));
        }
        ChatCommand::MaxTokens(value) => match session.set_max_tokens(value) {
            Ok(()) => renderer.print_info(&format!("max_tokens set to {value}")),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Temperature(value) => match session.set_temperature(value) {
            Ok(()) => renderer.print_info(&format!("temperature set to {value:.2}")),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::AddStopSequence(sequence) => {
            match session.add_stop_sequence(sequence.clone()) {
                Ok(()) => renderer.print_info(&format!("Added stop sequence: {sequence}")),
                Err(err) => renderer.print_error(&err.to_string()),
            }
        }
        ChatCommand::ClearStopSequences => {
            session.clear_stop_sequences();
            renderer.print_info("Stop sequences cleared.");
        }
        ChatCommand::ListStopSequences => {
            print_stop_sequences(session.stop_sequences());
        }
        ChatCommand::Reasoning(format) => {
            session.set_reasoning(format);
            renderer.print_info(&format!("Reasoning format set to {format}."));
        }
        ChatCommand::Stream(stream) => {
            session.set_streaming(stream);
            if stream {
                renderer.print_info("Streaming enabled.");
            } else {
                renderer.print_info("Streaming disabled.");
            }
        }
        ChatCommand::Sanitize(sanitize) => {
            session.set_sanitize_markup(sanitize);
            if sanitize {
                renderer.print_info("Markup stripping enabled.");
            } else {
                renderer.print_info("Markup stripping disabled.");
            }
        }
        ChatCommand::TranscriptPath(path) => {
            session.set_transcript_path(Some(PathBuf::from(&path)));
            renderer.print_info(&format!("Transcript auto-save set to {path}"));
        }
        ChatCommand::ClearTranscriptPath => {
            session.set_transcript_path(None);
            renderer.print_info("Transcript auto-save disabled.");
        }
        ChatCommand::SaveTranscript(path) => match session.save_transcript_to(&path) {
            Ok(()) => renderer.print_info(&format!("Transcript saved to {path}")),
            Err(err) => renderer.print_error(&format!("Failed to save transcript: {err}")),
        },
        ChatCommand::Stats => print_stats(session),
        ChatCommand::ShowConfig => print_config(session),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn print_stats<P: CompletionProvider>(session: &ChatSession<P>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Total tokens: {} prompt / {} completion ({} requests)",
        stats.total_usage.prompt_tokens, stats.total_usage.completion_tokens, stats.total_requests
    );
    println!(
        "      Total time: {:.3}s prompt / {:.3}s completion",
        stats.total_usage.prompt_time, stats.total_usage.completion_time
    );
    match stats.last_turn_usage {
        Some(usage) => println!(
            "      Last turn: {} prompt / {} completion tokens in {:.3}s",
            usage.prompt_tokens, usage.completion_tokens, usage.total_time
        ),
        None => println!("      Last turn: (no usage reported)"),
    }
    if let Some(duration) = stats.last_turn_duration {
        println!("      Last turn took {:.3}s", duration.as_secs_f64());
    }
}

fn print_config<P: CompletionProvider>(session: &ChatSession<P>) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!("      Max tokens: {}", stats.options.max_tokens);
    println!("      Temperature: {:.2}", stats.options.temperature);
    println!("      Reasoning: {}", stats.options.reasoning);
    println!(
        "      Streaming: {}",
        if stats.options.stream { "on" } else { "off" }
    );
    println!(
        "      Markup stripping: {}",
        if stats.sanitize_markup { "on" } else { "off" }
    );
    if let Some(prompt) = stats.system_prompt.as_deref() {
        println!("      System prompt: {prompt}");
    } else {
        println!("      System prompt: (none)");
    }
    print_stop_sequences(&stats.options.stop_sequences);
    match stats.transcript_path {
        Some(ref path) => println!("      Transcript file: {}", path.display()),
        None => println!("      Transcript file: (disabled)"),
    }
}

fn print_stop_sequences(stop_sequences: &[String]) {
    if stop_sequences.is_empty() {
        println!("      Stop sequences: (none)");
    } else {
        println!("      Stop sequences:");
        for seq in stop_sequences {
            println!("        - {seq}");
        }
    }
}
