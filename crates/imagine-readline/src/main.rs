use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use imagine_application::{ChatSetup, ChatSetupService, SessionHandle, SessionRegistry, ShareService};
use imagine_core::config::AppConfig;
use imagine_core::session::{OutputSink, SessionNotice};
use imagine_infrastructure::{ConfigStorage, HtmlTranscriptPersister, ImaginePaths};
use imagine_interaction::OpenAiChatClient;

type ChatEditor = Editor<CliHelper, DefaultHistory>;

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/share".to_string(),
                "/transcript".to_string(),
                "/quit".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Prints chat entries as the session appends them.
struct ConsoleSink {
    human_name: String,
}

impl OutputSink for ConsoleSink {
    fn emit(&self, speaker: &str, text: &str) {
        if speaker.is_empty() {
            println!("{}", text.bright_yellow());
        } else if speaker == self.human_name {
            println!("{}", format!("{speaker}: {text}").green());
        } else {
            println!("{} {}", format!("{speaker}:").bright_magenta(), text.bright_blue());
        }
    }

    fn notify(&self, notice: &SessionNotice) {
        match notice {
            SessionNotice::TurnSkipped { agent, reason } => {
                println!("{}", format!("({agent} stayed quiet: {reason})").bright_black());
            }
            SessionNotice::ReplyDiscarded { agent } => {
                println!("{}", format!("({agent}'s reply arrived after the chat closed)").bright_black());
            }
            SessionNotice::PersistenceFailed { reason } => {
                eprintln!("{}", format!("Could not save the transcript: {reason}").red());
            }
        }
    }
}

/// Routes logs to a daily rolling file.
///
/// `RUST_LOG` takes precedence over the configured filter.
fn init_tracing(config: &AppConfig) -> Result<WorkerGuard> {
    let directory = match &config.logging.directory {
        Some(dir) => dir.clone(),
        None => ImaginePaths::logs_dir()?,
    };
    let file_appender = tracing_appender::rolling::daily(directory, "imagine-chat.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

/// Reads one trimmed line. `None` means the user wants to leave.
fn prompt(rl: &mut ChatEditor, text: &str) -> Result<Option<String>> {
    loop {
        match rl.readline(text) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);
                return Ok(Some(trimmed.to_string()));
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
            Err(err) => return Err(err.into()),
        }
    }
}

/// Resolves a selection like `1, 3 4` against `names`.
///
/// Unknown numbers are ignored. Anything that is not a number is taken as a
/// character name of its own (`1,3,Newman`).
fn parse_selection(input: &str, names: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for token in input.split(',').flat_map(|part| {
        let part = part.trim();
        if part.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
            part.split_whitespace().collect::<Vec<_>>()
        } else {
            vec![part]
        }
    }) {
        let name = match token.parse::<usize>() {
            Ok(n) if (1..=names.len()).contains(&n) => names[n - 1].clone(),
            Ok(_) => continue,
            Err(_) => token.to_string(),
        };
        if !name.is_empty() && !selected.contains(&name) {
            selected.push(name);
        }
    }
    selected
}

/// Resolves the human's own character: a number from `names` or a free name.
fn parse_own_character(input: &str, names: &[String]) -> String {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=names.len()).contains(&n) => names[n - 1].clone(),
        _ => input.trim().to_string(),
    }
}

/// Walks the user through context, cast and own character.
///
/// Returns `None` if the user left before the chat started.
async fn setup_chat(rl: &mut ChatEditor, setup_service: &ChatSetupService) -> Result<Option<ChatSetup>> {
    loop {
        let Some(context) = prompt(rl, "Context (e.g. Seinfeld)> ")? else {
            return Ok(None);
        };

        println!("{}", "Thinking of characters...".bright_black());
        let names = match setup_service.suggest_characters(&context).await {
            Ok(names) if !names.is_empty() => names,
            Ok(_) => {
                println!("{}", "No characters came to mind. Try another context.".yellow());
                continue;
            }
            Err(e) => {
                eprintln!("{}", format!("Could not suggest characters: {e}").red());
                continue;
            }
        };

        for (i, name) in names.iter().enumerate() {
            println!("  {} {}", format!("{:>2}.", i + 1).bright_black(), name);
        }

        let Some(selection) = prompt(rl, "Characters in the chat (e.g. 1,3,4)> ")? else {
            return Ok(None);
        };
        let characters = parse_selection(&selection, &names);
        if characters.is_empty() {
            println!("{}", "Pick at least one character.".yellow());
            continue;
        }

        let Some(own) = prompt(rl, "Who are you playing? (number or name)> ")? else {
            return Ok(None);
        };

        return Ok(Some(ChatSetup {
            context,
            characters,
            human_name: parse_own_character(&own, &names),
        }));
    }
}

async fn show_transcript(handle: &SessionHandle) {
    match handle.export_transcript().await {
        Ok(lines) => {
            println!("{}", format!("--- {} ---", handle.context_label()).bright_black());
            for line in lines {
                println!("{}", line.render());
            }
            println!("{}", "---".bright_black());
        }
        Err(e) => eprintln!("{}", format!("Error: {e}").red()),
    }
}

async fn share_chat(handle: &SessionHandle, share_service: &ShareService, sink: &ConsoleSink) {
    match share_service.share(handle).await {
        Ok(receipt) => {
            println!("{}", format!("Transcript saved to {}", receipt.location.file.display()).green());
            println!("{} {}", "Page:".bright_black(), receipt.page_url);
            println!("{} {}", "Share:".bright_black(), receipt.share_link);
        }
        Err(e) => sink.notify(&SessionNotice::PersistenceFailed {
            reason: e.to_string(),
        }),
    }
}

/// The entry point of the Imagine Chat terminal front-end.
///
/// Sets up the chat interactively, then forwards every line the human types
/// to the session and prints the replies as they are appended.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration =====
    let config = ConfigStorage::new()?.load()?;
    let _log_guard = init_tracing(&config)?;
    info!(model = %config.generation.model, "Imagine Chat starting");

    let client = Arc::new(
        OpenAiChatClient::try_from_env(&config).context("An OpenAI API key is required")?,
    );
    let registry = Arc::new(SessionRegistry::with_idle_timeout(config.registry.idle_timeout()));
    let setup_service = ChatSetupService::new(client.clone(), client, registry.clone())
        .with_scheduler_config(config.scheduler.clone())
        .with_reply_timeout(config.generation.request_timeout());

    let transcript_dir = match &config.share.transcript_dir {
        Some(dir) => dir.clone(),
        None => ImaginePaths::transcripts_dir()?,
    };
    let share_service = ShareService::new(
        Arc::new(HtmlTranscriptPersister::new(transcript_dir)),
        &config.share,
    );

    // ===== REPL Setup =====
    let mut rl: ChatEditor = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Imagine Chat ===".bright_magenta().bold());
    println!("{}", "Chat with your favorite characters from any show, book or era.".bright_black());
    println!();

    let Some(setup) = setup_chat(&mut rl, &setup_service).await? else {
        println!("{}", "Goodbye!".bright_green());
        return Ok(());
    };

    let human_name = setup.human_name.trim().to_string();
    let sink = Arc::new(ConsoleSink {
        human_name: human_name.clone(),
    });
    println!();
    let handle = setup_service.start_chat(setup, sink.clone()).await?;

    println!(
        "{}",
        "Type to chat. '/transcript' shows the chat so far, '/share' saves it, '/quit' leaves."
            .bright_black()
    );

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(&format!("{human_name}> "));

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match trimmed {
                    "/quit" | "quit" | "exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    "/transcript" => show_transcript(&handle).await,
                    "/share" => share_chat(&handle, &share_service, &sink).await,
                    text => match handle.receive(&human_name, text).await {
                        Ok(report) if report.replied.is_empty() && report.skipped.is_empty() => {
                            println!("{}", "(nobody answered)".bright_black());
                        }
                        Ok(_) => {}
                        Err(e) if e.is_closed() => {
                            eprintln!("{}", "The chat has ended.".yellow());
                            break;
                        }
                        Err(e) => eprintln!("{}", format!("Error: {e}").red()),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    handle.close();
    registry.close_all().await;
    info!(session_id = handle.id(), "Chat closed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["Jerry Seinfeld", "George Costanza", "Elaine Benes", "Cosmo Kramer"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_parse_selection_by_number() {
        assert_eq!(
            parse_selection("1, 3 4", &names()),
            vec!["Jerry Seinfeld", "Elaine Benes", "Cosmo Kramer"]
        );
    }

    #[test]
    fn test_parse_selection_ignores_out_of_range_and_repeats() {
        assert_eq!(parse_selection("0,2,2,9", &names()), vec!["George Costanza"]);
    }

    #[test]
    fn test_parse_selection_accepts_free_names() {
        assert_eq!(
            parse_selection("2, Newman", &names()),
            vec!["George Costanza", "Newman"]
        );
    }

    #[test]
    fn test_parse_own_character() {
        assert_eq!(parse_own_character("1", &names()), "Jerry Seinfeld");
        assert_eq!(parse_own_character(" Newman ", &names()), "Newman");
        assert_eq!(parse_own_character("7", &names()), "7");
    }
}
