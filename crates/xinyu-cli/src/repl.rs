//! Interactive chat loop.
//!
//! Lines starting with `/` are commands; anything else is sent to the
//! assistant. Sends run in the background so the prompt is available again
//! immediately; replies and translations are printed by an event task.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::str::FromStr;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use xinyu_application::{ConversationController, ConversationEvent, SendOutcome};
use xinyu_core::{MessageRole, SendRejection, TargetLanguage};

use crate::render;

const COMMANDS: &[&str] = &[
    "/new",
    "/end",
    "/translate",
    "/lang",
    "/history",
    "/detect",
    "/health",
    "/help",
];

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    NewSession,
    EndSession,
    ToggleTranslation,
    SetLanguage(TargetLanguage),
    History,
    Detect(String),
    Health,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return Self::Quit;
        }
        if !trimmed.starts_with('/') {
            return Self::Send(line.to_string());
        }

        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (trimmed, ""),
        };

        match command {
            "/new" => Self::NewSession,
            "/end" => Self::EndSession,
            "/translate" => Self::ToggleTranslation,
            "/lang" => match TargetLanguage::from_str(arg) {
                Ok(language) => Self::SetLanguage(language),
                Err(_) => Self::Invalid(format!(
                    "Unknown language '{arg}', expected auto, zh-CN or en"
                )),
            },
            "/history" => Self::History,
            "/detect" if !arg.is_empty() => Self::Detect(arg.to_string()),
            "/detect" => Self::Invalid("Usage: /detect <text>".to_string()),
            "/health" => Self::Health,
            "/help" => Self::Help,
            other => Self::Invalid(format!("Unknown command: {other}")),
        }
    }
}

/// rustyline helper providing slash-command completion, hints and highlighting.
#[derive(Clone)]
struct CliHelper;

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
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
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
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}

/// Runs the REPL until `quit` or EOF.
pub async fn run(controller: ConversationController) -> Result<()> {
    let printer = tokio::spawn(print_events(controller.clone()));

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", render::banner());
    println!();
    print_thread(&controller).await;

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let command = ReplCommand::parse(&line);
                if command != ReplCommand::Empty {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if !handle(&controller, command).await {
                    println!("{}", "再见，照顾好自己 💙".bright_green());
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    printer.abort();
    Ok(())
}

/// Executes one command. Returns `false` when the loop should stop.
async fn handle(controller: &ConversationController, command: ReplCommand) -> bool {
    match command {
        ReplCommand::Quit => return false,
        ReplCommand::Empty => {}
        ReplCommand::Send(text) => {
            spawn_send(controller, text);
        }
        ReplCommand::NewSession => {
            if let Err(err) = controller.new_session().await {
                tracing::debug!("New session failed: {}", err);
            }
        }
        ReplCommand::EndSession => {
            if let Err(err) = controller.end_session().await {
                tracing::debug!("End session failed: {}", err);
            }
        }
        ReplCommand::ToggleTranslation => {
            let toggle = controller.toggle_translation().await;
            if toggle.enabled {
                // Cached translations show immediately, the rest arrive as events.
                print_thread(controller).await;
            }
        }
        ReplCommand::SetLanguage(language) => controller.set_target_language(language).await,
        ReplCommand::History => print_thread(controller).await,
        ReplCommand::Detect(text) => match controller.detect_language(&text).await {
            Ok(language) => println!("{}", format!("detected: {language}").yellow()),
            Err(err) => eprintln!("{}", format!("Language detection failed: {err}").red()),
        },
        ReplCommand::Health => match controller.check_health().await {
            Ok(health) if health.is_ok() => println!("{}", health.message.bright_green()),
            Ok(health) => println!("{}", format!("{}: {}", health.status, health.message).yellow()),
            Err(err) => eprintln!("{}", format!("Backend unreachable: {err}").red()),
        },
        ReplCommand::Help => println!("{}", render::help()),
        ReplCommand::Invalid(message) => println!("{}", message.bright_black()),
    }
    true
}

/// Sends `text` in the background. The line travels with its task, so lines
/// typed while a reply is pending are rejected as busy instead of overwriting
/// each other.
fn spawn_send(controller: &ConversationController, text: String) -> JoinHandle<SendOutcome> {
    let controller = controller.clone();
    tokio::spawn(async move {
        let outcome = controller.send_message(&text).await;
        match &outcome {
            SendOutcome::Ignored(SendRejection::Busy) => {
                println!("{}", "心语还在回复上一条消息，请稍等…".yellow());
            }
            SendOutcome::Failed { error, .. } => {
                tracing::debug!("Send failed: {}", error);
            }
            _ => {}
        }
        outcome
    })
}

async fn print_thread(controller: &ConversationController) {
    let state = controller.snapshot().await;
    println!("{}", render::format_settings(&state.settings()));
    for (index, message) in state.messages().iter().enumerate() {
        println!("{}", render::format_message(message));
        if let Some(entry) = state.visible_translation(index) {
            println!("{}", render::format_translation(entry));
        }
    }
}

/// Prints assistant replies, translations and session resets as they happen.
async fn print_events(controller: ConversationController) {
    let mut events = controller.subscribe();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Event printer lagged, {} events skipped", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            ConversationEvent::MessageAppended { message, .. } => {
                // The user's own line is already on screen.
                if message.role == MessageRole::Assistant {
                    println!("{}", render::format_message(&message));
                }
            }
            ConversationEvent::TranslationUpdated { index, .. } => {
                if let Some(entry) = controller.translation_for(index).await {
                    println!(
                        "{} {}",
                        format!("#{index}").bright_black(),
                        render::format_translation(&entry).trim_start()
                    );
                }
            }
            ConversationEvent::SessionReset { .. } => print_thread(&controller).await,
            ConversationEvent::BusyChanged(true) => {
                println!("{}", "心语正在输入…".bright_black());
            }
            ConversationEvent::BusyChanged(false) => {}
            ConversationEvent::TranslationSettingsChanged(settings) => {
                println!("{}", render::format_settings(&settings));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use xinyu_core::{
        ChatBackend, ChatReply, HealthStatus, Result, TranslationResult, TranslationSettings,
    };

    // Backend whose chat requests never complete
    #[derive(Default)]
    struct StalledBackend {
        chat_calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ChatBackend for StalledBackend {
        async fn chat(&self, message: &str, _session_id: &str) -> Result<ChatReply> {
            self.chat_calls.lock().unwrap().push(message.to_string());
            std::future::pending().await
        }

        async fn new_session(&self) -> Result<String> {
            Ok("session-2".to_string())
        }

        async fn translate(
            &self,
            text: &str,
            _target: TargetLanguage,
        ) -> Result<TranslationResult> {
            Ok(TranslationResult {
                translated_text: text.to_string(),
                source_lang: "zh-CN".to_string(),
                target_lang: "en".to_string(),
                skipped: false,
            })
        }

        async fn delete_session(&self, _session_id: &str) -> Result<()> {
            Ok(())
        }

        async fn detect_language(&self, _text: &str) -> Result<String> {
            Ok("zh-CN".to_string())
        }

        async fn health(&self) -> Result<HealthStatus> {
            Ok(HealthStatus {
                status: "ok".to_string(),
                message: String::new(),
            })
        }
    }

    fn stalled_controller() -> (Arc<StalledBackend>, ConversationController) {
        let backend = Arc::new(StalledBackend::default());
        let controller =
            ConversationController::new(backend.clone(), TranslationSettings::default());
        (backend, controller)
    }

    async fn user_messages(controller: &ConversationController) -> Vec<String> {
        controller
            .snapshot()
            .await
            .messages()
            .iter()
            .filter(|message| message.role == MessageRole::User)
            .map(|message| message.content.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_back_to_back_lines_keep_the_first() {
        let (backend, controller) = stalled_controller();

        assert!(handle(&controller, ReplCommand::Send("first".to_string())).await);
        assert!(handle(&controller, ReplCommand::Send("second".to_string())).await);
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }

        assert_eq!(*backend.chat_calls.lock().unwrap(), vec!["first".to_string()]);
        assert_eq!(user_messages(&controller).await, vec!["first".to_string()]);
        assert!(controller.snapshot().await.is_busy());
    }

    #[tokio::test]
    async fn test_line_sent_while_waiting_is_busy() {
        let (_backend, controller) = stalled_controller();

        let first = spawn_send(&controller, "first".to_string());
        let second = spawn_send(&controller, "second".to_string());

        assert!(matches!(
            second.await.unwrap(),
            SendOutcome::Ignored(SendRejection::Busy)
        ));
        assert_eq!(user_messages(&controller).await, vec!["first".to_string()]);
        first.abort();
    }

    #[tokio::test]
    async fn test_line_is_sent_as_typed() {
        let (backend, controller) = stalled_controller();

        let _pending = spawn_send(&controller, "  我有点难过  ".to_string());
        while backend.chat_calls.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        assert_eq!(user_messages(&controller).await, vec!["  我有点难过  ".to_string()]);
    }

    #[test]
    fn test_plain_text_is_sent_untrimmed() {
        assert_eq!(
            ReplCommand::parse("  我有点难过  "),
            ReplCommand::Send("  我有点难过  ".to_string())
        );
    }

    #[test]
    fn test_blank_and_quit() {
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("exit"), ReplCommand::Quit);
    }

    #[test]
    fn test_language_command() {
        assert_eq!(
            ReplCommand::parse("/lang zh-CN"),
            ReplCommand::SetLanguage(TargetLanguage::ZhCn)
        );
        assert_eq!(
            ReplCommand::parse("/lang auto"),
            ReplCommand::SetLanguage(TargetLanguage::Auto)
        );
        assert!(matches!(ReplCommand::parse("/lang fr"), ReplCommand::Invalid(_)));
        assert!(matches!(ReplCommand::parse("/lang"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_detect_requires_text() {
        assert_eq!(
            ReplCommand::parse("/detect 谢谢 你"),
            ReplCommand::Detect("谢谢 你".to_string())
        );
        assert!(matches!(ReplCommand::parse("/detect"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_session_and_translation_commands() {
        assert_eq!(ReplCommand::parse("/new"), ReplCommand::NewSession);
        assert_eq!(ReplCommand::parse("/end"), ReplCommand::EndSession);
        assert_eq!(ReplCommand::parse("/translate"), ReplCommand::ToggleTranslation);
        assert!(matches!(ReplCommand::parse("/nope"), ReplCommand::Invalid(_)));
    }
}
