//! Interactive input for training gestures.
//!
//! Runs on its own thread next to the capture loop and only writes the shared
//! mode cell. Type a class digit and Enter to hold it, Enter on an empty line
//! to release. `/help` lists the commands.

use std::sync::Arc;
use std::thread::JoinHandle;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use teachable_vision::{KeyMap, Label, Mode, ModeCell};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/train", "Hold a class (same as typing its digit)"),
    ("/idle", "Release the held class (same as an empty line)"),
    ("/mode", "Show the current mode"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit"),
];

/// A parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Hold(Label),
    Release,
    ShowMode,
    Help,
    Clear,
    Exit,
    Invalid(String),
}

/// Parse one line. Bare digits and empty lines mirror key-down and key-up.
pub fn parse_line(line: &str, keys: &KeyMap) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Release;
    }

    let mut chars = line.chars();
    if let (Some(key), None) = (chars.next(), chars.next()) {
        if key.is_ascii_digit() {
            return match keys.label_for(key) {
                Some(label) => ReplCommand::Hold(label),
                None => ReplCommand::Invalid(format!(
                    "No class for key '{key}'. Use 1-{}.",
                    keys.num_classes()
                )),
            };
        }
    }

    let input = line.strip_prefix('/').unwrap_or(line);
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    match cmd {
        "train" | "t" => {
            let key = args.chars().next();
            match key.filter(|_| args.len() == 1).and_then(|k| keys.label_for(k)) {
                Some(label) => ReplCommand::Hold(label),
                None => ReplCommand::Invalid(format!(
                    "Usage: /train <1-{}>",
                    keys.num_classes()
                )),
            }
        }
        "idle" | "release" => ReplCommand::Release,
        "mode" | "status" => ReplCommand::ShowMode,
        "help" | "h" | "?" => ReplCommand::Help,
        "clear" | "cls" => ReplCommand::Clear,
        "exit" | "quit" => ReplCommand::Exit,
        _ => ReplCommand::Invalid(format!(
            "Unknown command '/{cmd}'. Type /help for commands."
        )),
    }
}

/// Apply a mode-changing command. Returns `false` for commands that leave it alone.
pub fn apply(command: &ReplCommand, mode: &ModeCell) -> bool {
    match command {
        ReplCommand::Hold(label) => {
            mode.set(Mode::Training(*label));
            true
        }
        ReplCommand::Release => {
            mode.set(Mode::Idle);
            true
        }
        _ => false,
    }
}

/// REPL helper for tab completion.
struct ModeHelper;

impl Completer for ModeHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        if input.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| Pair {
                display: format!("{cmd:<10} {desc}"),
                replacement: format!("{cmd} "),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for ModeHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for ModeHelper {}
impl Validator for ModeHelper {}
impl Helper for ModeHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// How an input session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// The user asked to quit.
    Quit,
    /// Stdin closed. The capture loop keeps running idle.
    EndOfInput,
}

/// Process exit code for a finished input session, if it should end the process.
///
/// Only an explicit quit or a REPL failure stops the process; end of input
/// leaves the capture loop running.
pub fn exit_code(outcome: &anyhow::Result<ReplExit>) -> Option<i32> {
    match outcome {
        Ok(ReplExit::Quit) => Some(0),
        Ok(ReplExit::EndOfInput) => None,
        Err(_) => Some(1),
    }
}

/// Start the REPL on a dedicated thread.
///
/// `/exit` ends the whole process: the capture loop has no other stop signal.
pub fn spawn(mode: Arc<ModeCell>, keys: KeyMap) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            let outcome = run(&mode, keys);
            match &outcome {
                Ok(ReplExit::EndOfInput) => {
                    tracing::info!("Input closed, predicting without training")
                }
                Ok(ReplExit::Quit) => {}
                Err(e) => tracing::error!("Input REPL failed: {e}"),
            }
            if let Some(code) = exit_code(&outcome) {
                std::process::exit(code);
            }
        })
}

/// Handle one `readline` result. `Some` ends the session.
pub fn handle_input(
    input: Result<String, ReadlineError>,
    mode: &ModeCell,
    keys: &KeyMap,
) -> Result<Option<ReplExit>, ReadlineError> {
    let line = match input {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) => {
            mode.set(Mode::Idle);
            eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            return Ok(None);
        }
        Err(ReadlineError::Eof) => {
            mode.set(Mode::Idle);
            return Ok(Some(ReplExit::EndOfInput));
        }
        Err(err) => {
            mode.set(Mode::Idle);
            return Err(err);
        }
    };

    let command = parse_line(&line, keys);
    if apply(&command, mode) {
        return Ok(None);
    }
    match command {
        ReplCommand::ShowMode => cmd_mode(mode),
        ReplCommand::Help => cmd_help(),
        ReplCommand::Clear => eprint!("\x1b[2J\x1b[H"),
        ReplCommand::Exit => {
            mode.set(Mode::Idle);
            eprintln!("  Goodbye!");
            return Ok(Some(ReplExit::Quit));
        }
        ReplCommand::Invalid(msg) => eprintln!("  {msg}"),
        ReplCommand::Hold(_) | ReplCommand::Release => {}
    }
    Ok(None)
}

/// Run the interactive REPL until `/exit` or end of input.
pub fn run(mode: &ModeCell, keys: KeyMap) -> anyhow::Result<ReplExit> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mteachable-vision v{}\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Type \x1b[36m1\x1b[0m-\x1b[36m{}\x1b[0m + Enter to teach a class, Enter again to stop, \x1b[90m/exit\x1b[0m to quit.",
        keys.num_classes()
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ModeHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ModeHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    loop {
        let prompt = match mode.get() {
            Mode::Idle => " \x1b[36mteach>\x1b[0m ".to_string(),
            Mode::Training(label) => format!(" \x1b[33mteach[{}]>\x1b[0m ", label.index() + 1),
        };

        if let Some(exit) = handle_input(rl.readline(&prompt), mode, &keys)? {
            return Ok(exit);
        }
    }
}

fn cmd_mode(mode: &ModeCell) {
    match mode.get() {
        Mode::Idle => eprintln!("  Idle"),
        Mode::Training(label) => eprintln!("  Training class {}", label.index() + 1),
    }
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    eprintln!("    <digit>    Hold that class");
    eprintln!("    <enter>    Release");
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<10} {desc}");
    }
    eprintln!();
}
