//! REPL mode (interactive shell)
//!
//! Lines are read with rustyline on the main thread and executed by the
//! [`Worker`]. A line ending in `:` opens a block that is submitted on the
//! next blank line.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::console;
use crate::worker::Worker;

const PROMPT: &str = ">>> ";
const CONTINUATION_PROMPT: &str = "... ";

/// Commands handled by the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Clear,
    History,
    Reset,
    Exit,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            "help" => Some(Self::Help),
            "clear" => Some(Self::Clear),
            "history" => Some(Self::History),
            "reset" => Some(Self::Reset),
            "exit" | "quit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// What the shell should do with an input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Keep reading; a block is open or the line was blank.
    Continue,
    Command(ReplCommand),
    Execute(String),
}

/// Input state of the shell: the open block and the command history.
#[derive(Debug, Default)]
pub struct ReplSession {
    block: Vec<String>,
    history: Vec<String>,
}

impl ReplSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_block(&self) -> bool {
        !self.block.is_empty()
    }

    pub fn prompt(&self) -> &'static str {
        if self.in_block() {
            CONTINUATION_PROMPT
        } else {
            PROMPT
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Drop a partially typed block.
    pub fn discard_block(&mut self) {
        self.block.clear();
    }

    pub fn feed(&mut self, line: &str) -> Action {
        if self.in_block() {
            if line.trim().is_empty() {
                let code = self.block.join("\n");
                self.block.clear();
                self.history.push(code.clone());
                return Action::Execute(code);
            }
            self.block.push(line.trim_end().to_string());
            return Action::Continue;
        }

        let command = line.trim();
        if command.is_empty() {
            return Action::Continue;
        }
        if let Some(builtin) = ReplCommand::parse(command) {
            self.history.push(command.to_string());
            return Action::Command(builtin);
        }
        if command.ends_with(':') {
            self.block.push(line.trim_end().to_string());
            return Action::Continue;
        }
        self.history.push(command.to_string());
        Action::Execute(line.trim_end().to_string())
    }
}

/// Run the interactive shell until `exit` or end of input.
pub fn run_repl(worker: &Worker, title: &str) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;
    let mut session = ReplSession::new();

    println!("{}", title.bold());
    console::write_status("Type 'help' for available commands.");
    println!();

    loop {
        match editor.readline(session.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                match session.feed(&line) {
                    Action::Continue => {}
                    Action::Execute(code) => {
                        let result = worker.execute_line(&code)?;
                        console::write_result(&result);
                    }
                    Action::Command(ReplCommand::Exit) => break,
                    Action::Command(command) => run_command(command, &session, worker)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                session.discard_block();
                console::write_error("KeyboardInterrupt");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }

    Ok(())
}

fn run_command(command: ReplCommand, session: &ReplSession, worker: &Worker) -> Result<()> {
    match command {
        ReplCommand::Help => print_help(),
        ReplCommand::Clear => console::clear_screen(),
        ReplCommand::History => print_history(session.history()),
        ReplCommand::Reset => {
            worker.reset_session()?;
            console::write_status("Session reset.");
        }
        ReplCommand::Exit => {}
    }
    Ok(())
}

fn print_help() {
    println!();
    println!("{}", "Available commands:".bold().cyan());
    println!("  arm.turn_left(angle)   - rotate arm left");
    println!("  arm.turn_right(angle)  - rotate arm right");
    println!("  arm.grab()             - close the gripper");
    println!("  arm.release()          - open the gripper");
    println!("  arm.elbow_left(angle)  - rotate elbow left");
    println!("  arm.elbow_right(angle) - rotate elbow right");
    println!("  arm.set_angle(angle)   - set absolute angle");
    println!("  delay(seconds)         - pause execution");
    println!("  print(...)             - print a value");
    println!();
    println!("{}", "REPL commands:".bold().cyan());
    println!("  help     - show this help");
    println!("  clear    - clear the console");
    println!("  history  - show command history");
    println!("  reset    - forget all variables");
    println!("  exit     - leave the shell");
    println!();
}

fn print_history(history: &[String]) {
    if history.is_empty() {
        console::write_status("No commands in history.");
        return;
    }
    println!("{}", "Command history:".bold().cyan());
    for (i, command) in history.iter().enumerate() {
        println!("  {}. {}", i + 1, command);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands() {
        assert_eq!(ReplCommand::parse("help"), Some(ReplCommand::Help));
        assert_eq!(ReplCommand::parse("quit"), Some(ReplCommand::Exit));
        assert_eq!(ReplCommand::parse("exit"), Some(ReplCommand::Exit));
        assert_eq!(ReplCommand::parse("help()"), None);
    }

    #[test]
    fn test_single_line_executes() {
        let mut session = ReplSession::new();
        assert_eq!(
            session.feed("arm.grab()  "),
            Action::Execute("arm.grab()".to_string())
        );
        assert_eq!(session.feed("   "), Action::Continue);
        assert_eq!(session.prompt(), PROMPT);
    }

    #[test]
    fn test_block_submitted_on_blank_line() {
        let mut session = ReplSession::new();
        assert_eq!(session.feed("for i in range(2):"), Action::Continue);
        assert!(session.in_block());
        assert_eq!(session.prompt(), CONTINUATION_PROMPT);
        assert_eq!(session.feed("    arm.turn_left(10)"), Action::Continue);
        assert_eq!(session.feed("    print(i)"), Action::Continue);
        assert_eq!(
            session.feed(""),
            Action::Execute("for i in range(2):\n    arm.turn_left(10)\n    print(i)".to_string())
        );
        assert!(!session.in_block());
    }

    #[test]
    fn test_commands_inside_block_are_code() {
        let mut session = ReplSession::new();
        session.feed("if True:");
        assert_eq!(session.feed("    help"), Action::Continue);
        assert_eq!(
            session.feed(""),
            Action::Execute("if True:\n    help".to_string())
        );
    }

    #[test]
    fn test_history_is_numbered_in_order() {
        let mut session = ReplSession::new();
        session.feed("x = 1");
        session.feed("history");
        session.feed("def f():");
        session.feed("    return x");
        session.feed("");
        assert_eq!(
            session.history(),
            &["x = 1", "history", "def f():\n    return x"]
        );
    }

    #[test]
    fn test_discard_block() {
        let mut session = ReplSession::new();
        session.feed("while True:");
        session.discard_block();
        assert!(!session.in_block());
        assert!(session.history().is_empty());
    }
}
