//! Interactive shell.
//!
//! A thin loop around the engine: read a line, parse it, hand JSON
//! values to the evaluator, print `show` output, report errors with
//! their code. The engine drains each cascade before the next line
//! is read, so inputs are strictly serialized.

use std::path::PathBuf;

use dpcl_engine::{Engine, EngineError};
use dpcl_types::ErrorCode;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::line::{self, LineCommand};

const PROMPT: &str = "> ";

const HELP: &str = "\
commands:
  load <path>          load a program file (replaces the current world)
  show <name-or-json>  pretty-print an entity, instance, template or frame
  help                 this summary
  exit                 leave the shell
input:
  {\"agent\": A, \"action\": E}   action request
  #tag                          agent-less world event
  any other JSON event value    fed to the evaluator as-is";

/// What the caller should do after one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// The shell: an engine plus line-editing state.
pub struct Shell {
    engine: Engine,
    history_path: Option<PathBuf>,
}

impl Shell {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            history_path: None,
        }
    }

    /// Persists line history at `path` across sessions.
    #[must_use]
    pub fn with_history(mut self, path: PathBuf) -> Self {
        self.history_path = Some(path);
        self
    }

    /// Read access to the engine, for tests.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Executes one input line.
    pub fn execute(&mut self, input: &str) -> Outcome {
        match line::parse(input) {
            LineCommand::Empty => Outcome::Continue,
            LineCommand::Quit => {
                println!("bye");
                Outcome::Quit
            }
            LineCommand::Help => {
                println!("{HELP}");
                Outcome::Continue
            }
            LineCommand::Load { path } => {
                match self.engine.load_file(std::path::Path::new(&path)) {
                    Ok(()) => println!("loaded {path}"),
                    Err(e) => report(&e),
                }
                Outcome::Continue
            }
            LineCommand::Show { target } => {
                match self.engine.show(&target) {
                    Ok(text) => print!("{text}"),
                    Err(e) => report(&e),
                }
                Outcome::Continue
            }
            LineCommand::Input { json } => {
                self.feed(&json);
                Outcome::Continue
            }
            LineCommand::Unknown { input } => {
                eprintln!("unknown command: {input} (try `help`)");
                Outcome::Continue
            }
        }
    }

    fn feed(&mut self, json: &str) {
        let value: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("malformed input: {e}");
                return;
            }
        };
        debug!(input = %value, "feeding event");
        match self.engine.submit_value(&value) {
            Ok(()) => println!("ok"),
            Err(e) => report(&e),
        }
    }

    /// The interactive loop. Returns the process exit code.
    pub fn run_interactive(&mut self) -> anyhow::Result<i32> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &self.history_path {
            // A missing history file is normal on first run.
            let _ = editor.load_history(path);
        }

        println!("DPCL shell - `help` for commands");

        loop {
            match editor.readline(PROMPT) {
                Ok(input) => {
                    let _ = editor.add_history_entry(input.as_str());
                    if self.execute(&input) == Outcome::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!("bye");
                    break;
                }
                Err(e) => {
                    eprintln!("input error: {e}");
                    break;
                }
            }
        }

        if let Some(path) = &self.history_path {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            let _ = editor.save_history(path);
        }
        Ok(0)
    }
}

fn report(error: &EngineError) {
    eprintln!("error[{}]: {error}", error.code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpcl_engine::EngineConfig;

    fn shell() -> Shell {
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .load_value(&serde_json::json!([
                {"atomics": ["alice", "student", "member"]},
                {"entity": "alice", "descriptor": "student", "gains": true},
                {
                    "position": "power",
                    "holder": "student",
                    "action": "#register",
                    "consequence": {"entity": "holder", "descriptor": "member", "gains": true}
                }
            ]))
            .expect("program loads");
        Shell::new(engine)
    }

    #[test]
    fn quit_ends_the_session() {
        let mut shell = shell();
        assert_eq!(shell.execute("exit"), Outcome::Quit);
    }

    #[test]
    fn request_flows_into_engine() {
        let mut shell = shell();
        let outcome = shell.execute(r##"{"agent": "alice", "action": "#register"}"##);
        assert_eq!(outcome, Outcome::Continue);

        let shown = shell.engine().show("alice").expect("show alice");
        assert!(shown.contains("member"));
    }

    #[test]
    fn malformed_json_does_not_quit() {
        let mut shell = shell();
        assert_eq!(shell.execute("{not json"), Outcome::Continue);
    }

    #[test]
    fn unknown_command_does_not_quit() {
        let mut shell = shell();
        assert_eq!(shell.execute("frobnicate"), Outcome::Continue);
    }

    #[test]
    fn missing_load_target_is_reported_not_fatal() {
        let mut shell = shell();
        assert_eq!(shell.execute("load /no/such/file.json"), Outcome::Continue);
        // The previous world survives a failed load.
        assert!(shell.engine().show("alice").is_ok());
    }
}
