//! Stateless input-line parser.
//!
//! Pure function from one shell line to a [`LineCommand`].
//!
//! # Input Format
//!
//! | Input | Command |
//! |-------|---------|
//! | `load <path>` | Load a program file |
//! | `show <name-or-json-ref>` | Inspect an object |
//! | `help` | Command summary |
//! | `exit` / `quit` / `q` | Leave the shell |
//! | `#tag` | Agent-less world event |
//! | `{...}` / `"..."` | JSON input value (action request or event) |

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    /// Load a program file.
    Load { path: String },
    /// Pretty-print an object.
    Show { target: String },
    /// Print the command summary.
    Help,
    /// Leave the shell.
    Quit,
    /// A JSON input value for the engine.
    Input { json: String },
    /// Blank line.
    Empty,
    /// Anything else.
    Unknown { input: String },
}

/// Parses one line. Same input, same output; no state.
#[must_use]
pub fn parse(line: &str) -> LineCommand {
    let line = line.trim();

    if line.is_empty() {
        return LineCommand::Empty;
    }

    // JSON values pass through to the engine. A bare `#tag` is
    // shorthand for the quoted event string.
    if line.starts_with('{') || line.starts_with('[') || line.starts_with('"') {
        return LineCommand::Input {
            json: line.to_string(),
        };
    }
    if line.starts_with('#') {
        return LineCommand::Input {
            json: format!("\"{line}\""),
        };
    }

    let (cmd, rest) = match line.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match cmd.to_lowercase().as_str() {
        "load" => {
            if rest.is_empty() {
                LineCommand::Unknown {
                    input: line.to_string(),
                }
            } else {
                LineCommand::Load {
                    path: rest.to_string(),
                }
            }
        }
        "show" => {
            if rest.is_empty() {
                LineCommand::Unknown {
                    input: line.to_string(),
                }
            } else {
                LineCommand::Show {
                    target: rest.to_string(),
                }
            }
        }
        "help" | "?" => LineCommand::Help,
        "exit" | "quit" | "q" => LineCommand::Quit,
        _ => LineCommand::Unknown {
            input: line.to_string(),
        },
    }
}
