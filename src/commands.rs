//! Command execution.

use crate::config::Config;
use crate::Commands;
use colored::Colorize;
use mealy_core::{ExecutionResult, Machine, SessionSnapshot, Validation};
use std::path::Path;

/// Formatted command output and whether the command succeeded.
pub struct Output {
    pub text: String,
    pub success: bool,
}

impl Output {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// Executes a one-shot command.
pub fn execute(cmd: Commands, config: &Config) -> Result<Output, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => unreachable!(),

        Commands::Check { machine, lenient } => {
            let machine = load_machine(&machine, lenient || config.run.lenient)?;
            let validation = machine.validate();
            Ok(Output {
                text: format_check(&machine, &validation),
                success: validation.is_ok(),
            })
        }

        Commands::Run {
            machine,
            input,
            history,
            json,
            lenient,
        } => {
            let machine = load_machine(&machine, lenient || config.run.lenient)?;
            let validation = machine.validate();
            if !validation.is_ok() {
                return Ok(Output {
                    text: format_refusal(&validation),
                    success: false,
                });
            }

            let result = machine.execute(&input, history || config.run.history)?;
            tracing::debug!(
                "Run finished in '{}' after {} transitions",
                result.final_state,
                result.transitions
            );

            let text = if json {
                serde_json::to_string_pretty(&result)?
            } else {
                format_result(&result)
            };
            Ok(Output {
                text,
                success: result.accepted,
            })
        }

        Commands::Step {
            machine,
            input,
            history,
            json,
            lenient,
        } => {
            let machine = load_machine(&machine, lenient || config.run.lenient)?;
            let validation = machine.validate();
            if !validation.is_ok() {
                return Ok(Output {
                    text: format_refusal(&validation),
                    success: false,
                });
            }

            let mut session = machine.session(input, history || config.run.history)?;
            let mut lines = Vec::new();
            let mut steps = 0;

            lines.push(render_snapshot(&session.snapshot(), json)?);
            loop {
                if config.run.step_limit_reached(steps) {
                    lines.push(format!(
                        "{} after {} steps (run.max_steps)",
                        "Stopped".yellow(),
                        steps
                    ));
                    break;
                }

                let advanced = session.step()?;
                lines.push(render_snapshot(&session.snapshot(), json)?);
                if !advanced {
                    break;
                }
                steps += 1;
            }

            Ok(Output {
                text: lines.join("\n"),
                success: session.accepted(),
            })
        }

        Commands::Fmt {
            machine,
            json,
            lenient,
        } => {
            let machine = load_machine(&machine, lenient || config.run.lenient)?;
            if json {
                return Ok(Output::ok(machine.to_json()?));
            }

            let validation = machine.validate();
            if lossy_as_text(&validation) {
                return Ok(Output {
                    text: format!("{}: {}", "Not representable as text".red(), validation),
                    success: false,
                });
            }
            Ok(Output::ok(machine.to_string()))
        }
    }
}

/// Reads a machine from disk.
///
/// `.json` files hold an array of column-form states; anything else is the
/// line-oriented text format.
pub fn load_machine(path: &Path, lenient: bool) -> Result<Machine, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let machine = if is_json {
        Machine::from_json(&content)
    } else if lenient {
        Ok(Machine::parse(&content))
    } else {
        Machine::parse_strict(&content)
    }
    .map_err(|e| format!("{}: {}", path.display(), e))?;

    tracing::debug!(
        "Loaded {} states from {}",
        machine.len(),
        path.display()
    );
    Ok(machine)
}

/// Returns true if the text form of a machine with this outcome would not
/// parse back to the same machine.
pub fn lossy_as_text(validation: &Validation) -> bool {
    matches!(
        validation,
        Validation::InvalidToken { .. } | Validation::InvalidLabel { .. }
    )
}

/// Formats a validation outcome with lints and checksum.
pub fn format_check(machine: &Machine, validation: &Validation) -> String {
    let mut output = format!(
        "{} {} states (checksum: {})\n",
        "Machine".bold(),
        machine.len(),
        machine.checksum()
    );

    if validation.is_ok() {
        output.push_str(&format!("  {}", "OK".green()));
    } else {
        output.push_str(&format!(
            "  {} (code {}): {}",
            "FAILED".red(),
            validation.code(),
            validation
        ));
    }

    for lint in machine.lint() {
        output.push_str(&format!("\n  {}: {}", "warning".yellow(), lint));
    }

    output
}

/// Message shown when execution is refused for an invalid machine.
pub fn format_refusal(validation: &Validation) -> String {
    format!(
        "{}\nCheck failed with code {}\n>> \"{}\"",
        "Unable to execute".red(),
        validation.code(),
        validation
    )
}

pub fn format_result(result: &ExecutionResult) -> String {
    let accepted = if result.accepted {
        "true".green()
    } else {
        "false".red()
    };

    let mut output = format!(
        "  Accepted:    {}\n  Final:       {}\n  Output:      \"{}\"\n  Message:     {}\n  Transitions: {}",
        accepted,
        result.final_state.yellow(),
        result.output,
        result.message,
        result.transitions
    );
    if let Some(history) = &result.history {
        output.push_str(&format!("\n  History:     {}", history.join(",")));
    }
    output
}

pub fn format_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut output = format!(
        "[{}] {} @{} output \"{}\"",
        snapshot.transitions.to_string().cyan(),
        snapshot.state.yellow(),
        snapshot.position,
        snapshot.output
    );
    if snapshot.done {
        output.push_str(&format!(" {} {}", "done:".dimmed(), snapshot.message));
    }
    if let Some(history) = &snapshot.history {
        output.push_str(&format!(" {} {}", "history:".dimmed(), history.join(",")));
    }
    output
}

fn render_snapshot(
    snapshot: &SessionSnapshot,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    if json {
        Ok(serde_json::to_string(snapshot)?)
    } else {
        Ok(format_snapshot(snapshot))
    }
}
