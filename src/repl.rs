//! Interactive REPL.

use crate::commands::{
    format_check, format_refusal, format_result, format_snapshot, load_machine, lossy_as_text,
};
use crate::config::Config;
use colored::Colorize;
use mealy_core::Machine;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::Path;

const HELP_TEXT: &str = r#"
Available commands:
  help                      Show this help

  load <file>               Replace the machine with one read from a file
  save <file>               Write the machine (.json for raw states)
  add <state line>          Add a state, e.g. add [START] S0 :: S1: a|x
  remove <label>            Remove a state
  show                      Print the machine

  check                     Validate the machine
  run <input>               Run to completion
  step <input>              Step through a run
                              next, <enter>  take one transition
                              finish         run to completion
                              stop           leave stepping mode
  history on|off            Record visited states
  config                    Show current settings
  config save <file>        Write current settings as YAML

  quit, exit                Exit the REPL
"#;

/// Editable machine plus session settings.
pub struct Shell {
    machine: Machine,
    config: Config,
}

impl Shell {
    pub fn new(config: &Config) -> Self {
        Self {
            machine: Machine::new(),
            config: config.clone(),
        }
    }
}

pub fn run(path: Option<&Path>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "mealy shell".bold().cyan());

    let mut shell = Shell::new(config);
    if let Some(path) = path {
        shell.machine = load_machine(path, shell.config.run.lenient)?;
        println!(
            "Loaded {} states from {}",
            shell.machine.len(),
            path.display()
        );
    }

    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    let history_path = &config.repl.history_file;
    let _ = rl.load_history(history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "mealy>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut shell, line, &mut |p: &str| rl.readline(p)) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(history_path) {
        tracing::debug!("Could not save history to {}: {}", history_path.display(), e);
    }

    Ok(())
}

/// Executes one shell command. Returns `Ok(None)` to exit.
///
/// `read_line` supplies input while in stepping mode.
fn execute_repl_command(
    shell: &mut Shell,
    line: &str,
    read_line: &mut dyn FnMut(&str) -> rustyline::Result<String>,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];
    // Everything after the command word, spacing preserved.
    let rest = line.trim_start()[parts[0].len()..].trim();

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "load" | "l" => {
            if args.is_empty() {
                return Ok(Some("Usage: load <file>".to_string()));
            }
            let path = Path::new(rest);
            shell.machine = load_machine(path, shell.config.run.lenient)?;
            Ok(Some(format!(
                "{} {} states from {}",
                "Loaded".green(),
                shell.machine.len(),
                path.display()
            )))
        }

        "save" => {
            if args.is_empty() {
                return Ok(Some("Usage: save <file>".to_string()));
            }
            let path = Path::new(rest);
            let is_json = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            let content = if is_json {
                shell.machine.to_json()?
            } else {
                let validation = shell.machine.validate();
                if lossy_as_text(&validation) {
                    return Ok(Some(format!(
                        "{}: {} (save as .json instead)",
                        "Not representable as text".red(),
                        validation
                    )));
                }
                format!("{}\n", shell.machine)
            };
            std::fs::write(path, content)?;
            Ok(Some(format!(
                "{} {} states to {} (checksum: {})",
                "Saved".green(),
                shell.machine.len(),
                path.display(),
                shell.machine.checksum()
            )))
        }

        "add" | "a" => {
            if args.is_empty() {
                return Ok(Some("Usage: add <state line>".to_string()));
            }
            shell.machine.add_state_from_str(rest)?;
            let label = shell
                .machine
                .labels()
                .last()
                .unwrap_or_default()
                .to_string();
            Ok(Some(format!("{} {}", "Added".green(), label.cyan())))
        }

        "remove" | "rm" => {
            if args.is_empty() {
                return Ok(Some("Usage: remove <label>".to_string()));
            }
            match shell.machine.remove_state(args[0]) {
                Some(state) => Ok(Some(format!("{} {}", "Removed".green(), state.label.cyan()))),
                None => Ok(Some(format!("No state {}", args[0]).yellow().to_string())),
            }
        }

        "show" | "s" => {
            if shell.machine.is_empty() {
                return Ok(Some("No states".yellow().to_string()));
            }
            Ok(Some(shell.machine.to_string()))
        }

        "check" | "c" => {
            let validation = shell.machine.validate();
            Ok(Some(format_check(&shell.machine, &validation)))
        }

        "run" | "r" => {
            let validation = shell.machine.validate();
            if !validation.is_ok() {
                return Ok(Some(format_refusal(&validation)));
            }
            let result = shell.machine.execute(rest, shell.config.run.history)?;
            Ok(Some(format_result(&result)))
        }

        "step" => step_mode(&shell.machine, rest, shell.config.run.history, read_line).map(Some),

        "history" | "h" => match args.first().map(|s| s.to_lowercase()).as_deref() {
            Some("on") => {
                shell.config.run.history = true;
                Ok(Some("History on".to_string()))
            }
            Some("off") => {
                shell.config.run.history = false;
                Ok(Some("History off".to_string()))
            }
            _ => Ok(Some(format!(
                "Usage: history on|off (currently {})",
                if shell.config.run.history { "on" } else { "off" }
            ))),
        },

        "config" => match args {
            [] => Ok(Some(serde_yaml::to_string(&shell.config)?)),
            ["save"] => Ok(Some("Usage: config save <file>".to_string())),
            ["save", ..] => {
                let path = Path::new(rest["save".len()..].trim());
                shell.config.save(path)?;
                Ok(Some(format!("{} settings to {}", "Saved".green(), path.display())))
            }
            _ => Ok(Some("Usage: config [save <file>]".to_string())),
        },

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

/// Runs a step session, reading one stepping command per line.
///
/// The machine stays borrowed until stepping mode is left.
fn step_mode(
    machine: &Machine,
    input: &str,
    history: bool,
    read_line: &mut dyn FnMut(&str) -> rustyline::Result<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    let validation = machine.validate();
    if !validation.is_ok() {
        return Ok(format_refusal(&validation));
    }

    let mut session = machine.session(input, history)?;
    println!(
        "{}",
        "Stepping: <enter>/next, finish, stop".dimmed()
    );
    println!("{}", format_snapshot(&session.snapshot()));

    while !session.is_done() {
        let prompt = format!("{} ", "step>".yellow());
        let line = match read_line(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Ok("Stopped".dimmed().to_string());
            }
            Err(e) => return Err(e.into()),
        };

        match line.trim().to_lowercase().as_str() {
            "" | "next" | "n" => {
                session.step()?;
                println!("{}", format_snapshot(&session.snapshot()));
            }
            "finish" | "f" => {
                let result = session.run_to_end()?;
                return Ok(format_result(&result));
            }
            "stop" | "s" => return Ok("Stopped".dimmed().to_string()),
            other => println!("Unknown step command: {}", other),
        }
    }

    Ok(if session.accepted() {
        format!("{} in {}", "Accepted".green(), session.state().label.yellow())
    } else {
        format!(
            "{} in {}: {}",
            "Rejected".red(),
            session.state().label.yellow(),
            session.snapshot().message
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    fn shell() -> Shell {
        colored::control::set_override(false);
        Shell::new(&Config::default())
    }

    fn exec(shell: &mut Shell, line: &str) -> Option<String> {
        execute_repl_command(shell, line, &mut |_: &str| Err(ReadlineError::Eof)).unwrap()
    }

    fn exec_scripted(shell: &mut Shell, line: &str, script: &[&str]) -> String {
        let mut script: VecDeque<String> = script.iter().map(|s| s.to_string()).collect();
        let mut read_line = |_: &str| script.pop_front().ok_or(ReadlineError::Eof);
        execute_repl_command(shell, line, &mut read_line)
            .unwrap()
            .unwrap()
    }

    fn binary(shell: &mut Shell) {
        exec(shell, "add [START] S0 :: S0: 0, S1: 1");
        exec(shell, "add [ACCEPT] S1 :: S1: 0, S0: 1");
    }

    #[test]
    fn test_quit() {
        let mut shell = shell();
        assert!(exec(&mut shell, "quit").is_none());
        assert!(exec(&mut shell, "EXIT").is_none());
    }

    #[test]
    fn test_add_show_remove() {
        let mut shell = shell();
        assert_eq!(exec(&mut shell, "show").unwrap(), "No states");

        assert_eq!(
            exec(&mut shell, "add [START]  S0 :: S0: 0").unwrap(),
            "Added S0"
        );
        assert_eq!(exec(&mut shell, "show").unwrap(), "[START] S0 :: S0: 0");

        assert_eq!(exec(&mut shell, "remove S0").unwrap(), "Removed S0");
        assert_eq!(exec(&mut shell, "remove S0").unwrap(), "No state S0");
        assert!(shell.machine.is_empty());
    }

    #[test]
    fn test_add_rejects_bad_line_and_duplicates() {
        let mut shell = shell();
        let never: &mut dyn FnMut(&str) -> rustyline::Result<String> =
            &mut |_| Err(ReadlineError::Eof);
        assert!(execute_repl_command(&mut shell, "add S0 S1", never).is_err());

        binary(&mut shell);
        assert!(execute_repl_command(&mut shell, "add S0 :: S0: 1", never).is_err());
        assert_eq!(shell.machine.len(), 2);
    }

    #[test]
    fn test_check_and_run() {
        let mut shell = shell();
        exec(&mut shell, "add [START] S0 :: S0: 0, S1: 1");
        let refusal = exec(&mut shell, "run 1").unwrap();
        assert!(refusal.contains("Unable to execute"));
        assert!(refusal.contains("State S0: unknown connecting state S1"));

        exec(&mut shell, "add [ACCEPT] S1 :: S1: 0, S0: 1");
        assert!(exec(&mut shell, "check").unwrap().contains("OK"));
        assert!(exec(&mut shell, "run 1011")
            .unwrap()
            .contains("Accepted:    true"));
    }

    #[test]
    fn test_history_toggle() {
        let mut shell = shell();
        binary(&mut shell);

        exec(&mut shell, "history on");
        assert!(shell.config.run.history);
        assert!(exec(&mut shell, "run 1").unwrap().contains("History:     S0,S1"));

        exec(&mut shell, "history off");
        assert!(!exec(&mut shell, "run 1").unwrap().contains("History"));
        assert!(exec(&mut shell, "history")
            .unwrap()
            .contains("currently off"));
    }

    #[test]
    fn test_step_mode_to_completion() {
        let mut shell = shell();
        binary(&mut shell);

        let output = exec_scripted(&mut shell, "step 10", &["", "next", ""]);
        assert_eq!(output, "Accepted in S1");
    }

    #[test]
    fn test_step_mode_finish() {
        let mut shell = shell();
        binary(&mut shell);

        let output = exec_scripted(&mut shell, "step 1011", &["n", "finish"]);
        assert!(output.contains("Accepted:    true"));
        assert!(output.contains("Transitions: 4"));
    }

    #[test]
    fn test_step_mode_stop_and_eof() {
        let mut shell = shell();
        binary(&mut shell);

        assert_eq!(exec_scripted(&mut shell, "step 11", &["stop"]), "Stopped");
        assert_eq!(exec_scripted(&mut shell, "step 11", &[]), "Stopped");
    }

    #[test]
    fn test_step_mode_stuck() {
        let mut shell = shell();
        binary(&mut shell);

        let output = exec_scripted(&mut shell, "step 1x", &["", "", ""]);
        assert!(output.starts_with("Rejected in S1"));
        assert!(output.contains("No inputs from string \"x\""));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut shell = shell();
        binary(&mut shell);

        for name in ["machine.fsm", "machine.json"] {
            let path = dir.path().join(name);
            let saved = exec(&mut shell, &format!("save {}", path.display())).unwrap();
            assert!(saved.starts_with("Saved 2 states"));

            let mut other = Shell::new(&Config::default());
            let loaded = exec(&mut other, &format!("load {}", path.display())).unwrap();
            assert!(loaded.starts_with("Loaded 2 states"));
            assert_eq!(other.machine, shell.machine);
        }
    }

    #[test]
    fn test_save_text_refuses_unrepresentable_tokens() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("spaced.json");
        std::fs::write(
            &json,
            r#"[{"label": "S0", "role": "start", "input": ["a b"], "conns": ["S1"]},
                {"label": "S1", "role": "accept", "input": ["x"], "conns": ["S1"]}]"#,
        )
        .unwrap();

        let mut shell = shell();
        exec(&mut shell, &format!("load {}", json.display()));
        assert!(exec(&mut shell, "check")
            .unwrap()
            .contains("State S0: invalid token \"a b\""));

        let text = dir.path().join("spaced.fsm");
        let output = exec(&mut shell, &format!("save {}", text.display())).unwrap();
        assert!(output.starts_with("Not representable as text"));
        assert!(!text.exists());

        let copy = dir.path().join("copy.json");
        exec(&mut shell, &format!("save {}", copy.display()));
        let mut other = Shell::new(&Config::default());
        exec(&mut other, &format!("load {}", copy.display()));
        assert_eq!(other.machine, shell.machine);
    }

    #[test]
    fn test_config_show_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mealy.yaml");
        let mut shell = shell();

        exec(&mut shell, "history on");
        assert!(exec(&mut shell, "config").unwrap().contains("history: true"));
        assert_eq!(
            exec(&mut shell, "config save").unwrap(),
            "Usage: config save <file>"
        );

        let saved = exec(&mut shell, &format!("config save {}", path.display())).unwrap();
        assert!(saved.starts_with("Saved settings to"));

        let loaded = Config::from_file(&path).unwrap();
        assert!(loaded.run.history);
        assert_eq!(loaded, shell.config);
    }

    #[test]
    fn test_unknown_command() {
        let mut shell = shell();
        assert!(exec(&mut shell, "frobnicate")
            .unwrap()
            .starts_with("Unknown command: frobnicate"));
    }
}
