/// Command definitions and parsing for the REPL and one-shot mode.
use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Unlock the wallet: unlock [<seconds>|always] [staking]
    Unlock {
        timeout_secs: Option<u64>,
        stake_only: bool,
    },
    /// Lock the wallet now
    Lock,
    /// Show the node's encryption status
    Status,
    /// List the selectable unlock windows
    Timeouts,
    /// Wait for pending unlock actions to run
    Wait,
    /// Print help
    Help,
    /// Exit
    Exit,
}

impl Command {
    pub(crate) fn parse(input: &str) -> Result<Self> {
        let mut words = input.split_whitespace();
        let Some(cmd) = words.next() else {
            bail!("No command entered. Type 'help' for a list of commands.");
        };

        match cmd.to_lowercase().as_str() {
            "unlock" | "u" => {
                let mut timeout_secs = None;
                let mut stake_only = false;
                for word in words {
                    match word.to_lowercase().as_str() {
                        "staking" | "stake" | "stakeonly" => stake_only = true,
                        "always" | "forever" => timeout_secs = Some(0),
                        other => {
                            let secs = other.parse::<u64>().map_err(|_| {
                                anyhow::anyhow!(
                                    "Invalid argument '{word}'. Usage: unlock [<seconds>|always] [staking]"
                                )
                            })?;
                            timeout_secs = Some(secs);
                        }
                    }
                }
                Ok(Command::Unlock {
                    timeout_secs,
                    stake_only,
                })
            }
            "lock" => Ok(Command::Lock),
            "status" | "st" => Ok(Command::Status),
            "timeouts" => Ok(Command::Timeouts),
            "wait" => Ok(Command::Wait),
            "help" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            other => bail!("Unknown command '{other}'. Type 'help' for a list of commands."),
        }
    }
}

pub(crate) const COMMAND_NAMES: &[&str] = &[
    "unlock", "lock", "status", "timeouts", "wait", "help", "exit", "quit",
];

pub(crate) const HELP: &str = "\
Commands:
  unlock [<seconds>|always] [staking]   Unlock the wallet (default window from config)
  lock                                  Lock the wallet now
  status                                Show the wallet's encryption status
  timeouts                              List the selectable unlock windows
  wait                                  Wait for pending unlock actions to run
  help                                  Show this help
  exit                                  Leave (pending actions are awaited first)";
