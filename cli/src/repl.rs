/// Reedline-based interactive unlock shell.
use anyhow::Result;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use wallet_unlock_core::Session;

use crate::app::{print_events, App};
use crate::commands::{Command, COMMAND_NAMES};
use crate::Cli;

pub async fn run_repl(cli: &Cli, app: &App) -> Result<()> {
    println!("Wallet Unlock v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", app.status_line());
    println!("Type 'help' for a list of commands.");
    println!();

    // One session per shell, torn down on exit.
    let (session, events) = Session::new();
    let printer = print_events(events);

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("[unlock]".to_string()),
        DefaultPromptSegment::Empty,
    );
    let commands: Vec<String> = COMMAND_NAMES.iter().map(|c| c.to_string()).collect();
    let completer = Box::new(DefaultCompleter::new(commands));
    let mut line_editor = Reedline::create().with_completer(completer);

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match Command::parse(line) {
                    Ok(Command::Exit) => break,
                    Ok(command) => match app.execute(cli, &session, &command).await {
                        Ok(output) if !output.is_empty() => println!("{output}"),
                        Ok(_) => {}
                        Err(e) => eprintln!("Error: {e}"),
                    },
                    Err(e) => eprintln!("{e}"),
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    session.destroy();
    app.finish(&session).await;
    printer.abort();
    println!("Goodbye.");
    Ok(())
}
