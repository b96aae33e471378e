//! `counter-shell`: drive the counter core from the command line.
//!
//! Usage:
//!   counter-shell [--config PATH] [--json] [ACTION...]
//!
//! Every run first issues `Initialize` so the stored count is loaded, then
//! issues one event per action and prints the view after each.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use counter_core::{Core, Event, ViewModel};
use counter_shell::{logging, DispatchLoop, ShellConfig};

#[derive(Parser)]
#[command(name = "counter-shell")]
#[command(about = "Persistent counter driven through the core boundary")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print each view as JSON
    #[arg(long)]
    json: bool,

    /// Actions to apply, in order
    #[arg(value_enum)]
    actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    Increment,
    Decrement,
    Reset,
    Show,
}

impl Action {
    fn event(self) -> Option<Event> {
        match self {
            Action::Increment => Some(Event::Increment),
            Action::Decrement => Some(Event::Decrement),
            Action::Reset => Some(Event::Reset),
            Action::Show => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ShellConfig::load(args.config.as_deref()).context("loading configuration")?;
    logging::init(&config.logging)?;

    let mut shell =
        DispatchLoop::from_config(Core::new(), &config).context("starting the counter shell")?;
    shell.subscribe(|view: &ViewModel| {
        info!(count = %view.count, message = %view.message, "view updated");
    });

    shell.issue(Event::Initialize)?;
    shell.settle()?;

    if args.actions.is_empty() {
        return print_view(shell.view(), args.json);
    }

    for action in args.actions {
        if let Some(event) = action.event() {
            shell.issue(event)?;
            shell.settle()?;
        }
        print_view(shell.view(), args.json)?;
    }
    Ok(())
}

fn print_view(view: &ViewModel, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(view)?);
    } else if view.message.is_empty() {
        println!("{}", view.count);
    } else {
        println!("{} ({})", view.count, view.message);
    }
    Ok(())
}
