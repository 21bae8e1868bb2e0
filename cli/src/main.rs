mod commands;
mod terminal;

use std::sync::Arc;

use commands::{CommandLine, Commands, clean, generate, list, run, setup, train};
use sixkit_common::event::CancelToken;
use sixkit_core::dispatch::Dispatcher;
use sixkit_core::registry::Registry;

use crate::terminal::{logging, print, progress};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    logging::init(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    print::banner(cli.quiet);

    let mut registry = Registry::new();
    sixkit_plugins::register_builtins(&mut registry)?;
    let registry = Arc::new(registry);

    let cancel = CancelToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let dispatcher = Dispatcher::new(registry.clone(), cli.workdir.clone())
        .with_events(Arc::new(progress::ProgressSink::new(cli.quiet)))
        .with_cancel(cancel);

    match cli.command {
        Commands::List { kind } => list::list(&registry, kind, cli.quiet),
        Commands::Setup { plugin } => setup::setup(&dispatcher, plugin).await,
        Commands::Train {
            plugin,
            seeds,
            output,
        } => train::train(&dispatcher, plugin, seeds, output).await,
        Commands::Generate {
            plugin,
            model,
            count,
            output,
        } => generate::generate(&dispatcher, plugin, model, count, output).await,
        Commands::Run {
            plugin,
            seeds,
            input,
            limit,
            scanner,
            scanner_set,
            output,
        } => run::run(&dispatcher, plugin, seeds, input, limit, scanner, scanner_set, output).await,
        Commands::Clean { plugin } => clean::clean(&dispatcher, plugin).await,
    }
}

/// First Ctrl-C flips the cooperative cancel flag; running operations
/// notice it between sampling or probing rounds.
fn spawn_ctrl_c_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling at the next checkpoint");
            cancel.cancel();
        }
    });
}
