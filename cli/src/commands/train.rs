use std::path::PathBuf;

use anyhow::Context;

use sixkit_common::address::read_seed_file;
use sixkit_common::model::AddressSet;
use sixkit_common::success;
use sixkit_core::dispatch::{Action, Dispatcher, ExecuteRequest, Input, Output};

use crate::commands::{PluginArgs, parse_config};
use crate::terminal::print;

pub async fn train(
    dispatcher: &Dispatcher,
    plugin: PluginArgs,
    seeds: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = parse_config(&plugin.set)?;

    let addresses = read_seed_file(&seeds)
        .with_context(|| format!("failed to read seed file {}", seeds.display()))?;
    anyhow::ensure!(
        !addresses.is_empty(),
        "no usable seed addresses in {}",
        seeds.display()
    );

    let name = seeds
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("seeds")
        .to_string();
    let seed_set = AddressSet {
        name,
        description: Some(format!("seeds loaded from {}", seeds.display())),
        addresses,
    };
    tracing::info!(
        "training {}/{} on {} seeds",
        plugin.kind,
        plugin.name,
        seed_set.len()
    );

    let result = dispatcher
        .execute(
            ExecuteRequest::new(plugin.kind, &plugin.name, Action::Train)
                .with_config(config)
                .with_input(Input::Addresses(seed_set)),
        )
        .await?;

    let Output::Model(handle) = result else {
        anyhow::bail!("train did not produce a model handle");
    };

    print::emit_json(&handle, output.as_deref())?;
    success!("model stored at {}", handle.artifact.display());
    Ok(())
}
