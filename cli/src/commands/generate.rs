use std::path::PathBuf;

use anyhow::Context;

use sixkit_common::model::ModelHandle;
use sixkit_common::success;
use sixkit_core::dispatch::{Action, Dispatcher, ExecuteRequest, Input, Output};

use crate::commands::{PluginArgs, parse_config};
use crate::terminal::print;

pub async fn generate(
    dispatcher: &Dispatcher,
    plugin: PluginArgs,
    model: PathBuf,
    count: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = parse_config(&plugin.set)?;

    let raw = std::fs::read_to_string(&model)
        .with_context(|| format!("failed to read model handle {}", model.display()))?;
    let handle: ModelHandle = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a model handle", model.display()))?;

    let result = dispatcher
        .execute(
            ExecuteRequest::new(plugin.kind, &plugin.name, Action::Generate { count })
                .with_config(config)
                .with_input(Input::Model(handle)),
        )
        .await?;

    let Output::Addresses(set) = result else {
        anyhow::bail!("generate did not produce addresses");
    };

    print::emit_addresses(&set, output.as_deref())?;
    success!("generated {} unique addresses", set.len());
    Ok(())
}
