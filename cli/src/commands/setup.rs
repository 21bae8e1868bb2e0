use sixkit_common::success;
use sixkit_core::dispatch::{Action, Dispatcher, ExecuteRequest};

use crate::commands::{PluginArgs, parse_config};

pub async fn setup(dispatcher: &Dispatcher, plugin: PluginArgs) -> anyhow::Result<()> {
    let config = parse_config(&plugin.set)?;

    dispatcher
        .execute(
            ExecuteRequest::new(plugin.kind, &plugin.name, Action::Setup).with_config(config),
        )
        .await?;

    success!("environment for {}/{} is ready", plugin.kind, plugin.name);
    Ok(())
}
