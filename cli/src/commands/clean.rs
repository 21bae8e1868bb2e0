use sixkit_common::success;
use sixkit_core::dispatch::{Action, Dispatcher, ExecuteRequest};

use crate::commands::{PluginArgs, parse_config};

pub async fn clean(dispatcher: &Dispatcher, plugin: PluginArgs) -> anyhow::Result<()> {
    let config = parse_config(&plugin.set)?;

    dispatcher
        .execute(
            ExecuteRequest::new(plugin.kind, &plugin.name, Action::Clean).with_config(config),
        )
        .await?;

    success!("removed provisioned state of {}/{}", plugin.kind, plugin.name);
    Ok(())
}
