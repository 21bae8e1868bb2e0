//! Dataset backends: named address collections fetched for seeding.

use async_trait::async_trait;

use sixkit_common::config::{ParamKind, ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::model::{AddressSet, Descriptor, PluginKind};
use sixkit_core::capability::{Dataset, PluginInstance};
use sixkit_core::plugin::{EnvState, LifecycleState, Plugin, PluginContext};
use sixkit_core::registry::PluginSpec;

const SEED_FILE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("path", ParamKind::Str, "seed file, one address per line"),
    ParamSpec::optional("name", ParamKind::Str, "name for the resulting address set"),
];

pub fn seed_file_spec() -> PluginSpec {
    PluginSpec {
        descriptor: seed_file_descriptor(),
        params: SEED_FILE_PARAMS,
        factory: seed_file_factory,
    }
}

fn seed_file_descriptor() -> Descriptor {
    Descriptor::new(
        PluginKind::Dataset,
        "seed-file",
        "0.1.0",
        "Loads a local seed list into an address set.",
    )
}

fn seed_file_factory(config: &PluginConfig) -> KitResult<PluginInstance> {
    let path = config
        .get_str("path")
        .ok_or_else(|| KitError::ConfigValidation("missing required parameter 'path'".into()))?;
    let name = config
        .get_str("name")
        .unwrap_or_else(|| "seed-file".to_string());

    Ok(PluginInstance::Dataset(Box::new(SeedFileDataset {
        descriptor: seed_file_descriptor(),
        env: EnvState::new(),
        path: path.into(),
        set_name: name,
    })))
}

/// Reads a local seed list. The file path is caller configuration, so a
/// missing or unreadable file surfaces as an execution failure for this
/// plugin rather than a setup problem.
struct SeedFileDataset {
    descriptor: Descriptor,
    env: EnvState,
    path: std::path::PathBuf,
    set_name: String,
}

#[async_trait]
impl Plugin for SeedFileDataset {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn state(&self) -> LifecycleState {
        self.env.current()
    }

    async fn setup(&mut self, ctx: &PluginContext) -> KitResult<()> {
        if self.env.already_provisioned(&ctx.workspace) {
            return Ok(());
        }
        ctx.workspace
            .mark_provisioned()
            .map_err(KitError::setup_failed)?;
        self.env.mark_ready();
        Ok(())
    }

    async fn clean(&mut self, ctx: &PluginContext) -> KitResult<()> {
        ctx.workspace.clear()?;
        self.env.reset();
        Ok(())
    }
}

#[async_trait]
impl Dataset for SeedFileDataset {
    async fn download(&mut self, ctx: &PluginContext) -> KitResult<AddressSet> {
        self.env.begin(LifecycleState::Busy)?;

        let addresses = sixkit_common::address::read_seed_file(&self.path).map_err(|err| {
            KitError::execution(PluginKind::Dataset, "seed-file", "download", err)
        })?;

        ctx.events.on_log(
            sixkit_common::event::LogLevel::Info,
            &format!("loaded {} seed addresses from {}", addresses.len(), self.path.display()),
        );

        self.env.finish();
        Ok(AddressSet {
            name: self.set_name.clone(),
            description: Some(format!("seed addresses read from {}", self.path.display())),
            addresses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixkit_common::config::ConfigValue;
    use sixkit_common::event::{CancelToken, NullSink};
    use sixkit_core::exec::SystemExec;
    use sixkit_core::workspace::Workspace;
    use std::sync::Arc;

    fn context(root: &std::path::Path) -> PluginContext {
        PluginContext::new(
            Workspace::new(root.to_path_buf()),
            Arc::new(NullSink),
            CancelToken::new(),
            Arc::new(SystemExec),
        )
    }

    #[tokio::test]
    async fn download_reads_and_explodes_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = dir.path().join("seeds.txt");
        std::fs::write(&seed_path, "2001:db8::1\n\nfe80::2\n").unwrap();

        let config = PluginConfig::new()
            .with("path", ConfigValue::Str(seed_path.display().to_string()));
        let mut instance = seed_file_factory(&config).unwrap();
        let ctx = context(&dir.path().join("work"));

        let PluginInstance::Dataset(plugin) = &mut instance else {
            panic!("seed-file must be a dataset plugin");
        };
        plugin.setup(&ctx).await.unwrap();
        let set = plugin.download(&ctx).await.unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.addresses[0], "2001:0db8:0000:0000:0000:0000:0000:0001");
    }

    #[tokio::test]
    async fn download_before_setup_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = PluginConfig::new()
            .with("path", ConfigValue::Str("/nonexistent".to_string()));
        let mut instance = seed_file_factory(&config).unwrap();
        let ctx = context(&dir.path().join("work"));

        let PluginInstance::Dataset(plugin) = &mut instance else {
            panic!("seed-file must be a dataset plugin");
        };
        let err = plugin.download(&ctx).await.unwrap_err();
        assert!(matches!(err, KitError::EnvironmentNotReady));
    }
}
