//! Analysis backends for scan results.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use sixkit_common::config::{ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::model::{AnalysisReport, Descriptor, PluginKind, ScanResultSet};
use sixkit_core::capability::{Analyze, PluginInstance};
use sixkit_core::plugin::{EnvState, LifecycleState, Plugin, PluginContext};
use sixkit_core::registry::PluginSpec;

const NAME: &str = "status-summary";

const PARAMS: &[ParamSpec] = &[];

pub fn status_summary_spec() -> PluginSpec {
    PluginSpec {
        descriptor: descriptor(),
        params: PARAMS,
        factory,
    }
}

fn descriptor() -> Descriptor {
    Descriptor::new(
        PluginKind::Analyze,
        NAME,
        "0.1.0",
        "Tallies scan results by status and protocol.",
    )
}

fn factory(_config: &PluginConfig) -> KitResult<PluginInstance> {
    Ok(PluginInstance::Analyze(Box::new(StatusSummary {
        descriptor: descriptor(),
        env: EnvState::new(),
    })))
}

struct StatusSummary {
    descriptor: Descriptor,
    env: EnvState,
}

fn is_alive(status: &str) -> bool {
    matches!(status, "responsive" | "open")
}

#[async_trait]
impl Plugin for StatusSummary {
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
impl Analyze for StatusSummary {
    async fn analyze(
        &mut self,
        _ctx: &PluginContext,
        results: &ScanResultSet,
    ) -> KitResult<AnalysisReport> {
        self.env.begin(LifecycleState::Busy)?;

        let mut by_status: BTreeMap<&str, u64> = BTreeMap::new();
        let mut by_protocol: BTreeMap<&str, u64> = BTreeMap::new();
        let mut alive: u64 = 0;

        for result in &results.results {
            *by_status.entry(result.status.as_str()).or_default() += 1;
            *by_protocol.entry(result.protocol.as_str()).or_default() += 1;
            if is_alive(&result.status) {
                alive += 1;
            }
        }

        let total = results.results.len() as u64;
        let ratio = if total > 0 {
            alive as f64 / total as f64
        } else {
            0.0
        };

        let mut details = Map::new();
        details.insert("by_status".to_string(), json!(by_status));
        details.insert("by_protocol".to_string(), json!(by_protocol));
        details.insert("responsive".to_string(), Value::from(alive));
        details.insert("responsive_ratio".to_string(), Value::from(ratio));

        let scan_name = results.scan_name.as_deref().unwrap_or("unnamed scan");

        self.env.finish();
        Ok(AnalysisReport {
            title: format!("Status summary for {scan_name}"),
            summary: format!("{alive} of {total} probed addresses answered"),
            details,
            source_scan_results_count: total,
        })
    }
}
