//! # det: dynamic space exploration
//!
//! Probes the seed addresses through a borrowed scanner, then expands
//! around whatever answered: the low nybbles of each responsive address
//! are varied to produce neighbor candidates, which join the probe queue.
//! The probe budget bounds how many addresses are ever scanned, not how
//! many come back; exploration stops early when the frontier dries up.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;

use sixkit_common::address::explode;
use sixkit_common::config::{ParamKind, ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::LogLevel;
use sixkit_common::model::{AddressSet, Descriptor, PluginKind};
use sixkit_core::capability::{DynamicTga, PluginInstance, Scan};
use sixkit_core::plugin::{EnvState, LifecycleState, Plugin, PluginContext};
use sixkit_core::registry::PluginSpec;

const NAME: &str = "det";
const DEFAULT_BATCH_SIZE: u64 = 64;
const HEX_DIGITS: &str = "0123456789abcdef";

const PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "batch-size",
    ParamKind::Int,
    "addresses probed per scanner round (default 64)",
)];

pub fn spec() -> PluginSpec {
    PluginSpec {
        descriptor: descriptor(),
        params: PARAMS,
        factory,
    }
}

fn descriptor() -> Descriptor {
    Descriptor::new(
        PluginKind::TgaDynamic,
        NAME,
        "0.1.0",
        "Budgeted neighborhood exploration guided by scan feedback.",
    )
}

fn factory(config: &PluginConfig) -> KitResult<PluginInstance> {
    let batch_size = match config.get_int("batch-size") {
        None => DEFAULT_BATCH_SIZE,
        Some(n) if n > 0 => n as u64,
        Some(n) => {
            return Err(KitError::ConfigValidation(format!(
                "batch-size must be positive, got {n}"
            )));
        }
    };

    Ok(PluginInstance::DynamicTga(Box::new(DetTga {
        descriptor: descriptor(),
        env: EnvState::new(),
        batch_size,
    })))
}

struct DetTga {
    descriptor: Descriptor,
    env: EnvState,
    batch_size: u64,
}

/// A response counts as alive for any probe module.
fn is_alive(status: &str) -> bool {
    matches!(status, "responsive" | "open")
}

/// Neighbor candidates: every variation of the last two nybbles.
fn neighbors(addr: &str) -> Vec<String> {
    let Ok(parsed) = addr.parse::<std::net::Ipv6Addr>() else {
        return Vec::new();
    };
    let exploded = explode(&parsed);
    let mut out = Vec::with_capacity(32);

    for position in [exploded.len() - 1, exploded.len() - 2] {
        for digit in HEX_DIGITS.chars() {
            let mut candidate: Vec<char> = exploded.chars().collect();
            if candidate[position] == digit {
                continue;
            }
            candidate[position] = digit;
            out.push(candidate.into_iter().collect());
        }
    }
    out
}

#[async_trait]
impl Plugin for DetTga {
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
impl DynamicTga for DetTga {
    async fn discover(
        &mut self,
        ctx: &PluginContext,
        seeds: &AddressSet,
        scanner: &mut dyn Scan,
        budget: u64,
    ) -> KitResult<AddressSet> {
        self.env.begin(LifecycleState::Discovering)?;

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut queued: HashSet<String> = HashSet::new();
        for seed in &seeds.addresses {
            if let Ok(parsed) = seed.parse::<std::net::Ipv6Addr>() {
                let exploded = explode(&parsed);
                if queued.insert(exploded.clone()) {
                    queue.push_back(exploded);
                }
            }
        }

        let mut discovered: Vec<String> = Vec::new();
        let mut alive: HashSet<String> = HashSet::new();
        let mut probes_used: u64 = 0;

        while probes_used < budget && !queue.is_empty() {
            if ctx.cancel.is_cancelled() {
                return Err(KitError::Cancelled);
            }

            let room = (budget - probes_used).min(self.batch_size) as usize;
            let batch: Vec<String> = (0..room).filter_map(|_| queue.pop_front()).collect();
            if batch.is_empty() {
                break;
            }

            let targets = AddressSet::new("det-probe", batch);
            let results = scanner.scan(ctx, &targets).await?;
            probes_used += targets.len() as u64;
            ctx.events.on_progress(probes_used.min(budget), budget);

            for result in &results.results {
                if !is_alive(&result.status) {
                    continue;
                }
                if alive.insert(result.address.clone()) {
                    discovered.push(result.address.clone());
                    for neighbor in neighbors(&result.address) {
                        if queued.insert(neighbor.clone()) {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }

        ctx.events.on_log(
            LogLevel::Info,
            &format!(
                "discovery finished: {} alive addresses after {probes_used} probes",
                discovered.len()
            ),
        );

        self.env.finish();
        Ok(AddressSet {
            name: NAME.to_string(),
            description: Some(format!("addresses discovered within a budget of {budget} probes")),
            addresses: discovered,
        })
    }
}
