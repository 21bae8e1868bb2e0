//! # sixgen: in-process pattern mining TGA
//!
//! Training clusters the exploded seeds by /64 prefix and merges every
//! cluster position-wise: nybbles all members agree on stay fixed,
//! diverging positions become wildcards. Generation samples random fills
//! of random patterns through the unique sampler until the requested
//! count of distinct addresses is reached.

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use sixkit_common::address::Pattern;
use sixkit_common::config::{ParamKind, ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::LogLevel;
use sixkit_common::model::{AddressSet, Descriptor, ModelHandle, PluginKind};
use sixkit_core::capability::{PluginInstance, StaticTga};
use sixkit_core::plugin::{EnvState, LifecycleState, Plugin, PluginContext};
use sixkit_core::registry::PluginSpec;
use sixkit_core::sample::generate_unique;

const NAME: &str = "sixgen";
const PATTERNS_FILE: &str = "patterns.txt";

/// Nybbles of shared prefix used as the cluster key (16 = /64).
const DEFAULT_CLUSTER_NYBBLES: usize = 16;

const PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "cluster-nybbles",
    ParamKind::Int,
    "prefix length in nybbles used for seed clustering (default 16)",
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
        PluginKind::TgaStatic,
        NAME,
        "0.1.0",
        "Pattern-mining TGA: clusters seeds into wildcard templates and samples them.",
    )
}

fn factory(config: &PluginConfig) -> KitResult<PluginInstance> {
    let cluster_nybbles = match config.get_int("cluster-nybbles") {
        None => DEFAULT_CLUSTER_NYBBLES,
        Some(n) if (1..=32).contains(&n) => n as usize,
        Some(n) => {
            return Err(KitError::ConfigValidation(format!(
                "cluster-nybbles must be between 1 and 32, got {n}"
            )));
        }
    };

    Ok(PluginInstance::StaticTga(Box::new(SixGenTga {
        descriptor: descriptor(),
        env: EnvState::new(),
        cluster_nybbles,
    })))
}

struct SixGenTga {
    descriptor: Descriptor,
    env: EnvState,
    cluster_nybbles: usize,
}

/// Strips separators: an exploded address becomes its 32 nybbles.
fn nybbles(addr: &str) -> String {
    addr.chars().filter(|c| *c != ':').collect()
}

/// Reinserts `:` every four nybbles.
fn group(nybbles: &str) -> String {
    let mut out = String::with_capacity(39);
    for (i, c) in nybbles.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(':');
        }
        out.push(c);
    }
    out
}

/// Position-wise merge of a cluster: agreement stays, divergence becomes
/// a wildcard.
fn merge_cluster(members: &[String]) -> String {
    let first = &members[0];
    let merged: String = (0..first.len())
        .map(|i| {
            let c = first.as_bytes()[i] as char;
            let uniform = members.iter().all(|m| m.as_bytes()[i] as char == c);
            if uniform { c } else { '*' }
        })
        .collect();
    group(&merged)
}

fn mine_patterns(seeds: &[String], cluster_nybbles: usize) -> Vec<String> {
    use std::collections::BTreeMap;

    let mut clusters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for seed in seeds {
        let stripped = nybbles(seed);
        if stripped.len() != 32 {
            continue;
        }
        let key = stripped[..cluster_nybbles.min(32)].to_string();
        clusters.entry(key).or_default().push(stripped);
    }

    let mut patterns: Vec<String> = clusters
        .values()
        .map(|members| merge_cluster(members))
        .collect();
    patterns.dedup();
    patterns
}

#[async_trait]
impl Plugin for SixGenTga {
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
impl StaticTga for SixGenTga {
    async fn train(&mut self, ctx: &PluginContext, seeds: &AddressSet) -> KitResult<ModelHandle> {
        self.env.begin(LifecycleState::Busy)?;

        if seeds.is_empty() {
            return Err(KitError::ConfigValidation(
                "training requires at least one seed address".to_string(),
            ));
        }

        let patterns = mine_patterns(&seeds.addresses, self.cluster_nybbles);
        if patterns.is_empty() {
            return Err(KitError::execution(
                PluginKind::TgaStatic,
                NAME,
                "train",
                anyhow::anyhow!("no usable exploded seeds out of {} provided", seeds.len()),
            ));
        }

        let artifact = ctx.workspace.write_seeds(PATTERNS_FILE, &patterns)?;
        ctx.events.on_log(
            LogLevel::Info,
            &format!("mined {} patterns from {} seeds", patterns.len(), seeds.len()),
        );

        self.env.mark_trained();
        Ok(ModelHandle::new(NAME, artifact))
    }

    async fn generate(
        &mut self,
        ctx: &PluginContext,
        model: &ModelHandle,
        count: u64,
    ) -> KitResult<AddressSet> {
        self.env.begin(LifecycleState::Busy)?;
        if count == 0 {
            return Err(KitError::InvalidCount);
        }
        if model.plugin != NAME || !model.artifact.exists() {
            return Err(KitError::ModelNotTrained);
        }

        let raw = std::fs::read_to_string(&model.artifact)?;
        let patterns: Vec<Pattern> = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Pattern::parse)
            .collect::<anyhow::Result<_>>()
            .map_err(|err| KitError::execution(PluginKind::TgaStatic, NAME, "generate", err))?;
        if patterns.is_empty() {
            return Err(KitError::ModelNotTrained);
        }

        let mut rng = rand::rng();
        let addresses = generate_unique(
            count,
            || {
                let pattern = patterns
                    .choose(&mut rng)
                    .expect("patterns checked non-empty");
                Ok(vec![pattern.fill(&mut rng)])
            },
            |candidate| candidate.parse::<std::net::Ipv6Addr>().is_ok(),
            ctx.events.as_ref(),
            &ctx.cancel,
        )?;

        self.env.finish();
        Ok(AddressSet {
            name: NAME.to_string(),
            description: Some(format!("{count} pattern-sampled candidate addresses")),
            addresses,
        })
    }
}
