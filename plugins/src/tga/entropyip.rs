//! # entropy-ip: external-pipeline TGA
//!
//! Wraps the published Entropy/IP analysis scripts. Setup clones the
//! upstream repository and provisions a Python 2.7 virtualenv; training
//! pushes the seeds through the a1→a5 pipeline to produce the Bayesian
//! model; generation decodes candidate batches with c1-gen/c2-decode and
//! dedups them through the unique sampler. Every external step goes
//! through the command adapter; none of the model's numerics live here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use sixkit_common::config::{ParamKind, ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::LogLevel;
use sixkit_common::model::{AddressSet, Descriptor, ModelHandle, PluginKind};
use sixkit_core::capability::{PluginInstance, StaticTga};
use sixkit_core::exec::CommandSpec;
use sixkit_core::plugin::{EnvState, LifecycleState, Plugin, PluginContext};
use sixkit_core::registry::PluginSpec;
use sixkit_core::sample::generate_unique;
use sixkit_core::workspace::Workspace;

const NAME: &str = "entropy-ip";
const DEFAULT_REPO_URL: &str = "https://github.com/akamai/entropy-ip";
const PYTHON_VERSION: &str = "2.7.18";
const PYTHON_DEPS: &[&str] = &["toposort==1.7", "matplotlib", "scikit-learn", "bnfinder"];

const PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "repo-url",
    ParamKind::Str,
    "git URL of the entropy-ip sources",
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
        "Entropy/IP Bayesian-model TGA driven through its upstream scripts.",
    )
}

fn factory(config: &PluginConfig) -> KitResult<PluginInstance> {
    Ok(PluginInstance::StaticTga(Box::new(EntropyIpTga {
        descriptor: descriptor(),
        env: EnvState::new(),
        repo_url: config
            .get_str("repo-url")
            .unwrap_or_else(|| DEFAULT_REPO_URL.to_string()),
    })))
}

struct EntropyIpTga {
    descriptor: Descriptor,
    env: EnvState,
    repo_url: String,
}

fn shell(cmdline: String) -> CommandSpec {
    CommandSpec::new("sh").args(["-c".to_string(), cmdline])
}

/// `20010db8...0001` -> `2001:0db8:...:0001`
fn add_colons(nybbles: &str) -> String {
    let mut out = String::with_capacity(39);
    for (i, c) in nybbles.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(':');
        }
        out.push(c);
    }
    out
}

impl EntropyIpTga {
    fn clone_dir(&self, workspace: &Workspace) -> PathBuf {
        workspace.sources_dir().join("entropy-ip")
    }

    fn venv_python(&self, workspace: &Workspace) -> PathBuf {
        workspace.env_dir().join("venv").join("bin").join("python")
    }

    fn provision(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        let workspace = &ctx.workspace;
        let clone_dir = self.clone_dir(workspace);

        if !clone_dir.exists() {
            tracing::info!(url = %self.repo_url, "cloning entropy-ip sources");
            ctx.exec
                .run(
                    &CommandSpec::new("git")
                        .arg("clone")
                        .arg(&self.repo_url)
                        .arg(clone_dir.display().to_string()),
                )?
                .require_success("git clone")?;
        }

        ctx.exec
            .run(
                &CommandSpec::new("pyenv")
                    .args(["install", "--skip-existing", PYTHON_VERSION]),
            )?
            .require_success("pyenv install")?;

        let root = ctx
            .exec
            .run(&CommandSpec::new("pyenv").arg("root"))?;
        root.require_success("pyenv root")?;
        let pyenv_python = Path::new(root.stdout.trim())
            .join("versions")
            .join(PYTHON_VERSION)
            .join("bin")
            .join("python");

        // Python 2 has no built-in venv module; bootstrap virtualenv first.
        ctx.exec
            .run(
                &CommandSpec::new(pyenv_python.display().to_string().as_str()).args([
                    "-m",
                    "pip",
                    "install",
                    "--upgrade",
                    "pip",
                    "virtualenv",
                ]),
            )?
            .require_success("pip bootstrap")?;

        let venv_dir = workspace.env_dir().join("venv");
        ctx.exec
            .run(
                &CommandSpec::new(pyenv_python.display().to_string().as_str()).args([
                    "-m".to_string(),
                    "virtualenv".to_string(),
                    venv_dir.display().to_string(),
                ]),
            )?
            .require_success("virtualenv")?;

        let mut pip_args = vec![
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "--upgrade".to_string(),
            "pip".to_string(),
        ];
        pip_args.extend(PYTHON_DEPS.iter().map(|d| d.to_string()));
        ctx.exec
            .run(&CommandSpec::new(self.venv_python(workspace).display().to_string().as_str()).args(pip_args))?
            .require_success("pip install")?;

        Ok(())
    }
}

#[async_trait]
impl Plugin for EntropyIpTga {
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
            .ensure_layout()
            .map_err(KitError::setup_failed)?;
        self.provision(ctx).map_err(KitError::setup_failed)?;
        ctx.workspace
            .mark_provisioned()
            .map_err(KitError::setup_failed)?;
        self.env.mark_ready();
        ctx.events
            .on_log(LogLevel::Info, "entropy-ip environment ready");
        Ok(())
    }

    async fn clean(&mut self, ctx: &PluginContext) -> KitResult<()> {
        ctx.workspace.clear()?;
        self.env.reset();
        Ok(())
    }
}

#[async_trait]
impl StaticTga for EntropyIpTga {
    async fn train(&mut self, ctx: &PluginContext, seeds: &AddressSet) -> KitResult<ModelHandle> {
        self.env.begin(LifecycleState::Busy)?;

        if seeds.is_empty() {
            return Err(KitError::ConfigValidation(
                "training requires at least one seed address".to_string(),
            ));
        }

        let run = || -> anyhow::Result<PathBuf> {
            let workspace = &ctx.workspace;
            let clone_dir = self.clone_dir(workspace);
            let python = self.venv_python(workspace);
            let train_dir = workspace.train_dir();

            // entropy-ip consumes bare nybble strings, one per line
            let stripped: Vec<String> = seeds
                .addresses
                .iter()
                .map(|addr| addr.chars().filter(|c| *c != ':').collect())
                .collect();
            let seed_file = workspace.write_seeds("seeds.txt", &stripped)?;

            let script = |name: &str| clone_dir.join(name).display().to_string();
            let python = python.display().to_string();
            let seed_file = seed_file.display().to_string();
            let segments = train_dir.join("segments").display().to_string();
            let analysis = train_dir.join("analysis").display().to_string();
            let bnfinput = train_dir.join("bnfinput").display().to_string();
            let model = train_dir.join("model");

            let stages = [
                format!(
                    "cat '{seed_file}' | '{python}' '{a1}' /dev/stdin > '{segments}'",
                    a1 = script("a1-segments.py"),
                ),
                format!(
                    "cat '{seed_file}' | '{python}' '{a2}' /dev/stdin '{segments}' > '{analysis}'",
                    a2 = script("a2-mining.py"),
                ),
                format!(
                    "cat '{seed_file}' | '{python}' '{a3}' /dev/stdin '{analysis}' | '{a4}' /dev/stdin > '{bnfinput}'",
                    a3 = script("a3-encode.py"),
                    a4 = script("a4-bayes-prepare.sh"),
                ),
                format!(
                    "'{a5}' '{bnfinput}' > '{model}'",
                    a5 = script("a5-bayes.sh"),
                    model = model.display(),
                ),
            ];

            for (idx, stage) in stages.iter().enumerate() {
                ctx.events.on_progress(idx as u64 + 1, stages.len() as u64);
                ctx.exec
                    .run(&shell(stage.clone()))?
                    .require_success("entropy-ip training stage")?;
            }

            Ok(model)
        };

        let model = run()
            .map_err(|err| KitError::execution(PluginKind::TgaStatic, NAME, "train", err))?;

        self.env.mark_trained();
        Ok(ModelHandle::new(NAME, model))
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

        let workspace = &ctx.workspace;
        let clone_dir = self.clone_dir(workspace);
        let python = self.venv_python(workspace).display().to_string();
        let model_path = model.artifact.display().to_string();
        let analysis = model
            .artifact
            .parent()
            .map(|dir| dir.join("analysis"))
            .ok_or(KitError::ModelNotTrained)?;
        let reduced = workspace.train_dir().join("reduced").display().to_string();

        let c1 = clone_dir.join("c1-gen.py").display().to_string();
        let c2 = clone_dir.join("c2-decode.py").display().to_string();
        let analysis = analysis.display().to_string();

        let produce_batch = || -> KitResult<Vec<String>> {
            let cmdline = format!(
                "'{python}' '{c1}' '{model_path}' -n {count} > '{reduced}' && \
                 '{python}' '{c2}' '{reduced}' '{analysis}'"
            );
            let output = ctx
                .exec
                .run(&shell(cmdline))
                .and_then(|out| {
                    out.require_success("entropy-ip generation")?;
                    Ok(out)
                })
                .map_err(|err| {
                    KitError::execution(PluginKind::TgaStatic, NAME, "generate", err)
                })?;

            Ok(output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| line.len() == 32)
                .map(add_colons)
                .collect())
        };

        let addresses = generate_unique(
            count,
            produce_batch,
            |candidate| candidate.parse::<std::net::Ipv6Addr>().is_ok(),
            ctx.events.as_ref(),
            &ctx.cancel,
        )?;

        self.env.finish();
        Ok(AddressSet {
            name: NAME.to_string(),
            description: Some(format!("{count} candidates decoded from the Bayesian model")),
            addresses,
        })
    }
}
