//! # Dispatcher
//!
//! Binds a requested `(kind, name, action)` to a concrete plugin and runs
//! it: registry lookup, configuration validation, instance construction,
//! auto-provisioning, capability invocation, error tagging.
//!
//! Instances are per-call and discarded afterwards: two sequential
//! `execute` calls for the same plugin are logically independent unless
//! the caller threads a [`ModelHandle`] from a prior `train` back in.
//! The dispatcher itself performs no caching and no retries.

use std::path::PathBuf;
use std::sync::Arc;

use sixkit_common::config::PluginConfig;
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::{CancelToken, EventSink, NullSink};
use sixkit_common::model::{
    AddressSet, AnalysisReport, ModelHandle, PluginKind, ScanResultSet,
};

use crate::capability::PluginInstance;
use crate::exec::{Exec, SystemExec};
use crate::plugin::{LifecycleState, PluginContext};
use crate::registry::Registry;
use crate::workspace::Workspace;

/// The closed set of lifecycle actions the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Setup,
    Train,
    Generate { count: u64 },
    Discover { budget: u64 },
    Scan,
    Analyze,
    Download,
    Clean,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Setup => "setup",
            Action::Train => "train",
            Action::Generate { .. } => "generate",
            Action::Discover { .. } => "discover",
            Action::Scan => "scan",
            Action::Analyze => "analyze",
            Action::Download => "download",
            Action::Clean => "clean",
        }
    }

    /// Data-bearing actions need a provisioned environment first.
    fn needs_environment(&self) -> bool {
        !matches!(self, Action::Setup | Action::Clean)
    }
}

/// Typed input accompanying a request.
#[derive(Debug, Clone)]
pub enum Input {
    None,
    Addresses(AddressSet),
    Results(ScanResultSet),
    Model(ModelHandle),
}

/// Typed result of a completed action.
#[derive(Debug, Clone)]
pub enum Output {
    None,
    Addresses(AddressSet),
    Results(ScanResultSet),
    Report(AnalysisReport),
    Model(ModelHandle),
}

/// Names the scanner a dynamic TGA borrows for its probes.
#[derive(Debug, Clone)]
pub struct ScannerRef {
    pub name: String,
    pub config: PluginConfig,
}

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub kind: PluginKind,
    pub name: String,
    pub action: Action,
    pub config: PluginConfig,
    pub input: Input,
    /// Only meaningful for `Discover`.
    pub scanner: Option<ScannerRef>,
}

impl ExecuteRequest {
    pub fn new(kind: PluginKind, name: &str, action: Action) -> Self {
        Self {
            kind,
            name: name.to_string(),
            action,
            config: PluginConfig::new(),
            input: Input::None,
            scanner: None,
        }
    }

    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    pub fn with_scanner(mut self, scanner: ScannerRef) -> Self {
        self.scanner = Some(scanner);
        self
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    workdir: PathBuf,
    exec: Arc<dyn Exec>,
    events: Arc<dyn EventSink>,
    cancel: CancelToken,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, workdir: PathBuf) -> Self {
        Self {
            registry,
            workdir,
            exec: Arc::new(SystemExec),
            events: Arc::new(NullSink),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_exec(mut self, exec: Arc<dyn Exec>) -> Self {
        self.exec = exec;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs one action to completion and returns its typed output.
    pub async fn execute(&self, request: ExecuteRequest) -> KitResult<Output> {
        let ExecuteRequest {
            kind,
            name,
            action,
            config,
            input,
            scanner,
        } = request;

        // Fail before any filesystem work when the plugin does not exist.
        let spec = self.registry.lookup(kind, &name)?;
        config.validate(spec.params)?;

        let mut instance = (spec.factory)(&config)?;
        let ctx = self.context_for(kind, &name);

        if action.needs_environment()
            && instance.as_plugin().state() == LifecycleState::Unconfigured
        {
            self.provision(&mut instance, &ctx).await?;
        }

        tracing::debug!(kind = %kind, name = %name, action = action.name(), "dispatching");

        self.invoke(&mut instance, action, input, scanner, &ctx)
            .await
            .map_err(|err| tag(err, kind, &name, action.name()))
    }

    fn context_for(&self, kind: PluginKind, name: &str) -> PluginContext {
        let root = self.workdir.join(kind.as_str()).join(name);
        PluginContext::new(
            Workspace::new(root),
            self.events.clone(),
            self.cancel.clone(),
            self.exec.clone(),
        )
    }

    /// Auto-setup before a data-bearing action; the action is never
    /// attempted when provisioning fails.
    async fn provision(&self, instance: &mut PluginInstance, ctx: &PluginContext) -> KitResult<()> {
        instance.as_plugin_mut().setup(ctx).await.map_err(|err| match err {
            KitError::SetupFailed { .. } | KitError::Cancelled => err,
            other => KitError::setup_failed(other),
        })
    }

    async fn invoke(
        &self,
        instance: &mut PluginInstance,
        action: Action,
        input: Input,
        scanner: Option<ScannerRef>,
        ctx: &PluginContext,
    ) -> KitResult<Output> {
        match (action, instance) {
            (Action::Setup, instance) => {
                self.provision(instance, ctx).await?;
                Ok(Output::None)
            }
            (Action::Clean, instance) => {
                instance.as_plugin_mut().clean(ctx).await?;
                Ok(Output::None)
            }
            (Action::Download, PluginInstance::Dataset(plugin)) => {
                Ok(Output::Addresses(plugin.download(ctx).await?))
            }
            (Action::Scan, PluginInstance::Scan(plugin)) => {
                let Input::Addresses(targets) = input else {
                    return Err(KitError::ConfigValidation(
                        "scan requires an address set input".to_string(),
                    ));
                };
                Ok(Output::Results(plugin.scan(ctx, &targets).await?))
            }
            (Action::Train, PluginInstance::StaticTga(plugin)) => {
                let Input::Addresses(seeds) = input else {
                    return Err(KitError::ConfigValidation(
                        "train requires a seed address set".to_string(),
                    ));
                };
                Ok(Output::Model(plugin.train(ctx, &seeds).await?))
            }
            (Action::Generate { count }, PluginInstance::StaticTga(plugin)) => {
                if count == 0 {
                    return Err(KitError::InvalidCount);
                }
                let Input::Model(model) = input else {
                    return Err(KitError::ModelNotTrained);
                };
                Ok(Output::Addresses(plugin.generate(ctx, &model, count).await?))
            }
            (Action::Discover { budget }, PluginInstance::DynamicTga(plugin)) => {
                let Input::Addresses(seeds) = input else {
                    return Err(KitError::ConfigValidation(
                        "discover requires a seed address set".to_string(),
                    ));
                };
                let scanner = scanner.ok_or_else(|| {
                    KitError::ConfigValidation(
                        "discover requires a scanner plugin reference".to_string(),
                    )
                })?;
                let mut borrowed = self.build_scanner(&scanner).await?;
                Ok(Output::Addresses(
                    plugin.discover(ctx, &seeds, borrowed.as_mut(), budget).await?,
                ))
            }
            (Action::Analyze, PluginInstance::Analyze(plugin)) => {
                let Input::Results(results) = input else {
                    return Err(KitError::ConfigValidation(
                        "analyze requires a scan result set input".to_string(),
                    ));
                };
                Ok(Output::Report(plugin.analyze(ctx, &results).await?))
            }
            (action, instance) => Err(KitError::ConfigValidation(format!(
                "action '{}' is not supported by {} plugins",
                action.name(),
                instance.kind(),
            ))),
        }
    }

    /// Constructs and provisions the scanner a dynamic TGA borrows.
    async fn build_scanner(
        &self,
        scanner: &ScannerRef,
    ) -> KitResult<Box<dyn crate::capability::Scan>> {
        let spec = self.registry.lookup(PluginKind::Scan, &scanner.name)?;
        scanner.config.validate(spec.params)?;

        let mut instance = (spec.factory)(&scanner.config)?;
        let ctx = self.context_for(PluginKind::Scan, &scanner.name);
        self.provision(&mut instance, &ctx).await?;

        match instance {
            PluginInstance::Scan(plugin) => Ok(plugin),
            other => Err(KitError::ConfigValidation(format!(
                "plugin {}/{} is not a scanner",
                other.kind(),
                scanner.name,
            ))),
        }
    }
}

/// Precondition failures pass through untouched; anything opaque gets
/// wrapped with kind/name/action for diagnostics.
fn tag(err: KitError, kind: PluginKind, name: &str, action: &str) -> KitError {
    match err {
        KitError::ConfigValidation(_)
        | KitError::UnknownPlugin { .. }
        | KitError::DuplicateRegistration { .. }
        | KitError::EnvironmentNotReady
        | KitError::SetupFailed { .. }
        | KitError::ModelNotTrained
        | KitError::InvalidCount
        | KitError::InsufficientCandidates { .. }
        | KitError::PluginExecution { .. }
        | KitError::Cancelled => err,
        other => KitError::execution(kind, name, action, other),
    }
}
