//! The common contract every backend satisfies.
//!
//! A plugin is identified by its [`Descriptor`], moves through a small
//! lifecycle and receives everything environmental through the
//! [`PluginContext`] the dispatcher builds per invocation. Capability
//! methods live in [`crate::capability`]; this module only covers what is
//! shared: identity, state, setup and cleanup.

use std::sync::Arc;

use async_trait::async_trait;

use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::{CancelToken, EventSink};
use sixkit_common::model::Descriptor;

use crate::exec::Exec;
use crate::workspace::Workspace;

/// Per-invocation surroundings handed to every lifecycle method.
pub struct PluginContext {
    pub workspace: Workspace,
    pub events: Arc<dyn EventSink>,
    pub cancel: CancelToken,
    pub exec: Arc<dyn Exec>,
}

impl PluginContext {
    pub fn new(
        workspace: Workspace,
        events: Arc<dyn EventSink>,
        cancel: CancelToken,
        exec: Arc<dyn Exec>,
    ) -> Self {
        Self {
            workspace,
            events,
            cancel,
            exec,
        }
    }
}

/// Observable lifecycle of a plugin instance.
///
/// Static TGAs pass through `Trained`; dynamic TGAs use `Discovering`
/// while probing. Transitions are driven by the dispatcher invoking the
/// matching lifecycle method; an action requested out of order fails
/// with a taxonomy error rather than silently doing nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    EnvironmentReady,
    Trained,
    Busy,
    Discovering,
    Idle,
}

#[async_trait]
pub trait Plugin: Send {
    fn descriptor(&self) -> &Descriptor;

    fn state(&self) -> LifecycleState;

    /// Prepares the environment. Idempotent: a second call on an already
    /// provisioned workspace is a no-op.
    async fn setup(&mut self, ctx: &PluginContext) -> KitResult<()>;

    /// Releases everything `setup` provisioned and returns the instance
    /// to `Unconfigured`.
    async fn clean(&mut self, ctx: &PluginContext) -> KitResult<()>;
}

/// Lifecycle bookkeeping shared by workspace-backed plugins.
///
/// Instances start `Unconfigured`; provisioning done by an earlier
/// process run is picked up through the workspace ready marker, which is
/// what keeps `setup` idempotent.
#[derive(Debug)]
pub struct EnvState {
    state: LifecycleState,
}

impl Default for EnvState {
    fn default() -> Self {
        Self {
            state: LifecycleState::Unconfigured,
        }
    }
}

impl EnvState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> LifecycleState {
        self.state
    }

    /// True when the workspace already carries a completed provisioning.
    pub fn already_provisioned(&mut self, workspace: &Workspace) -> bool {
        if workspace.is_provisioned() {
            self.mark_ready();
            return true;
        }
        false
    }

    pub fn mark_ready(&mut self) {
        self.state = LifecycleState::EnvironmentReady;
    }

    pub fn mark_trained(&mut self) {
        self.state = LifecycleState::Trained;
    }

    pub fn require_ready(&self) -> KitResult<()> {
        match self.current() {
            LifecycleState::Unconfigured => Err(KitError::EnvironmentNotReady),
            _ => Ok(()),
        }
    }

    /// Enters a working state (`Busy` or `Discovering`).
    pub fn begin(&mut self, working: LifecycleState) -> KitResult<()> {
        self.require_ready()?;
        self.state = working;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.state = LifecycleState::Idle;
    }

    pub fn reset(&mut self) {
        self.state = LifecycleState::Unconfigured;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_before_setup_are_rejected() {
        let state = EnvState::new();
        assert_eq!(state.current(), LifecycleState::Unconfigured);
        assert!(matches!(
            state.require_ready(),
            Err(KitError::EnvironmentNotReady)
        ));
    }

    #[test]
    fn begin_and_finish_walk_the_lifecycle() {
        let mut state = EnvState::new();
        state.mark_ready();
        state.begin(LifecycleState::Busy).unwrap();
        assert_eq!(state.current(), LifecycleState::Busy);
        state.finish();
        assert_eq!(state.current(), LifecycleState::Idle);

        state.reset();
        assert!(state.require_ready().is_err());
    }

    #[test]
    fn provisioned_workspace_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf());
        ws.mark_provisioned().unwrap();

        let mut state = EnvState::new();
        assert!(state.already_provisioned(&ws));
        assert_eq!(state.current(), LifecycleState::EnvironmentReady);
    }
}
