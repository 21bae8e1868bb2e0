//! # Capability Contracts
//!
//! One trait per capability, composed instead of inherited: a dynamic TGA
//! *borrows* a [`Scan`] implementation for its probes rather than being
//! one, which mirrors the real dependency and spares backends from
//! stubbing out a universal interface.

use async_trait::async_trait;

use sixkit_common::error::KitResult;
use sixkit_common::model::{AddressSet, AnalysisReport, ModelHandle, PluginKind, ScanResultSet};

use crate::plugin::{Plugin, PluginContext};

/// Fetches a named address collection from wherever it lives.
#[async_trait]
pub trait Dataset: Plugin {
    async fn download(&mut self, ctx: &PluginContext) -> KitResult<AddressSet>;
}

/// Probes a set of addresses.
///
/// Must accept an empty input and answer with an empty result set (with
/// its `scan_name` filled in) without touching the command adapter.
#[async_trait]
pub trait Scan: Plugin {
    async fn scan(&mut self, ctx: &PluginContext, targets: &AddressSet) -> KitResult<ScanResultSet>;
}

/// Train-then-generate target generation.
#[async_trait]
pub trait StaticTga: Plugin {
    /// Builds a model from seed addresses and returns an opaque handle to
    /// the stored artifact. Fails with `EnvironmentNotReady` before setup.
    async fn train(&mut self, ctx: &PluginContext, seeds: &AddressSet) -> KitResult<ModelHandle>;

    /// Produces `count` candidate addresses from a previously trained
    /// model. Fails with `ModelNotTrained` when the handle is absent,
    /// foreign or its artifact is gone, and `InvalidCount` on zero.
    async fn generate(
        &mut self,
        ctx: &PluginContext,
        model: &ModelHandle,
        count: u64,
    ) -> KitResult<AddressSet>;
}

/// Interactive exploration of the address space.
#[async_trait]
pub trait DynamicTga: Plugin {
    /// `budget` bounds scan probes, not output size; discovery may return
    /// fewer addresses when the space dries up early.
    async fn discover(
        &mut self,
        ctx: &PluginContext,
        seeds: &AddressSet,
        scanner: &mut dyn Scan,
        budget: u64,
    ) -> KitResult<AddressSet>;
}

/// Turns scan results into a report.
#[async_trait]
pub trait Analyze: Plugin {
    async fn analyze(
        &mut self,
        ctx: &PluginContext,
        results: &ScanResultSet,
    ) -> KitResult<AnalysisReport>;
}

/// A constructed plugin, tagged by the capability it carries.
pub enum PluginInstance {
    Dataset(Box<dyn Dataset>),
    Scan(Box<dyn Scan>),
    StaticTga(Box<dyn StaticTga>),
    DynamicTga(Box<dyn DynamicTga>),
    Analyze(Box<dyn Analyze>),
}

impl PluginInstance {
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginInstance::Dataset(_) => PluginKind::Dataset,
            PluginInstance::Scan(_) => PluginKind::Scan,
            PluginInstance::StaticTga(_) => PluginKind::TgaStatic,
            PluginInstance::DynamicTga(_) => PluginKind::TgaDynamic,
            PluginInstance::Analyze(_) => PluginKind::Analyze,
        }
    }

    pub fn as_plugin(&self) -> &dyn Plugin {
        match self {
            PluginInstance::Dataset(p) => p.as_ref(),
            PluginInstance::Scan(p) => p.as_ref(),
            PluginInstance::StaticTga(p) => p.as_ref(),
            PluginInstance::DynamicTga(p) => p.as_ref(),
            PluginInstance::Analyze(p) => p.as_ref(),
        }
    }

    pub fn as_plugin_mut(&mut self) -> &mut dyn Plugin {
        match self {
            PluginInstance::Dataset(p) => p.as_mut(),
            PluginInstance::Scan(p) => p.as_mut(),
            PluginInstance::StaticTga(p) => p.as_mut(),
            PluginInstance::DynamicTga(p) => p.as_mut(),
            PluginInstance::Analyze(p) => p.as_mut(),
        }
    }
}
