//! Built-in sixkit backends.
//!
//! Registration is explicit and deterministic: `main` calls
//! [`register_builtins`] once at startup, before any dispatch. No module
//! registers itself as a side effect of being linked in.

pub mod analyze;
pub mod dataset;
pub mod scan;
pub mod tga;

use sixkit_common::error::KitResult;
use sixkit_core::registry::Registry;

/// Registers every built-in backend. Fails on the first name collision.
pub fn register_builtins(registry: &mut Registry) -> KitResult<()> {
    registry.register(dataset::seed_file_spec())?;
    registry.register(scan::zmap6::icmp_echo_spec())?;
    registry.register(scan::zmap6::tcp_syn_spec())?;
    registry.register(tga::sixgen::spec())?;
    registry.register(tga::entropyip::spec())?;
    registry.register(tga::det::spec())?;
    registry.register(analyze::status_summary_spec())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixkit_common::model::PluginKind;

    #[test]
    fn builtins_register_exactly_once() {
        let mut registry = Registry::new();
        register_builtins(&mut registry).unwrap();
        assert_eq!(registry.len(), 7);

        assert_eq!(
            registry.list(PluginKind::Scan),
            vec!["zmap6-icmp-echo", "zmap6-tcp-syn"]
        );
        assert_eq!(
            registry.list(PluginKind::TgaStatic),
            vec!["entropy-ip", "sixgen"]
        );
        assert_eq!(registry.list(PluginKind::TgaDynamic), vec!["det"]);

        // a second bootstrap into the same registry must collide
        let err = register_builtins(&mut registry).unwrap_err();
        assert!(matches!(
            err,
            sixkit_common::error::KitError::DuplicateRegistration { .. }
        ));
    }
}
