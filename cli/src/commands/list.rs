use sixkit_common::model::PluginKind;
use sixkit_core::registry::Registry;

use crate::terminal::print;

pub fn list(registry: &Registry, kind: Option<PluginKind>, q_level: u8) -> anyhow::Result<()> {
    let kinds: Vec<PluginKind> = match kind {
        Some(kind) => vec![kind],
        None => PluginKind::ALL.to_vec(),
    };

    for kind in kinds {
        let names = registry.list(kind);
        if names.is_empty() {
            continue;
        }

        print::header(kind.as_str(), q_level);
        for name in names {
            let spec = registry.lookup(kind, name)?;
            let description = spec
                .descriptor
                .description
                .as_deref()
                .unwrap_or("no description");
            print::aligned_line(
                name,
                format!("{} (v{})", description, spec.descriptor.version),
            );
        }
    }

    Ok(())
}
