//! `preload inspect`: show how sources resolve, without loading them.

use std::io::{self, Write};

use preload_queue::{ItemNormalizer, PluginRegistry, Strategy};

use crate::commands::SourceArgs;
use crate::error::CliError;
use crate::presentation::tables::{format_optional, truncate_string, write_separator};
use crate::sources::ManifestFile;

/// How one descriptor resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Item {
        id: String,
        src: String,
        resource_type: String,
        extension: Option<String>,
        strategy: Strategy,
    },
    Skipped,
    Invalid(String),
}

/// One row of the inspect table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectRow {
    /// Source as written in the arguments or manifest.
    pub input: String,
    pub resolution: Resolution,
}

/// Execute the inspect command.
pub fn execute(
    sources: &SourceArgs,
    base_path: Option<String>,
    prefer_network: bool,
) -> anyhow::Result<()> {
    let rows = inspect(sources, base_path, prefer_network)?;
    write_table(&rows, &mut io::stdout().lock())?;
    Ok(())
}

/// Normalize every source without enqueueing anything.
///
/// Manifest entries are expanded here, with the manifest's `path` prefix,
/// since nothing is fetched.
pub fn inspect(
    sources: &SourceArgs,
    base_path: Option<String>,
    prefer_network: bool,
) -> Result<Vec<InspectRow>, CliError> {
    let normalizer = ItemNormalizer::new(base_path);
    let plugins = PluginRegistry::new();

    let mut groups = Vec::new();
    if let Some(path) = &sources.manifest {
        let manifest = ManifestFile::read(path)?;
        let prefix = manifest.prefix().map(str::to_string);
        groups.push((prefix, manifest.into_descriptors()));
    }
    groups.push((None, sources.positional()));

    let mut rows = Vec::new();
    for (prefix, descriptors) in groups {
        for descriptor in descriptors {
            let input = descriptor.src().to_string();
            let resolution = match normalizer.normalize_in(descriptor, &plugins, prefix.as_deref()) {
                Ok(Some(item)) => Resolution::Item {
                    strategy: Strategy::for_item(&item, prefer_network),
                    id: item.id,
                    src: item.src,
                    resource_type: item.resource_type.to_string(),
                    extension: item.extension,
                },
                Ok(None) => Resolution::Skipped,
                Err(e) => Resolution::Invalid(e.user_message()),
            };
            rows.push(InspectRow { input, resolution });
        }
    }

    if rows.is_empty() {
        return Err(CliError::Arguments(
            "nothing to inspect: pass sources or --manifest".to_string(),
        ));
    }
    Ok(rows)
}

/// Render inspect rows as a table.
pub fn write_table(rows: &[InspectRow], out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{:<24} {:<10} {:<5} {:<8}  SRC", "ID", "TYPE", "EXT", "VIA")?;
    write_separator(out, 80)?;
    for row in rows {
        match &row.resolution {
            Resolution::Item {
                id,
                src,
                resource_type,
                extension,
                strategy,
            } => writeln!(
                out,
                "{:<24} {:<10} {:<5} {:<8}  {}",
                truncate_string(id, 24),
                resource_type,
                format_optional(extension.as_ref(), "-"),
                strategy.as_str(),
                src
            )?,
            Resolution::Skipped => {
                writeln!(out, "{:<24} skipped by plugin", truncate_string(&row.input, 24))?;
            }
            Resolution::Invalid(message) => {
                writeln!(out, "{:<24} invalid: {message}", truncate_string(&row.input, 24))?;
            }
        }
    }
    Ok(())
}
