use crate::config::{resolve, Config, RawStanza, ResolveError};
use crate::export::{export, ExportError, GenerationDescriptor};
use crate::source::{apply_autotimestamps, LoadError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("sample load failed: {0}")]
    Load(#[from] LoadError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Resolve `stanzas`, load and timestamp-scan the samples, and export them.
pub fn compile(config: &mut Config, stanzas: &[RawStanza]) -> Result<GenerationDescriptor, CompileError> {
    let mut samples = resolve(config, stanzas)?;
    apply_autotimestamps(config, &mut samples)?;
    let descriptor = export(config, &mut samples)?;

    info!(
        samples = descriptor.samples.len(),
        tokens = descriptor.samples.iter().map(|s| s.tokens.len()).sum::<usize>(),
        "Compiled generation descriptor"
    );
    Ok(descriptor)
}
