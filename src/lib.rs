pub mod cli;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod sample;
pub mod source;

pub use config::{Config, RawStanza, SearchPaths};
pub use export::GenerationDescriptor;
pub use pipeline::{compile, CompileError};
pub use sample::{EventRecord, Sample, Token};
