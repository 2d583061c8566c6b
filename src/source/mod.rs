pub mod autotimestamp;
pub mod loader;
pub mod timestamp;

pub use autotimestamp::{apply_autotimestamps, TimestampCandidate};
pub use loader::{load_sample, LoadError};
pub use timestamp::{TimestampError, TimestampExtractor};
