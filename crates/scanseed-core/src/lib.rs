pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod profile;
pub mod schema;

// Re-export key types for convenience
pub use error::{Result, ScanSeedError};
pub use generate::engine::{run, CancelFlag, GenerationOptions, GenerationReport, TableStatus};
pub use profile::{DatabaseProfile, FieldProfile, FieldType, TableProfile};
pub use schema::types::DatabaseType;
