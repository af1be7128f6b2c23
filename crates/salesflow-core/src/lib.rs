pub mod dates;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod tables;

pub use error::{EtlError, Result};
pub use layout::StorageLayout;
pub use pipeline::{run, RunSummary};
pub use report::Reporter;
pub use tables::TableStore;
