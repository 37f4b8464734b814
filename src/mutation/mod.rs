//! Rewriting EXIF blocks with a backup that is restored when the rewrite fails.
mod transaction;
mod writer;

pub use transaction::{MutationTransaction, TransactionState};
pub use writer::{ContainerSink, FileSink, LocationWriter, WriteOutcome};
