pub mod store;

pub use store::{replace_date, upsert, DatasetStore, MergeSummary, UpsertOutcome};
