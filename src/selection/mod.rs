pub mod store;
pub mod types;

pub use store::{BulkSelectReport, NavigateOutcome, SelectionStore};
pub use types::{CurrentPageView, SelectionSet};
