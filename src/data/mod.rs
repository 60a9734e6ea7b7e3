//! Dataset provider
//!
//! Loads the raw table, splits it into fixed training and test partitions
//! and persists the [`Artifacts`] every model pipeline starts from.

mod artifacts;
mod loader;
mod split;
mod table;

pub use artifacts::Artifacts;
pub use loader::{dataset_from_frame, load_csv};
pub use split::{initial_split, DatasetSplit};
pub use table::{ClassLabels, Column, Dataset, Table};
