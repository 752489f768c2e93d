//! Data models for cytoset.

mod population;

pub use population::{Population, PopulationId, PopulationStore};
