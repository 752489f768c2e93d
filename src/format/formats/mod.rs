//! Population format implementations.

mod common;
mod json;
mod population_csv;
mod project_csv;

#[cfg(test)]
mod tests;

pub use json::PopulationJsonFormat;
pub use population_csv::PopulationCsvFormat;
pub use project_csv::ProjectCsvFormat;
