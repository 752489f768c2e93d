//! Helpers shared by the population formats.

use crate::format::traits::{ExportOptions, ExportResult, FormatWarning};
use crate::model::Population;

/// Populations of one dataset that should be written, honoring `options`.
///
/// Populations without segments cannot be represented in row-based formats;
/// when `rows_only` is set they are skipped with a warning.
pub fn exportable<'a>(
    populations: &'a [Population],
    dataset: Option<&str>,
    options: &ExportOptions,
    rows_only: bool,
    result: &mut ExportResult,
) -> Vec<&'a Population> {
    populations
        .iter()
        .filter(|p| options.include_hidden || p.visible)
        .filter(|p| {
            if rows_only && p.segments.is_empty() {
                result.add_warning(
                    FormatWarning::new(format!(
                        "Population '{}' has no segments and was not written",
                        p.name
                    ))
                    .with_dataset(dataset),
                );
                false
            } else {
                true
            }
        })
        .collect()
}
