//! Global constants for the cytoset library

/// Default number of datasets kept fully loaded at once
pub const DEFAULT_MAX_RESIDENT_DATASETS: usize = 3;

/// Upper bound on statistics/decode worker threads
pub const MAX_WORKER_THREADS: usize = 16;

/// Label value reserved for background pixels in a segmentation mask
pub const BACKGROUND_LABEL: u32 = 0;

/// Prefix for auto-generated population names ("Selection 1", "Selection 2", ...)
pub const SELECTION_NAME_PREFIX: &str = "Selection";

/// Saturation/value used when picking random population colors
pub const POPULATION_COLOR_SATURATION: f32 = 0.75;
pub const POPULATION_COLOR_VALUE: f32 = 0.95;
