//! cytoset - multiplexed tissue image analysis
//!
//! Loads datasets of per-marker intensity channels together with a cell
//! segmentation mask, computes per-segment statistics on background worker
//! threads and manages named populations of segments.
//!
//! The entry point is [`state::Project`]: it owns a bounded cache of resident
//! datasets, the statistics workers and the populations of every dataset.

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod data;
pub mod format;
pub mod model;
pub mod segmentation;
pub mod state;
pub mod statistics;
