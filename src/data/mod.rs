//! Per-box data buffers and the distributed level container.

pub mod base_fab;
pub mod level_data;

pub use base_fab::BaseFab;
pub use level_data::LevelData;
