//! CSV output: row assembly and on-disk layout.

pub mod files;
pub mod row;

pub use files::{Accumulator, DataFiles, remove_data_files};
pub use row::{RowAssembler, RowLabel, RunPosition};
