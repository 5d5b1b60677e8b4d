//! Export module for handing finished heightfields to other tools.
//!
//! Only plain RAW sample dumps are written; meshing and rendering live
//! downstream.

mod raw;

pub use raw::{expected_file_size, export_raw, write_raw, RawExportError, RawExportOptions, RawFormat};
