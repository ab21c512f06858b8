//! Excel export of equipment records into a fixed template.

pub mod layout;
pub mod template;
mod workbook;


use chrono::Local;

pub use layout::{CellRange, CellRef, DEFAULT_LAYOUT, DEFAULT_PHOTO_ANCHOR, FieldSlot, Layout, ResolvedLayout};
pub use template::{build_default_template, write_default_template};
pub use workbook::{
    ExportOptions, ExportReport, ImageKind, PhotoOutcome, PhotoPlacement, PhotoScale, export_equipment, merged_ranges,
};

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}
