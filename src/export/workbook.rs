//! Template filling: writes one equipment record into a workbook.

use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::structs::{Image, Worksheet};

use super::layout::{CellRange, CellRef, DEFAULT_PHOTO_ANCHOR, Layout, ResolvedSlot};
use crate::error::{AppError, Result};
use crate::models::equipment::{CellValue, Equipment};

/// English Metric Units per screen pixel at 96 dpi.
const EMU_PER_PIXEL: i64 = 9525;

/// How an embedded photo is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PhotoScale {
    /// Native pixel size of the image.
    #[default]
    Original,
    /// Explicit size in pixels.
    Fixed { width_px: u32, height_px: u32 },
}

/// Where and how the photo is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoPlacement {
    /// Top-left cell of the image.
    pub anchor: CellRef,
    pub scale: PhotoScale,
}

impl Default for PhotoPlacement {
    fn default() -> Self {
        Self {
            anchor: DEFAULT_PHOTO_ANCHOR,
            scale: PhotoScale::Original,
        }
    }
}

/// Everything the exporter needs besides the record and the streams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    pub layout: Layout,
    pub sheet_index: usize,
    pub photo: PhotoPlacement,
}

/// Supported photo encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Infer from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Whether `bytes` start with this format's signature.
    pub fn matches(self, bytes: &[u8]) -> bool {
        match self {
            Self::Png => bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

/// What happened to the record's photo.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoOutcome {
    /// The record has no photo.
    None,
    Embedded { path: PathBuf, kind: ImageKind },
    /// The photo was left out; the export itself still succeeded.
    Skipped { path: PathBuf, reason: String },
}

/// Summary of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub writes: Vec<ResolvedSlot>,
    pub photo: PhotoOutcome,
    pub bytes_written: usize,
}

impl ExportReport {
    /// Number of writes redirected to a merged-range anchor.
    pub fn redirected(&self) -> usize {
        self.writes.iter().filter(|w| w.redirected()).count()
    }
}

/// Fill `template` with `equipment` and write the resulting workbook to `sink`.
///
/// The workbook is serialized to memory first; `sink` receives nothing unless
/// the whole export succeeded.
pub fn export_equipment<R: Read, W: Write>(
    equipment: &Equipment,
    mut template: R,
    mut sink: W,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let mut template_bytes = Vec::new();
    template.read_to_end(&mut template_bytes)?;
    if template_bytes.is_empty() {
        return Err(AppError::export("template is empty"));
    }

    // The spreadsheet reader panics on some damaged archives
    let (bytes, writes, photo) = panic::catch_unwind(AssertUnwindSafe(|| render(equipment, template_bytes, options)))
        .map_err(|_| AppError::export("cannot read template: corrupt workbook"))??;

    sink.write_all(&bytes)?;
    sink.flush()?;

    info!(
        "Exported {} fields ({} via merged anchors), {} bytes",
        writes.len(),
        writes.iter().filter(|w| w.redirected()).count(),
        bytes.len()
    );

    Ok(ExportReport {
        writes,
        photo,
        bytes_written: bytes.len(),
    })
}

fn render(
    equipment: &Equipment,
    template_bytes: Vec<u8>,
    options: &ExportOptions,
) -> Result<(Vec<u8>, Vec<ResolvedSlot>, PhotoOutcome)> {
    let mut book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(template_bytes), true)
        .map_err(|e| AppError::export(format!("cannot read template: {e}")))?;

    let sheet = book
        .get_sheet_mut(&options.sheet_index)
        .ok_or_else(|| AppError::export(format!("template has no sheet {}", options.sheet_index)))?;

    let merged = merged_ranges(sheet);
    let resolved = options.layout.resolve(&merged)?;
    debug!("Template has {} merged ranges", merged.len());

    for write in resolved.writes() {
        let (col, row) = write.target.one_based();
        let cell = sheet.get_cell_mut((col, row));
        match equipment.cell_value(write.field) {
            CellValue::Text(text) => {
                cell.set_value_string(text);
            }
            CellValue::Number(number) => {
                cell.set_value_number(number);
            }
            CellValue::Empty => {
                cell.set_value_string("");
            }
        }
    }

    let photo = match &equipment.photo_path {
        Some(path) => embed_photo(sheet, path, &options.photo),
        None => PhotoOutcome::None,
    };

    let mut buffer = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buffer)
        .map_err(|e| AppError::export(format!("cannot write workbook: {e}")))?;

    Ok((buffer.into_inner(), resolved.writes().to_vec(), photo))
}

/// Merged ranges of a sheet. Unparseable entries are ignored.
pub fn merged_ranges(sheet: &Worksheet) -> Vec<CellRange> {
    sheet
        .get_merge_cells()
        .iter()
        .filter_map(|range| {
            let text = range.get_range();
            match text.parse::<CellRange>() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Ignoring merged range '{}': {}", text, e);
                    None
                }
            }
        })
        .collect()
}

fn embed_photo(sheet: &mut Worksheet, path: &Path, placement: &PhotoPlacement) -> PhotoOutcome {
    let skipped = |reason: String| {
        warn!("Photo {} not embedded: {}", path.display(), reason);
        PhotoOutcome::Skipped {
            path: path.to_path_buf(),
            reason,
        }
    };

    let Some(kind) = ImageKind::from_path(path) else {
        return skipped("unsupported image format, use JPEG or PNG".to_string());
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return skipped(format!("cannot read image: {e}")),
    };
    if !kind.matches(&bytes) {
        return skipped(format!("file content is not {kind:?}"));
    }

    let size = match imagesize::blob_size(&bytes) {
        Ok(size) => size,
        Err(e) => return skipped(format!("damaged image: {e}")),
    };
    let (Ok(width), Ok(height)) = (u32::try_from(size.width), u32::try_from(size.height)) else {
        return skipped(format!("image too large: {}x{}", size.width, size.height));
    };

    let mut marker = MarkerType::default();
    marker.set_coordinate(placement.anchor.to_string());

    let mut image = Image::default();
    image.new_image_with_dimensions(height, width, &format!("photo.{}", kind.extension()), bytes, marker);

    if let PhotoScale::Fixed { width_px, height_px } = placement.scale {
        if let Some(anchor) = image.get_one_cell_anchor_mut() {
            let extent = anchor.get_extent_mut();
            extent.set_cx(i64::from(width_px) * EMU_PER_PIXEL);
            extent.set_cy(i64::from(height_px) * EMU_PER_PIXEL);
        }
    }

    sheet.add_image(image);
    debug!("Embedded {:?} photo at {}", kind, placement.anchor);

    PhotoOutcome::Embedded {
        path: path.to_path_buf(),
        kind,
    }
}
