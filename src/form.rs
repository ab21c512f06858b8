//! Inventory form state: the record being edited and the last export outcome.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info};

use crate::db::EquipmentStore;
use crate::error::{AppError, Result};
use crate::export::{self, ExportOptions, ExportReport, PhotoOutcome};
use crate::models::equipment::{Equipment, EquipmentField};

/// Observable state holder behind the inventory screen.
///
/// Both values are published through `watch` channels so a UI can follow them.
#[derive(Debug)]
pub struct InventoryForm {
    equipment: watch::Sender<Equipment>,
    export_status: watch::Sender<Option<String>>,
}

impl Default for InventoryForm {
    fn default() -> Self {
        Self::new(Equipment::default())
    }
}

impl InventoryForm {
    pub fn new(initial: Equipment) -> Self {
        Self {
            equipment: watch::Sender::new(initial),
            export_status: watch::Sender::new(None),
        }
    }

    /// Snapshot of the record being edited.
    pub fn current(&self) -> Equipment {
        self.equipment.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Equipment> {
        self.equipment.subscribe()
    }

    /// Last export outcome message, if any.
    pub fn export_status(&self) -> Option<String> {
        self.export_status.borrow().clone()
    }

    pub fn subscribe_export_status(&self) -> watch::Receiver<Option<String>> {
        self.export_status.subscribe()
    }

    /// Apply an arbitrary change to the record.
    pub fn update(&self, change: impl FnOnce(&mut Equipment)) {
        self.equipment.send_modify(change);
    }

    /// Set one field from raw text input.
    pub fn set_field(&self, field: EquipmentField, input: &str) {
        self.update(|equipment| equipment.set_field(field, input));
    }

    pub fn set_photo(&self, path: Option<PathBuf>) {
        self.update(|equipment| equipment.photo_path = path);
    }

    /// Start over with an empty record.
    pub fn reset(&self) {
        self.equipment.send_replace(Equipment::default());
    }

    /// Load a stored record for editing.
    pub fn load(&self, equipment: Equipment) {
        self.equipment.send_replace(equipment);
    }

    /// Persist the current record and remember its id.
    pub async fn save(&self, store: &EquipmentStore) -> Result<i32> {
        let id = store.insert(self.current()).await?;
        self.update(|equipment| equipment.id = Some(id));
        Ok(id)
    }

    /// Export the current record, reading the template from `template` and
    /// writing the workbook to `sink`.
    ///
    /// The record is read once at the start. The outcome message is updated
    /// whether the export succeeds or not.
    pub fn export<R: Read, W: Write>(&self, template: R, sink: W, options: &ExportOptions) -> Result<ExportReport> {
        let snapshot = self.current();
        let result = export::export_equipment(&snapshot, template, sink, options);
        self.record_outcome(&result, None);
        result
    }

    /// Export the current record from a template file into `output_dir`.
    ///
    /// Returns the written file path alongside the report.
    pub fn export_to_path(
        &self,
        template_path: &Path,
        output_dir: &Path,
        file_prefix: &str,
        options: &ExportOptions,
    ) -> Result<(PathBuf, ExportReport)> {
        let snapshot = self.current();
        let output_path = output_dir.join(export::generate_export_filename(file_prefix));

        let result = export_file(&snapshot, template_path, &output_path, options);
        self.record_outcome(&result, Some(&output_path));
        result.map(|report| (output_path, report))
    }

    fn record_outcome(&self, result: &Result<ExportReport>, destination: Option<&Path>) {
        let message = match result {
            Ok(report) => {
                let mut message = match destination {
                    Some(path) => format!("File exported successfully to {}", path.display()),
                    None => "File exported successfully with the equipment data.".to_string(),
                };
                if let PhotoOutcome::Skipped { reason, .. } = &report.photo {
                    message.push_str(&format!(" Photo not included: {reason}."));
                }
                info!("{}", message);
                message
            }
            Err(e) => {
                error!("Export failed: {}", e);
                format!("Export failed: {e}")
            }
        };
        self.export_status.send_replace(Some(message));
    }
}

fn export_file(
    equipment: &Equipment,
    template_path: &Path,
    output_path: &Path,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let template = File::open(template_path)
        .map_err(|e| AppError::Io(std::io::Error::new(e.kind(), format!("template {}: {e}", template_path.display()))))?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Render in memory first so a failed export never creates the output file
    let mut rendered = Vec::new();
    let report = export::export_equipment(equipment, BufReader::new(template), &mut rendered, options)?;

    let mut writer = BufWriter::new(File::create(output_path)?);
    writer.write_all(&rendered)?;
    writer.flush()?;

    Ok(report)
}
