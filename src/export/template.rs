//! Default inventory template.
//!
//! Builds a blank sheet whose merged value ranges are anchored exactly at the
//! cells of [`DEFAULT_LAYOUT`](super::layout::DEFAULT_LAYOUT), with a label
//! range beside or above each value.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

use super::layout::CellRange;
use crate::models::equipment::EquipmentField;

/// Label range and value range for one field, in A1 notation.
struct Block {
    field: EquipmentField,
    label: &'static str,
    value: &'static str,
}

const SECTIONS: &[(&str, &str)] = &[
    ("A1:V2", "BIOMEDICAL EQUIPMENT INVENTORY SHEET"),
    ("A11:V11", "LOCATION"),
    ("A16:V16", "CLASSIFICATION"),
    ("A20:V20", "ELECTRICAL DATA"),
    ("A24:V24", "ACQUISITION"),
    ("A28:K28", "PHOTO"),
];

const BLOCKS: &[Block] = &[
    Block { field: EquipmentField::Name, label: "A4:I4", value: "J4:V4" },
    Block { field: EquipmentField::GeneralInfo, label: "A5:V5", value: "A6:V6" },
    Block { field: EquipmentField::Brand, label: "A7:C7", value: "D7:K7" },
    Block { field: EquipmentField::Model, label: "A8:C8", value: "D8:K8" },
    Block { field: EquipmentField::Serial, label: "A9:C9", value: "D9:K9" },
    Block { field: EquipmentField::Kind, label: "A10:C10", value: "D10:K10" },
    Block { field: EquipmentField::Reference, label: "L7:O7", value: "P7:V7" },
    Block { field: EquipmentField::EquipmentCode, label: "L8:O8", value: "P8:V8" },
    Block { field: EquipmentField::InventoryNumber, label: "L9:O9", value: "P9:V9" },
    Block { field: EquipmentField::Building, label: "A13:C13", value: "D13:K13" },
    Block { field: EquipmentField::Area, label: "A14:C14", value: "D14:K14" },
    Block { field: EquipmentField::Address, label: "A15:C15", value: "D15:K15" },
    Block { field: EquipmentField::Location, label: "L13:R13", value: "S13:V13" },
    Block { field: EquipmentField::CostCenter, label: "L14:R14", value: "S14:V14" },
    Block { field: EquipmentField::Responsible, label: "L15:R15", value: "S15:V15" },
    Block { field: EquipmentField::BiomedicalClass, label: "A17:I17", value: "A18:I18" },
    Block { field: EquipmentField::PredominantTechnology, label: "J17:R17", value: "J18:R18" },
    Block { field: EquipmentField::BiologicalRiskClass, label: "S17:V17", value: "S18:V18" },
    Block { field: EquipmentField::VoltageMax, label: "A21:G21", value: "A22:G22" },
    Block { field: EquipmentField::VoltageMin, label: "H21:N21", value: "H22:N22" },
    Block { field: EquipmentField::CurrentMax, label: "O21:T21", value: "O22:T22" },
    Block { field: EquipmentField::CurrentMin, label: "U21:V21", value: "U22:V22" },
    Block { field: EquipmentField::Quantity, label: "A25:G25", value: "A26:G26" },
    Block { field: EquipmentField::UnitCost, label: "H25:N25", value: "H26:N26" },
];

/// Value ranges of the default template, by field.
pub fn value_ranges() -> Vec<(EquipmentField, CellRange)> {
    BLOCKS
        .iter()
        .filter_map(|block| block.value.parse().ok().map(|range| (block.field, range)))
        .collect()
}

/// Build the default template in memory.
pub fn build_default_template() -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill_template(worksheet)?;
    workbook.save_to_buffer()
}

/// Write the default template to a file.
pub fn write_default_template(path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill_template(worksheet)?;
    workbook.save(path)?;
    Ok(())
}

fn fill_template(worksheet: &mut Worksheet) -> Result<(), XlsxError> {
    worksheet.set_name("Inventory")?;

    // Section header format
    let section_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    let label_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_border(FormatBorder::Thin);

    let value_format = Format::new().set_border(FormatBorder::Thin);

    for col in 0..22u16 {
        worksheet.set_column_width(col, 6)?;
    }

    for (range, title) in SECTIONS {
        merge(worksheet, range, title, &section_format)?;
    }

    for block in BLOCKS {
        merge(worksheet, block.label, block.field.label(), &label_format)?;
        merge(worksheet, block.value, "", &value_format)?;
    }

    Ok(())
}

fn merge(worksheet: &mut Worksheet, range: &str, text: &str, format: &Format) -> Result<(), XlsxError> {
    let range: CellRange = range
        .parse()
        .map_err(|e: crate::error::AppError| XlsxError::ParameterError(e.to_string()))?;
    worksheet.merge_range(
        range.first.row,
        range.first.col as u16,
        range.last.row,
        range.last.col as u16,
        text,
        format,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::layout::DEFAULT_LAYOUT;

    #[test]
    fn test_value_ranges_anchor_default_layout() {
        let ranges = value_ranges();
        assert_eq!(ranges.len(), DEFAULT_LAYOUT.len());

        for slot in DEFAULT_LAYOUT {
            let (_, range) = ranges
                .iter()
                .find(|(field, _)| *field == slot.field)
                .unwrap_or_else(|| panic!("no value range for {}", slot.field));
            assert_eq!(range.anchor(), slot.cell, "{} is not anchored at its slot", slot.field);
        }
    }

    #[test]
    fn test_template_ranges_do_not_overlap() {
        let mut all: Vec<CellRange> = SECTIONS.iter().map(|(r, _)| r.parse().unwrap()).collect();
        for block in BLOCKS {
            all.push(block.label.parse().unwrap());
            all.push(block.value.parse().unwrap());
        }

        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                let overlap = a.first.row <= b.last.row
                    && b.first.row <= a.last.row
                    && a.first.col <= b.last.col
                    && b.first.col <= a.last.col;
                assert!(!overlap, "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn test_build_default_template() {
        let bytes = build_default_template().unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }
}
