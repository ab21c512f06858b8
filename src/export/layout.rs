//! Field-to-cell layout and merged-range resolution.
//!
//! Templates merge label/value cell groups. Spreadsheet readers only show the
//! value of the top-left (anchor) cell of a merged range, so every write has
//! to be redirected to the anchor of the range that contains its target.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::equipment::EquipmentField;

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

/// Inclusive rectangular range of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first: CellRef,
    pub last: CellRef,
}

/// Target cell of one logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub field: EquipmentField,
    pub cell: CellRef,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// One-based `(column, row)` pair, as spreadsheet libraries address cells.
    pub fn one_based(self) -> (u32, u32) {
        (self.col + 1, self.row + 1)
    }
}

/// Column letters for a zero-based column index (`0` is `A`, `26` is `AA`).
pub fn column_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = AppError;

    /// Parse A1 notation. `$` markers are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| AppError::validation(format!("invalid cell reference '{s}'")))?;
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::validation(format!("invalid cell reference '{s}'")));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(value))
                .ok_or_else(|| AppError::validation(format!("column out of range in '{s}'")))?;
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| AppError::validation(format!("invalid row in cell reference '{s}'")))?;
        if row == 0 {
            return Err(AppError::validation(format!("row numbers start at 1 in '{s}'")));
        }

        Ok(Self::new(row - 1, col - 1))
    }
}

impl CellRange {
    pub fn new(first: CellRef, last: CellRef) -> Self {
        Self {
            first: CellRef::new(first.row.min(last.row), first.col.min(last.col)),
            last: CellRef::new(first.row.max(last.row), first.col.max(last.col)),
        }
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.first.row..=self.last.row).contains(&cell.row) && (self.first.col..=self.last.col).contains(&cell.col)
    }

    /// Top-left cell, the only one that holds a value.
    pub fn anchor(&self) -> CellRef {
        self.first
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

impl FromStr for CellRange {
    type Err = AppError;

    /// Parse `A1:C3`; a single reference is a one-cell range.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((first, last)) => Ok(Self::new(first.parse()?, last.parse()?)),
            None => {
                let cell: CellRef = s.parse()?;
                Ok(Self::new(cell, cell))
            }
        }
    }
}

/// Default placement of every field on the inventory sheet.
pub const DEFAULT_LAYOUT: &[FieldSlot] = &[
    FieldSlot { field: EquipmentField::Name, cell: CellRef::new(3, 9) },
    FieldSlot { field: EquipmentField::GeneralInfo, cell: CellRef::new(5, 0) },
    FieldSlot { field: EquipmentField::Brand, cell: CellRef::new(6, 3) },
    FieldSlot { field: EquipmentField::Model, cell: CellRef::new(7, 3) },
    FieldSlot { field: EquipmentField::Serial, cell: CellRef::new(8, 3) },
    FieldSlot { field: EquipmentField::Kind, cell: CellRef::new(9, 3) },
    FieldSlot { field: EquipmentField::Reference, cell: CellRef::new(6, 15) },
    FieldSlot { field: EquipmentField::EquipmentCode, cell: CellRef::new(7, 15) },
    FieldSlot { field: EquipmentField::InventoryNumber, cell: CellRef::new(8, 15) },
    FieldSlot { field: EquipmentField::Building, cell: CellRef::new(12, 3) },
    FieldSlot { field: EquipmentField::Area, cell: CellRef::new(13, 3) },
    FieldSlot { field: EquipmentField::Address, cell: CellRef::new(14, 3) },
    FieldSlot { field: EquipmentField::Location, cell: CellRef::new(12, 18) },
    FieldSlot { field: EquipmentField::CostCenter, cell: CellRef::new(13, 18) },
    FieldSlot { field: EquipmentField::Responsible, cell: CellRef::new(14, 18) },
    FieldSlot { field: EquipmentField::BiomedicalClass, cell: CellRef::new(17, 0) },
    FieldSlot { field: EquipmentField::PredominantTechnology, cell: CellRef::new(17, 9) },
    FieldSlot { field: EquipmentField::BiologicalRiskClass, cell: CellRef::new(17, 18) },
    FieldSlot { field: EquipmentField::VoltageMax, cell: CellRef::new(21, 0) },
    FieldSlot { field: EquipmentField::VoltageMin, cell: CellRef::new(21, 7) },
    FieldSlot { field: EquipmentField::CurrentMax, cell: CellRef::new(21, 14) },
    FieldSlot { field: EquipmentField::CurrentMin, cell: CellRef::new(21, 20) },
    FieldSlot { field: EquipmentField::Quantity, cell: CellRef::new(25, 0) },
    FieldSlot { field: EquipmentField::UnitCost, cell: CellRef::new(25, 7) },
];

/// Default photo anchor, `A29`.
pub const DEFAULT_PHOTO_ANCHOR: CellRef = CellRef::new(28, 0);

/// Declarative field-to-cell mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    slots: Vec<FieldSlot>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            slots: DEFAULT_LAYOUT.to_vec(),
        }
    }
}

impl Layout {
    /// Layout from explicit slots. A field listed twice is rejected.
    pub fn new(slots: Vec<FieldSlot>) -> Result<Self> {
        let mut seen = HashMap::new();
        for slot in &slots {
            if let Some(previous) = seen.insert(slot.field, slot.cell) {
                return Err(AppError::validation(format!(
                    "field '{}' is mapped twice ({} and {})",
                    slot.field, previous, slot.cell
                )));
            }
        }
        Ok(Self { slots })
    }

    /// Move a field to another cell, adding it if absent.
    pub fn with_override(mut self, field: EquipmentField, cell: CellRef) -> Self {
        match self.slots.iter_mut().find(|slot| slot.field == field) {
            Some(slot) => slot.cell = cell,
            None => self.slots.push(FieldSlot { field, cell }),
        }
        self
    }

    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    pub fn cell_of(&self, field: EquipmentField) -> Option<CellRef> {
        self.slots.iter().find(|slot| slot.field == field).map(|slot| slot.cell)
    }

    /// Resolve every target against the sheet's merged ranges.
    ///
    /// Fails when two fields would land on the same cell after resolution.
    pub fn resolve(&self, merged: &[CellRange]) -> Result<ResolvedLayout> {
        let mut writes = Vec::with_capacity(self.slots.len());
        let mut owners: HashMap<CellRef, EquipmentField> = HashMap::new();

        for slot in &self.slots {
            let target = resolve_cell(merged, slot.cell);
            if let Some(other) = owners.insert(target, slot.field) {
                return Err(AppError::validation(format!(
                    "fields '{}' and '{}' both resolve to cell {}",
                    other, slot.field, target
                )));
            }
            writes.push(ResolvedSlot {
                field: slot.field,
                requested: slot.cell,
                target,
            });
        }

        Ok(ResolvedLayout { writes })
    }
}

/// Anchor of the first merged range containing `cell`, or `cell` itself.
pub fn resolve_cell(merged: &[CellRange], cell: CellRef) -> CellRef {
    merged
        .iter()
        .find(|range| range.contains(cell))
        .map(CellRange::anchor)
        .unwrap_or(cell)
}

/// One field after merged-range resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub field: EquipmentField,
    pub requested: CellRef,
    pub target: CellRef,
}

impl ResolvedSlot {
    pub fn redirected(&self) -> bool {
        self.requested != self.target
    }
}

/// Layout validated against one template.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayout {
    writes: Vec<ResolvedSlot>,
}

impl ResolvedLayout {
    pub fn writes(&self) -> &[ResolvedSlot] {
        &self.writes
    }

    pub fn target_of(&self, field: EquipmentField) -> Option<CellRef> {
        self.writes.iter().find(|w| w.field == field).map(|w| w.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellRef {
        s.parse().unwrap()
    }

    fn range(s: &str) -> CellRange {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(cell("A1"), CellRef::new(0, 0));
        assert_eq!(cell("J4"), CellRef::new(3, 9));
        assert_eq!(cell("$AA$10"), CellRef::new(9, 26));
        assert_eq!(cell("d7"), CellRef::new(6, 3));
    }

    #[test]
    fn test_parse_cell_ref_invalid() {
        assert!("".parse::<CellRef>().is_err());
        assert!("A0".parse::<CellRef>().is_err());
        assert!("12".parse::<CellRef>().is_err());
        assert!("A1B".parse::<CellRef>().is_err());
        assert!("Ä1".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellRef::new(0, 0).to_string(), "A1");
        assert_eq!(CellRef::new(21, 25).to_string(), "Z22");
        assert_eq!(CellRef::new(0, 27).to_string(), "AB1");
        assert_eq!(range("C3:A1").to_string(), "A1:C3");
    }

    #[test]
    fn test_range_contains() {
        let r = range("D7:I7");
        assert!(r.contains(cell("D7")));
        assert!(r.contains(cell("F7")));
        assert!(r.contains(cell("I7")));
        assert!(!r.contains(cell("C7")));
        assert!(!r.contains(cell("D8")));
        assert_eq!(r.anchor(), cell("D7"));
    }

    #[test]
    fn test_resolve_redirects_to_anchor() {
        let merged = [range("J4:U4"), range("A6:V6")];
        assert_eq!(resolve_cell(&merged, cell("M4")), cell("J4"));
        assert_eq!(resolve_cell(&merged, cell("J4")), cell("J4"));
        assert_eq!(resolve_cell(&merged, cell("B6")), cell("A6"));
        assert_eq!(resolve_cell(&merged, cell("B7")), cell("B7"));
    }

    #[test]
    fn test_default_layout_resolves_without_merges() {
        let resolved = Layout::default().resolve(&[]).unwrap();
        assert_eq!(resolved.writes().len(), EquipmentField::ALL.len());
        assert!(resolved.writes().iter().all(|w| !w.redirected()));
    }

    #[test]
    fn test_default_layout_covers_every_field_once() {
        let layout = Layout::new(DEFAULT_LAYOUT.to_vec()).unwrap();
        for field in EquipmentField::ALL {
            assert!(layout.cell_of(field).is_some(), "{field} has no cell");
        }
    }

    #[test]
    fn test_resolve_detects_collision() {
        let layout = Layout::default();
        // One range swallowing both the brand and model targets
        let merged = [range("D7:D8")];
        let err = layout.resolve(&merged).unwrap_err();
        assert!(err.to_string().contains("D7"));
    }

    #[test]
    fn test_override_and_duplicate_fields() {
        let layout = Layout::default().with_override(EquipmentField::Serial, cell("B2"));
        assert_eq!(layout.cell_of(EquipmentField::Serial), Some(cell("B2")));

        let slots = vec![
            FieldSlot { field: EquipmentField::Brand, cell: cell("A1") },
            FieldSlot { field: EquipmentField::Brand, cell: cell("A2") },
        ];
        assert!(Layout::new(slots).is_err());
    }
}
