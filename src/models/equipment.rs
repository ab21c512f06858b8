//! Equipment form record and field catalogue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::entities::equipment;

/// In-progress equipment record as edited by the inventory form.
///
/// `id` is `None` until the record has been stored once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Option<i32>,
    pub name: String,
    pub general_info: String,
    pub brand: String,
    pub model_name: String,
    pub serial: String,
    pub kind: String,
    pub reference: String,
    pub equipment_code: String,
    pub inventory_number: String,
    pub building: String,
    pub area: String,
    pub address: String,
    pub location: String,
    pub cost_center: String,
    pub responsible: String,
    pub biomedical_class: String,
    pub predominant_technology: String,
    pub biological_risk_class: String,
    pub voltage_max: Option<f64>,
    pub voltage_min: Option<f64>,
    pub current_max: Option<f64>,
    pub current_min: Option<f64>,
    pub quantity: Option<i64>,
    pub unit_cost: Option<f64>,
    pub photo_path: Option<PathBuf>,
}

/// Logical fields of an equipment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentField {
    Name,
    GeneralInfo,
    Brand,
    Model,
    Serial,
    Kind,
    Reference,
    EquipmentCode,
    InventoryNumber,
    Building,
    Area,
    Address,
    Location,
    CostCenter,
    Responsible,
    BiomedicalClass,
    PredominantTechnology,
    BiologicalRiskClass,
    VoltageMax,
    VoltageMin,
    CurrentMax,
    CurrentMin,
    Quantity,
    UnitCost,
}

/// A value ready to be written into a spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl EquipmentField {
    /// Every field, in form order.
    pub const ALL: [EquipmentField; 24] = [
        Self::Name,
        Self::GeneralInfo,
        Self::Brand,
        Self::Model,
        Self::Serial,
        Self::Kind,
        Self::Reference,
        Self::EquipmentCode,
        Self::InventoryNumber,
        Self::Building,
        Self::Area,
        Self::Address,
        Self::Location,
        Self::CostCenter,
        Self::Responsible,
        Self::BiomedicalClass,
        Self::PredominantTechnology,
        Self::BiologicalRiskClass,
        Self::VoltageMax,
        Self::VoltageMin,
        Self::CurrentMax,
        Self::CurrentMin,
        Self::Quantity,
        Self::UnitCost,
    ];

    /// Machine name, as used in config files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::GeneralInfo => "general_info",
            Self::Brand => "brand",
            Self::Model => "model",
            Self::Serial => "serial",
            Self::Kind => "kind",
            Self::Reference => "reference",
            Self::EquipmentCode => "equipment_code",
            Self::InventoryNumber => "inventory_number",
            Self::Building => "building",
            Self::Area => "area",
            Self::Address => "address",
            Self::Location => "location",
            Self::CostCenter => "cost_center",
            Self::Responsible => "responsible",
            Self::BiomedicalClass => "biomedical_class",
            Self::PredominantTechnology => "predominant_technology",
            Self::BiologicalRiskClass => "biological_risk_class",
            Self::VoltageMax => "voltage_max",
            Self::VoltageMin => "voltage_min",
            Self::CurrentMax => "current_max",
            Self::CurrentMin => "current_min",
            Self::Quantity => "quantity",
            Self::UnitCost => "unit_cost",
        }
    }

    /// Label printed next to the value in the template.
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "EQUIPMENT NAME",
            Self::GeneralInfo => "GENERAL INFORMATION",
            Self::Brand => "BRAND",
            Self::Model => "MODEL",
            Self::Serial => "SERIAL",
            Self::Kind => "TYPE",
            Self::Reference => "REFERENCE",
            Self::EquipmentCode => "EQUIPMENT CODE",
            Self::InventoryNumber => "INVENTORY No.",
            Self::Building => "BUILDING",
            Self::Area => "AREA",
            Self::Address => "ADDRESS",
            Self::Location => "LOCATION",
            Self::CostCenter => "COST CENTER",
            Self::Responsible => "RESPONSIBLE",
            Self::BiomedicalClass => "BIOMEDICAL CLASSIFICATION",
            Self::PredominantTechnology => "PREDOMINANT TECHNOLOGY",
            Self::BiologicalRiskClass => "BIOLOGICAL RISK CLASSIFICATION",
            Self::VoltageMax => "MAX VOLTAGE",
            Self::VoltageMin => "MIN VOLTAGE",
            Self::CurrentMax => "MAX CURRENT",
            Self::CurrentMin => "MIN CURRENT",
            Self::Quantity => "QUANTITY",
            Self::UnitCost => "UNIT COST",
        }
    }
}

impl fmt::Display for EquipmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EquipmentField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|field| field.key() == wanted)
            .ok_or_else(|| format!("unknown equipment field '{s}'"))
    }
}

/// Parse a decimal leniently: blank or malformed input is `None`.
///
/// A comma decimal separator is accepted.
pub fn parse_decimal(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a whole number leniently: blank or malformed input is `None`.
pub fn parse_count(input: &str) -> Option<i64> {
    input.trim().parse::<i64>().ok()
}

impl Equipment {
    /// Set a field from raw text input. Numeric fields parse leniently.
    pub fn set_field(&mut self, field: EquipmentField, input: &str) {
        let text = input.to_string();
        match field {
            EquipmentField::Name => self.name = text,
            EquipmentField::GeneralInfo => self.general_info = text,
            EquipmentField::Brand => self.brand = text,
            EquipmentField::Model => self.model_name = text,
            EquipmentField::Serial => self.serial = text,
            EquipmentField::Kind => self.kind = text,
            EquipmentField::Reference => self.reference = text,
            EquipmentField::EquipmentCode => self.equipment_code = text,
            EquipmentField::InventoryNumber => self.inventory_number = text,
            EquipmentField::Building => self.building = text,
            EquipmentField::Area => self.area = text,
            EquipmentField::Address => self.address = text,
            EquipmentField::Location => self.location = text,
            EquipmentField::CostCenter => self.cost_center = text,
            EquipmentField::Responsible => self.responsible = text,
            EquipmentField::BiomedicalClass => self.biomedical_class = text,
            EquipmentField::PredominantTechnology => self.predominant_technology = text,
            EquipmentField::BiologicalRiskClass => self.biological_risk_class = text,
            EquipmentField::VoltageMax => self.voltage_max = parse_decimal(input),
            EquipmentField::VoltageMin => self.voltage_min = parse_decimal(input),
            EquipmentField::CurrentMax => self.current_max = parse_decimal(input),
            EquipmentField::CurrentMin => self.current_min = parse_decimal(input),
            EquipmentField::Quantity => self.quantity = parse_count(input),
            EquipmentField::UnitCost => self.unit_cost = parse_decimal(input),
        }
    }

    /// Value of a field as it should appear in a spreadsheet cell.
    pub fn cell_value(&self, field: EquipmentField) -> CellValue {
        let text = |s: &str| CellValue::Text(s.to_string());
        let number = |v: Option<f64>| v.map(CellValue::Number).unwrap_or(CellValue::Empty);

        match field {
            EquipmentField::Name => text(&self.name),
            EquipmentField::GeneralInfo => text(&self.general_info),
            EquipmentField::Brand => text(&self.brand),
            EquipmentField::Model => text(&self.model_name),
            EquipmentField::Serial => text(&self.serial),
            EquipmentField::Kind => text(&self.kind),
            EquipmentField::Reference => text(&self.reference),
            EquipmentField::EquipmentCode => text(&self.equipment_code),
            EquipmentField::InventoryNumber => text(&self.inventory_number),
            EquipmentField::Building => text(&self.building),
            EquipmentField::Area => text(&self.area),
            EquipmentField::Address => text(&self.address),
            EquipmentField::Location => text(&self.location),
            EquipmentField::CostCenter => text(&self.cost_center),
            EquipmentField::Responsible => text(&self.responsible),
            EquipmentField::BiomedicalClass => text(&self.biomedical_class),
            EquipmentField::PredominantTechnology => text(&self.predominant_technology),
            EquipmentField::BiologicalRiskClass => text(&self.biological_risk_class),
            EquipmentField::VoltageMax => number(self.voltage_max),
            EquipmentField::VoltageMin => number(self.voltage_min),
            EquipmentField::CurrentMax => number(self.current_max),
            EquipmentField::CurrentMin => number(self.current_min),
            EquipmentField::Quantity => number(self.quantity.map(|q| q as f64)),
            EquipmentField::UnitCost => number(self.unit_cost),
        }
    }
}

impl From<equipment::Model> for Equipment {
    fn from(model: equipment::Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            general_info: model.general_info,
            brand: model.brand,
            model_name: model.model_name,
            serial: model.serial,
            kind: model.kind,
            reference: model.reference,
            equipment_code: model.equipment_code,
            inventory_number: model.inventory_number,
            building: model.building,
            area: model.area,
            address: model.address,
            location: model.location,
            cost_center: model.cost_center,
            responsible: model.responsible,
            biomedical_class: model.biomedical_class,
            predominant_technology: model.predominant_technology,
            biological_risk_class: model.biological_risk_class,
            voltage_max: model.voltage_max,
            voltage_min: model.voltage_min,
            current_max: model.current_max,
            current_min: model.current_min,
            quantity: model.quantity,
            unit_cost: model.unit_cost,
            photo_path: model.photo_path.map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_lenient() {
        assert_eq!(parse_decimal("220"), Some(220.0));
        assert_eq!(parse_decimal(" 110.5 "), Some(110.5));
        assert_eq!(parse_decimal("0,75"), Some(0.75));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("12V"), None);
        assert_eq!(parse_decimal("NaN"), None);
    }

    #[test]
    fn test_parse_count_lenient() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("three"), None);
        assert_eq!(parse_count("2.5"), None);
    }

    #[test]
    fn test_set_field_numeric_garbage_is_absent() {
        let mut equipment = Equipment {
            voltage_max: Some(220.0),
            ..Default::default()
        };
        equipment.set_field(EquipmentField::VoltageMax, "not a number");
        assert_eq!(equipment.voltage_max, None);
    }

    #[test]
    fn test_set_field_text() {
        let mut equipment = Equipment::default();
        equipment.set_field(EquipmentField::Brand, "Mindray");
        equipment.set_field(EquipmentField::Quantity, "2");
        assert_eq!(equipment.brand, "Mindray");
        assert_eq!(equipment.quantity, Some(2));
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in EquipmentField::ALL {
            assert_eq!(field.key().parse::<EquipmentField>(), Ok(field));
        }
        assert_eq!("cost-center".parse::<EquipmentField>(), Ok(EquipmentField::CostCenter));
        assert!("colour".parse::<EquipmentField>().is_err());
    }

    #[test]
    fn test_cell_value() {
        let equipment = Equipment {
            serial: "SN-1".to_string(),
            current_min: Some(0.5),
            ..Default::default()
        };
        assert_eq!(equipment.cell_value(EquipmentField::Serial), CellValue::Text("SN-1".to_string()));
        assert_eq!(equipment.cell_value(EquipmentField::CurrentMin), CellValue::Number(0.5));
        assert_eq!(equipment.cell_value(EquipmentField::CurrentMax), CellValue::Empty);
    }
}
