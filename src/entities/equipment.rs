//! `equipment` table: stored inventory records.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "equipment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
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
    pub photo_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
