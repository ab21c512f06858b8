//! Equipment store with CRUD operations and a live listing.

use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::Storage;
use crate::entities::{equipment, prelude::*};
use crate::error::{AppError, Result};
use crate::models::equipment::Equipment as EquipmentForm;

/// Repository over the `equipment` table.
///
/// Every successful mutation republishes the full listing (id descending)
/// to all [`watch_all`](Self::watch_all) subscribers.
#[derive(Debug, Clone)]
pub struct EquipmentStore {
    storage: Storage,
    listing: Arc<watch::Sender<Vec<equipment::Model>>>,
}

impl EquipmentStore {
    /// Create the store and load the initial listing.
    pub async fn new(storage: Storage) -> Result<Self> {
        let initial = fetch_all(storage.conn()).await?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self {
            storage,
            listing: Arc::new(tx),
        })
    }

    /// Insert a record and return its id.
    ///
    /// A record that already carries an id replaces the stored row.
    pub async fn insert(&self, record: EquipmentForm) -> Result<i32> {
        let explicit_id = record.id;
        let model = to_active_model(record)?;

        let result = Equipment::insert(model)
            .on_conflict(
                OnConflict::column(equipment::Column::Id)
                    .update_columns(
                        equipment::Column::iter().filter(|column| !matches!(column, equipment::Column::Id)),
                    )
                    .to_owned(),
            )
            .exec(self.storage.conn())
            .await?;

        let id = explicit_id.unwrap_or(result.last_insert_id);
        debug!("Stored equipment {}", id);
        self.publish().await?;
        Ok(id)
    }

    /// Update an existing record.
    pub async fn update(&self, record: &equipment::Model) -> Result<()> {
        let existing = Equipment::find_by_id(record.id).one(self.storage.conn()).await?;
        if existing.is_none() {
            return Err(AppError::not_found(format!("equipment {}", record.id)));
        }

        let active: equipment::ActiveModel = record.clone().into();
        active.reset_all().update(self.storage.conn()).await?;
        self.publish().await
    }

    /// Delete a record. Returns false when no row had its id.
    pub async fn delete(&self, record: &equipment::Model) -> Result<bool> {
        self.delete_by_id(record.id).await
    }

    /// Delete a record by id.
    pub async fn delete_by_id(&self, id: i32) -> Result<bool> {
        let result = Equipment::delete_by_id(id).exec(self.storage.conn()).await?;
        if result.rows_affected == 0 {
            warn!("Delete requested for missing equipment {}", id);
            return Ok(false);
        }
        self.publish().await?;
        Ok(true)
    }

    /// All records, newest id first.
    pub async fn list_all(&self) -> Result<Vec<equipment::Model>> {
        Ok(fetch_all(self.storage.conn()).await?)
    }

    /// Live listing, newest id first. The receiver starts with the current snapshot.
    pub fn watch_all(&self) -> watch::Receiver<Vec<equipment::Model>> {
        self.listing.subscribe()
    }

    /// Get record by ID.
    pub async fn get_by_id(&self, id: i32) -> Result<Option<equipment::Model>> {
        Ok(Equipment::find_by_id(id).one(self.storage.conn()).await?)
    }

    async fn publish(&self) -> Result<()> {
        let snapshot = fetch_all(self.storage.conn()).await?;
        self.listing.send_replace(snapshot);
        Ok(())
    }
}

async fn fetch_all(db: &DatabaseConnection) -> std::result::Result<Vec<equipment::Model>, DbErr> {
    Equipment::find().order_by_desc(equipment::Column::Id).all(db).await
}

fn to_active_model(record: EquipmentForm) -> Result<equipment::ActiveModel> {
    let photo_path = record
        .photo_path
        .map(|path| {
            path.into_os_string()
                .into_string()
                .map_err(|raw| AppError::validation(format!("photo path is not valid UTF-8: {}", raw.to_string_lossy())))
        })
        .transpose()?;

    Ok(equipment::ActiveModel {
        id: record.id.map(Set).unwrap_or(NotSet),
        name: Set(record.name),
        general_info: Set(record.general_info),
        brand: Set(record.brand),
        model_name: Set(record.model_name),
        serial: Set(record.serial),
        kind: Set(record.kind),
        reference: Set(record.reference),
        equipment_code: Set(record.equipment_code),
        inventory_number: Set(record.inventory_number),
        building: Set(record.building),
        area: Set(record.area),
        address: Set(record.address),
        location: Set(record.location),
        cost_center: Set(record.cost_center),
        responsible: Set(record.responsible),
        biomedical_class: Set(record.biomedical_class),
        predominant_technology: Set(record.predominant_technology),
        biological_risk_class: Set(record.biological_risk_class),
        voltage_max: Set(record.voltage_max),
        voltage_min: Set(record.voltage_min),
        current_max: Set(record.current_max),
        current_min: Set(record.current_min),
        quantity: Set(record.quantity),
        unit_cost: Set(record.unit_cost),
        photo_path: Set(photo_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn store() -> EquipmentStore {
        EquipmentStore::new(Storage::in_memory().await.unwrap()).await.unwrap()
    }

    fn monitor() -> EquipmentForm {
        EquipmentForm {
            name: "Patient monitor".to_string(),
            brand: "Mindray".to_string(),
            model_name: "uMEC12".to_string(),
            serial: "MR-0042".to_string(),
            area: "ICU".to_string(),
            voltage_max: Some(240.0),
            voltage_min: Some(100.0),
            current_max: None,
            current_min: Some(0.8),
            quantity: Some(1),
            unit_cost: Some(4_500_000.0),
            photo_path: Some(PathBuf::from("/photos/monitor.jpg")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_then_get_returns_equal_record() {
        let store = store().await;
        let record = monitor();
        let id = store.insert(record.clone()).await.unwrap();

        let fetched = store.get_by_id(id).await.unwrap().unwrap();
        let expected = EquipmentForm { id: Some(id), ..record };
        assert_eq!(EquipmentForm::from(fetched), expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_insert_rejects_non_utf8_photo_path() {
        use crate::error::ErrorKind;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let store = store().await;
        let record = EquipmentForm {
            photo_path: Some(PathBuf::from(OsStr::from_bytes(b"/photos/\xFFmonitor.jpg"))),
            ..monitor()
        };

        let err = store.insert(record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.watch_all().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = store().await;
        let a = store.insert(monitor()).await.unwrap();
        let b = store.insert(monitor()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_list_all_orders_by_id_desc() {
        let store = store().await;
        let first = store.insert(monitor()).await.unwrap();
        let second = store.insert(monitor()).await.unwrap();
        let third = store.insert(monitor()).await.unwrap();

        let ids: Vec<i32> = store.list_all().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = store().await;
        let id = store.insert(monitor()).await.unwrap();

        let mut stored = store.get_by_id(id).await.unwrap().unwrap();
        stored.area = "Emergency".to_string();
        stored.voltage_max = None;
        store.update(&stored).await.unwrap();

        let fetched = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);

        assert!(store.delete(&fetched).await.unwrap());
        assert!(store.get_by_id(id).await.unwrap().is_none());
        assert!(!store.delete(&fetched).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = store().await;
        let id = store.insert(monitor()).await.unwrap();
        let mut stored = store.get_by_id(id).await.unwrap().unwrap();
        stored.id = 999;

        let err = store.update(&stored).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_insert_with_existing_id_replaces() {
        let store = store().await;
        let id = store.insert(monitor()).await.unwrap();

        let replacement = EquipmentForm {
            id: Some(id),
            name: "Defibrillator".to_string(),
            ..Default::default()
        };
        assert_eq!(store.insert(replacement).await.unwrap(), id);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Defibrillator");
        assert_eq!(all[0].brand, "");
    }

    #[tokio::test]
    async fn test_watch_all_follows_mutations() {
        let store = store().await;
        let mut rx = store.watch_all();
        assert!(rx.borrow_and_update().is_empty());

        let id = store.insert(monitor()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().iter().map(|m| m.id).collect::<Vec<_>>(), vec![id]);

        store.delete_by_id(id).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_current_snapshot() {
        let store = store().await;
        store.insert(monitor()).await.unwrap();
        let rx = store.watch_all();
        assert_eq!(rx.borrow().len(), 1);
    }
}
