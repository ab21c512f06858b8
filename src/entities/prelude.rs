pub use super::equipment::Entity as Equipment;
pub use super::users::Entity as Users;
