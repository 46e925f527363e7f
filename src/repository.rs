pub mod default;
pub mod interface;
#[cfg(feature = "catalog-postgres")]
pub mod postgres;
pub mod sqlite;
