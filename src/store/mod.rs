mod log_rows;
mod schema;
mod sqlite_store;

pub use log_rows::SqliteLogFamily;
pub use schema::MUSICBOXD_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStore;
