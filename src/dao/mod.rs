/// Database model definitions.
pub mod models;
/// Record store trait and its backends.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
