pub mod manager;
pub mod storage;

pub use manager::{DatabaseError, DatabaseManager};
pub use storage::{PgStorage, SharedStorage, Storage};
