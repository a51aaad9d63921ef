mod memory;
pub mod sqlite;
mod task;

pub use memory::InMemoryTaskStorage;
pub use sqlite::task_storage::SqliteTaskStorage;
pub use task::{StorageError, TaskStorage};
