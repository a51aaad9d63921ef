pub mod task_storage;
