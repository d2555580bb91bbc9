pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod storage;
pub mod store;
pub mod task_ops;
pub mod utils;
pub mod view;

pub use config::Config;
pub use database::Database;
pub use models::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
pub use storage::{KeyValueStore, MemoryStorage};
pub use store::{Confirm, StoreError, TaskStore};
pub use task_ops::ValidationError;
pub use utils::Profile;
pub use view::{ViewMode, ViewState};
