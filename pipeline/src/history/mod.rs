pub mod memory;
pub mod model;
pub mod repository;
pub mod repository_sqlx;
pub mod store;

pub use memory::MemoryHistoryRepository;
pub use model::{HistoryRecord, UpsertSummary};
pub use repository::HistoryRepository;
pub use repository_sqlx::SqlxHistoryRepository;
pub use store::HistoryStore;
