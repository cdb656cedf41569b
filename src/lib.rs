//! Tablestore: table reference graph, ownership and persistence library

// Global type definitions
pub mod types;

// Import various modules
pub mod buffer;
pub mod exec;
pub mod persist;
pub mod progress;
pub mod repository;
pub mod settings;
pub mod table;

// Re-export the items most callers need
pub use exec::ExecutionContext;
pub use persist::{PersistError, PersistResult, PersistenceEngine};
pub use progress::{CanceledExecution, ExecutionMonitor};
pub use repository::TableRepository;
pub use table::{RowCountedTable, TableHandle, TableKind};
pub use types::{NodeId, TableId, TableStoreConfig};
