//! Database module
//!
//! This module handles database connections and the event store backends

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, run_migrations, DatabasePool};
pub use memory::InMemoryEventStore;
pub use repositories::EventRepository;
pub use service::DatabaseService;
pub use store::{EventCatalog, EventStore, JoinGuard, SharedEventCatalog, SharedEventStore};
