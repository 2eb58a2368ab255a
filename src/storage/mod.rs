// Storage module: durable last-used form values.

pub mod sqlite;

pub use sqlite::SqliteStorage;
