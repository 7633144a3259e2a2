pub mod feed;
pub mod follows;
pub mod store;
