//! SeaORM entity definitions for the pagesync database schema.

pub mod prelude;
pub mod sync_config;
