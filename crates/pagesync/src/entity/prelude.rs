//! Common re-exports for convenient entity usage.

pub use super::sync_config::{
    ActiveModel as SyncConfigActiveModel, Column as SyncConfigColumn, Entity as SyncConfigEntity,
    Model as SyncConfigModel,
};
