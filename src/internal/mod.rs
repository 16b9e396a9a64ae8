pub mod cache;
pub mod clock;
pub mod feed_cache;
pub mod models;
pub mod notification;
pub mod removals;
pub mod search;
pub mod tab;
pub mod ui;
