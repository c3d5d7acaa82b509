pub mod git_snapshot;
pub mod theme_store;
