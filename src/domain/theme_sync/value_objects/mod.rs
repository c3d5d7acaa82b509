pub mod credentials;
pub mod theme_bundle;
