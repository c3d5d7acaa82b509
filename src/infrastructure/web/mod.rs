pub mod theme_request;
