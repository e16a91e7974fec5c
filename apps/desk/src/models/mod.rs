pub mod api;
pub mod upload;
