pub mod config;
pub mod gateway;
pub mod payload;

pub use gateway::{CatalogGateway, UploadError, UploadOutcome, Uploader};
