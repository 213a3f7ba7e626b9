use once_cell::sync::Lazy;
use std::env;

pub const FALLBACK_BASE_URL: &str = "https://catalog.example.com/api/v1/products/add";

/// Header carrying the operator's catalogue token.
pub const AUTH_HEADER: &str = "authtoken";

pub const DEFAULT_CURRENCY: &str = "INR";

/// How many image URLs the remote catalogue accepts per product.
pub const MAX_IMAGES: usize = 3;

pub static DEFAULT_BASE_URL: Lazy<String> = Lazy::new(|| {
    env::var("CATALOG_BASE_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| FALLBACK_BASE_URL.to_string())
});
