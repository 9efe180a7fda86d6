// Catalog module
// Read-only access to products, categories and their price rules

pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{Product, ProductResponse, ProductRow};
pub use repository::{CatalogRepository, TransactionCatalog};
