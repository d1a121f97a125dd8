//! Product catalog domain module.
//!
//! Products, their administrative updates and the per-product stock ledger,
//! implemented as deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;
pub mod stock;

pub use product::{NewProduct, Product, ProductRecord, ProductUpdate};
