//! Aggregates module
pub mod product;
pub mod token_record;

pub use product::{Base, ClientProductView, Product, Variant};
pub use token_record::{ClientContact, ClientTokenRecord, ProductSnapshot};
