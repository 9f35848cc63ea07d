//! Domain model: value objects, aggregates, and product-update events.
pub mod aggregates;
pub mod events;
pub mod value_objects;
