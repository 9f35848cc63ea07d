//! Loomfront - self-hosted retail/wholesale storefront service.
//!
//! Three audience-segmented views (public retail, gated wholesale, admin
//! back office) over a Postgres catalog, with:
//! - an opaque client-access token subsystem: issuance binds {SKU, color,
//!   size, quantity} plus a buyer contact to a shareable token; resolution
//!   recovers the product, variant, and order intent, accepting both the
//!   persisted token shape and the older stateless SKU-based shapes;
//! - role-based route gating in front of the `/retail`, `/client`, and
//!   `/admin` areas, with a password exchange granting wholesale access;
//! - a product-update fan-out channel with an optional NATS mirror.

pub mod api;
pub mod catalog;
pub mod domain;
pub mod gate;
pub mod token;

pub use domain::aggregates::{Base, ClientContact, ClientTokenRecord, Product, Variant};
