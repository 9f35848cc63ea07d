//! Client-access token subsystem: issuance, persistence, resolution.
pub mod generator;
pub mod resolver;
pub mod store;

pub use generator::{issue, Issuance, IssueError};
pub use resolver::{resolve, ParsedToken, ResolveError, ResolvedToken};
pub use store::{MemoryTokenStore, PgTokenStore, StoreError, TokenStore};
