//! Session driver for the zgate Z39.50 gateway.
//!
//! The enclosing wire server (the Z39.50 BER codec lives outside this
//! workspace) creates one [`Session`] per client connection and feeds it
//! decoded request frames; every handler produces a reply frame, with
//! protocol failures translated into the reply's BIB-1 diagnostic slots.

mod auth;
mod fetch;
mod pool;
pub mod proto;
mod resultset;
mod scan;
mod search;
mod session;
mod sort;

pub use resultset::ResultSet;
pub use session::{Gateway, Session};
