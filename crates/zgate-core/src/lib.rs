//! Core types for the zgate Z39.50 gateway.
//!
//! This crate carries everything the query compilers, the record converter
//! and the session driver share: the configuration model, the BIB-1
//! diagnostic surface, the Type-1 (RPN) query model, and the back-end seam
//! behind which a ZOOM-style client library lives.

pub mod backend;
pub mod config;
pub mod diag;
pub mod mock;
pub mod rpn;

use thiserror::Error;

pub use diag::{BackendError, Diagnostic};

/// Top-level error type for gateway operations.
///
/// `Diag` and `Backend` are protocol-level failures: the session dispatcher
/// converts them into the diagnostic slots of the current reply. Every other
/// variant is a programmer or deployment error and propagates out of the
/// session untranslated.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Diag(#[from] Diagnostic),
    #[error("back-end failure: {0}")]
    Backend(#[from] BackendError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
