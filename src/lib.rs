//! Share custody for 2-of-3 key recovery.
//!
//! A remote custodian stores one share of a user's signing key. The share
//! travels sealed under a key negotiated per session (ephemeral secp256k1
//! ECDH) and rests sealed under a static at-rest key.

pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod router;

pub mod crypto {
    pub mod aes;
    pub mod ecdh;
}

pub mod models {
    pub mod api;
    pub mod session;
    pub mod share;
}

pub mod repositories;

pub mod services {
    pub mod custody;
    pub mod identity;
    pub mod session;
}

pub mod handlers {
    pub mod session;
    pub mod share;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod extract;
    pub mod request;
}

pub mod client;

pub use error::{AppError, Result};
