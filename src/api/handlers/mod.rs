//! API handlers.
//!
//! Identity comes from headers set by the upstream auth gateway; see
//! `principal` for the contract.

pub mod admin;
pub mod generate;
pub mod health;
pub mod principal;
pub mod settings;
