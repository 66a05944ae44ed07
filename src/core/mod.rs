//! Core library components.
//!
//! This module contains the Secret Service object model, the session
//! crypto, the password store backends and configuration handling.

pub mod bus;
pub mod cipher;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod path;
pub mod service;
pub mod session;
pub mod store;
pub mod types;
