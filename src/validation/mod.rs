//! Entity Validation Module
//!
//! This module checks entities and actions arriving from outside (HTTP
//! dispatch, the entity source) before they reach the cache store.

mod validator;
pub use validator::Validator;
