//! # Services module
//!
//! This module provide services to interact with the cloud provider api,
//! reconcile declarative resources and browse them
pub mod apis;
pub mod cfg;
pub mod dbaas;
pub mod filter;
