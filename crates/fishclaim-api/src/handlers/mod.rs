//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod catches;
pub mod claims;
pub mod health;
