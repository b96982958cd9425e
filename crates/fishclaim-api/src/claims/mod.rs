//! Claim ledger module
//!
//! - Catch and claim records
//! - Supersession ("longer fish wins") and reviewer moderation

pub mod ledger;
pub mod models;

pub use ledger::{ClaimLedger, ReviewDecision, MAX_LENGTH_CM, REVIEWER_ROLES};
pub use models::{Catch, Claim, ClaimOutcome, NewCatch, NewClaim, ReviewUpdate};
