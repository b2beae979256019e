//! Citeline Consensus Verifier and Status Checker
//!
//! Independently corroborates each resolved source's identity against the
//! metadata providers before it may be cited, and screens DOI-bearing
//! sources for integrity problems (retraction, correction, expression of
//! concern).
//!
//! Verification re-queries the providers on its own and never trusts the
//! resolver's lookups, so a resolver mistake or a spoofed identifier
//! needs at least two independent services to agree before a source is
//! accepted.

#![warn(missing_docs)]

mod consensus;
mod status;

pub use consensus::{ConsensusBand, ConsensusOutcome, ConsensusVerifier};
pub use status::{IntegrityMode, StatusChecker, StatusOutcome};
