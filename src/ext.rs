//! Attaching dual-subject tokens to outbound requests.
//!
//! Header construction for the hybrid-assertion pattern lives here once, so callers never
//! branch on the provider that issued a token.

pub mod request_signer;

pub use request_signer::*;
