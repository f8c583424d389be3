//! Citation extraction and verification against the legislation gateway (§4.4).

pub mod extract;
pub mod verify;

pub use extract::{extract_all, ExtractedCitation};
pub use verify::{verify_response, VerificationResult, VerificationStatus, VerifiedCitation};
