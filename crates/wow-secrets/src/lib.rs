//! Credential detection and redaction.
//!
//! The detector classifies substrings against a catalog of secret shapes;
//! the redactor rewrites payloads, replacing each match with a stable
//! placeholder that carries the kind and a short non-reversible fingerprint.

pub mod detector;
pub mod redactor;

pub use detector::{Confidence, CredentialKind, CredentialMatch, Severity, detect};
pub use redactor::{Redaction, redact};
