//! Shared infrastructure utilities for OptiControl.
//!
//! Cross-cutting helpers that several crates need but that don't belong in the
//! domain-pure `opticontrol-types` crate:
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename)
//! - **`security`**: Secret redaction and sanitization of upstream text

pub mod atomic_write;
pub mod security;

pub use atomic_write::{
    AtomicWriteOptions, PersistMode, atomic_write_with_options, recover_bak_file,
};
pub use security::{
    MAX_UPSTREAM_TEXT_CHARS, REDACTED, mask, redact_secrets, sanitize_upstream_text,
};
