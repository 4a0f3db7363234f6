//! Outbound adapters implementing domain ports.
//!
//! - **memory**: process-local stores providing the conditional writes the
//!   loan engine relies on, plus an in-memory identity provider.
//!
//! Adapters are thin translators between domain types and their storage
//! representation. They contain no business logic.

pub mod memory;
