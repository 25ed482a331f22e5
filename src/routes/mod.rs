//! Router Module Index
//!
//! Splits the console gate's HTTP surface by access level. Access control is
//! applied per module (via Axum layers and extractors), so an endpoint's
//! exposure follows from where it is registered.

/// Routes open to anyone: health, session creation, and the navigation gate
/// itself (which must answer visitors without a session).
pub mod public;

/// Routes behind the `ActivePrincipal` middleware. Require a live session.
pub mod authenticated;

/// Routes restricted to principals with the admin role.
pub mod admin;
