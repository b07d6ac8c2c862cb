/// Router Module Index
///
/// Splits the HTTP surface by who may reach it. Authentication is applied per module
/// (router layers or the `AuthUser` extractor); authorization inside a module always
/// goes through the permission table.

/// Routes reachable without a session.
pub mod public;

/// Routes behind the `AuthUser` extractor middleware.
pub mod authenticated;

/// Permission administration, gated by the caller's grants on the `roles` resource.
pub mod admin;
