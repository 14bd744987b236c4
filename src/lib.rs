//! Persistence and domain-integrity layer for a small school roster:
//! students, teachers, courses and the enrollments that join students to
//! courses, stored in an embedded SQLite database.
//!
//! Callers build validated entity values from [`models`], then hand them to
//! the [`SchoolDb`] gateway, which owns the single connection and translates
//! constraint violations into [`SchoolError`] kinds.
pub mod config;
pub mod db;
pub mod error;
pub mod models;

#[cfg(test)]
mod test_support;

/// Where the database file lives and how long a write waits on a lock.
pub use config::DatabaseConfig;

/// The persistence gateway and the course rows it reads back.
pub use db::{CourseListing, SchoolDb};

/// Error kinds every fallible call reports through.
pub use error::{EntityKind, Result, SchoolError};

/// The validated entities callers build and hand to the gateway.
pub use models::{Course, Person, PersonDetails, Student, Teacher};
