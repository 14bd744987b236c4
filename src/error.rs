//! Domain error kinds surfaced by the entity constructors and the persistence
//! gateway. Raw SQLite codes never leave this crate: constraint violations are
//! translated into the specific variants below, everything else is wrapped in
//! [`SchoolError::StorageFailure`] with the original error kept as `source`.

use std::fmt;

use rusqlite::{ffi, Error as SqlError, ErrorCode};
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = SchoolError> = std::result::Result<T, E>;

/// Boxed cause carried by [`SchoolError::StorageFailure`].
pub type StorageCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three relations that carry their own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Teacher,
    Course,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher",
            Self::Course => "Course",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SchoolError {
    /// A constructed or mutated entity violates a field invariant.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Insert of an id that already exists in its relation.
    #[error("{kind} with ID {id} already exists")]
    DuplicateKey { kind: EntityKind, id: i64 },

    /// Enrollment of a (student, course) pair that already exists.
    #[error("student {student_id} is already enrolled in course {course_id}")]
    DuplicateRelationship { student_id: i64, course_id: i64 },

    /// Enrollment into a course that already holds `max_capacity` students.
    #[error("course {course_id} is full ({max_capacity} students)")]
    CourseFull { course_id: i64, max_capacity: i64 },

    /// A relationship write names an id that has no row.
    #[error("{kind} with ID {id} does not exist")]
    MissingReference { kind: EntityKind, id: i64 },

    /// A course update would shrink capacity below the stored enrollment.
    #[error(
        "course {course_id} has {enrolled} students enrolled, capacity {max_capacity} is too small"
    )]
    CapacityBelowEnrollment {
        course_id: i64,
        max_capacity: i64,
        enrolled: i64,
    },

    /// Operation attempted before bootstrap or after close.
    #[error("database connection is not open")]
    NotConnected,

    /// Any other storage problem: I/O, driver, malformed SQL.
    #[error("{context}: {source}")]
    StorageFailure {
        context: &'static str,
        #[source]
        source: StorageCause,
    },
}

impl SchoolError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn storage(
        context: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageFailure {
            context,
            source: Box::new(source),
        }
    }
}

/// Attach a static context message to a raw SQLite result.
pub(crate) trait StorageContext<T> {
    fn storage(self, context: &'static str) -> Result<T>;
}

impl<T> StorageContext<T> for std::result::Result<T, SqlError> {
    fn storage(self, context: &'static str) -> Result<T> {
        self.map_err(|err| SchoolError::storage(context, err))
    }
}

/// True when SQLite rejected a write because a primary key or unique index
/// already holds the value.
pub(crate) fn is_key_violation(err: &SqlError) -> bool {
    match err {
        SqlError::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

/// Coerce a failed insert into `DuplicateKey` when the id is already taken.
pub(crate) fn map_duplicate_key(
    err: SqlError,
    kind: EntityKind,
    id: i64,
    context: &'static str,
) -> SchoolError {
    if is_key_violation(&err) {
        SchoolError::DuplicateKey { kind, id }
    } else {
        SchoolError::storage(context, err)
    }
}
