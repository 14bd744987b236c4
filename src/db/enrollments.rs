use rusqlite::{params, Connection};
use tracing::debug;

use crate::db::courses::course_capacity;
use crate::db::students::student_exists;
use crate::error::{is_key_violation, EntityKind, Result, SchoolError, StorageContext};

/// Number of stored enrollments for a course. The capacity checks compare
/// against this count, not against in-memory state.
pub(crate) fn enrollment_count(conn: &Connection, course_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = ?1",
        [course_id],
        |row| row.get(0),
    )
    .storage("failed to count enrollments")
}

/// True when the (student, course) pair is already stored.
pub(crate) fn is_enrolled(conn: &Connection, student_id: i64, course_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM enrollments WHERE student_id = ?1 AND course_id = ?2)",
        params![student_id, course_id],
        |row| row.get(0),
    )
    .storage("failed to check enrollment")
}

/// Link a student to a course. Both rows must exist, the pair must be new and
/// the course must still have room.
pub(crate) fn enroll(conn: &Connection, student_id: i64, course_id: i64) -> Result<()> {
    if !student_exists(conn, student_id)? {
        return Err(SchoolError::MissingReference {
            kind: EntityKind::Student,
            id: student_id,
        });
    }
    let Some(max_capacity) = course_capacity(conn, course_id)? else {
        return Err(SchoolError::MissingReference {
            kind: EntityKind::Course,
            id: course_id,
        });
    };

    if is_enrolled(conn, student_id, course_id)? {
        return Err(SchoolError::DuplicateRelationship {
            student_id,
            course_id,
        });
    }
    if enrollment_count(conn, course_id)? >= max_capacity {
        return Err(SchoolError::CourseFull {
            course_id,
            max_capacity,
        });
    }

    conn.execute(
        "INSERT INTO enrollments (student_id, course_id) VALUES (?1, ?2)",
        params![student_id, course_id],
    )
    .map_err(|err| {
        if is_key_violation(&err) {
            SchoolError::DuplicateRelationship {
                student_id,
                course_id,
            }
        } else {
            SchoolError::storage("failed to enroll student", err)
        }
    })?;

    debug!(student_id, course_id, "student enrolled");
    Ok(())
}

/// Remove one enrollment pair. Returns `false` when the pair was never stored.
pub(crate) fn withdraw(conn: &Connection, student_id: i64, course_id: i64) -> Result<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM enrollments WHERE student_id = ?1 AND course_id = ?2",
            params![student_id, course_id],
        )
        .storage("failed to withdraw student")?;
    Ok(deleted > 0)
}
