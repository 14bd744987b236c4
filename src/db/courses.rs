use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::db::enrollments::enrollment_count;
use crate::db::like_pattern;
use crate::db::teachers::teacher_exists;
use crate::error::{map_duplicate_key, EntityKind, Result, SchoolError, StorageContext};
use crate::models::{Course, Teacher};

/// A course as read back from storage, with its teacher resolved through a
/// join and the number of enrollment rows that reference it.
#[derive(Debug, Clone)]
pub struct CourseListing {
    pub course: Course,
    /// `None` when the course has no teacher or its teacher row is gone.
    pub teacher: Option<Teacher>,
    pub enrollment_count: i64,
}

const COURSE_LISTING_SELECT: &str = "SELECT c.course_id, c.title, c.max_capacity,
        t.id, t.name, t.age, t.subject, c.teacher_id,
        (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.course_id)
     FROM courses c
     LEFT JOIN teachers t ON c.teacher_id = t.id";

/// Build a listing from a `COURSE_LISTING_SELECT` row. A `teacher_id` without
/// a matching teacher row is dropped so the course reads as unassigned.
fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<CourseListing> {
    let course_id: i64 = row.get(0)?;
    let teacher_id: Option<i64> = row.get(3)?;
    let teacher = match teacher_id {
        Some(id) => Some(Teacher::from_row(id, row.get(4)?, row.get(5)?, row.get(6)?)),
        None => {
            let stored: Option<i64> = row.get(7)?;
            if let Some(stored) = stored {
                debug!(course_id, teacher_id = stored, "course references a missing teacher");
            }
            None
        }
    };

    Ok(CourseListing {
        course: Course::from_row(course_id, row.get(1)?, row.get(2)?, teacher_id),
        teacher,
        enrollment_count: row.get(8)?,
    })
}

/// Course writes may only point at a teacher row that exists right now.
fn ensure_teacher(conn: &Connection, course: &Course) -> Result<()> {
    if let Some(id) = course.teacher_id() {
        if !teacher_exists(conn, id)? {
            return Err(SchoolError::MissingReference {
                kind: EntityKind::Teacher,
                id,
            });
        }
    }
    Ok(())
}

/// Store a new course after checking its teacher, if any, exists.
pub(crate) fn insert_course(conn: &Connection, course: &Course) -> Result<()> {
    ensure_teacher(conn, course)?;
    conn.execute(
        "INSERT INTO courses (course_id, title, teacher_id, max_capacity) VALUES (?1, ?2, ?3, ?4)",
        params![
            course.course_id(),
            course.title(),
            course.teacher_id(),
            course.max_capacity()
        ],
    )
    .map_err(|err| {
        map_duplicate_key(err, EntityKind::Course, course.course_id(), "failed to insert course")
    })?;
    Ok(())
}

/// Every course ordered by id, each with its teacher and enrollment count.
pub(crate) fn fetch_courses(conn: &Connection) -> Result<Vec<CourseListing>> {
    let mut stmt = conn
        .prepare(&format!("{COURSE_LISTING_SELECT} ORDER BY c.course_id"))
        .storage("failed to prepare course query")?;

    let courses = stmt
        .query_map([], row_to_listing)
        .storage("failed to load courses")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect courses")?;

    Ok(courses)
}

/// One course listing, or `None` for an unknown id.
pub(crate) fn fetch_course(conn: &Connection, course_id: i64) -> Result<Option<CourseListing>> {
    conn.query_row(
        &format!("{COURSE_LISTING_SELECT} WHERE c.course_id = ?1"),
        [course_id],
        row_to_listing,
    )
    .optional()
    .storage("failed to retrieve course")
}

/// Courses whose title contains `needle` literally, ordered by id.
pub(crate) fn search_courses(conn: &Connection, needle: &str) -> Result<Vec<CourseListing>> {
    let mut stmt = conn
        .prepare(&format!(
            "{COURSE_LISTING_SELECT} WHERE c.title LIKE ?1 ESCAPE '\\' ORDER BY c.course_id"
        ))
        .storage("failed to prepare course search")?;

    let courses = stmt
        .query_map([like_pattern(needle)], row_to_listing)
        .storage("failed to search courses")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect course search")?;

    Ok(courses)
}

/// Courses a student is enrolled in. Orphaned teacher ids read as `None`.
pub(crate) fn fetch_courses_for_student(conn: &Connection, student_id: i64) -> Result<Vec<Course>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.course_id, c.title, c.max_capacity, t.id
             FROM courses c
             INNER JOIN enrollments e ON e.course_id = c.course_id
             LEFT JOIN teachers t ON c.teacher_id = t.id
             WHERE e.student_id = ?1
             ORDER BY c.course_id",
        )
        .storage("failed to prepare student courses query")?;

    let courses = stmt
        .query_map([student_id], |row| {
            Ok(Course::from_row(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .storage("failed to load student courses")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect student courses")?;

    Ok(courses)
}

/// Stored capacity of a course, or `None` when there is no such row.
pub(crate) fn course_capacity(conn: &Connection, course_id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT max_capacity FROM courses WHERE course_id = ?1",
        [course_id],
        |row| row.get(0),
    )
    .optional()
    .storage("failed to read course capacity")
}

/// Overwrite title, capacity and teacher. The new teacher must exist and the
/// capacity may not drop below the stored enrollment count.
pub(crate) fn update_course(conn: &Connection, course: &Course) -> Result<bool> {
    ensure_teacher(conn, course)?;

    let enrolled = enrollment_count(conn, course.course_id())?;
    if course.max_capacity() < enrolled {
        return Err(SchoolError::CapacityBelowEnrollment {
            course_id: course.course_id(),
            max_capacity: course.max_capacity(),
            enrolled,
        });
    }

    let updated = conn
        .execute(
            "UPDATE courses SET title = ?1, teacher_id = ?2, max_capacity = ?3
             WHERE course_id = ?4",
            params![
                course.title(),
                course.teacher_id(),
                course.max_capacity(),
                course.course_id()
            ],
        )
        .storage("failed to update course")?;
    Ok(updated > 0)
}

/// Remove the course together with its enrollment rows.
pub(crate) fn delete_course(conn: &mut Connection, course_id: i64) -> Result<bool> {
    let tx = conn.transaction().storage("failed to begin course delete")?;
    tx.execute("DELETE FROM enrollments WHERE course_id = ?1", [course_id])
        .storage("failed to delete course enrollments")?;
    let deleted = tx
        .execute("DELETE FROM courses WHERE course_id = ?1", [course_id])
        .storage("failed to delete course")?;
    tx.commit().storage("failed to commit course delete")?;
    Ok(deleted > 0)
}
