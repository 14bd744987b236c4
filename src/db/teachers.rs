use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::like_pattern;
use crate::error::{map_duplicate_key, EntityKind, Result, StorageContext};
use crate::models::{Person, Teacher};

/// Map a `SELECT id, name, age, subject` row onto a teacher with no course
/// assignments attached.
fn row_to_teacher(row: &Row<'_>) -> rusqlite::Result<Teacher> {
    Ok(Teacher::from_row(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
    ))
}

/// Store a new teacher row, translating a taken id into `DuplicateKey`.
pub(crate) fn insert_teacher(conn: &Connection, teacher: &Teacher) -> Result<()> {
    conn.execute(
        "INSERT INTO teachers (id, name, age, subject) VALUES (?1, ?2, ?3, ?4)",
        params![teacher.id(), teacher.name(), teacher.age(), teacher.subject()],
    )
    .map_err(|err| {
        map_duplicate_key(err, EntityKind::Teacher, teacher.id(), "failed to insert teacher")
    })?;
    Ok(())
}

/// Every teacher ordered by id.
pub(crate) fn fetch_teachers(conn: &Connection) -> Result<Vec<Teacher>> {
    let mut stmt = conn
        .prepare("SELECT id, name, age, subject FROM teachers ORDER BY id")
        .storage("failed to prepare teacher query")?;

    let teachers = stmt
        .query_map([], row_to_teacher)
        .storage("failed to load teachers")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect teachers")?;

    Ok(teachers)
}

/// Look up one teacher. Course reads also use this to resolve `teacher_id`.
pub(crate) fn fetch_teacher(conn: &Connection, id: i64) -> Result<Option<Teacher>> {
    conn.query_row(
        "SELECT id, name, age, subject FROM teachers WHERE id = ?1",
        [id],
        row_to_teacher,
    )
    .optional()
    .storage("failed to retrieve teacher")
}

/// Existence check run before a course is written with a teacher id.
pub(crate) fn teacher_exists(conn: &Connection, id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM teachers WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
    .storage("failed to check teacher")
}

/// Teachers whose name contains `needle` literally, ordered by id.
pub(crate) fn search_teachers(conn: &Connection, needle: &str) -> Result<Vec<Teacher>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, age, subject FROM teachers
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY id",
        )
        .storage("failed to prepare teacher search")?;

    let teachers = stmt
        .query_map([like_pattern(needle)], row_to_teacher)
        .storage("failed to search teachers")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect teacher search")?;

    Ok(teachers)
}

/// Overwrite name, age and subject. Returns `false` when no row has the id.
pub(crate) fn update_teacher(conn: &Connection, teacher: &Teacher) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE teachers SET name = ?1, age = ?2, subject = ?3 WHERE id = ?4",
            params![teacher.name(), teacher.age(), teacher.subject(), teacher.id()],
        )
        .storage("failed to update teacher")?;
    Ok(updated > 0)
}

/// Remove the teacher row only. Courses that still point at the id keep it and
/// resolve to "no teacher" on read.
pub(crate) fn delete_teacher(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM teachers WHERE id = ?1", [id])
        .storage("failed to delete teacher")?;
    Ok(deleted > 0)
}
