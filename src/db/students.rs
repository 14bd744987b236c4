use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::like_pattern;
use crate::error::{map_duplicate_key, EntityKind, Result, StorageContext};
use crate::models::{Person, Student};

/// Map a `SELECT id, name, age, grade_level` row onto a student. Course links
/// are loaded separately, so the returned value starts with none.
fn row_to_student(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student::from_row(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
    ))
}

/// Store a new student row. A taken id surfaces as `DuplicateKey` rather than
/// a raw constraint error.
pub(crate) fn insert_student(conn: &Connection, student: &Student) -> Result<()> {
    conn.execute(
        "INSERT INTO students (id, name, age, grade_level) VALUES (?1, ?2, ?3, ?4)",
        params![student.id(), student.name(), student.age(), student.grade_level()],
    )
    .map_err(|err| {
        map_duplicate_key(err, EntityKind::Student, student.id(), "failed to insert student")
    })?;
    Ok(())
}

/// Every student ordered by id, which keeps listings stable between calls.
pub(crate) fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare("SELECT id, name, age, grade_level FROM students ORDER BY id")
        .storage("failed to prepare student query")?;

    let students = stmt
        .query_map([], row_to_student)
        .storage("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect students")?;

    Ok(students)
}

/// Look up one student. An unknown id is `None`, not an error.
pub(crate) fn fetch_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    conn.query_row(
        "SELECT id, name, age, grade_level FROM students WHERE id = ?1",
        [id],
        row_to_student,
    )
    .optional()
    .storage("failed to retrieve student")
}

/// Cheap existence check used before writing enrollment rows.
pub(crate) fn student_exists(conn: &Connection, id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
    .storage("failed to check student")
}

/// Students whose name contains `needle` literally. Wildcards in the needle are
/// escaped so `%` and `_` match themselves.
pub(crate) fn search_students(conn: &Connection, needle: &str) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, age, grade_level FROM students
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY id",
        )
        .storage("failed to prepare student search")?;

    let students = stmt
        .query_map([like_pattern(needle)], row_to_student)
        .storage("failed to search students")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect student search")?;

    Ok(students)
}

/// Students enrolled in one course, resolved through the enrollments table.
pub(crate) fn fetch_students_for_course(conn: &Connection, course_id: i64) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.name, s.age, s.grade_level
             FROM students s
             INNER JOIN enrollments e ON e.student_id = s.id
             WHERE e.course_id = ?1
             ORDER BY s.id",
        )
        .storage("failed to prepare course roster query")?;

    let students = stmt
        .query_map([course_id], row_to_student)
        .storage("failed to load course roster")?
        .collect::<Result<Vec<_>, _>>()
        .storage("failed to collect course roster")?;

    Ok(students)
}

/// Overwrite name, age and grade level. Returns `false` when no row has the id.
pub(crate) fn update_student(conn: &Connection, student: &Student) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE students SET name = ?1, age = ?2, grade_level = ?3 WHERE id = ?4",
            params![student.name(), student.age(), student.grade_level(), student.id()],
        )
        .storage("failed to update student")?;
    Ok(updated > 0)
}

/// Remove the student together with their enrollment rows.
pub(crate) fn delete_student(conn: &mut Connection, id: i64) -> Result<bool> {
    let tx = conn.transaction().storage("failed to begin student delete")?;
    tx.execute("DELETE FROM enrollments WHERE student_id = ?1", [id])
        .storage("failed to delete student enrollments")?;
    let deleted = tx
        .execute("DELETE FROM students WHERE id = ?1", [id])
        .storage("failed to delete student")?;
    tx.commit().storage("failed to commit student delete")?;
    Ok(deleted > 0)
}
