//! Persistence gateway split across one submodule per relation. The
//! submodules hold plain functions over a `rusqlite::Connection`; [`SchoolDb`]
//! guards the connection lifecycle and delegates to them.

mod connection;
mod courses;
mod enrollments;
mod students;
mod teachers;

use tracing::debug;

pub use connection::SchoolDb;
pub use courses::CourseListing;

use crate::error::Result;
use crate::models::{Course, Person, Student, Teacher};

impl SchoolDb {
    /// Persist a new student. Fails with `DuplicateKey` if the id is taken.
    pub fn insert_student(&self, student: &Student) -> Result<()> {
        self.with_conn(|conn| students::insert_student(conn, student))?;
        debug!(student_id = student.id(), "student inserted");
        Ok(())
    }

    /// Persist a new teacher. Fails with `DuplicateKey` if the id is taken.
    pub fn insert_teacher(&self, teacher: &Teacher) -> Result<()> {
        self.with_conn(|conn| teachers::insert_teacher(conn, teacher))?;
        debug!(teacher_id = teacher.id(), "teacher inserted");
        Ok(())
    }

    /// Persist a new course. An absent teacher is stored as NULL; a present
    /// one must name an existing teacher row.
    pub fn insert_course(&self, course: &Course) -> Result<()> {
        self.with_conn(|conn| courses::insert_course(conn, course))?;
        debug!(course_id = course.course_id(), "course inserted");
        Ok(())
    }

    /// `Ok(None)` means no such row, as opposed to a storage failure.
    pub fn get_student_by_id(&self, id: i64) -> Result<Option<Student>> {
        self.with_conn(|conn| students::fetch_student(conn, id))
    }

    pub fn get_teacher_by_id(&self, id: i64) -> Result<Option<Teacher>> {
        self.with_conn(|conn| teachers::fetch_teacher(conn, id))
    }

    pub fn get_course_by_id(&self, course_id: i64) -> Result<Option<CourseListing>> {
        self.with_conn(|conn| courses::fetch_course(conn, course_id))
    }

    pub fn get_students(&self) -> Result<Vec<Student>> {
        self.with_conn(|conn| students::fetch_students(conn))
    }

    pub fn get_teachers(&self) -> Result<Vec<Teacher>> {
        self.with_conn(|conn| teachers::fetch_teachers(conn))
    }

    /// Every course with its teacher resolved. A teacher id with no matching
    /// row reads back as "no teacher assigned".
    pub fn get_courses(&self) -> Result<Vec<CourseListing>> {
        self.with_conn(|conn| courses::fetch_courses(conn))
    }

    /// Students whose name contains `needle`. An empty needle matches all.
    pub fn search_students_by_name(&self, needle: &str) -> Result<Vec<Student>> {
        self.with_conn(|conn| students::search_students(conn, needle))
    }

    pub fn search_teachers_by_name(&self, needle: &str) -> Result<Vec<Teacher>> {
        self.with_conn(|conn| teachers::search_teachers(conn, needle))
    }

    pub fn search_courses_by_title(&self, needle: &str) -> Result<Vec<CourseListing>> {
        self.with_conn(|conn| courses::search_courses(conn, needle))
    }

    /// Replace the mutable fields of a stored student. Returns whether a row
    /// was affected; an unknown id is not an error.
    pub fn update_student(&self, student: &Student) -> Result<bool> {
        self.with_conn(|conn| students::update_student(conn, student))
    }

    pub fn update_teacher(&self, teacher: &Teacher) -> Result<bool> {
        self.with_conn(|conn| teachers::update_teacher(conn, teacher))
    }

    /// Replace title, teacher and capacity. The new capacity may not drop
    /// below the stored enrollment count.
    pub fn update_course(&self, course: &Course) -> Result<bool> {
        self.with_conn(|conn| courses::update_course(conn, course))
    }

    /// Store one enrollment pair. Rejects duplicates, unknown ids and full
    /// courses.
    pub fn enroll_student_in_course(&self, student_id: i64, course_id: i64) -> Result<()> {
        self.with_conn(|conn| enrollments::enroll(conn, student_id, course_id))
    }

    pub fn withdraw_student_from_course(&self, student_id: i64, course_id: i64) -> Result<bool> {
        self.with_conn(|conn| enrollments::withdraw(conn, student_id, course_id))
    }

    /// Students currently enrolled in a course.
    pub fn get_course_roster(&self, course_id: i64) -> Result<Vec<Student>> {
        self.with_conn(|conn| students::fetch_students_for_course(conn, course_id))
    }

    /// Courses a student is currently enrolled in.
    pub fn get_student_courses(&self, student_id: i64) -> Result<Vec<Course>> {
        self.with_conn(|conn| courses::fetch_courses_for_student(conn, student_id))
    }

    /// Remove a student and their enrollments. Returns whether a row was
    /// removed.
    pub fn delete_student(&self, id: i64) -> Result<bool> {
        let deleted = self.with_conn(|conn| students::delete_student(conn, id))?;
        debug!(student_id = id, deleted, "student delete");
        Ok(deleted)
    }

    /// Remove a teacher. Courses pointing at them are left as they are.
    pub fn delete_teacher(&self, id: i64) -> Result<bool> {
        let deleted = self.with_conn(|conn| teachers::delete_teacher(conn, id))?;
        debug!(teacher_id = id, deleted, "teacher delete");
        Ok(deleted)
    }

    /// Remove a course and its enrollments.
    pub fn delete_course(&self, course_id: i64) -> Result<bool> {
        let deleted = self.with_conn(|conn| courses::delete_course(conn, course_id))?;
        debug!(course_id, deleted, "course delete");
        Ok(deleted)
    }
}

/// Wrap `needle` for `LIKE ... ESCAPE '\'` so wildcard characters in the input
/// match literally.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::{EntityKind, SchoolError};
    use crate::test_support::{ahmed, calculus, fatima, math_teacher, test_db};

    fn names(students: &[Student]) -> Vec<&str> {
        students.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn student_round_trip() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();

        let stored = db.get_student_by_id(1001).unwrap().unwrap();
        assert_eq!(stored.id(), 1001);
        assert_eq!(stored.name(), "Ahmed Ali");
        assert_eq!(stored.age(), 20);
        assert_eq!(stored.grade_level(), 12);
        assert_eq!(stored.enrolled_courses_count(), 0);
    }

    #[test]
    fn missing_rows_read_as_none() {
        let db = test_db();
        assert!(db.get_student_by_id(1).unwrap().is_none());
        assert!(db.get_teacher_by_id(1).unwrap().is_none());
        assert!(db.get_course_by_id(1).unwrap().is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected_without_overwriting() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        let impostor = Student::new(1001, "Someone Else", 30, 3).unwrap();
        let err = db.insert_student(&impostor).unwrap_err();
        assert!(matches!(
            err,
            SchoolError::DuplicateKey {
                kind: EntityKind::Student,
                id: 1001
            }
        ));
        assert_eq!(db.get_student_by_id(1001).unwrap().unwrap().name(), "Ahmed Ali");

        db.insert_teacher(&math_teacher()).unwrap();
        let err = db
            .insert_teacher(&Teacher::new(3001, "Other", 50, "History").unwrap())
            .unwrap_err();
        assert!(matches!(err, SchoolError::DuplicateKey { kind: EntityKind::Teacher, .. }));
        assert_eq!(db.get_teacher_by_id(3001).unwrap().unwrap().subject(), "Mathematics");

        db.insert_course(&calculus()).unwrap();
        let err = db
            .insert_course(&Course::new(101, "Other", 5).unwrap())
            .unwrap_err();
        assert!(matches!(err, SchoolError::DuplicateKey { kind: EntityKind::Course, .. }));
        let stored = db.get_course_by_id(101).unwrap().unwrap();
        assert_eq!(stored.course.title(), "Advanced Calculus");
    }

    #[test]
    fn course_without_teacher_stores_null() {
        let db = test_db();
        db.insert_course(&calculus()).unwrap();

        let listing = db.get_course_by_id(101).unwrap().unwrap();
        assert_eq!(listing.course.teacher_id(), None);
        assert!(listing.teacher.is_none());
    }

    #[test]
    fn course_teacher_is_resolved_by_join() {
        let db = test_db();
        let mut teacher = math_teacher();
        let mut course = calculus();
        teacher.assign_course(&mut course);
        db.insert_teacher(&teacher).unwrap();
        db.insert_course(&course).unwrap();

        let courses = db.get_courses().unwrap();
        assert_eq!(courses.len(), 1);
        let resolved = courses[0].teacher.as_ref().unwrap();
        assert_eq!(resolved.id(), 3001);
        assert_eq!(resolved.name(), "Dr. Khalid Ibrahim");
        assert_eq!(courses[0].course.teacher_id(), Some(3001));
    }

    #[test]
    fn course_with_unknown_teacher_is_rejected() {
        let db = test_db();
        let mut course = calculus();
        course.set_teacher(Some(&math_teacher()));

        let err = db.insert_course(&course).unwrap_err();
        assert!(matches!(
            err,
            SchoolError::MissingReference {
                kind: EntityKind::Teacher,
                id: 3001
            }
        ));
        assert!(db.get_courses().unwrap().is_empty());
    }

    #[test]
    fn update_naming_a_deleted_teacher_is_rejected() {
        let db = test_db();
        let mut teacher = math_teacher();
        let mut course = calculus();
        teacher.assign_course(&mut course);
        db.insert_teacher(&teacher).unwrap();
        db.insert_course(&course).unwrap();
        assert!(db.delete_teacher(3001).unwrap());

        course.set_title("Calculus II").unwrap();
        course.set_max_capacity(10).unwrap();
        let err = db.update_course(&course).unwrap_err();
        assert!(matches!(
            err,
            SchoolError::MissingReference {
                kind: EntityKind::Teacher,
                id: 3001
            }
        ));

        let stored = db.get_course_by_id(101).unwrap().unwrap();
        assert_eq!(stored.course.title(), "Advanced Calculus");
        assert_eq!(stored.course.max_capacity(), 30);
    }

    #[test]
    fn deleted_teacher_leaves_course_without_teacher() {
        let db = test_db();
        let mut teacher = math_teacher();
        let mut course = calculus();
        teacher.assign_course(&mut course);
        db.insert_teacher(&teacher).unwrap();
        db.insert_course(&course).unwrap();

        assert!(db.delete_teacher(3001).unwrap());

        let courses = db.get_courses().unwrap();
        assert_eq!(courses.len(), 1);
        assert!(courses[0].teacher.is_none());
        assert_eq!(courses[0].course.teacher_id(), None);
        assert_eq!(courses[0].course.title(), "Advanced Calculus");
    }

    #[test]
    fn search_students_by_substring() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_student(&fatima()).unwrap();

        assert_eq!(names(&db.search_students_by_name("Ali").unwrap()), vec!["Ahmed Ali"]);
        assert_eq!(
            names(&db.search_students_by_name("").unwrap()),
            vec!["Ahmed Ali", "Fatima Hassan"]
        );
        assert!(db.search_students_by_name("Zed").unwrap().is_empty());
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let db = test_db();
        db.insert_student(&Student::new(1, "100% Present", 17, 11).unwrap()).unwrap();
        db.insert_student(&Student::new(2, "1000 Days", 17, 11).unwrap()).unwrap();
        db.insert_student(&Student::new(3, "snake_case", 17, 11).unwrap()).unwrap();
        db.insert_student(&Student::new(4, "snakeXcase", 17, 11).unwrap()).unwrap();

        assert_eq!(names(&db.search_students_by_name("0%").unwrap()), vec!["100% Present"]);
        assert_eq!(names(&db.search_students_by_name("e_c").unwrap()), vec!["snake_case"]);
    }

    #[test]
    fn search_teachers_and_courses() {
        let db = test_db();
        db.insert_teacher(&math_teacher()).unwrap();
        db.insert_teacher(&Teacher::new(2002, "Prof. Aisha Ahmed", 42, "Physics").unwrap())
            .unwrap();
        db.insert_course(&calculus()).unwrap();
        db.insert_course(&Course::new(102, "Classical Mechanics", 25).unwrap())
            .unwrap();

        let teachers = db.search_teachers_by_name("Aisha").unwrap();
        assert_eq!(teachers.len(), 1);
        assert_eq!(teachers[0].id(), 2002);

        let courses = db.search_courses_by_title("Calc").unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].course.course_id(), 101);
        assert_eq!(db.search_courses_by_title("").unwrap().len(), 2);
    }

    #[test]
    fn updates_report_whether_a_row_changed() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();

        let mut student = db.get_student_by_id(1001).unwrap().unwrap();
        student.set_name("Ahmed A. Ali").unwrap();
        student.set_grade_level(11);
        assert!(db.update_student(&student).unwrap());

        let stored = db.get_student_by_id(1001).unwrap().unwrap();
        assert_eq!(stored.name(), "Ahmed A. Ali");
        assert_eq!(stored.grade_level(), 11);

        let ghost = Student::new(9999, "Nobody", 10, 4).unwrap();
        assert!(!db.update_student(&ghost).unwrap());
        assert!(db.get_student_by_id(9999).unwrap().is_none());

        let ghost_teacher = Teacher::new(9999, "Nobody", 40, "Art").unwrap();
        assert!(!db.update_teacher(&ghost_teacher).unwrap());
        assert!(!db.update_course(&Course::new(9999, "Nothing", 3).unwrap()).unwrap());
    }

    #[test]
    fn update_teacher_and_course() {
        let db = test_db();
        db.insert_teacher(&math_teacher()).unwrap();
        db.insert_course(&calculus()).unwrap();

        let mut teacher = db.get_teacher_by_id(3001).unwrap().unwrap();
        teacher.set_subject("Statistics").unwrap();
        assert!(db.update_teacher(&teacher).unwrap());
        assert_eq!(db.get_teacher_by_id(3001).unwrap().unwrap().subject(), "Statistics");

        let mut course = db.get_course_by_id(101).unwrap().unwrap().course;
        course.set_title("Calculus III").unwrap();
        course.set_teacher(Some(&teacher));
        assert!(db.update_course(&course).unwrap());

        let listing = db.get_course_by_id(101).unwrap().unwrap();
        assert_eq!(listing.course.title(), "Calculus III");
        assert_eq!(listing.teacher.map(|t| t.id()), Some(3001));
    }

    #[test]
    fn enrolling_twice_is_a_duplicate_relationship() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_course(&calculus()).unwrap();

        db.enroll_student_in_course(1001, 101).unwrap();
        let err = db.enroll_student_in_course(1001, 101).unwrap_err();
        assert!(matches!(
            err,
            SchoolError::DuplicateRelationship {
                student_id: 1001,
                course_id: 101
            }
        ));

        assert_eq!(db.get_course_roster(101).unwrap().len(), 1);
        assert_eq!(db.get_course_by_id(101).unwrap().unwrap().enrollment_count, 1);
    }

    #[test]
    fn enrollment_respects_stored_capacity() {
        let db = test_db();
        db.insert_course(&Course::new(7, "Seminar", 2).unwrap()).unwrap();
        for id in 1..=3 {
            db.insert_student(&Student::new(id, format!("Student {id}"), 18, 12).unwrap())
                .unwrap();
        }

        db.enroll_student_in_course(1, 7).unwrap();
        db.enroll_student_in_course(2, 7).unwrap();
        let err = db.enroll_student_in_course(3, 7).unwrap_err();
        assert!(matches!(
            err,
            SchoolError::CourseFull {
                course_id: 7,
                max_capacity: 2
            }
        ));
        assert_eq!(db.get_course_by_id(7).unwrap().unwrap().enrollment_count, 2);
    }

    #[test]
    fn enrollment_requires_existing_rows() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();

        let err = db.enroll_student_in_course(1001, 404).unwrap_err();
        assert!(matches!(err, SchoolError::MissingReference { kind: EntityKind::Course, id: 404 }));

        db.insert_course(&calculus()).unwrap();
        let err = db.enroll_student_in_course(5, 101).unwrap_err();
        assert!(matches!(err, SchoolError::MissingReference { kind: EntityKind::Student, id: 5 }));
    }

    #[test]
    fn roster_and_student_courses_refresh_views() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_student(&fatima()).unwrap();
        db.insert_course(&calculus()).unwrap();
        db.insert_course(&Course::new(102, "Classical Mechanics", 25).unwrap())
            .unwrap();

        db.enroll_student_in_course(1001, 101).unwrap();
        db.enroll_student_in_course(1002, 101).unwrap();
        db.enroll_student_in_course(1001, 102).unwrap();

        assert_eq!(names(&db.get_course_roster(101).unwrap()), vec!["Ahmed Ali", "Fatima Hassan"]);

        let mut student = db.get_student_by_id(1001).unwrap().unwrap();
        for course in db.get_student_courses(1001).unwrap() {
            student.enroll_course(&course);
        }
        assert_eq!(student.course_ids().into_iter().collect::<Vec<_>>(), vec![101, 102]);
    }

    #[test]
    fn withdraw_is_a_boolean_no_op_for_missing_pairs() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_course(&calculus()).unwrap();
        db.enroll_student_in_course(1001, 101).unwrap();

        assert!(db.withdraw_student_from_course(1001, 101).unwrap());
        assert!(!db.withdraw_student_from_course(1001, 101).unwrap());
        db.enroll_student_in_course(1001, 101).unwrap();
    }

    #[test]
    fn capacity_update_below_enrollment_is_refused() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_student(&fatima()).unwrap();
        db.insert_course(&calculus()).unwrap();
        db.enroll_student_in_course(1001, 101).unwrap();
        db.enroll_student_in_course(1002, 101).unwrap();

        let shrunk = Course::new(101, "Advanced Calculus", 1).unwrap();
        let err = db.update_course(&shrunk).unwrap_err();
        assert!(matches!(
            err,
            SchoolError::CapacityBelowEnrollment {
                course_id: 101,
                max_capacity: 1,
                enrolled: 2
            }
        ));
        assert_eq!(db.get_course_by_id(101).unwrap().unwrap().course.max_capacity(), 30);
    }

    #[test]
    fn deletes_report_removal_and_clear_enrollments() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_course(&calculus()).unwrap();
        db.enroll_student_in_course(1001, 101).unwrap();

        assert!(db.delete_student(1001).unwrap());
        assert!(!db.delete_student(1001).unwrap());
        assert_eq!(db.get_course_by_id(101).unwrap().unwrap().enrollment_count, 0);

        db.insert_student(&ahmed()).unwrap();
        db.enroll_student_in_course(1001, 101).unwrap();
        assert!(db.delete_course(101).unwrap());
        assert!(!db.delete_course(101).unwrap());
        assert!(db.get_student_courses(1001).unwrap().is_empty());

        assert!(!db.delete_teacher(3001).unwrap());
    }

    #[test]
    fn returned_snapshots_are_independent_of_storage() {
        let db = test_db();
        db.insert_student(&ahmed()).unwrap();
        db.insert_course(&calculus()).unwrap();

        let mut listing = db.get_course_by_id(101).unwrap().unwrap();
        assert!(listing.course.enroll_student(&ahmed()));

        assert!(db.get_course_roster(101).unwrap().is_empty());
        assert_eq!(db.get_course_by_id(101).unwrap().unwrap().enrollment_count, 0);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Ali"), "%Ali%");
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("50%_\\"), "%50\\%\\_\\\\%");
    }
}
