//! Fixtures shared by the unit tests.

use crate::db::SchoolDb;
use crate::models::{Course, Student, Teacher};

/// A bootstrapped in-memory store.
pub(crate) fn test_db() -> SchoolDb {
    let db = SchoolDb::open_in_memory().unwrap();
    db.bootstrap_schema().unwrap();
    db
}

pub(crate) fn ahmed() -> Student {
    Student::new(1001, "Ahmed Ali", 20, 12).unwrap()
}

pub(crate) fn fatima() -> Student {
    Student::new(1002, "Fatima Hassan", 19, 11).unwrap()
}

pub(crate) fn math_teacher() -> Teacher {
    Teacher::new(3001, "Dr. Khalid Ibrahim", 40, "Mathematics").unwrap()
}

pub(crate) fn calculus() -> Course {
    Course::new(101, "Advanced Calculus", 30).unwrap()
}
