//! Domain models for the school roster. Every constructor validates its
//! fields, and relationships between entities are held as ids so a course
//! never owns its teacher and deleting one side cannot leave a dangling
//! pointer on the other.

mod course;
mod person;
mod student;
mod teacher;

pub use course::Course;
pub use person::{Person, PersonDetails};
pub use student::Student;
pub use teacher::Teacher;
