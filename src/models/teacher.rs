use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::models::person::require_text;
use crate::models::{Course, Person, PersonDetails};

#[derive(Debug, Clone)]
pub struct Teacher {
    /// Id, name and age.
    person: PersonDetails,
    /// Non-blank subject the teacher covers.
    subject: String,
    /// Ids of the courses this teacher has been assigned in memory.
    assigned_courses: BTreeSet<i64>,
}

impl Teacher {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        age: i64,
        subject: impl Into<String>,
    ) -> Result<Self> {
        let person = PersonDetails::new(id, name, age)?;
        let subject = subject.into();
        require_text(&subject, "subject")?;
        Ok(Self {
            person,
            subject,
            assigned_courses: BTreeSet::new(),
        })
    }

    pub(crate) fn from_row(id: i64, name: String, age: i64, subject: String) -> Self {
        Self {
            person: PersonDetails::from_row(id, name, age),
            subject,
            assigned_courses: BTreeSet::new(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        let subject = subject.into();
        require_text(&subject, "subject")?;
        self.subject = subject;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.person.set_name(name)
    }

    pub fn set_age(&mut self, age: i64) -> Result<()> {
        self.person.set_age(age)
    }

    /// Snapshot of the assigned course ids.
    pub fn assigned_course_ids(&self) -> BTreeSet<i64> {
        self.assigned_courses.clone()
    }

    /// Assign the course to this teacher and point the course back at them.
    /// Returns `false`, touching neither side, when the course id is already
    /// assigned.
    pub fn assign_course(&mut self, course: &mut Course) -> bool {
        if !self.assigned_courses.insert(course.course_id()) {
            return false;
        }
        course.set_teacher(Some(&*self));
        true
    }

    /// Forget the assignment on the teacher side only.
    pub fn unassign_course(&mut self, course_id: i64) -> bool {
        self.assigned_courses.remove(&course_id)
    }

    pub fn assigned_courses_count(&self) -> usize {
        self.assigned_courses.len()
    }

    pub fn teaches(&self, course_id: i64) -> bool {
        self.assigned_courses.contains(&course_id)
    }
}

impl Person for Teacher {
    fn details(&self) -> &PersonDetails {
        &self.person
    }

    fn summary(&self) -> String {
        let mut out = format!(
            "{}\nSubject: {}\nAssigned Courses: {}",
            self.basic_info(),
            self.subject,
            self.assigned_courses.len()
        );
        for course_id in &self.assigned_courses {
            out.push_str(&format!("\n  - course {course_id}"));
        }
        out
    }
}

impl PartialEq for Teacher {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Teacher {}

impl Hash for Teacher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Subject: {}, Teaching: {} courses",
            self.basic_info(),
            self.subject,
            self.assigned_courses.len()
        )
    }
}
