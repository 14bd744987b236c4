use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::models::{Course, Person, PersonDetails};

/// A student and the ids of the courses they are enrolled in. The course set
/// is caller-maintained; the gateway never fills it in on its own.
#[derive(Debug, Clone)]
pub struct Student {
    /// Id, name and age.
    person: PersonDetails,
    /// School grade, stored as given.
    grade_level: i64,
    /// Ids of the courses recorded on the student side.
    courses: BTreeSet<i64>,
}

impl Student {
    pub fn new(id: i64, name: impl Into<String>, age: i64, grade_level: i64) -> Result<Self> {
        Ok(Self {
            person: PersonDetails::new(id, name, age)?,
            grade_level,
            courses: BTreeSet::new(),
        })
    }

    pub(crate) fn from_row(id: i64, name: String, age: i64, grade_level: i64) -> Self {
        Self {
            person: PersonDetails::from_row(id, name, age),
            grade_level,
            courses: BTreeSet::new(),
        }
    }

    pub fn grade_level(&self) -> i64 {
        self.grade_level
    }

    pub fn set_grade_level(&mut self, grade_level: i64) {
        self.grade_level = grade_level;
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.person.set_name(name)
    }

    pub fn set_age(&mut self, age: i64) -> Result<()> {
        self.person.set_age(age)
    }

    /// Snapshot of the enrolled course ids.
    pub fn course_ids(&self) -> BTreeSet<i64> {
        self.courses.clone()
    }

    /// Record the course on the student side. Returns `false` when the course
    /// id is already present.
    pub fn enroll_course(&mut self, course: &Course) -> bool {
        self.courses.insert(course.course_id())
    }

    pub fn drop_course(&mut self, course_id: i64) -> bool {
        self.courses.remove(&course_id)
    }

    pub fn enrolled_courses_count(&self) -> usize {
        self.courses.len()
    }

    pub fn is_enrolled_in(&self, course_id: i64) -> bool {
        self.courses.contains(&course_id)
    }
}

impl Person for Student {
    fn details(&self) -> &PersonDetails {
        &self.person
    }

    fn summary(&self) -> String {
        let mut out = format!(
            "{}\nGrade Level: {}\nEnrolled Courses: {}",
            self.basic_info(),
            self.grade_level,
            self.courses.len()
        );
        for course_id in &self.courses {
            out.push_str(&format!("\n  - course {course_id}"));
        }
        out
    }
}

impl PartialEq for Student {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Student {}

impl Hash for Student {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Grade: {}, Courses: {}",
            self.basic_info(),
            self.grade_level,
            self.courses.len()
        )
    }
}
