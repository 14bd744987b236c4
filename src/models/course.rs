use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Result, SchoolError};
use crate::models::person::{require_positive, require_text};
use crate::models::{Person, Student, Teacher};

/// A course with an optional teacher reference and a capacity-bounded set of
/// enrolled student ids. The teacher is referenced by id only: the course
/// never owns the teacher's lifecycle.
#[derive(Debug, Clone)]
pub struct Course {
    /// Primary key of the `courses` row. Always positive.
    course_id: i64,
    /// Non-blank display title, also the field searched by title.
    title: String,
    /// Upper bound on enrolled students. Always positive.
    max_capacity: i64,
    /// Id of the assigned teacher, if any. `None` also covers a teacher row
    /// that has since been deleted.
    teacher_id: Option<i64>,
    /// Ids of the students enrolled in memory. Never larger than `max_capacity`.
    enrolled_students: BTreeSet<i64>,
}

impl Course {
    pub fn new(course_id: i64, title: impl Into<String>, max_capacity: i64) -> Result<Self> {
        let title = title.into();
        require_positive(course_id, "course id")?;
        require_text(&title, "title")?;
        require_positive(max_capacity, "max capacity")?;
        Ok(Self {
            course_id,
            title,
            max_capacity,
            teacher_id: None,
            enrolled_students: BTreeSet::new(),
        })
    }

    pub(crate) fn from_row(
        course_id: i64,
        title: String,
        max_capacity: i64,
        teacher_id: Option<i64>,
    ) -> Self {
        Self {
            course_id,
            title,
            max_capacity,
            teacher_id,
            enrolled_students: BTreeSet::new(),
        }
    }

    pub fn course_id(&self) -> i64 {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn max_capacity(&self) -> i64 {
        self.max_capacity
    }

    pub fn teacher_id(&self) -> Option<i64> {
        self.teacher_id
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        require_text(&title, "title")?;
        self.title = title;
        Ok(())
    }

    /// Change the capacity. Shrinking below the students already enrolled in
    /// this value is rejected.
    pub fn set_max_capacity(&mut self, max_capacity: i64) -> Result<()> {
        require_positive(max_capacity, "max capacity")?;
        let enrolled = self.current_enrollment() as i64;
        if max_capacity < enrolled {
            return Err(SchoolError::invalid(format!(
                "max capacity {max_capacity} is below the {enrolled} students enrolled"
            )));
        }
        self.max_capacity = max_capacity;
        Ok(())
    }

    /// Point the course at a teacher, or clear the reference with `None`.
    pub fn set_teacher(&mut self, teacher: Option<&Teacher>) {
        self.teacher_id = teacher.map(Person::id);
    }

    /// Add the student if there is room and they are not already enrolled.
    /// Both refusals return `false` rather than an error.
    pub fn enroll_student(&mut self, student: &Student) -> bool {
        if self.is_full() {
            return false;
        }
        self.enrolled_students.insert(student.id())
    }

    pub fn remove_student(&mut self, student_id: i64) -> bool {
        self.enrolled_students.remove(&student_id)
    }

    /// Snapshot of the enrolled student ids.
    pub fn enrolled_student_ids(&self) -> BTreeSet<i64> {
        self.enrolled_students.clone()
    }

    pub fn current_enrollment(&self) -> usize {
        self.enrolled_students.len()
    }

    pub fn is_full(&self) -> bool {
        self.current_enrollment() as i64 >= self.max_capacity
    }

    pub fn is_student_enrolled(&self, student_id: i64) -> bool {
        self.enrolled_students.contains(&student_id)
    }
}

impl PartialEq for Course {
    fn eq(&self, other: &Self) -> bool {
        self.course_id == other.course_id
    }
}

impl Eq for Course {}

impl Hash for Course {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.course_id.hash(state);
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let teacher = match self.teacher_id {
            Some(id) => format!("teacher {id}"),
            None => "None".to_string(),
        };
        write!(
            f,
            "Course{{ID={}, title='{}', teacher={}, enrollment={}/{}}}",
            self.course_id,
            self.title,
            teacher,
            self.enrolled_students.len(),
            self.max_capacity
        )
    }
}
