use crate::error::{Result, SchoolError};

/// Identity and demographic fields shared by students and teachers.
#[derive(Debug, Clone)]
pub struct PersonDetails {
    /// Primary key shared with the student or teacher row. Always positive.
    id: i64,
    /// Non-blank full name used for display and name search.
    name: String,
    /// Age in years, zero or more.
    age: i64,
}

impl PersonDetails {
    /// Validate and build the shared fields. The id must be positive, the name
    /// non-blank and the age non-negative.
    pub fn new(id: i64, name: impl Into<String>, age: i64) -> Result<Self> {
        let name = name.into();
        require_positive(id, "id")?;
        require_text(&name, "name")?;
        require_non_negative(age, "age")?;
        Ok(Self { id, name, age })
    }

    /// Rows read back from SQLite were validated on the way in.
    pub(crate) fn from_row(id: i64, name: String, age: i64) -> Self {
        Self { id, name, age }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> i64 {
        self.age
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        require_text(&name, "name")?;
        self.name = name;
        Ok(())
    }

    pub fn set_age(&mut self, age: i64) -> Result<()> {
        require_non_negative(age, "age")?;
        self.age = age;
        Ok(())
    }
}

/// Capability shared by every person-like entity. Each variant provides its
/// own [`Person::summary`]; the accessors come for free from the embedded
/// [`PersonDetails`].
pub trait Person {
    fn details(&self) -> &PersonDetails;

    /// Multi-line description including the variant-specific fields.
    fn summary(&self) -> String;

    fn id(&self) -> i64 {
        self.details().id()
    }

    fn name(&self) -> &str {
        self.details().name()
    }

    fn age(&self) -> i64 {
        self.details().age()
    }

    fn basic_info(&self) -> String {
        format!("ID: {}, Name: {}, Age: {}", self.id(), self.name(), self.age())
    }
}

pub(crate) fn require_positive(value: i64, field: &str) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(SchoolError::invalid(format!(
            "{field} must be positive, got {value}"
        )))
    }
}

pub(crate) fn require_non_negative(value: i64, field: &str) -> Result<()> {
    if value >= 0 {
        Ok(())
    } else {
        Err(SchoolError::invalid(format!(
            "{field} must not be negative, got {value}"
        )))
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(SchoolError::invalid(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
