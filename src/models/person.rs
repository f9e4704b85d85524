use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{lenient, Row};

/// Subtype of a person record. Both subtypes share the remote `people` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonType {
    Teacher,
    #[serde(rename = "TA")]
    Assistant,
}

impl PersonType {
    /// Value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Teacher => "Teacher",
            PersonType::Assistant => "TA",
        }
    }
}

impl fmt::Display for PersonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonType::Teacher => write!(f, "teacher"),
            PersonType::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for PersonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "teacher" => Ok(PersonType::Teacher),
            "ta" | "assistant" => Ok(PersonType::Assistant),
            _ => Err(format!(
                "Invalid person type '{}'. Valid options: teacher, assistant (ta)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PersonType,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub department: Option<String>,
    /// Profile columns this crate does not model explicitly.
    #[serde(flatten)]
    pub extra: Row,
}

impl Person {
    pub fn new(kind: PersonType, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name: name.into(),
            email: None,
            phone: None,
            department: None,
            extra: Row::new(),
        }
    }

    pub fn teacher(name: impl Into<String>) -> Self {
        Self::new(PersonType::Teacher, name)
    }

    pub fn assistant(name: impl Into<String>) -> Self {
        Self::new(PersonType::Assistant, name)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.kind)?;
        writeln!(f, "ID: {}", self.id)?;
        if let Some(email) = &self.email {
            writeln!(f, "Email: {}", email)?;
        }
        if let Some(phone) = &self.phone {
            writeln!(f, "Phone: {}", phone)?;
        }
        if let Some(department) = &self.department {
            writeln!(f, "Department: {}", department)?;
        }
        Ok(())
    }
}
