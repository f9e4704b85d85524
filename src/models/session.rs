use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{lenient, Row};

/// A single teaching session belonging to exactly one course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub course_id: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub teacher_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub assistant_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub sequence: i64,
    #[serde(default, deserialize_with = "lenient::hours")]
    pub duration_hours: f64,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub topic: Option<String>,
    #[serde(flatten)]
    pub extra: Row,
}

impl Session {
    pub fn new(course_id: impl Into<String>, duration_hours: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.into(),
            teacher_ids: Vec::new(),
            assistant_ids: Vec::new(),
            sequence: 0,
            duration_hours,
            date: None,
            start_time: None,
            end_time: None,
            topic: None,
            extra: Row::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_time_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self.end_time = Some(end.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_teachers(mut self, teacher_ids: Vec<String>) -> Self {
        self.teacher_ids = teacher_ids;
        self
    }

    pub fn with_assistants(mut self, assistant_ids: Vec<String>) -> Self {
        self.assistant_ids = assistant_ids;
        self
    }

    /// True when the person teaches or assists this session.
    pub fn involves(&self, person_id: &str) -> bool {
        self.teacher_ids.iter().any(|id| id == person_id)
            || self.assistant_ids.iter().any(|id| id == person_id)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ", self.sequence)?;
        if let Some(topic) = &self.topic {
            write!(f, "{} ", topic)?;
        }
        write!(f, "[{}h]", self.duration_hours)?;
        if let Some(date) = self.date {
            write!(f, " on {}", date)?;
        }
        if let (Some(start), Some(end)) = (&self.start_time, &self.end_time) {
            write!(f, " {}-{}", start, end)?;
        }
        Ok(())
    }
}
