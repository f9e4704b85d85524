use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{lenient, Row};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub teacher_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub assistant_ids: Vec<String>,
    /// Derived from the session collection; never authoritative.
    #[serde(default, deserialize_with = "lenient::count")]
    pub session_count: u32,
    /// Derived from the session collection; never authoritative.
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_hours: f64,
    #[serde(flatten)]
    pub extra: Row,
}

impl Course {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            code: None,
            teacher_ids: Vec::new(),
            assistant_ids: Vec::new(),
            session_count: 0,
            total_hours: 0.0,
            extra: Row::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
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
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        if let Some(code) = &self.code {
            writeln!(f, "Code: {}", code)?;
        }
        writeln!(f, "Sessions: {}", self.session_count)?;
        writeln!(f, "Total hours: {:.2}", self.total_hours)?;

        if !self.teacher_ids.is_empty() {
            writeln!(f, "Teachers: {}", self.teacher_ids.join(", "))?;
        }
        if !self.assistant_ids.is_empty() {
            writeln!(f, "Assistants: {}", self.assistant_ids.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_course_new_starts_without_stats() {
        let course = Course::new("Algebra");
        assert_eq!(course.session_count, 0);
        assert_eq!(course.total_hours, 0.0);
        assert!(Uuid::parse_str(&course.id).is_ok());
    }

    #[test]
    fn test_course_wire_names() {
        let course = Course::new("Algebra")
            .with_id("c1")
            .with_teachers(vec!["t1".into()]);
        let row = serde_json::to_value(&course).unwrap();

        assert_eq!(row["teacherIds"], json!(["t1"]));
        assert_eq!(row["sessionCount"], json!(0));
        assert_eq!(row["totalHours"], json!(0.0));
        assert!(row.get("teacher_ids").is_none());
    }

    #[test]
    fn test_course_decodes_loose_row() {
        let course: Course = serde_json::from_value(json!({
            "id": "c1",
            "name": "Physics",
            "teacherIds": "t1",
            "sessionCount": "3",
            "totalHours": null,
            "room": "Lab 2"
        }))
        .unwrap();

        assert_eq!(course.teacher_ids, vec!["t1"]);
        assert!(course.assistant_ids.is_empty());
        assert_eq!(course.session_count, 3);
        assert_eq!(course.total_hours, 0.0);
        assert_eq!(course.extra.get("room"), Some(&json!("Lab 2")));
    }

    #[test]
    fn test_course_null_name_decodes_empty() {
        let course: Course = serde_json::from_value(json!({
            "id": "c1",
            "name": null,
            "code": ""
        }))
        .unwrap();

        assert_eq!(course.name, "");
        assert!(course.code.is_none());
    }

    #[test]
    fn test_course_display() {
        let mut course = Course::new("History").with_code("HIS-101");
        course.session_count = 2;
        course.total_hours = 3.5;

        let output = format!("{}", course);
        assert!(output.contains("Code: HIS-101"));
        assert!(output.contains("Sessions: 2"));
        assert!(output.contains("Total hours: 3.50"));
    }
}
