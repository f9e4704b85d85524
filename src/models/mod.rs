pub mod lenient;
mod course;
mod person;
mod schedule;
mod session;

pub use course::Course;
pub use person::{Person, PersonType};
pub use schedule::{ScheduleError, ScheduleParams, ScheduleParamsPatch};
pub use session::Session;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A remote table row: a JSON object keyed by camelCase column names.
pub type Row = Map<String, Value>;

/// An entity stored as one row of a remote table.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Serializes the entity into a row.
    fn to_row(&self) -> Result<Row, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(row) => Ok(row),
            other => Err(serde::ser::Error::custom(format!(
                "expected an object row, got {}",
                other
            ))),
        }
    }

    /// Row without its `id` column, as sent by remote updates.
    fn to_update_row(&self) -> Result<Row, serde_json::Error> {
        let mut row = self.to_row()?;
        row.remove("id");
        Ok(row)
    }

    fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row))
    }
}

impl Record for Person {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Course {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Session {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_row_omits_id() {
        let session = Session::new("c1", 2.0).with_id("s1");
        let row = session.to_update_row().unwrap();

        assert!(row.get("id").is_none());
        assert_eq!(row.get("courseId"), Some(&json!("c1")));
        assert_eq!(row.get("durationHours"), Some(&json!(2.0)));
    }

    #[test]
    fn test_from_row_rejects_unknown_person_type() {
        let mut row = Row::new();
        row.insert("id".into(), json!("p1"));
        row.insert("type".into(), json!("Student"));
        assert!(Person::from_row(row).is_err());
    }
}
