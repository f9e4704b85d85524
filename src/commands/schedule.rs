use clap::Args;

use classplan::{ScheduleParamsPatch, SyncStore};

use super::{truncate, OutputFormat};

/// Show dated sessions for a month range and person
#[derive(Args)]
pub struct ScheduleCommand {
    /// First month (YYYY-MM), defaults to the current month
    #[arg(long)]
    from: Option<String>,

    /// Last month (YYYY-MM), defaults to the first month
    #[arg(long)]
    to: Option<String>,

    /// Teacher or assistant ID or name
    #[arg(long)]
    person: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ScheduleCommand {
    pub fn run(&self, store: &SyncStore) -> Result<(), Box<dyn std::error::Error>> {
        let snap = store.snapshot();
        let selected_person_id = match &self.person {
            Some(identifier) => {
                let person = snap.person(identifier).or_else(|| {
                    snap.teachers
                        .iter()
                        .chain(snap.assistants.iter())
                        .find(|p| p.name.eq_ignore_ascii_case(identifier))
                });
                match person {
                    Some(p) => Some(p.id.clone()),
                    None => return Err(format!("Person not found: {}", identifier).into()),
                }
            }
            None => None,
        };

        let params = store.update_schedule_params(ScheduleParamsPatch {
            start_month: self.from.clone(),
            end_month: self.to.clone().or_else(|| self.from.clone()),
            selected_person_id,
        })?;

        let snap = store.snapshot();
        let sessions = snap.scheduled_sessions();

        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "params": params,
                    "sessions": sessions,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                println!("Schedule {} to {}", params.start_month, params.end_month);
                if let Some(person) = snap.person(&params.selected_person_id) {
                    println!("For: {} ({})", person.name, person.kind);
                }
                println!();

                if sessions.is_empty() {
                    println!("No sessions scheduled");
                    return Ok(());
                }

                let mut total = 0.0;
                for session in &sessions {
                    let course = snap
                        .course(&session.course_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| session.course_id.clone());
                    println!("{:<30}  {}", truncate(&course, 30), session);
                    total += session.duration_hours;
                }
                println!(
                    "\nTotal: {} session(s), {:.2} hour(s)",
                    sessions.len(),
                    total
                );
            }
        }
        Ok(())
    }
}
