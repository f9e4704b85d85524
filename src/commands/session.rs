use chrono::NaiveDate;
use clap::{Args, Subcommand};

use classplan::{Session, SyncStore};

use super::course::find_course;
use super::{confirm, settle, split_ids, truncate, OutputFormat};

#[derive(Args)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub command: SessionSubcommand,
}

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Add a session to a course
    Add {
        /// Course ID, code or name
        course: String,

        /// Duration in hours
        #[arg(long)]
        hours: f64,

        /// Position within the course
        #[arg(long)]
        sequence: Option<i64>,

        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Start time (HH:MM)
        #[arg(long)]
        start: Option<String>,

        /// End time (HH:MM)
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        /// Teacher IDs (repeat or comma-separate)
        #[arg(long = "teacher", value_name = "ID")]
        teachers: Vec<String>,

        /// Assistant IDs (repeat or comma-separate)
        #[arg(long = "assistant", value_name = "ID")]
        assistants: Vec<String>,
    },

    /// List sessions
    List {
        /// Only sessions of this course (ID, code or name)
        #[arg(long)]
        course: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a session
    Update {
        /// Session ID
        id: String,

        /// Move to another course (ID, code or name)
        #[arg(long)]
        course: Option<String>,

        #[arg(long)]
        hours: Option<f64>,

        #[arg(long)]
        sequence: Option<i64>,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        topic: Option<String>,
    },

    /// Delete a session
    Delete {
        /// Session ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

fn check_hours(hours: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !hours.is_finite() || hours < 0.0 {
        return Err("Hours must be a non-negative number".into());
    }
    Ok(())
}

impl SessionCommand {
    pub async fn run(&self, store: &SyncStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SessionSubcommand::Add {
                course,
                hours,
                sequence,
                date,
                start,
                end,
                topic,
                teachers,
                assistants,
            } => {
                check_hours(*hours)?;
                let snap = store.snapshot();
                let course = match find_course(&snap, course) {
                    Some(c) => c,
                    None => return Err(format!("Course not found: {}", course).into()),
                };

                let next_sequence = snap
                    .sessions_for_course(&course.id)
                    .map(|s| s.sequence)
                    .max()
                    .unwrap_or(0)
                    + 1;
                let mut session = Session::new(&course.id, *hours)
                    .with_sequence(sequence.unwrap_or(next_sequence))
                    .with_teachers(split_ids(teachers))
                    .with_assistants(split_ids(assistants));
                if let Some(date) = date {
                    session = session.with_date(*date);
                }
                session.start_time = start.clone();
                session.end_time = end.clone();
                session.topic = topic.clone();

                let pending = store.add_session(session.clone());
                println!("Added session to '{}':", course.name);
                println!("  {}", session);
                if let Some(updated) = store.snapshot().course(&course.id) {
                    println!(
                        "  Course now has {} session(s), {:.2} hour(s)",
                        updated.session_count, updated.total_hours
                    );
                }
                settle(pending).await
            }

            SessionSubcommand::List { course, format } => {
                let snap = store.snapshot();
                let mut sessions: Vec<&Session> = match course {
                    Some(identifier) => match find_course(&snap, identifier) {
                        Some(c) => snap.sessions_for_course(&c.id).collect(),
                        None => return Err(format!("Course not found: {}", identifier).into()),
                    },
                    None => snap.sessions.iter().collect(),
                };
                sessions.sort_by(|a, b| {
                    a.course_id
                        .cmp(&b.course_id)
                        .then(a.sequence.cmp(&b.sequence))
                });

                if sessions.is_empty() {
                    println!("No sessions found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&sessions)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<20}  SESSION", "ID", "COURSE");
                        println!("{}", "-".repeat(90));
                        for session in &sessions {
                            let course = snap
                                .course(&session.course_id)
                                .map(|c| c.code.clone().unwrap_or_else(|| c.name.clone()))
                                .unwrap_or_else(|| session.course_id.clone());
                            println!(
                                "{:<36}  {:<20}  {}",
                                session.id,
                                truncate(&course, 20),
                                session
                            );
                        }
                        println!("\nTotal: {} session(s)", sessions.len());
                    }
                }
                Ok(())
            }

            SessionSubcommand::Update {
                id,
                course,
                hours,
                sequence,
                date,
                start,
                end,
                topic,
            } => {
                let snap = store.snapshot();
                let mut session = match snap.session(id) {
                    Some(s) => s.clone(),
                    None => return Err(format!("Session not found: {}", id).into()),
                };

                if let Some(identifier) = course {
                    match find_course(&snap, identifier) {
                        Some(c) => session.course_id = c.id.clone(),
                        None => return Err(format!("Course not found: {}", identifier).into()),
                    }
                }
                if let Some(hours) = hours {
                    check_hours(*hours)?;
                    session.duration_hours = *hours;
                }
                if let Some(sequence) = sequence {
                    session.sequence = *sequence;
                }
                if date.is_some() {
                    session.date = *date;
                }
                if start.is_some() {
                    session.start_time = start.clone();
                }
                if end.is_some() {
                    session.end_time = end.clone();
                }
                if topic.is_some() {
                    session.topic = topic.clone();
                }

                let pending = store.update_session(session.clone());
                println!("Updated session:");
                println!("  {}", session);
                settle(pending).await
            }

            SessionSubcommand::Delete { id, force } => {
                let snap = store.snapshot();
                let session = match snap.session(id) {
                    Some(s) => s,
                    None => return Err(format!("Session not found: {}", id).into()),
                };

                if !force && !confirm(&format!("Delete session {}?", session))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let pending = store.delete_session(&session.id);
                println!("Deleted session: {}", session);
                settle(pending).await
            }
        }
    }
}
