use clap::{Args, Subcommand};

use classplan::{Course, Snapshot, SyncStore};

use super::{confirm, settle, split_ids, truncate, OutputFormat};

#[derive(Args)]
pub struct CourseCommand {
    #[command(subcommand)]
    pub command: CourseSubcommand,
}

#[derive(Subcommand)]
pub enum CourseSubcommand {
    /// Add a course
    Add {
        /// Course name
        name: String,

        /// Course code (e.g., MATH-101)
        #[arg(long)]
        code: Option<String>,

        /// Teacher IDs (repeat or comma-separate)
        #[arg(long = "teacher", value_name = "ID")]
        teachers: Vec<String>,

        /// Assistant IDs (repeat or comma-separate)
        #[arg(long = "assistant", value_name = "ID")]
        assistants: Vec<String>,
    },

    /// List courses with their session totals
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a course and its sessions
    Show {
        /// Course ID, code or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update course details
    Update {
        /// Course ID, code or name
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        code: Option<String>,

        /// Replace the teacher IDs
        #[arg(long = "teacher", value_name = "ID")]
        teachers: Vec<String>,

        /// Replace the assistant IDs
        #[arg(long = "assistant", value_name = "ID")]
        assistants: Vec<String>,
    },

    /// Delete a course and all of its sessions
    Delete {
        /// Course ID, code or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub(super) fn find_course<'a>(snap: &'a Snapshot, identifier: &str) -> Option<&'a Course> {
    snap.course(identifier).or_else(|| {
        snap.courses.iter().find(|c| {
            c.code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(identifier))
                || c.name.eq_ignore_ascii_case(identifier)
        })
    })
}

impl CourseCommand {
    pub async fn run(&self, store: &SyncStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CourseSubcommand::Add {
                name,
                code,
                teachers,
                assistants,
            } => {
                if name.trim().is_empty() {
                    return Err("Course name cannot be empty".into());
                }

                let mut course = Course::new(name.trim())
                    .with_teachers(split_ids(teachers))
                    .with_assistants(split_ids(assistants));
                if let Some(code) = code {
                    course = course.with_code(code);
                }
                let id = course.id.clone();

                let pending = store.add_course(course);
                if let Some(created) = store.snapshot().course(&id) {
                    println!("Created course:");
                    println!("{}", created);
                }
                settle(pending).await
            }

            CourseSubcommand::List { format } => {
                let snap = store.snapshot();
                if snap.courses.is_empty() {
                    println!("No courses found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&snap.courses)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<12}  {:<30}  {:>8}  {:>8}",
                            "ID", "CODE", "NAME", "SESSIONS", "HOURS"
                        );
                        println!("{}", "-".repeat(102));
                        for course in &snap.courses {
                            println!(
                                "{:<36}  {:<12}  {:<30}  {:>8}  {:>8.2}",
                                course.id,
                                course.code.as_deref().unwrap_or("-"),
                                truncate(&course.name, 30),
                                course.session_count,
                                course.total_hours
                            );
                        }
                        println!("\nTotal: {} course(s)", snap.courses.len());
                    }
                }
                Ok(())
            }

            CourseSubcommand::Show { identifier, format } => {
                let snap = store.snapshot();
                let course = match find_course(&snap, identifier) {
                    Some(c) => c,
                    None => return Err(format!("Course not found: {}", identifier).into()),
                };

                let mut sessions: Vec<_> = snap.sessions_for_course(&course.id).collect();
                sessions.sort_by_key(|s| s.sequence);

                match format {
                    OutputFormat::Json => {
                        let value = serde_json::json!({
                            "course": course,
                            "sessions": sessions,
                        });
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", course);
                        if !sessions.is_empty() {
                            println!("\nSessions:");
                            for session in sessions {
                                println!("  {}", session);
                            }
                        }
                    }
                }
                Ok(())
            }

            CourseSubcommand::Update {
                identifier,
                name,
                code,
                teachers,
                assistants,
            } => {
                let has_updates = name.is_some()
                    || code.is_some()
                    || !teachers.is_empty()
                    || !assistants.is_empty();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let snap = store.snapshot();
                let mut course = match find_course(&snap, identifier) {
                    Some(c) => c.clone(),
                    None => return Err(format!("Course not found: {}", identifier).into()),
                };

                if let Some(new_name) = name {
                    course.name = new_name.clone();
                }
                if code.is_some() {
                    course.code = code.clone();
                }
                if !teachers.is_empty() {
                    course.teacher_ids = split_ids(teachers);
                }
                if !assistants.is_empty() {
                    course.assistant_ids = split_ids(assistants);
                }

                let pending = store.update_course(course.clone());
                println!("Updated course:");
                println!("{}", course);
                settle(pending).await
            }

            CourseSubcommand::Delete { identifier, force } => {
                let snap = store.snapshot();
                let course = match find_course(&snap, identifier) {
                    Some(c) => c,
                    None => return Err(format!("Course not found: {}", identifier).into()),
                };

                if !force {
                    let prompt = format!(
                        "Delete course '{}' and its {} session(s)?",
                        course.name, course.session_count
                    );
                    if !confirm(&prompt)? {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let pending = store.delete_course(&course.id);
                println!("Deleted course: {}", course.name);
                settle(pending).await
            }
        }
    }
}
