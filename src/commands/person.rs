use clap::{Args, Subcommand};

use classplan::{Person, PersonType, Snapshot, SyncStore};

use super::{confirm, settle, truncate, OutputFormat};

#[derive(Args)]
pub struct PersonCommand {
    #[command(subcommand)]
    pub command: PersonSubcommand,
}

#[derive(Subcommand)]
pub enum PersonSubcommand {
    /// Add a person
    Add {
        /// Full name
        name: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        department: Option<String>,
    },

    /// List people
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a person's details
    Update {
        /// Person ID or name
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        department: Option<String>,
    },

    /// Delete a person
    Delete {
        /// Person ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Finds a person of `kind` by id, then by case-insensitive name.
fn find<'a>(snap: &'a Snapshot, kind: PersonType, identifier: &str) -> Option<&'a Person> {
    let people = snap.people(kind);
    people
        .iter()
        .find(|p| p.id == identifier)
        .or_else(|| people.iter().find(|p| p.name.eq_ignore_ascii_case(identifier)))
}

impl PersonCommand {
    pub async fn run(
        &self,
        store: &SyncStore,
        kind: PersonType,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PersonSubcommand::Add {
                name,
                email,
                phone,
                department,
            } => {
                if name.trim().is_empty() {
                    return Err("Name cannot be empty".into());
                }

                let mut person = Person::new(kind, name.trim());
                person.email = email.clone();
                person.phone = phone.clone();
                person.department = department.clone();

                let pending = store.add_person(person.clone());
                println!("Added {}:", kind);
                println!("{}", person);
                settle(pending).await
            }

            PersonSubcommand::List { format } => {
                let snap = store.snapshot();
                let people = snap.people(kind);

                if people.is_empty() {
                    println!("No {}s found", kind);
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(people)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  EMAIL", "ID", "NAME");
                        println!("{}", "-".repeat(80));
                        for person in people {
                            println!(
                                "{:<36}  {:<30}  {}",
                                person.id,
                                truncate(&person.name, 30),
                                person.email.as_deref().unwrap_or("-")
                            );
                        }
                        println!("\nTotal: {} {}(s)", people.len(), kind);
                    }
                }
                Ok(())
            }

            PersonSubcommand::Update {
                identifier,
                name,
                email,
                phone,
                department,
            } => {
                let has_updates =
                    name.is_some() || email.is_some() || phone.is_some() || department.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let snap = store.snapshot();
                let mut person = match find(&snap, kind, identifier) {
                    Some(p) => p.clone(),
                    None => return Err(format!("{} not found: {}", kind, identifier).into()),
                };

                if let Some(new_name) = name {
                    person.name = new_name.clone();
                }
                if email.is_some() {
                    person.email = email.clone();
                }
                if phone.is_some() {
                    person.phone = phone.clone();
                }
                if department.is_some() {
                    person.department = department.clone();
                }

                let pending = store.update_person(person.clone());
                println!("Updated {}:", kind);
                println!("{}", person);
                settle(pending).await
            }

            PersonSubcommand::Delete { identifier, force } => {
                let snap = store.snapshot();
                let person = match find(&snap, kind, identifier) {
                    Some(p) => p,
                    None => return Err(format!("{} not found: {}", kind, identifier).into()),
                };

                if !force && !confirm(&format!("Delete {} '{}'?", kind, person.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let pending = store.delete_person(&person.id);
                println!("Deleted {}: {}", kind, person.name);
                settle(pending).await
            }
        }
    }
}
