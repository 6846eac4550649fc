//! Pet commands.

use crate::context::{parse_id, Context};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use offsync_core::{NewPet, PetPatch, Record, RecordId, SyncStatus};
use serde::Serialize;
use std::error::Error;

/// Pet subcommands. All act on the `--user` account's pets.
#[derive(Subcommand)]
pub enum PetCommand {
    /// Add a pet
    Add {
        /// Name
        name: String,

        /// Species, e.g. dog
        species: String,

        /// Breed
        #[arg(long)]
        breed: Option<String>,

        /// Age in years
        #[arg(long)]
        age: Option<u32>,

        /// Weight in kilograms
        #[arg(long)]
        weight: Option<f64>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List pets by name
    List,

    /// Show one pet
    Show {
        /// Pet id
        id: String,
    },

    /// Change fields of a pet, e.g. `age=4 notes="vet on monday"`
    Update {
        /// Pet id
        id: String,

        /// Assignments: name, species, breed, age, weight, notes
        #[arg(required = true, value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Delete a pet
    Delete {
        /// Pet id
        id: String,
    },
}

/// Pet as printed.
#[derive(Debug, Serialize)]
pub struct PetView {
    /// Pet id.
    pub id: RecordId,
    /// Owning account.
    pub owner_id: Option<RecordId>,
    /// Name.
    pub name: String,
    /// Species.
    pub species: String,
    /// Breed.
    pub breed: String,
    /// Age in years.
    pub age: u32,
    /// Weight in kilograms.
    pub weight: f64,
    /// Notes.
    pub notes: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Local sync state.
    pub sync_status: SyncStatus,
}

impl PetView {
    fn from_record(record: &Record) -> Option<Self> {
        let pet = record.pet()?;
        Some(Self {
            id: record.id,
            owner_id: record.owner_id,
            name: pet.name.clone(),
            species: pet.species.clone(),
            breed: pet.breed.clone(),
            age: pet.age,
            weight: pet.weight,
            notes: pet.notes.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            sync_status: record.sync_status,
        })
    }

    fn line(&self) -> String {
        let marker = match self.sync_status {
            SyncStatus::Pending => "*",
            SyncStatus::Synced => " ",
        };
        format!("{marker} {}  {:<16} {}", self.id, self.name, self.species)
    }

    fn detail(&self) -> String {
        let mut out = format!(
            "{} ({})\n  id:       {}\n  species:  {}\n",
            self.name, self.sync_status, self.id, self.species
        );
        if !self.breed.is_empty() {
            out.push_str(&format!("  breed:    {}\n", self.breed));
        }
        out.push_str(&format!("  age:      {}\n", self.age));
        out.push_str(&format!("  weight:   {:.1} kg\n", self.weight));
        if !self.notes.is_empty() {
            out.push_str(&format!("  notes:    {}\n", self.notes));
        }
        out.push_str(&format!(
            "  updated:  {}",
            self.updated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out
    }
}

/// Runs a pet command.
pub fn run(ctx: &Context, command: PetCommand) -> Result<(), Box<dyn Error>> {
    match command {
        PetCommand::Add {
            name,
            species,
            breed,
            age,
            weight,
            notes,
        } => {
            let owner = ctx.current_user()?;
            let mut pet = NewPet::new(name, species);
            if let Some(breed) = breed {
                pet = pet.breed(breed);
            }
            if let Some(age) = age {
                pet = pet.age(age);
            }
            if let Some(weight) = weight {
                pet = pet.weight(weight);
            }
            if let Some(notes) = notes {
                pet = pet.notes(notes);
            }
            let id = ctx.engine.create_pet(owner, pet)?;
            show(ctx, id)
        }
        PetCommand::List => {
            let owner = ctx.current_user()?;
            let pets: Vec<PetView> = ctx
                .engine
                .list_pets(owner)
                .iter()
                .filter_map(PetView::from_record)
                .collect();
            ctx.emit(&pets, |pets| {
                if pets.is_empty() {
                    "no pets".to_string()
                } else {
                    pets.iter().map(PetView::line).collect::<Vec<_>>().join("\n")
                }
            })
        }
        PetCommand::Show { id } => show(ctx, parse_id(&id)?),
        PetCommand::Update { id, set } => {
            let id = parse_id(&id)?;
            let patch = PetPatch::from_assignments(set)?;
            if !ctx.engine.update_pet(id, &patch)? {
                return Err(format!("pet {id} not found").into());
            }
            show(ctx, id)
        }
        PetCommand::Delete { id } => {
            let id = parse_id(&id)?;
            if !ctx.engine.delete_pet(id)? {
                return Err(format!("pet {id} not found").into());
            }
            ctx.emit(&serde_json::json!({ "deleted": id }), |_| format!("deleted {id}"))
        }
    }
}

fn show(ctx: &Context, id: RecordId) -> Result<(), Box<dyn Error>> {
    let view = ctx
        .engine
        .get_pet(id)
        .as_ref()
        .and_then(PetView::from_record)
        .ok_or_else(|| format!("pet {id} not found"))?;
    ctx.emit(&view, PetView::detail)
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(
            parse_assignment("notes=a=b").unwrap(),
            ("notes".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment(" age =4").unwrap(),
            ("age".to_string(), "4".to_string())
        );
        assert!(parse_assignment("age").is_err());
    }
}
