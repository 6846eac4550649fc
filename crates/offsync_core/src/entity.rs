//! Typed mutation inputs.
//!
//! Every mutation enters through one of these structures and is validated
//! before anything reaches the store. A rejected input is never partially
//! applied.

use crate::error::{CoreError, CoreResult};
use crate::record::{AccountFields, PetFields};

/// Minimum username length.
pub const MIN_USERNAME_LEN: usize = 3;

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// Login name.
    pub username: String,
    /// Credential hash from the authentication layer.
    pub password_hash: String,
}

impl NewAccount {
    /// Creates account input.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    /// Checks the input and returns the normalized payload.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a short username or empty hash.
    pub fn validate(self) -> CoreResult<AccountFields> {
        let username = self.username.trim().to_string();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(CoreError::validation(
                "username",
                format!("must be at least {MIN_USERNAME_LEN} characters"),
            ));
        }
        if self.password_hash.is_empty() {
            return Err(CoreError::validation("password_hash", "must not be empty"));
        }
        Ok(AccountFields {
            username,
            password_hash: self.password_hash,
        })
    }
}

/// Input for creating a pet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPet {
    fields: PetFields,
}

impl NewPet {
    /// Starts a pet with the two required fields.
    pub fn new(name: impl Into<String>, species: impl Into<String>) -> Self {
        Self {
            fields: PetFields::new(name, species),
        }
    }

    /// Sets the breed.
    #[must_use]
    pub fn breed(mut self, breed: impl Into<String>) -> Self {
        self.fields.breed = breed.into();
        self
    }

    /// Sets the age in years.
    #[must_use]
    pub fn age(mut self, age: u32) -> Self {
        self.fields.age = age;
        self
    }

    /// Sets the weight in kilograms.
    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.fields.weight = weight;
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.fields.notes = notes.into();
        self
    }

    /// Checks the input and returns the payload.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or species or a
    /// negative or non-finite weight.
    pub fn validate(self) -> CoreResult<PetFields> {
        let mut fields = self.fields;
        fields.name = required("name", &fields.name)?;
        fields.species = required("species", &fields.species)?;
        check_weight(fields.weight)?;
        Ok(fields)
    }
}

/// A partial update of a pet.
///
/// Only the fields listed here can change; identity, ownership and
/// timestamps are managed by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetPatch {
    /// New name.
    pub name: Option<String>,
    /// New species.
    pub species: Option<String>,
    /// New breed.
    pub breed: Option<String>,
    /// New age.
    pub age: Option<u32>,
    /// New weight.
    pub weight: Option<f64>,
    /// New notes.
    pub notes: Option<String>,
}

impl PetPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the species.
    #[must_use]
    pub fn species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    /// Sets the breed.
    #[must_use]
    pub fn breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    /// Sets the age.
    #[must_use]
    pub fn age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    /// Sets the weight.
    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builds a patch from `key=value` style assignments.
    ///
    /// # Errors
    ///
    /// Unknown keys and unparsable numbers are rejected; they are never
    /// silently dropped.
    pub fn from_assignments<I, K, V>(assignments: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut patch = Self::new();
        for (key, value) in assignments {
            let value: String = value.into();
            match key.as_ref() {
                "name" => patch.name = Some(value),
                "species" => patch.species = Some(value),
                "breed" => patch.breed = Some(value),
                "notes" => patch.notes = Some(value),
                "age" => {
                    let age = value
                        .trim()
                        .parse()
                        .map_err(|_| CoreError::validation("age", format!("not a whole number: {value:?}")))?;
                    patch.age = Some(age);
                }
                "weight" => {
                    let weight = value
                        .trim()
                        .parse()
                        .map_err(|_| CoreError::validation("weight", format!("not a number: {value:?}")))?;
                    patch.weight = Some(weight);
                }
                other => {
                    return Err(CoreError::validation(other, "not an updatable pet field"));
                }
            }
        }
        Ok(patch)
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.species.is_none()
            && self.breed.is_none()
            && self.age.is_none()
            && self.weight.is_none()
            && self.notes.is_none()
    }

    /// Checks the patch.
    ///
    /// # Errors
    ///
    /// Rejects an empty patch, blank name or species, and bad weights.
    pub fn validate(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::validation("patch", "no fields to update"));
        }
        if let Some(name) = &self.name {
            required("name", name)?;
        }
        if let Some(species) = &self.species {
            required("species", species)?;
        }
        if let Some(weight) = self.weight {
            check_weight(weight)?;
        }
        Ok(())
    }

    /// Applies the patch to an existing payload.
    pub fn apply(&self, fields: &mut PetFields) {
        if let Some(name) = &self.name {
            fields.name = name.trim().to_string();
        }
        if let Some(species) = &self.species {
            fields.species = species.trim().to_string();
        }
        if let Some(breed) = &self.breed {
            fields.breed = breed.clone();
        }
        if let Some(age) = self.age {
            fields.age = age;
        }
        if let Some(weight) = self.weight {
            fields.weight = weight;
        }
        if let Some(notes) = &self.notes {
            fields.notes = notes.clone();
        }
    }
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn check_weight(weight: f64) -> CoreResult<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(CoreError::validation(
            "weight",
            "must be a non-negative number",
        ));
    }
    Ok(())
}
