//! Property-based test generators using proptest.
//!
//! Strategies produce inputs that pass validation unless their name says
//! otherwise.

use offsync_core::{NewPet, PetPatch, RecordId, MIN_USERNAME_LEN};
use proptest::prelude::*;
use std::time::Duration;

/// Strategy for record ids.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    prop::array::uniform16(any::<u8>()).prop_map(RecordId::from_bytes)
}

/// Strategy for valid usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-z][a-z0-9_]{{{},15}}", MIN_USERNAME_LEN - 1))
        .expect("Invalid regex")
}

/// Strategy for usernames that fail validation.
pub fn short_username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!(" {{0,3}}[a-z]{{0,{}}} {{0,3}}", MIN_USERNAME_LEN - 1))
        .expect("Invalid regex")
}

/// Strategy for non-blank display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,11}").expect("Invalid regex")
}

/// Strategy for valid pet input.
pub fn new_pet_strategy() -> impl Strategy<Value = NewPet> {
    (
        name_strategy(),
        prop::sample::select(vec!["dog", "cat", "rabbit", "parrot"]),
        prop::option::of(name_strategy()),
        0u32..30,
        0.0f64..80.0,
    )
        .prop_map(|(name, species, breed, age, weight)| {
            let pet = NewPet::new(name, species).age(age).weight(weight);
            match breed {
                Some(breed) => pet.breed(breed),
                None => pet,
            }
        })
}

/// Strategy for non-empty, valid pet patches.
pub fn pet_patch_strategy() -> impl Strategy<Value = PetPatch> {
    (
        prop::option::of(name_strategy()),
        prop::option::of(name_strategy()),
        prop::option::of(0u32..30),
        prop::option::of(0.0f64..80.0),
        prop::option::of("[a-z ]{0,20}"),
    )
        .prop_map(|(name, breed, age, weight, notes)| {
            let mut patch = PetPatch::new();
            patch.name = name;
            patch.breed = breed;
            patch.age = age;
            patch.weight = weight;
            patch.notes = notes;
            if patch.is_empty() {
                patch.notes = Some(String::new());
            }
            patch
        })
}

/// Strategy for the offset of a remote edit relative to the local row, in
/// whole seconds. Negative means the remote copy is older.
pub fn clock_skew_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        1 => Just(0i64),
        3 => -120i64..120,
    ]
}

/// Strategy for short gaps between local mutations.
pub fn gap_strategy() -> impl Strategy<Value = Duration> {
    (0u64..5_000).prop_map(Duration::from_millis)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
