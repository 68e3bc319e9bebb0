/// Observation metadata entered alongside each marked sequence
///
/// The form is plain data owned by the UI. Required fields are enumerated in
/// `RequiredField`, each with its own presence rule, so validation reports
/// every missing field at once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of the retrieval date, both in the text input and in exported rows
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Seabird or predator; selects which species/behavior lists apply
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObservationType {
    Predator,
    #[default]
    Seabird,
}

impl ObservationType {
    pub const ALL: [ObservationType; 2] = [ObservationType::Predator, ObservationType::Seabird];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::Predator => "Predator",
            ObservationType::Seabird => "Seabird",
        }
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields that must be filled in before a sequence can be saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Site,
    Camera,
    RetrievalDate,
    Type,
    Species,
    Behavior,
    ReviewerName,
}

impl RequiredField {
    /// Declaration order, which is also the order missing fields are reported in
    pub const ALL: [RequiredField; 7] = [
        RequiredField::Site,
        RequiredField::Camera,
        RequiredField::RetrievalDate,
        RequiredField::Type,
        RequiredField::Species,
        RequiredField::Behavior,
        RequiredField::ReviewerName,
    ];

    /// Human-readable name (matches the exported column name)
    pub fn label(&self) -> &'static str {
        match self {
            RequiredField::Site => "Site",
            RequiredField::Camera => "Camera",
            RequiredField::RetrievalDate => "Retrieval Date",
            RequiredField::Type => "Type",
            RequiredField::Species => "Species",
            RequiredField::Behavior => "Behavior",
            RequiredField::ReviewerName => "Reviewer Name",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current contents of the annotation details form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationForm {
    pub site: String,
    pub camera: String,
    pub retrieval_date: Option<NaiveDate>,
    pub observation_type: Option<ObservationType>,
    pub species: String,
    pub behavior: String,
    pub reviewer_name: String,
    /// Free text, never required
    pub notes: String,
}

impl AnnotationForm {
    /// A fresh form: retrieval date defaults to today and type to seabird
    pub fn with_defaults(today: NaiveDate) -> Self {
        Self {
            retrieval_date: Some(today),
            observation_type: Some(ObservationType::default()),
            ..Self::default()
        }
    }

    /// Presence rule for one required field
    pub fn is_present(&self, field: RequiredField) -> bool {
        let filled = |value: &str| !value.trim().is_empty();

        match field {
            RequiredField::Site => filled(&self.site),
            RequiredField::Camera => filled(&self.camera),
            RequiredField::RetrievalDate => self.retrieval_date.is_some(),
            RequiredField::Type => self.observation_type.is_some(),
            RequiredField::Species => filled(&self.species),
            RequiredField::Behavior => filled(&self.behavior),
            RequiredField::ReviewerName => filled(&self.reviewer_name),
        }
    }

    /// Every required field that is still empty, in declaration order
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        RequiredField::ALL
            .into_iter()
            .filter(|&field| !self.is_present(field))
            .collect()
    }

    /// Check all required fields and produce the typed metadata for a record
    pub fn validate(&self) -> Result<ValidatedForm, Vec<RequiredField>> {
        let missing = self.missing_fields();

        match (self.retrieval_date, self.observation_type) {
            (Some(retrieval_date), Some(observation_type)) if missing.is_empty() => {
                // Trimming only decides presence; values are kept as entered
                Ok(ValidatedForm {
                    site: self.site.clone(),
                    camera: self.camera.clone(),
                    retrieval_date,
                    observation_type,
                    species: self.species.clone(),
                    behavior: self.behavior.clone(),
                    reviewer_name: self.reviewer_name.clone(),
                    notes: self.notes.clone(),
                })
            }
            _ => Err(missing),
        }
    }

    /// Update the retrieval date from `YYYY-MM-DD` text.
    /// Unparseable text clears the date so validation reports it.
    pub fn set_retrieval_date_text(&mut self, text: &str) -> bool {
        self.retrieval_date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok();
        self.retrieval_date.is_some()
    }

    /// Switch the observation type, dropping a species or behavior that the
    /// new type's vocabulary does not offer
    pub fn set_observation_type(&mut self, observation_type: ObservationType, vocabulary: &Vocabulary) {
        let lists = vocabulary.for_type(observation_type);

        if !lists.species.contains(&self.species) {
            self.species.clear();
        }
        if !lists.behaviors.contains(&self.behavior) {
            self.behavior.clear();
        }
        self.observation_type = Some(observation_type);
    }
}

/// Form contents after every required field passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub site: String,
    pub camera: String,
    pub retrieval_date: NaiveDate,
    pub observation_type: ObservationType,
    pub species: String,
    pub behavior: String,
    pub reviewer_name: String,
    pub notes: String,
}

/// Species and behaviors offered for one observation type
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeVocabulary {
    pub species: Vec<String>,
    pub behaviors: Vec<String>,
}

/// Controlled vocabulary for the form's dropdowns (configuration, not logic)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Vocabulary {
    pub sites: Vec<String>,
    pub cameras: Vec<String>,
    pub seabird: TypeVocabulary,
    pub predator: TypeVocabulary,
}

impl Vocabulary {
    pub fn for_type(&self, observation_type: ObservationType) -> &TypeVocabulary {
        match observation_type {
            ObservationType::Seabird => &self.seabird,
            ObservationType::Predator => &self.predator,
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            sites: (1..=6).map(|i| format!("Location {}", i)).collect(),
            cameras: (1..=8).map(|i| format!("CAM{:03}", i)).collect(),
            seabird: TypeVocabulary {
                species: owned(&[
                    "Laysan Albatross (Phoebastria immutabilis)",
                    "Black-footed Albatross (Phoebastria nigripes)",
                    "Wedge-tailed Shearwater (Ardenna pacifica)",
                    "Newell's Shearwater (Puffinus newelli)",
                    "Hawaiian Petrel (Pterodroma sandwichensis)",
                    "Red-tailed Tropicbird (Phaethon rubricauda)",
                    "White-tailed Tropicbird (Phaethon lepturus)",
                    "Brown Booby (Sula leucogaster)",
                    "Red-footed Booby (Sula sula)",
                    "Great Frigatebird (Fregata minor)",
                ]),
                behaviors: owned(&[
                    "Chick rearing",
                    "Cleaning",
                    "Courtship",
                    "Defending territory",
                    "Feeding",
                    "Flying",
                    "Foraging",
                    "Incubating",
                    "Nesting",
                    "Preening",
                    "Resting",
                ]),
            },
            predator: TypeVocabulary {
                species: owned(&[
                    "Rat (Rattus sp.)",
                    "Cat (Felis catus)",
                    "Mongoose (Herpestes javanicus)",
                    "Barn Owl (Tyto alba)",
                    "Dog (Canis lupus familiaris)",
                    "Goat (Capra hircus)",
                    "Deer (Cervidae)",
                ]),
                behaviors: owned(&[
                    "Depredating nest",
                    "Feeding",
                    "Foraging",
                    "Investigating nest",
                    "Passing through",
                    "Resting",
                ]),
            },
        }
    }
}
