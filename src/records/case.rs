//! Case record schema
//!
//! Defines the patient case entries kept in the case log, plus the valve
//! sites the recordings belong to.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{HeartestError, Result};

/// Number of auscultation sites a complete case covers
pub const VALVE_COUNT: usize = 4;

/// Timestamp layout used in the case log
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator between file names in the `file` field
const FILE_SEPARATOR: &str = ", ";

/// Oldest age accepted on the intake form
pub const MAX_AGE: u32 = 120;

// ============================================================================
// Valve sites
// ============================================================================

/// Auscultation site, in the order recordings are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValveSite {
    Aortic,
    Pulmonary,
    Tricuspid,
    Mitral,
}

impl ValveSite {
    /// All sites in canonical order
    pub const ALL: [ValveSite; VALVE_COUNT] = [
        ValveSite::Aortic,
        ValveSite::Pulmonary,
        ValveSite::Tricuspid,
        ValveSite::Mitral,
    ];

    /// Label used in file names and on screen
    pub fn label(&self) -> &'static str {
        match self {
            ValveSite::Aortic => "Aortic",
            ValveSite::Pulmonary => "Pulmonary",
            ValveSite::Tricuspid => "Tricuspid",
            ValveSite::Mitral => "Mitral",
        }
    }
}

impl fmt::Display for ValveSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ValveSite {
    type Err = HeartestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "aortic" | "a" => Ok(ValveSite::Aortic),
            "pulmonary" | "pulmonic" | "p" => Ok(ValveSite::Pulmonary),
            "tricuspid" | "t" => Ok(ValveSite::Tricuspid),
            "mitral" | "m" => Ok(ValveSite::Mitral),
            other => Err(HeartestError::invalid_parameter(
                "valve",
                other,
                "aortic, pulmonary, tricuspid or mitral",
            )),
        }
    }
}

/// Stored recordings for one case, keyed by valve site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValveSet {
    files: BTreeMap<ValveSite, String>,
}

impl ValveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the stored file for a site, replacing any earlier upload
    pub fn insert(&mut self, site: ValveSite, file_name: impl Into<String>) {
        self.files.insert(site, file_name.into());
    }

    pub fn get(&self, site: ValveSite) -> Option<&str> {
        self.files.get(&site).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sites with no recording yet
    pub fn missing(&self) -> Vec<ValveSite> {
        ValveSite::ALL
            .into_iter()
            .filter(|site| !self.files.contains_key(site))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// File names in canonical site order
    ///
    /// # Errors
    /// * `IncompleteValveSet` - If any site has no recording
    pub fn file_names(&self) -> Result<Vec<String>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(HeartestError::IncompleteValveSet {
                missing: missing.iter().map(|s| s.label().to_string()).collect(),
            });
        }
        Ok(self.files.values().cloned().collect())
    }
}

// ============================================================================
// Patient info
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        };
        f.write_str(label)
    }
}

impl FromStr for Gender {
    type Err = HeartestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            other => Err(HeartestError::invalid_parameter(
                "gender",
                other,
                "male, female or other",
            )),
        }
    }
}

/// Intake form fields, before a case record exists
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatientInfo {
    pub name: String,
    pub age: u32,
    pub gender: Option<Gender>,
    pub notes: String,
    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
}

impl PatientInfo {
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            age,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HeartestError::invalid_parameter(
                "name",
                "<empty>",
                "the patient's name",
            ));
        }
        if !(1..=MAX_AGE).contains(&self.age) {
            return Err(HeartestError::invalid_parameter(
                "age",
                self.age,
                format!("1 to {}", MAX_AGE),
            ));
        }
        for (param, value) in [("height_cm", self.height_cm), ("weight_kg", self.weight_kg)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(HeartestError::invalid_parameter(param, v, "a positive number"));
                }
            }
        }
        Ok(())
    }

    /// Body mass index, when both height and weight are known
    pub fn bmi(&self) -> Option<f64> {
        match (self.height_cm, self.weight_kg) {
            (Some(h), Some(w)) if h > 0.0 => Some(compute_bmi(h, w)),
            _ => None,
        }
    }
}

/// BMI from height in centimetres and weight in kilograms, to two decimals
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let height_m = height_cm / 100.0;
    (weight_kg / (height_m * height_m) * 100.0).round() / 100.0
}

// ============================================================================
// Case record
// ============================================================================

/// One saved case, immutable once appended to the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub name: String,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    /// Stored valve recordings in canonical site order
    #[serde(rename = "file", with = "file_list")]
    pub files: Vec<String>,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
}

impl CaseRecord {
    /// Build a record stamped with the given time
    ///
    /// # Errors
    /// * `InvalidParameter` - If the patient fields are invalid
    /// * `IncompleteValveSet` - If any valve recording is missing
    pub fn new(patient: &PatientInfo, valves: &ValveSet, date: NaiveDateTime) -> Result<Self> {
        patient.validate()?;
        let files = valves.file_names()?;

        Ok(Self {
            name: patient.name.trim().to_string(),
            age: patient.age,
            gender: patient.gender,
            notes: patient.notes.clone(),
            height: patient.height_cm,
            weight: patient.weight_kg,
            bmi: patient.bmi(),
            files,
            date,
        })
    }

    /// Build a record stamped with the current local time, to the second
    pub fn now(patient: &PatientInfo, valves: &ValveSet) -> Result<Self> {
        let now = Local::now().naive_local();
        Self::new(patient, valves, now.with_nanosecond(0).unwrap_or(now))
    }

    /// Check the record references one recording per valve site
    ///
    /// # Errors
    /// * `InvalidParameter` - If a name holds a comma or there are too many files
    /// * `IncompleteValveSet` - If a site has no recording
    pub fn check_valves(&self) -> Result<()> {
        if let Some(bad) = self.files.iter().find(|f| f.contains(',')) {
            return Err(HeartestError::invalid_parameter(
                "file",
                bad,
                "a file name without commas",
            ));
        }
        if self.files.len() > VALVE_COUNT {
            return Err(HeartestError::invalid_parameter(
                "file",
                format!("{} files", self.files.len()),
                format!("exactly {} files", VALVE_COUNT),
            ));
        }

        let missing: Vec<String> = ValveSite::ALL
            .iter()
            .enumerate()
            .filter(|(i, _)| self.files.get(*i).map_or(true, |f| f.trim().is_empty()))
            .map(|(_, site)| site.label().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(HeartestError::IncompleteValveSet { missing });
        }
        Ok(())
    }

    /// Stored file for a site, by canonical position
    pub fn file_for(&self, site: ValveSite) -> Option<&str> {
        let index = ValveSite::ALL.iter().position(|s| *s == site)?;
        self.files.get(index).map(String::as_str)
    }

    /// Timestamp as written in the log
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Header line used when listing history
    pub fn headline(&self) -> String {
        format!("{} ({} y/o) - {}", self.name, self.age, self.date_string())
    }
}

/// `file` is written as one comma-separated string; arrays are accepted on read
mod file_list {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::FILE_SEPARATOR;

    pub fn serialize<S: Serializer>(files: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&files.join(FILE_SEPARATOR))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Joined(String),
        List(Vec<String>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Repr::List(list) => list,
        })
    }
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_FORMAT).map_err(de::Error::custom)
    }
}
