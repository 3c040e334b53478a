// Domain types shared by the parser, matcher, and commit coordinator.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque team identifier assigned by the backend.
pub type TeamId = String;

/// Opaque player identifier assigned by the backend.
pub type PlayerId = String;

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Canonical team gender category. Renders as "Boys", "Girls" or "Mixed",
/// which is also the form teams are stored and matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Boys,
    Girls,
    Mixed,
}

impl Gender {
    /// Normalize a free-text gender value.
    ///
    /// Trimmed and case-insensitive. Anything unrecognised (including blank
    /// or garbled input) falls back to `Mixed` rather than failing.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "MALE" | "M" | "BOY" | "BOYS" | "MEN" => Gender::Boys,
            "FEMALE" | "F" | "GIRL" | "GIRLS" | "WOMEN" => Gender::Girls,
            _ => Gender::Mixed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Boys => "Boys",
            Gender::Girls => "Girls",
            Gender::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parent relationship
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentRelationship {
    Mother,
    Father,
    Guardian,
    Grandparent,
    Other,
}

impl ParentRelationship {
    /// Parse a free-text relationship. Blank input yields `None`; any other
    /// unrecognised value yields `Other`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        Some(match normalized.as_str() {
            "mother" | "mum" | "mom" => ParentRelationship::Mother,
            "father" | "dad" => ParentRelationship::Father,
            "guardian" => ParentRelationship::Guardian,
            "grandparent" | "grandmother" | "grandfather" => ParentRelationship::Grandparent,
            _ => ParentRelationship::Other,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsed rows
// ---------------------------------------------------------------------------

/// One player row read from an import file, normalized and (after matching)
/// linked to a team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPlayerRow {
    /// Display name, "First Last".
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub age_group: String,
    pub sport: String,
    pub gender: Gender,
    pub season: String,
    pub parent_first_name: Option<String>,
    pub parent_surname: Option<String>,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    pub parent_relationship: Option<ParentRelationship>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    /// Position among the kept rows of the parse that produced this row.
    pub row_index: usize,
    pub matched_team_id: Option<TeamId>,
    pub matched_team_name: Option<String>,
}

impl ParsedPlayerRow {
    pub fn is_matched(&self) -> bool {
        self.matched_team_id.is_some()
    }

    /// The tuple a team must equal for this row to match it.
    pub fn team_key(&self) -> TeamKey<'_> {
        TeamKey {
            sport: &self.sport,
            age_group: &self.age_group,
            gender: self.gender.as_str(),
            season: &self.season,
        }
    }
}

/// Borrowed (sport, age group, gender, season) tuple used for matching and
/// bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeamKey<'a> {
    pub sport: &'a str,
    pub age_group: &'a str,
    pub gender: &'a str,
    pub season: &'a str,
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// A team as returned by the backend. Matching attributes are optional on the
/// backend side; a team missing any of them never matches a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "_id")]
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Team {
    pub fn matches(&self, key: &TeamKey<'_>) -> bool {
        self.sport.as_deref() == Some(key.sport)
            && self.age_group.as_deref() == Some(key.age_group)
            && self.gender.as_deref() == Some(key.gender)
            && self.season.as_deref() == Some(key.season)
    }
}

/// Arguments of the backend's create-team call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    pub organization_id: String,
    pub sport: String,
    pub age_group: String,
    pub gender: Gender,
    pub season: String,
    pub is_active: bool,
}

impl NewTeam {
    /// Build the create-team payload for a missing-team bucket. The team is
    /// named "{age group} {gender}", e.g. "U12 Boys".
    pub fn from_bucket(organization_id: &str, bucket: &MissingTeamBucket) -> Self {
        Self {
            name: format!("{} {}", bucket.age_group, bucket.gender),
            organization_id: organization_id.to_string(),
            sport: bucket.sport.clone(),
            age_group: bucket.age_group.clone(),
            gender: bucket.gender,
            season: bucket.season.clone(),
            is_active: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Arguments of the backend's create-player call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub name: String,
    pub age_group: String,
    pub sport: String,
    pub gender: Gender,
    pub organization_id: String,
    pub season: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_phone: Option<String>,
}

impl NewPlayer {
    /// Build the create-player payload for a parsed row. Parent email is
    /// trimmed and lower-cased the way the backend stores it.
    pub fn from_row(organization_id: &str, row: &ParsedPlayerRow) -> Self {
        Self {
            name: row.name.clone(),
            age_group: row.age_group.clone(),
            sport: row.sport.clone(),
            gender: row.gender,
            organization_id: organization_id.to_string(),
            season: row.season.clone(),
            date_of_birth: row.date_of_birth.clone(),
            address: row.address.clone(),
            town: row.town.clone(),
            postcode: row.postcode.clone(),
            parent_first_name: row.parent_first_name.clone(),
            parent_surname: row.parent_surname.clone(),
            parent_email: row.parent_email.as_ref().map(|e| e.trim().to_lowercase()),
            parent_phone: row.parent_phone.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Missing teams
// ---------------------------------------------------------------------------

/// A (sport, age group, gender, season) tuple shared by unmatched rows, with
/// the number of rows that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTeamBucket {
    pub sport: String,
    pub age_group: String,
    pub gender: Gender,
    pub season: String,
    pub count: usize,
}
