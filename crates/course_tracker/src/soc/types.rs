/// Types for Schedule of Classes responses
use serde::{Deserialize, Serialize};

/// Subject entry from `subjects.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Course entry from `courses.json`. Fields are optional because SOC
/// occasionally omits them; incomplete entries are skipped by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "courseNumber", default)]
    pub course_number: Option<String>,
    #[serde(default)]
    pub sections: Option<Vec<Section>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}
