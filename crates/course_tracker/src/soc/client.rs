//! HTTP client for the Rutgers Schedule of Classes (SOC).
//!
//! Three read-only endpoints are used:
//! 1. `openSections` lists the section indices currently accepting registration
//! 2. `subjects` lists subject codes for a semester
//! 3. `courses` lists a subject's courses, each with its sections

use super::error::SocError;
use super::types::{Course, Subject};
use crate::term::Term;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

const OPEN_SECTIONS_URL: &str = "https://sis.rutgers.edu/soc/api/openSections.gzip";
const SUBJECTS_URL: &str = "https://sis.rutgers.edu/oldsoc/subjects.json";
const COURSES_URL: &str = "https://sis.rutgers.edu/oldsoc/courses.json";

/// Configuration for the SOC client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocConfig {
    pub open_sections_url: Url,
    pub subjects_url: Url,
    pub courses_url: Url,
    /// Campus code sent with every request
    pub campus: String,
    /// `level` sent to the subjects endpoint
    pub subject_level: String,
    /// `level` sent to the courses endpoint
    pub course_level: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SocConfig {
    fn default() -> Self {
        Self {
            open_sections_url: Url::parse(OPEN_SECTIONS_URL).expect("valid default URL"),
            subjects_url: Url::parse(SUBJECTS_URL).expect("valid default URL"),
            courses_url: Url::parse(COURSES_URL).expect("valid default URL"),
            campus: "NB".to_string(),
            subject_level: "U".to_string(),
            course_level: "UG".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 20,
            user_agent: concat!("course_tracker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SocConfig {
    /// Points every endpoint at `base` with SOC's usual paths. Used by tests and local mirrors.
    pub fn with_base_url(mut self, base: &str) -> Result<Self, SocError> {
        let base = base.trim_end_matches('/');
        self.open_sections_url = Url::parse(&format!("{base}/soc/api/openSections.gzip"))?;
        self.subjects_url = Url::parse(&format!("{base}/oldsoc/subjects.json"))?;
        self.courses_url = Url::parse(&format!("{base}/oldsoc/courses.json"))?;
        Ok(self)
    }
}

/// Client for the Schedule of Classes API.
pub struct SocClient {
    client: Client,
    config: SocConfig,
}

impl SocClient {
    pub fn new(config: SocConfig) -> Result<Self, SocError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SocError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SocConfig {
        &self.config
    }

    /// Fetches the set of section indices open for `term`.
    pub async fn open_sections(&self, term: Term) -> Result<HashSet<String>, SocError> {
        let start = Instant::now();
        let query = [
            ("year", term.year.to_string()),
            ("term", term.season.code().to_string()),
            ("campus", self.config.campus.clone()),
        ];

        let indices: Vec<String> = self
            .get_json(&self.config.open_sections_url, &query)
            .await?;

        info!(
            term = %term,
            open = indices.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched open sections"
        );

        Ok(indices.into_iter().collect())
    }

    /// Fetches the subject list for `term`.
    pub async fn subjects(&self, term: Term) -> Result<Vec<Subject>, SocError> {
        let query = [
            ("semester", term.semester_code()),
            ("campus", self.config.campus.clone()),
            ("level", self.config.subject_level.clone()),
        ];
        self.get_json(&self.config.subjects_url, &query).await
    }

    /// Fetches every course (with sections) of one subject in `term`.
    pub async fn courses(&self, term: Term, subject_code: &str) -> Result<Vec<Course>, SocError> {
        let query = [
            ("subject", subject_code.to_string()),
            ("semester", term.semester_code()),
            ("campus", self.config.campus.clone()),
            ("level", self.config.course_level.clone()),
        ];
        self.get_json(&self.config.courses_url, &query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, SocError> {
        debug!(url = %url, ?query, "Requesting SOC");

        let response = self.client.get(url.clone()).query(query).send().await?;

        if !response.status().is_success() {
            return Err(SocError::Status {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
