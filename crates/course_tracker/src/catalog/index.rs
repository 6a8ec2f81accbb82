/// Flattened section index and its four stored projections
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::db::CatalogDocument;
use crate::soc::Course;
use crate::term::Season;

/// Everything the client app needs to label one section index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub subject: String,
    /// Course title
    pub name: String,
    /// Section number within the course, e.g. "01"
    pub section: String,
    /// Course number, e.g. "111"
    pub course: String,
}

/// One attribute of [`CatalogEntry`] stored as its own document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Sections,
    Names,
    Subjects,
    Courses,
}

impl Projection {
    pub const ALL: [Projection; 4] = [
        Projection::Sections,
        Projection::Names,
        Projection::Subjects,
        Projection::Courses,
    ];

    /// Document name, also used as the single top-level key of the body.
    pub fn document(self) -> &'static str {
        match self {
            Projection::Sections => "sections",
            Projection::Names => "names",
            Projection::Subjects => "subjects",
            Projection::Courses => "courses",
        }
    }

    fn value(self, entry: &CatalogEntry) -> &str {
        match self {
            Projection::Sections => &entry.section,
            Projection::Names => &entry.name,
            Projection::Subjects => &entry.subject,
            Projection::Courses => &entry.course,
        }
    }
}

/// Section index → catalog entry for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIndex {
    entries: BTreeMap<String, CatalogEntry>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: &str) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    /// Adds every complete section of `course`. Returns how many sections were skipped.
    pub fn add_course(&mut self, course: &Course) -> usize {
        let Some(sections) = &course.sections else {
            warn!(
                title = ?course.title,
                course_number = ?course.course_number,
                "Course has no sections, skipping"
            );
            return 0;
        };

        let mut skipped = 0;
        for section in sections {
            let (Some(subject), Some(name), Some(number), Some(index)) = (
                &course.subject,
                &course.title,
                &section.number,
                &section.index,
            ) else {
                warn!(
                    title = ?course.title,
                    subject = ?course.subject,
                    index = ?section.index,
                    number = ?section.number,
                    "Section is missing fields, skipping"
                );
                skipped += 1;
                continue;
            };

            self.entries.insert(
                index.clone(),
                CatalogEntry {
                    subject: subject.clone(),
                    name: name.clone(),
                    section: number.clone(),
                    course: course.course_number.clone().unwrap_or_default(),
                },
            );
        }
        skipped
    }

    /// Builds the body of one projection document: `{ "<doc>": { "<index>": "<value>" } }`.
    pub fn projection(&self, projection: Projection) -> Value {
        let values: Map<String, Value> = self
            .entries
            .iter()
            .map(|(index, entry)| (index.clone(), Value::from(projection.value(entry))))
            .collect();

        let mut body = Map::new();
        body.insert(projection.document().to_string(), Value::Object(values));
        Value::Object(body)
    }

    /// All four documents for `season`'s collection.
    pub fn documents(&self, season: Season) -> Vec<CatalogDocument> {
        Projection::ALL
            .into_iter()
            .map(|projection| CatalogDocument {
                collection: season.name().to_string(),
                document: projection.document().to_string(),
                body: self.projection(projection),
            })
            .collect()
    }
}
