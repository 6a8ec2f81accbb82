//! Seasons, terms and the primary-season file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// A registration season. The numeric code is what SOC expects in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// SOC term code for this season.
    pub fn code(self) -> u8 {
        match self {
            Season::Winter => 0,
            Season::Spring => 1,
            Season::Summer => 7,
            Season::Fall => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown season `{0}`")]
pub struct UnknownSeason(pub String);

impl FromStr for Season {
    type Err = UnknownSeason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|season| season.name() == lower)
            .ok_or(UnknownSeason(s.to_string()))
    }
}

/// A (season, year) pair identifying one registration period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub season: Season,
    pub year: i32,
}

impl Term {
    pub fn new(season: Season, year: i32) -> Self {
        Self { season, year }
    }

    /// Resolves the term SOC should be asked about for `season` in calendar year `current_year`.
    ///
    /// Spring belongs to the academic cycle that started the previous calendar
    /// year, so it is always requested as `current_year + 1`. Every other
    /// season uses the calendar year unchanged.
    pub fn resolve(season: Season, current_year: i32) -> Self {
        let year = match season {
            Season::Spring => current_year + 1,
            Season::Winter | Season::Summer | Season::Fall => current_year,
        };
        Self { season, year }
    }

    /// The `semester` query value used by the subjects/courses endpoints, e.g. `92024`.
    pub fn semester_code(&self) -> String {
        format!("{}{}", self.season.code(), self.year)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.year)
    }
}

/// The season named in the season file. Selects which pair of terms is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySeason {
    Fall,
    Spring,
}

#[derive(Debug, Error)]
pub enum SeasonFileError {
    #[error("could not read season file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("season file {path} names neither spring nor fall")]
    NoSeason { path: String },
}

impl PrimarySeason {
    /// Reads the primary season from a single-line text file.
    pub fn from_file(path: &Path) -> Result<Self, SeasonFileError> {
        let contents = fs::read_to_string(path).map_err(|source| SeasonFileError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&contents).ok_or_else(|| SeasonFileError::NoSeason {
            path: path.display().to_string(),
        })
    }

    /// Finds the primary season in the file contents. Spring is checked first.
    pub fn parse(contents: &str) -> Option<Self> {
        let lower = contents.to_lowercase();
        if lower.contains("spring") {
            Some(PrimarySeason::Spring)
        } else if lower.contains("fall") {
            Some(PrimarySeason::Fall)
        } else {
            None
        }
    }

    /// Seasons tracked while this is the primary season.
    pub fn tracked_seasons(self) -> [Season; 2] {
        match self {
            PrimarySeason::Fall => [Season::Fall, Season::Summer],
            PrimarySeason::Spring => [Season::Spring, Season::Winter],
        }
    }

    /// Terms tracked during `current_year`.
    pub fn tracked_terms(self, current_year: i32) -> Vec<Term> {
        self.tracked_seasons()
            .into_iter()
            .map(|season| Term::resolve(season, current_year))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_codes() {
        assert_eq!(Season::Winter.code(), 0);
        assert_eq!(Season::Spring.code(), 1);
        assert_eq!(Season::Summer.code(), 7);
        assert_eq!(Season::Fall.code(), 9);
        assert_eq!(Season::from_code(7), Some(Season::Summer));
        assert_eq!(Season::from_code(3), None);
    }

    #[test]
    fn test_season_from_str() {
        assert_eq!("Fall".parse::<Season>(), Ok(Season::Fall));
        assert_eq!(" spring\n".parse::<Season>(), Ok(Season::Spring));
        assert!("autumn".parse::<Season>().is_err());
    }

    #[test]
    fn test_spring_resolves_to_next_year() {
        assert_eq!(Term::resolve(Season::Spring, 2024), Term::new(Season::Spring, 2025));
        assert_eq!(Term::resolve(Season::Fall, 2024), Term::new(Season::Fall, 2024));
        assert_eq!(Term::resolve(Season::Summer, 2024).year, 2024);
        assert_eq!(Term::resolve(Season::Winter, 2024).year, 2024);
    }

    #[test]
    fn test_semester_code() {
        assert_eq!(Term::new(Season::Fall, 2024).semester_code(), "92024");
        assert_eq!(Term::new(Season::Winter, 2025).semester_code(), "02025");
    }

    #[test]
    fn test_primary_season_parse() {
        assert_eq!(PrimarySeason::parse("fall\n"), Some(PrimarySeason::Fall));
        assert_eq!(PrimarySeason::parse("Spring"), Some(PrimarySeason::Spring));
        assert_eq!(PrimarySeason::parse("summer"), None);
        assert_eq!(PrimarySeason::parse(""), None);
    }

    #[test]
    fn test_tracked_terms() {
        assert_eq!(
            PrimarySeason::Fall.tracked_terms(2024),
            vec![Term::new(Season::Fall, 2024), Term::new(Season::Summer, 2024)]
        );
        assert_eq!(
            PrimarySeason::Spring.tracked_terms(2024),
            vec![Term::new(Season::Spring, 2025), Term::new(Season::Winter, 2024)]
        );
    }

    #[test]
    fn test_primary_season_missing_file() {
        let err = PrimarySeason::from_file(Path::new("/nonexistent/season.txt")).unwrap_err();
        assert!(matches!(err, SeasonFileError::Unreadable { .. }));
    }
}
