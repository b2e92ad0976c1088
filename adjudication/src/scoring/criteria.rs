//! Scoring criteria and per-event scoring configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::{CriterionId, JudgeSeat};

/// Points the KO loser receives unless configured otherwise
pub const DEFAULT_KO_LOSER_SCORE: u32 = 0;

/// Maximum number of criteria an event may configure
pub const MAX_CRITERIA: usize = 6;

/// Maximum points a single criterion may carry
pub const MAX_CRITERION_POINTS: u32 = 10;

/// Error type for scoring configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one scoring criterion is required")]
    NoCriteria,

    #[error("Too many scoring criteria: {0} (max 6)")]
    TooManyCriteria(usize),

    #[error("Scoring criterion with empty id")]
    EmptyCriterionId,

    #[error("Duplicate scoring criterion: {0}")]
    DuplicateCriterion(String),

    #[error("Criterion {criterion} has {points} points (allowed 1-10)")]
    PointsOutOfRange { criterion: String, points: u32 },

    #[error("KO loser score {loser} must be below KO winner score {winner}")]
    KoLoserScoreTooHigh { loser: u32, winner: u32 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scoring config: {0}")]
    Parse(String),
}

/// A named scoring category with a fixed per-judge point budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Key used in submitted point splits
    pub id: CriterionId,
    /// Display name
    pub name: String,
    /// Points split between the two competitors
    pub points: u32,
}

impl Criterion {
    pub fn new(id: impl Into<CriterionId>, name: impl Into<String>, points: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            points,
        }
    }
}

/// Criteria and KO policy for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub criteria: Vec<Criterion>,
    /// Score given to the loser of a KO decision
    pub ko_loser_score: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            criteria: vec![
                Criterion::new("aggression", "Aggression", 3),
                Criterion::new("damage", "Damage", 5),
                Criterion::new("control", "Control", 3),
            ],
            ko_loser_score: DEFAULT_KO_LOSER_SCORE,
        }
    }
}

impl ScoringConfig {
    /// Build and validate a config from explicit criteria
    pub fn new(criteria: Vec<Criterion>, ko_loser_score: u32) -> Result<Self, ConfigError> {
        let config = Self {
            criteria,
            ko_loser_score,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    ///
    /// ```toml
    /// ko_loser_score = 0
    ///
    /// [[criteria]]
    /// id = "damage"
    /// name = "Damage"
    /// points = 5
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.criteria.is_empty() {
            return Err(ConfigError::NoCriteria);
        }
        if self.criteria.len() > MAX_CRITERIA {
            return Err(ConfigError::TooManyCriteria(self.criteria.len()));
        }

        for (i, criterion) in self.criteria.iter().enumerate() {
            if criterion.id.trim().is_empty() {
                return Err(ConfigError::EmptyCriterionId);
            }
            if !(1..=MAX_CRITERION_POINTS).contains(&criterion.points) {
                return Err(ConfigError::PointsOutOfRange {
                    criterion: criterion.id.clone(),
                    points: criterion.points,
                });
            }
            if self.criteria[..i].iter().any(|c| c.id == criterion.id) {
                return Err(ConfigError::DuplicateCriterion(criterion.id.clone()));
            }
        }

        let winner = self.ko_winner_score();
        if self.ko_loser_score >= winner {
            return Err(ConfigError::KoLoserScoreTooHigh {
                loser: self.ko_loser_score,
                winner,
            });
        }

        Ok(())
    }

    /// Points one judge splits across all criteria
    pub fn point_budget(&self) -> u32 {
        self.criteria.iter().map(|c| c.points).sum()
    }

    /// Score the KO winner receives: the full budget of every judge
    pub fn ko_winner_score(&self) -> u32 {
        self.point_budget() * JudgeSeat::PANEL_SIZE as u32
    }

    pub fn criterion(&self, id: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.point_budget(), 11);
        assert_eq!(config.ko_winner_score(), 33);
        assert_eq!(config.ko_loser_score, 0);
        assert_eq!(config.criterion("damage").unwrap().points, 5);
    }

    #[test]
    fn test_validation_limits() {
        assert!(matches!(
            ScoringConfig::new(vec![], 0),
            Err(ConfigError::NoCriteria)
        ));

        let seven: Vec<Criterion> = (0..7)
            .map(|i| Criterion::new(format!("c{i}"), format!("C{i}"), 1))
            .collect();
        assert!(matches!(
            ScoringConfig::new(seven, 0),
            Err(ConfigError::TooManyCriteria(7))
        ));

        assert!(matches!(
            ScoringConfig::new(vec![Criterion::new("x", "X", 11)], 0),
            Err(ConfigError::PointsOutOfRange { points: 11, .. })
        ));
        assert!(matches!(
            ScoringConfig::new(vec![Criterion::new("x", "X", 0)], 0),
            Err(ConfigError::PointsOutOfRange { points: 0, .. })
        ));
        assert!(matches!(
            ScoringConfig::new(
                vec![Criterion::new("x", "X", 2), Criterion::new("x", "Again", 3)],
                0
            ),
            Err(ConfigError::DuplicateCriterion(_))
        ));
        assert!(matches!(
            ScoringConfig::new(vec![Criterion::new(" ", "Blank", 2)], 0),
            Err(ConfigError::EmptyCriterionId)
        ));
    }

    #[test]
    fn test_ko_loser_score_must_stay_below_winner() {
        let criteria = vec![Criterion::new("damage", "Damage", 5)];
        assert!(ScoringConfig::new(criteria.clone(), 14).is_ok());
        assert!(matches!(
            ScoringConfig::new(criteria, 15),
            Err(ConfigError::KoLoserScoreTooHigh {
                loser: 15,
                winner: 15
            })
        ));
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
ko_loser_score = 2

[[criteria]]
id = "damage"
name = "Damage"
points = 6

[[criteria]]
id = "style"
name = "Style"
points = 4
"#;
        let config = ScoringConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.criteria.len(), 2);
        assert_eq!(config.point_budget(), 10);
        assert_eq!(config.ko_loser_score, 2);
    }

    #[test]
    fn test_from_toml_defaults_missing_fields() {
        let config = ScoringConfig::from_toml_str("ko_loser_score = 1").unwrap();
        assert_eq!(config.point_budget(), 11);
        assert_eq!(config.ko_loser_score, 1);

        assert!(matches!(
            ScoringConfig::from_toml_str("criteria = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScoringConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
