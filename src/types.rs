//! Common types used throughout the ranking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted identifier of a team
pub type TeamId = i64;

/// Identifier of a snapshot (auto-incrementing)
pub type SnapshotId = i64;

/// Team identity record supplied by the data-access layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl Team {
    pub fn new(id: TeamId, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            tag: None,
            organization: None,
        }
    }
}

/// Raw match record as it comes out of storage.
///
/// `team_i`/`team_j` are arbitrary labels; a match has no home side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub team_i: Option<String>,
    pub team_j: Option<String>,
    pub score_i: Option<u32>,
    pub score_j: Option<u32>,
    pub played_at: DateTime<Utc>,
    #[serde(default)]
    pub map: Option<String>,
    #[serde(default)]
    pub tournament_id: Option<Uuid>,
}

impl Match {
    /// Convenience constructor for a fully specified match
    pub fn new(
        team_i: impl Into<String>,
        team_j: impl Into<String>,
        score_i: u32,
        score_j: u32,
        played_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            team_i: Some(team_i.into()),
            team_j: Some(team_j.into()),
            score_i: Some(score_i),
            score_j: Some(score_j),
            played_at,
            map: None,
            tournament_id: None,
        }
    }

    pub fn on_map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }
}

/// Everything one ranking run consumes, as supplied by the data-access layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
}

impl Dataset {
    /// Read a `{ "teams": [...], "matches": [...] }` JSON document
    pub fn from_json_file(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))
    }
}

/// The seven independent rating models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingModel {
    Colley,
    Massey,
    Elo,
    EloMargin,
    Skill,
    Centrality,
    Pairwise,
}

impl RatingModel {
    pub const ALL: [RatingModel; 7] = [
        RatingModel::Colley,
        RatingModel::Massey,
        RatingModel::Elo,
        RatingModel::EloMargin,
        RatingModel::Skill,
        RatingModel::Centrality,
        RatingModel::Pairwise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingModel::Colley => "colley",
            RatingModel::Massey => "massey",
            RatingModel::Elo => "elo",
            RatingModel::EloMargin => "elo_mov",
            RatingModel::Skill => "trueskill",
            RatingModel::Centrality => "pagerank",
            RatingModel::Pairwise => "bradley_terry",
        }
    }
}

impl std::fmt::Display for RatingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw score of every signal that went into a team's composite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub colley: f64,
    pub massey: f64,
    pub elo: f64,
    pub elo_mov: f64,
    pub trueskill: f64,
    pub pagerank: f64,
    pub bradley_terry: f64,
    pub pca: f64,
    pub sos: f64,
    pub consistency: f64,
    pub borda: u32,
    pub integrated: f64,
}

impl ComponentScores {
    /// Raw output of one model
    pub fn model(&self, model: RatingModel) -> f64 {
        match model {
            RatingModel::Colley => self.colley,
            RatingModel::Massey => self.massey,
            RatingModel::Elo => self.elo,
            RatingModel::EloMargin => self.elo_mov,
            RatingModel::Skill => self.trueskill,
            RatingModel::Centrality => self.pagerank,
            RatingModel::Pairwise => self.bradley_terry,
        }
    }
}

/// Outlier flag produced by the optional anomaly pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub is_anomaly: bool,
    pub score: f64,
}

/// One row of the in-memory ranking table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTeam {
    pub position: u32,
    pub slug: String,
    /// `None` when the slug has no matching team record
    pub team_id: Option<TeamId>,
    pub name: String,
    pub tag: Option<String>,
    pub organization: Option<String>,
    pub score: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub uncertainty: f64,
    pub games_count: u32,
    pub scores: ComponentScores,
    pub anomaly: Option<AnomalyFlag>,
}
