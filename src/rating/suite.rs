//! Runs all seven rating models over one match table

use crate::canonical::MatchTable;
use crate::config::EngineConfig;
use crate::error::{RankingError, Result};
use crate::rating::{
    CentralityRater, ColleyRater, EloRater, MasseyRater, ModelOutput, PairwiseRater, Rater,
    SkillRater,
};
use crate::types::RatingModel;
use tracing::{debug, info};

/// Outputs of every model, in [`RatingModel::ALL`] order
#[derive(Debug, Clone)]
pub struct SuiteOutput {
    outputs: Vec<ModelOutput>,
}

impl SuiteOutput {
    pub fn get(&self, model: RatingModel) -> Result<&ModelOutput> {
        self.outputs
            .iter()
            .find(|o| o.model == model)
            .ok_or_else(|| {
                RankingError::InternalError {
                    message: format!("missing {} output", model),
                }
                .into()
            })
    }

    pub fn outputs(&self) -> &[ModelOutput] {
        &self.outputs
    }

    /// Models that degraded to their neutral vector
    pub fn fallbacks(&self) -> Vec<RatingModel> {
        self.outputs
            .iter()
            .filter(|o| o.is_fallback())
            .map(|o| o.model)
            .collect()
    }
}

/// The Rating Model Suite
#[derive(Debug, Clone)]
pub struct RatingSuite {
    colley: ColleyRater,
    massey: MasseyRater,
    elo: EloRater,
    elo_margin: EloRater,
    skill: SkillRater,
    centrality: CentralityRater,
    pairwise: PairwiseRater,
}

impl RatingSuite {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            colley: ColleyRater::new(),
            massey: MasseyRater::new(),
            elo: EloRater::new(config.elo.clone()),
            elo_margin: EloRater::with_margin(config.elo.clone()),
            skill: SkillRater::new(config.skill.clone()),
            centrality: CentralityRater::new(config.centrality.clone()),
            pairwise: PairwiseRater::new(config.pairwise.clone()),
        }
    }

    fn guarded(rater: &dyn Rater, output: ModelOutput, n: usize) -> Result<ModelOutput> {
        if output.scores.len() != n {
            return Err(RankingError::InternalError {
                message: format!(
                    "{} produced {} scores for {} teams",
                    output.model,
                    output.scores.len(),
                    n
                ),
            }
            .into());
        }
        let output = output.sanitized(rater.neutral(n));
        debug!(
            model = %output.model,
            fallback = output.is_fallback(),
            "Model finished"
        );
        Ok(output)
    }

    pub fn run(&self, table: &MatchTable) -> Result<SuiteOutput> {
        let n = table.team_count();
        info!("Running rating models over {} teams", n);

        let colley = Self::guarded(&self.colley, self.colley.rate(table)?, n)?;
        let elo = self.elo.rate_seeded(table, &colley.scores)?;
        let elo_margin = self.elo_margin.rate_seeded(table, &colley.scores)?;

        let outputs = vec![
            Self::guarded(&self.massey, self.massey.rate(table)?, n)?,
            Self::guarded(&self.elo, elo, n)?,
            Self::guarded(&self.elo_margin, elo_margin, n)?,
            Self::guarded(&self.skill, self.skill.rate(table)?, n)?,
            Self::guarded(&self.centrality, self.centrality.rate(table)?, n)?,
            Self::guarded(&self.pairwise, self.pairwise.rate(table)?, n)?,
        ];

        let mut all = Vec::with_capacity(RatingModel::ALL.len());
        all.push(colley);
        all.extend(outputs);

        let suite = SuiteOutput { outputs: all };
        let fallbacks = suite.fallbacks();
        if !fallbacks.is_empty() {
            info!("{} model(s) used neutral fallbacks: {:?}", fallbacks.len(), fallbacks);
        }
        Ok(suite)
    }
}
