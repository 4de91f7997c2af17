use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AiController, HeuristicEvaluator, HeuristicWeights, Lookahead, PlacementSearch};

#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::FromStr,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Everything needed to build an [`AiController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiProfile {
    pub weights: HeuristicWeights,
    pub lookahead: Option<Lookahead>,
    pub think_delay_ms: u64,
    pub action_delay_ms: u64,
    pub hard_drop: bool,
}

impl Default for AiProfile {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::default())
    }
}

impl AiProfile {
    #[must_use]
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                weights: HeuristicWeights::basic(),
                lookahead: None,
                think_delay_ms: 600,
                action_delay_ms: 300,
                hard_drop: false,
            },
            Difficulty::Normal => Self {
                weights: HeuristicWeights::default(),
                lookahead: None,
                think_delay_ms: 300,
                action_delay_ms: 200,
                hard_drop: false,
            },
            Difficulty::Hard => Self {
                weights: HeuristicWeights::careful(),
                lookahead: Some(Lookahead::default()),
                think_delay_ms: 150,
                action_delay_ms: 80,
                hard_drop: true,
            },
        }
    }

    #[must_use]
    pub fn think_delay(&self) -> Duration {
        Duration::from_millis(self.think_delay_ms)
    }

    #[must_use]
    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    #[must_use]
    pub fn build(&self) -> AiController {
        let evaluator = HeuristicEvaluator::new(self.weights.clone());
        let search = PlacementSearch::new(Box::new(evaluator)).with_lookahead(self.lookahead);
        AiController::new(search, self.think_delay(), self.action_delay())
            .with_hard_drop(self.hard_drop)
    }
}

impl From<Difficulty> for AiProfile {
    fn from(difficulty: Difficulty) -> Self {
        Self::from_difficulty(difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_names() {
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("brutal".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Normal.to_string(), "Normal");
    }

    #[test]
    fn harder_profiles_act_faster() {
        let [easy, normal, hard] =
            [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard].map(AiProfile::from);
        assert!(easy.think_delay() > normal.think_delay());
        assert!(normal.think_delay() > hard.think_delay());
        assert!(easy.action_delay() > normal.action_delay());
        assert!(normal.action_delay() > hard.action_delay());
        assert!(hard.lookahead.is_some());
    }

    #[test]
    fn profile_from_json_fills_defaults() {
        let profile: AiProfile =
            serde_json::from_str(r#"{ "think_delay_ms": 50, "hard_drop": true }"#).unwrap();
        assert_eq!(profile.think_delay(), Duration::from_millis(50));
        assert!(profile.hard_drop);
        assert_eq!(profile.action_delay_ms, 200);
        assert_eq!(profile.weights, HeuristicWeights::default());

        let ai = profile.build();
        assert!(ai.search().lookahead().is_none());
    }
}
