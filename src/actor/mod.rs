//! Actors decide the next trajectory item
//!
//! [`BaseActor`] makes one model call. [`ReflexionActor`] and [`VerificationActor`] wrap another
//! actor and second-guess it with extra model calls. [`build_actor`] assembles a validated chain
//! from an [`ActorConfig`].

pub mod base;
pub mod reflexion;
pub mod verification;

pub use base::{BaseActor, DEFAULT_CONTEXT_MARGIN, debug_display};
pub use reflexion::{DEFAULT_MAX_NUM_ITERATIONS, ReflexionActor};
pub use verification::VerificationActor;

use crate::{afford::AffordanceStrategyId,
            browser::BrowserSession,
            error::{AgentError, AgentResult},
            llm::ChatCompletion,
            trajectory::{Trajectory, TrajectoryItem}};
use async_trait::async_trait;
use std::{fmt, str::FromStr, sync::Arc};

#[async_trait]
pub trait ActorStrategy: Send + Sync {
    /// Choose what happens next given the history and the current page
    async fn next_action(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<TrajectoryItem>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorStrategyId {
    Base,
    Reflexion,
    Verification,
}

impl FromStr for ActorStrategyId {
    type Err = AgentError;

    fn from_str(s: &str) -> AgentResult<Self> {
        match s {
            "base" | "base_llm" => Ok(ActorStrategyId::Base),
            "reflexion" => Ok(ActorStrategyId::Reflexion),
            "verification" => Ok(ActorStrategyId::Verification),
            other => Err(AgentError::InvalidStrategy(format!("unknown actor strategy: {}", other))),
        }
    }
}

impl fmt::Display for ActorStrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorStrategyId::Base => "base_llm",
            ActorStrategyId::Reflexion => "reflexion",
            ActorStrategyId::Verification => "verification",
        };
        f.write_str(name)
    }
}

/// Actor chain configuration
///
/// `chain` lists strategies from the outermost wrapper inwards, e.g. `[Reflexion, Base]`. A chain that
/// does not end in `Base` gets one appended.
#[derive(Debug, Clone)]
pub struct ActorConfig {
    pub chain: Vec<ActorStrategyId>,
    pub affordance: AffordanceStrategyId,
    pub max_num_iterations: usize,
    pub context_margin: f64,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            chain: vec![ActorStrategyId::Base],
            affordance: AffordanceStrategyId::default(),
            max_num_iterations: DEFAULT_MAX_NUM_ITERATIONS,
            context_margin: DEFAULT_CONTEXT_MARGIN,
        }
    }
}

impl ActorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: Vec<ActorStrategyId>) -> Self {
        self.chain = chain;
        self
    }

    pub fn affordance(mut self, affordance: AffordanceStrategyId) -> Self {
        self.affordance = affordance;
        self
    }

    pub fn max_num_iterations(mut self, max: usize) -> Self {
        self.max_num_iterations = max;
        self
    }

    pub fn context_margin(mut self, margin: f64) -> Self {
        self.context_margin = margin;
        self
    }

    /// Chain with `Base` appended when missing, checked for cycles and misplaced wrappers
    pub fn resolved_chain(&self) -> AgentResult<Vec<ActorStrategyId>> {
        if self.chain.is_empty() {
            return Err(AgentError::InvalidStrategy("actor chain is empty".to_string()));
        }
        let mut chain = self.chain.clone();
        if chain.last() != Some(&ActorStrategyId::Base) {
            chain.push(ActorStrategyId::Base);
        }

        let wrappers = &chain[..chain.len() - 1];
        if wrappers.contains(&ActorStrategyId::Base) {
            return Err(AgentError::InvalidStrategy("base_llm must be the innermost strategy".to_string()));
        }
        for (i, id) in wrappers.iter().enumerate() {
            if wrappers[i + 1..].contains(id) {
                return Err(AgentError::InvalidStrategy(format!("{} cannot wrap itself", id)));
            }
        }
        let verification = wrappers.iter().position(|id| *id == ActorStrategyId::Verification);
        if verification.is_some_and(|pos| pos + 1 != wrappers.len()) {
            return Err(AgentError::InvalidStrategy("verification must directly wrap base_llm".to_string()));
        }
        Ok(chain)
    }
}

/// Build the actor chain described by `config`
pub fn build_actor(config: &ActorConfig, model: Arc<dyn ChatCompletion>) -> AgentResult<Arc<dyn ActorStrategy>> {
    let chain = config.resolved_chain()?;
    let afforder = config.affordance.build(model.clone());
    let base = Arc::new(BaseActor::new(model.clone(), afforder.clone()).context_margin(config.context_margin));

    let mut actor: Arc<dyn ActorStrategy> = base.clone();
    for id in chain.iter().rev().skip(1) {
        actor = match id {
            ActorStrategyId::Verification => Arc::new(VerificationActor::new(base.clone(), model.clone())),
            ActorStrategyId::Reflexion => Arc::new(
                ReflexionActor::new(actor, model.clone(), afforder.clone())
                    .max_num_iterations(config.max_num_iterations),
            ),
            ActorStrategyId::Base => actor,
        };
    }
    log::debug!("Built actor chain {:?} with {}", chain, config.affordance);
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use ActorStrategyId::{Base, Reflexion, Verification};

    #[test]
    fn test_strategy_ids() {
        assert_eq!("reflexion".parse::<ActorStrategyId>().unwrap(), Reflexion);
        assert_eq!("base_llm".parse::<ActorStrategyId>().unwrap(), Base);
        assert!(matches!("react".parse::<ActorStrategyId>(), Err(AgentError::InvalidStrategy(_))));
        assert_eq!(Verification.to_string(), "verification");
    }

    #[test]
    fn test_base_is_appended() {
        let config = ActorConfig::new().chain(vec![Reflexion]);
        assert_eq!(config.resolved_chain().unwrap(), vec![Reflexion, Base]);
        let config = ActorConfig::new().chain(vec![Reflexion, Verification, Base]);
        assert_eq!(config.resolved_chain().unwrap(), vec![Reflexion, Verification, Base]);
    }

    #[test]
    fn test_invalid_chains_are_rejected() {
        for chain in [vec![], vec![Base, Reflexion], vec![Reflexion, Reflexion], vec![Verification, Reflexion]] {
            let config = ActorConfig::new().chain(chain.clone());
            assert!(
                matches!(config.resolved_chain(), Err(AgentError::InvalidStrategy(_))),
                "chain {:?} should be rejected",
                chain
            );
        }
    }

    #[test]
    fn test_build_actor() {
        let model: Arc<dyn ChatCompletion> = Arc::new(ScriptedModel::new(vec![]));
        let config = ActorConfig::new().chain(vec![Reflexion, Verification]).affordance(AffordanceStrategyId::Filter);
        assert!(build_actor(&config, model.clone()).is_ok());
        assert!(build_actor(&ActorConfig::new().chain(vec![Verification, Verification]), model).is_err());
    }
}
