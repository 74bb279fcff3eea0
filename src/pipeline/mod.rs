//! The pipeline: runs the agents over a talk until nothing changes.
//!
//! One pass invokes every agent once, in order, committing each batch
//! before the next agent runs. A talk is passed again while passes keep
//! mutating it, up to a budget.

mod pulse;
mod sweep;


pub use pulse::{HEALTHY_MINUTES, Health, PULSE_FILE, Pulse, Tick};
pub use sweep::{SweepReport, sweep};

use crate::agents::{Agent, Services};
use crate::talk::Talk;

/// Default number of passes one trigger may spend on a talk.
pub const PASS_BUDGET: usize = 16;

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Agents whose batch committed.
    pub mutations: usize,
    /// `agent: error` for each agent that failed.
    pub failures: Vec<String>,
}

/// How a call to [`Pipeline::converge`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// The last pass changed nothing.
    Quiescent { passes: usize, failures: Vec<String> },
    /// Still changing after the whole budget.
    BudgetExceeded { passes: usize, failures: Vec<String> },
    /// Another pass on this talk is in flight.
    Busy,
}

impl Convergence {
    pub fn failures(&self) -> &[String] {
        match self {
            Convergence::Quiescent { failures, .. } | Convergence::BudgetExceeded { failures, .. } => {
                failures
            }
            Convergence::Busy => &[],
        }
    }
}

/// A fixed, ordered list of agents with their collaborators.
#[derive(Debug, Clone)]
pub struct Pipeline {
    agents: Vec<Agent>,
    budget: usize,
    services: Services,
}

impl Pipeline {
    pub fn new(agents: Vec<Agent>, budget: usize, services: Services) -> Self {
        Self {
            agents,
            budget: budget.max(1),
            services,
        }
    }

    /// The standard agent order.
    pub fn standard(services: Services, budget: usize) -> Self {
        Self::new(Agent::standard(), budget, services)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run every agent once. A failing agent is logged and skipped; the
    /// rest of the pass continues.
    pub fn pass(&self, talk: &Talk) -> PassReport {
        let mut report = PassReport::default();
        for agent in &self.agents {
            match talk.update(|snapshot| agent.execute(snapshot, &self.services)) {
                Ok(Some(revision)) => {
                    tracing::debug!(talk = talk.number(), agent = agent.name(), revision, "agent committed");
                    report.mutations += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(talk = talk.number(), agent = agent.name(), error = %e, "agent failed");
                    report.failures.push(format!("{}: {}", agent.name(), e));
                }
            }
        }
        report
    }

    /// Pass over the talk until a pass mutates nothing or the budget runs
    /// out. Holds the talk's pass guard throughout.
    pub fn converge(&self, talk: &Talk) -> Convergence {
        let Some(_guard) = talk.try_begin_pass() else {
            tracing::debug!(talk = talk.number(), "pass already in flight");
            return Convergence::Busy;
        };
        let mut failures = Vec::new();
        for passes in 1..=self.budget {
            let report = self.pass(talk);
            failures.extend(
                report
                    .failures
                    .into_iter()
                    .map(|f| format!("talk #{}: {}", talk.number(), f)),
            );
            if report.mutations == 0 {
                return Convergence::Quiescent { passes, failures };
            }
        }
        tracing::error!(
            talk = talk.number(),
            budget = self.budget,
            "talk still changing after the pass budget; agents may be oscillating"
        );
        Convergence::BudgetExceeded {
            passes: self.budget,
            failures,
        }
    }
}
