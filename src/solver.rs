//! Cooperative stepping shared by every solver in the crate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{Result, RouterError};

/// Reproducible seed derived from a solver's input.
pub(crate) fn input_seed<H: Hash + ?Sized>(input: &H) -> u64 {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolverStatus {
    Running,
    Solved,
    Failed(RouterError),
}

/// Iteration counter and terminal status of a stepped solver.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverState {
    pub iterations: usize,
    pub max_iterations: usize,
    pub status: SolverStatus,
}

impl SolverState {
    pub fn new(max_iterations: usize) -> Self {
        SolverState {
            iterations: 0,
            max_iterations,
            status: SolverStatus::Running,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status, SolverStatus::Running)
    }

    pub fn solved(&self) -> bool {
        matches!(self.status, SolverStatus::Solved)
    }

    pub fn error(&self) -> Option<&RouterError> {
        match &self.status {
            SolverStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn succeed(&mut self) {
        self.status = SolverStatus::Solved;
    }

    pub fn fail(&mut self, error: RouterError) {
        self.status = SolverStatus::Failed(error);
    }

    /// Counts one iteration. Returns `false` and fails the solver once the
    /// budget is exhausted.
    fn tick(&mut self) -> bool {
        if self.iterations >= self.max_iterations {
            self.fail(RouterError::IterationBudgetExceeded {
                max_iterations: self.max_iterations,
            });
            return false;
        }
        self.iterations += 1;
        true
    }
}

pub trait Solver {
    fn state(&self) -> &SolverState;
    fn state_mut(&mut self) -> &mut SolverState;

    /// One bounded slice of work. Only called while the solver is running.
    fn step_once(&mut self);

    fn step(&mut self) {
        if self.state().is_finished() {
            return;
        }
        if !self.state_mut().tick() {
            tracing::warn!(max_iterations = self.state().max_iterations, "solver ran out of iterations");
            return;
        }
        self.step_once();
    }

    /// Steps until the solver is solved or failed.
    fn solve(&mut self) -> Result<()> {
        while !self.state().is_finished() {
            self.step();
        }
        match &self.state().status {
            SolverStatus::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }
}
