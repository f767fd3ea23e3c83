// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module solves a plain MDP through the primal linear program over
//! value functions:
//!
//! ```text
//! min  1^T V
//! s.t. V_s >= r_{s,a} + discount * sum_{s'} P_{s,a,s'} V_{s'}   for all s, a
//! ```
//!
//! The program is handed to the pluggable LP backend; the optimal policy is
//! recovered from the binding constraints. A backend status other than
//! optimal is surfaced as an infeasible solution carrying no policy.

use std::time::Instant;

use crate::abstraction::backend::{BackendStatus, LinearConstraint, LinearProgram, LpBackend, Sense};
use crate::abstraction::bellman::Bellman;
use crate::common::{DetermSolution, Solution, Status, Value};
use crate::errors::Error;
use crate::implementation::bellman::plain::PlainBellman;
use crate::model::action::ModelAction;
use crate::model::mdp::Mdp;

/// Builds the primal LP of the given model: one variable per state, one
/// `>=` row per valid (state, action) pair. Also returns the (state,
/// action) pair of every row, in row order, for policy recovery.
pub fn primal_program(mdp: &Mdp, discount: Value) -> (LinearProgram, Vec<(usize, usize)>) {
    let n = mdp.state_count();
    let mut lp = LinearProgram::new(n);
    lp.maximize = false;
    lp.objective = vec![1.0; n];
    lp.lower = vec![Value::NEG_INFINITY; n];

    let mut rows = vec![];
    for (sid, state) in mdp.states().iter().enumerate() {
        for (aid, transition) in state.actions().iter().enumerate() {
            if !transition.is_valid() {
                continue;
            }
            let mut coefficients = vec![0.0; n];
            coefficients[sid] += 1.0;
            for (k, &target) in transition.indices().iter().enumerate() {
                coefficients[target] -= discount * transition.probabilities()[k];
            }
            lp.constraints.push(LinearConstraint {
                linear: coefficients
                    .iter()
                    .enumerate()
                    .filter(|(_, &c)| c != 0.0)
                    .map(|(j, &c)| (j, c))
                    .collect(),
                sense: Sense::GreaterEqual,
                rhs: transition.mean_reward(),
            });
            rows.push((sid, aid));
        }
    }
    (lp, rows)
}

/// Solves the MDP through the primal LP formulation using the given
/// backend. The policy is recovered by picking, in every non-terminal
/// state, the action whose constraint is the tightest (lowest action id on
/// ties).
pub fn solve_lp_primal(
    backend: &dyn LpBackend,
    mdp: &Mdp,
    discount: Value,
) -> Result<DetermSolution, Error> {
    let start = Instant::now();
    let n = mdp.state_count();
    if n == 0 {
        return Ok(Solution::empty(Status::Ok));
    }

    let (lp, rows) = primal_program(mdp, discount);
    let backend_solution = backend.solve_lp(&lp)?;
    if backend_solution.status != BackendStatus::Optimal {
        let mut solution = DetermSolution::empty(Status::Infeasible);
        solution.time = start.elapsed().as_secs_f64();
        return Ok(solution);
    }
    let v = backend_solution.values;

    // recover the policy from the binding constraints
    let mut policy = vec![-1_isize; n];
    let mut slack = vec![Value::INFINITY; n];
    for (row, &(sid, aid)) in rows.iter().enumerate() {
        let constraint = &lp.constraints[row];
        let activity: Value = constraint.linear.iter().map(|&(j, c)| c * v[j]).sum();
        let gap = activity - constraint.rhs;
        if gap < slack[sid] {
            slack[sid] = gap;
            policy[sid] = aid as isize;
        }
    }

    // the residual of the recovered value function under one greedy backup
    let bellman = PlainBellman::new(mdp);
    let mut residual = 0.0;
    for s in 0..n {
        let up = bellman.policy_update(s, &v, discount);
        residual = Value::max(residual, (up.value - v[s]).abs());
    }

    Ok(Solution {
        valuefunction: v,
        policy,
        nature: vec![(); n],
        residual,
        iterations: 1,
        time: start.elapsed().as_secs_f64(),
        status: Status::Ok,
    })
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################


#[cfg(test)]
mod test_solve_lp {
    use crate::abstraction::backend::{BackendSolution, BackendStatus, LinearProgram, LpBackend};
    use crate::common::Status;
    use crate::errors::Error;
    use crate::implementation::bellman::plain::test_support::chain;
    use crate::implementation::solver::lp::solve_lp_primal;

    /// A test double returning a preset verdict.
    struct Canned(BackendStatus, Vec<f64>);
    impl LpBackend for Canned {
        fn solve_lp(&self, _program: &LinearProgram) -> Result<BackendSolution, Error> {
            Ok(BackendSolution {
                status: self.0,
                values: self.1.clone(),
                objective: self.1.iter().sum(),
            })
        }
    }

    #[test]
    fn the_policy_is_recovered_from_the_binding_constraints() {
        let mdp = chain();
        // the known optimal value function of the chain under discount 0.9
        let backend = Canned(BackendStatus::Optimal, vec![8.91, 9.9, 11.0]);
        let solution = solve_lp_primal(&backend, &mdp, 0.9).unwrap();
        assert_eq!(Status::Ok, solution.status);
        assert_eq!(vec![1, 1, 1], solution.policy);
        assert!(solution.residual < 1e-9);
    }

    #[test]
    fn a_non_optimal_backend_status_yields_no_policy() {
        let mdp = chain();
        let backend = Canned(BackendStatus::InfeasibleOrUnbounded, vec![]);
        let solution = solve_lp_primal(&backend, &mdp, 0.9).unwrap();
        assert_eq!(Status::Infeasible, solution.status);
        assert!(solution.policy.is_empty());
        assert!(solution.valuefunction.is_empty());
    }
}
