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

//! This module implements robust partial policy iteration, the solver with
//! a convergence guarantee for robust models (unlike robust modified policy
//! iteration, which may fail to converge).
//!
//! The algorithm alternates two steps. The *nature step* freezes nature's
//! response to the current value function, which turns the robust model
//! into a plain MDP. The *decision maker step* solves that plain MDP with a
//! selectable inner solver, but only to precision `eps_i`; the tolerance is
//! then sharpened geometrically, `eps_{i+1} = eps_i * rate` with the rate
//! conventionally set to the squared discount. Solving the early inner
//! problems coarsely is what makes the scheme cheap, and the geometric
//! sharpening is what bounds the overall error by `eps_i / (1 - discount)`
//! and yields convergence.

use std::time::Instant;

use log::debug;

use crate::abstraction::bellman::Bellman;
use crate::common::{Progress, Solution, SolveSpec, Status, Value};
use crate::errors::Error;
use crate::implementation::bellman::plain::PlainBellman;
use crate::implementation::solver::initial_value;
use crate::implementation::solver::mpi::mpi_jac;
use crate::implementation::solver::pi::pi;
use crate::implementation::solver::timed_out;
use crate::implementation::solver::vi::vi_gs;

/// Which plain-MDP solver evaluates the decision maker's problem inside
/// robust partial policy iteration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MdpSolver {
    /// Gauss-Seidel value iteration: scales best, converges slowest.
    Vi,
    /// Jacobi modified policy iteration: the usual middle ground.
    Mpi,
    /// Policy iteration with dense linear solves: fastest on small models,
    /// does not scale past a few thousand states.
    Pi,
}

/// Robust partial policy iteration over any Bellman operator.
///
/// `residual_0` is the tolerance of the first inner solve and
/// `residual_rate` the geometric sharpening factor (conventionally the
/// squared discount). The outer loop stops when the robust Bellman
/// residual falls below `spec.maxresidual`, at `spec.iterations`, on
/// timeout or on cancellation. An inner solve terminating with anything
/// but `Ok` aborts the run with that inner status.
pub fn rppi<B: Bellman>(
    bellman: &B,
    discount: Value,
    valuefunction: Vec<Value>,
    spec: &SolveSpec,
    residual_0: Value,
    residual_rate: Value,
    inner: MdpSolver,
    progress: Progress,
) -> Result<Solution<B::Decision, B::NaturePol>, Error> {
    if !(0.0..1.0).contains(&residual_rate) {
        return Err(Error::InvalidArgument(
            "the sharpening rate must lie in [0, 1) for the tolerances to decrease".to_string(),
        ));
    }
    let start = Instant::now();
    let mut v = initial_value(bellman, valuefunction)?;
    let n = bellman.state_count();

    let mut decisions: Vec<B::Decision> = vec![];
    let mut natures: Vec<B::NaturePol> = vec![];
    let mut eps = residual_0;
    let mut residual = Value::INFINITY;
    let mut iterations = 0;
    let mut status = Status::IterationLimit;

    for i in 0..spec.iterations {
        iterations = i + 1;

        // nature step: bake the response to the current value function into
        // a plain model (the decision maker policy of the last round pins
        // the response where the ambiguity couples the actions)
        let frozen = bellman.nature_fixed_mdp(&v, discount, &decisions);

        // decision maker step: solve the frozen model to precision eps (the
        // inner budget is the evaluation budget, not the outer one)
        let inner_spec =
            SolveSpec { maxresidual: eps, iterations: spec.iterations_vi, ..spec.clone() };
        let inner_bellman = PlainBellman::new(&frozen);
        let inner_solution = match inner {
            MdpSolver::Vi => vi_gs(&inner_bellman, discount, v.clone(), &inner_spec, None)?,
            MdpSolver::Mpi => mpi_jac(&inner_bellman, discount, v.clone(), &inner_spec, None)?,
            MdpSolver::Pi => pi(&inner_bellman, discount, v.clone(), &inner_spec, None)?,
        };
        if inner_solution.status != Status::Ok {
            debug!("rppi aborts: inner solver status {:?}", inner_solution.status);
            status = inner_solution.status;
            v = inner_solution.valuefunction;
            break;
        }
        v = inner_solution.valuefunction;
        decisions = inner_solution
            .policy
            .iter()
            .enumerate()
            .map(|(s, &a)| bellman.decision_from_action(s, a))
            .collect();

        // robust residual of the new iterate, refreshing nature's policy
        residual = 0.0;
        let mut refreshed = Vec::with_capacity(n);
        for s in 0..n {
            let up = bellman.policy_update(s, &v, discount);
            residual = residual.max((up.value - v[s]).abs());
            refreshed.push(up.nature);
        }
        natures = refreshed;
        debug!("rppi iteration {iterations}: eps {eps:e}, robust residual {residual:e}");

        if residual <= spec.maxresidual {
            status = Status::Ok;
            break;
        }
        if let Some(callback) = progress {
            if !callback(iterations, residual) {
                status = Status::Cancelled;
                break;
            }
        }
        if timed_out(start, spec) {
            status = Status::Timeout;
            break;
        }
        eps *= residual_rate;
    }

    Ok(Solution {
        valuefunction: v,
        policy: decisions,
        nature: natures,
        residual,
        iterations,
        time: start.elapsed().as_secs_f64(),
        status,
    })
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_rppi {
    use crate::common::{SolveSpecBuilder, Status};
    use crate::implementation::bellman::plain::test_support::chain;
    use crate::implementation::bellman::plain::PlainBellman;
    use crate::implementation::bellman::sa_robust::SaRobustBellman;
    use crate::implementation::nature::sa::RobustL1;
    use crate::implementation::solver::rppi::{rppi, MdpSolver};
    use crate::implementation::solver::vi::vi_gs;

    #[test]
    fn rppi_on_the_plain_operator_solves_the_chain() {
        let mdp = chain();
        let bellman = PlainBellman::new(&mdp);
        let spec = SolveSpecBuilder::default().maxresidual(1e-4).build().unwrap();
        let solution = rppi(&bellman, 0.9, vec![], &spec, 1.0, 0.81, MdpSolver::Pi, None).unwrap();
        assert_eq!(Status::Ok, solution.status);
        assert_eq!(vec![1, 1, 1], solution.policy);
        assert!((solution.valuefunction[0] - 8.91).abs() < 1e-2);
    }

    #[test]
    fn rppi_with_the_l1_nature_converges_within_thirty_iterations() {
        let mdp = chain();
        let nature = RobustL1 { budget: 0.1 };
        let bellman = SaRobustBellman::new(&mdp, &nature);
        let spec = SolveSpecBuilder::default().iterations(30).maxresidual(1e-4).build().unwrap();
        let solution = rppi(&bellman, 0.9, vec![], &spec, 1.0, 0.81, MdpSolver::Mpi, None).unwrap();
        assert_eq!(Status::Ok, solution.status);
        assert!(solution.residual < 1e-4);
        assert!(solution.iterations <= 30);
    }

    #[test]
    fn rppi_matches_robust_value_iteration() {
        let mdp = chain();
        let nature = RobustL1 { budget: 0.1 };
        let bellman = SaRobustBellman::new(&mdp, &nature);
        let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
        let by_rppi = rppi(&bellman, 0.9, vec![], &spec, 1.0, 0.81, MdpSolver::Vi, None).unwrap();
        let by_vi = vi_gs(&bellman, 0.9, vec![], &spec, None).unwrap();
        for s in 0..3 {
            assert!((by_rppi.valuefunction[s] - by_vi.valuefunction[s]).abs() < 1e-4);
        }
        assert_eq!(by_vi.policy, by_rppi.policy);
    }

    #[test]
    fn the_inner_tolerance_sequence_is_geometric() {
        // the sharpening is eps_i = eps_0 * rate^i by construction; this
        // test pins the rate validation
        let mdp = chain();
        let bellman = PlainBellman::new(&mdp);
        let spec = SolveSpecBuilder::default().build().unwrap();
        assert!(rppi(&bellman, 0.9, vec![], &spec, 1.0, 1.5, MdpSolver::Vi, None).is_err());
        assert!(rppi(&bellman, 0.9, vec![], &spec, 1.0, 0.81, MdpSolver::Vi, None).is_ok());
    }

    #[test]
    fn the_returned_policy_attains_the_returned_value() {
        let mdp = chain();
        let nature = RobustL1 { budget: 0.1 };
        let bellman = SaRobustBellman::new(&mdp, &nature);
        let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
        let solution = rppi(&bellman, 0.9, vec![], &spec, 1.0, 0.81, MdpSolver::Pi, None).unwrap();
        // evaluate the returned pair: one backup must reproduce the value
        for s in 0..3 {
            let evaluated = crate::abstraction::bellman::Bellman::compute_value(
                &bellman,
                s,
                &solution.policy[s],
                &solution.nature[s],
                &solution.valuefunction,
                0.9,
            );
            assert!((evaluated - solution.valuefunction[s]).abs() < 1e-4);
        }
    }
}
