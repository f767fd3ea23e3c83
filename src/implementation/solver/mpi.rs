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

//! This module implements modified policy iteration with Jacobi policy
//! evaluation. The outer loop improves the policy (one optimizing Jacobi
//! sweep); the inner loop evaluates the fixed policy pair with plain Jacobi
//! sweeps until its residual drops below `maxresidual_vi` times the last
//! improvement residual. Both players are fixed during the evaluation: in
//! the robust case the inner loop evaluates the action *and* nature's
//! distribution chosen by the last improvement sweep.
//!
//! Jacobi sweeps read a snapshot of the value vector, so the per-state
//! backups of one sweep are mutually independent and large models are
//! evaluated with one output chunk per hardware thread.
//!
//! For plain operators the nested schedule improves monotonically; for the
//! robust operators there is no convergence guarantee (robust partial
//! policy iteration is the variant with one). In practice the robust
//! behavior is strong, which is why the method is offered at all.

use std::time::Instant;

use log::{debug, trace};

use crate::abstraction::bellman::Bellman;
use crate::common::{Progress, Solution, SolveSpec, Status, Value};
use crate::errors::Error;
use crate::implementation::solver::{evaluation_sweep, initial_value, timed_out};

/// Modified policy iteration with Jacobi evaluation sweeps, over any
/// Bellman operator.
///
/// The outer loop stops when the improvement residual falls below
/// `spec.maxresidual`, at `spec.iterations`, on timeout or on cancellation;
/// the inner evaluation runs at most `spec.iterations_vi` sweeps per outer
/// iteration.
pub fn mpi_jac<B: Bellman>(
    bellman: &B,
    discount: Value,
    valuefunction: Vec<Value>,
    spec: &SolveSpec,
    progress: Progress,
) -> Result<Solution<B::Decision, B::NaturePol>, Error> {
    let start = Instant::now();
    let mut v = initial_value(bellman, valuefunction)?;
    let n = bellman.state_count();

    let mut decisions: Vec<B::Decision> = Vec::with_capacity(n);
    let mut natures: Vec<B::NaturePol> = Vec::with_capacity(n);
    let mut residual = Value::INFINITY;
    let mut iterations = 0;
    let mut status = Status::IterationLimit;

    for i in 0..spec.iterations {
        iterations = i + 1;

        // policy improvement: one optimizing Jacobi sweep from a snapshot
        let mut improved = vec![0.0; n];
        residual = 0.0;
        for s in 0..n {
            let up = bellman.policy_update(s, &v, discount);
            residual = residual.max((up.value - v[s]).abs());
            improved[s] = up.value;
            if decisions.len() <= s {
                decisions.push(up.decision);
                natures.push(up.nature);
            } else {
                decisions[s] = up.decision;
                natures[s] = up.nature;
            }
        }
        v = improved;
        debug!("mpi_jac improvement {iterations}: residual {residual:e}");
        if residual < spec.maxresidual {
            status = Status::Ok;
            break;
        }

        // policy evaluation: Jacobi sweeps with both players fixed
        let target = spec.maxresidual_vi * residual;
        let mut scratch = vec![0.0; n];
        for sweep in 0..spec.iterations_vi {
            evaluation_sweep(bellman, &decisions, &natures, &v, discount, &mut scratch);
            let residual_vi = v
                .iter()
                .zip(scratch.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, Value::max);
            std::mem::swap(&mut v, &mut scratch);
            trace!("mpi_jac evaluation sweep {sweep}: residual {residual_vi:e}");
            if residual_vi <= target {
                break;
            }
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
    }
    debug!("mpi_jac finished after {iterations} iterations with residual {residual:e}");

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
mod test_mpi_jac {
    use crate::common::{SolveSpecBuilder, Status};
    use crate::implementation::bellman::plain::test_support::chain;
    use crate::implementation::bellman::plain::{PlainBellman, PlainBellmanRand};
    use crate::implementation::bellman::sa_robust::SaRobustBellman;
    use crate::implementation::nature::sa::RobustL1;
    use crate::implementation::solver::mpi::mpi_jac;
    use crate::implementation::solver::vi::vi_gs;

    #[test]
    fn mpi_matches_value_iteration_on_the_chain() {
        let mdp = chain();
        let bellman = PlainBellman::new(&mdp);
        let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
        let by_mpi = mpi_jac(&bellman, 0.9, vec![], &spec, None).unwrap();
        let by_vi = vi_gs(&bellman, 0.9, vec![], &spec, None).unwrap();

        assert_eq!(Status::Ok, by_mpi.status);
        assert_eq!(by_vi.policy, by_mpi.policy);
        for s in 0..3 {
            assert!((by_mpi.valuefunction[s] - by_vi.valuefunction[s]).abs() < 1e-4);
        }
    }

    #[test]
    fn a_tight_inner_tolerance_cuts_the_outer_iteration_count() {
        let mdp = chain();
        let bellman = PlainBellman::new(&mdp);
        let spec = SolveSpecBuilder::default()
            .maxresidual(1e-8)
            .maxresidual_vi(1e-3)
            .build()
            .unwrap();
        let by_mpi = mpi_jac(&bellman, 0.9, vec![], &spec, None).unwrap();
        let by_vi = vi_gs(&bellman, 0.9, vec![], &spec, None).unwrap();
        assert!(by_mpi.iterations < by_vi.iterations);
    }

    #[test]
    fn the_robust_operator_plugs_in_unchanged() {
        let mdp = chain();
        let nature = RobustL1 { budget: 0.2 };
        let bellman = SaRobustBellman::new(&mdp, &nature);
        let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
        let robust = mpi_jac(&bellman, 0.9, vec![], &spec, None).unwrap();
        assert_eq!(Status::Ok, robust.status);
        // the deterministic chain has no mass to shift (all transitions are
        // degenerate), so the robust value matches the plain one
        let plain = mpi_jac(&PlainBellman::new(&mdp), 0.9, vec![], &spec, None).unwrap();
        for s in 0..3 {
            assert!((robust.valuefunction[s] - plain.valuefunction[s]).abs() < 1e-4);
        }
    }

    #[test]
    fn a_randomized_policy_is_evaluated_not_improved() {
        let mdp = chain();
        let rule = vec![vec![0.5, 0.5], vec![0.5, 0.5], vec![0.5, 0.5]];
        let bellman = PlainBellmanRand::with_policy(&mdp, rule.clone());
        let spec = SolveSpecBuilder::default().maxresidual(1e-8).build().unwrap();
        let solution = mpi_jac(&bellman, 0.9, vec![], &spec, None).unwrap();
        assert_eq!(Status::Ok, solution.status);
        assert_eq!(rule, solution.policy);
        // the mixed chain is worth strictly less than the optimal one
        assert!(solution.valuefunction[0] < 8.91);
    }
}
