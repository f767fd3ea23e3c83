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

//! This module implements policy iteration with an exact policy evaluation:
//! the improved policy pair is evaluated by solving the dense linear system
//! `(I - discount * P) V = r` with an LU factorization. Based on dense
//! matrices, the method does not scale past a few thousand states by
//! design; within that range it converges in very few improvement steps.

use std::time::Instant;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::abstraction::bellman::Bellman;
use crate::common::{Progress, Solution, SolveSpec, Status, Value};
use crate::errors::Error;
use crate::implementation::solver::{initial_value, timed_out};

/// Policy iteration over any Bellman operator, evaluating each improved
/// policy pair exactly through a dense linear solve.
///
/// Stops when the improvement residual falls below `spec.maxresidual`, when
/// the policy reaches a fixed point, at `spec.iterations`, on timeout or on
/// cancellation. A singular evaluation system (possible when the discount
/// is 1 and the policy is not absorbing) terminates the run with status
/// `InternalError`.
pub fn pi<B: Bellman>(
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
    let mut previous: Option<Vec<B::Decision>> = None;
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
        debug!("pi improvement {iterations}: residual {residual:e}");
        if residual < spec.maxresidual {
            v = improved;
            status = Status::Ok;
            break;
        }
        if previous.as_ref() == Some(&decisions) {
            // the policy stopped changing: its exact value is already in v
            v = improved;
            status = Status::Ok;
            break;
        }
        previous = Some(decisions.clone());

        // exact policy evaluation: solve (I - discount P) V = r
        let mut system = DMatrix::<Value>::identity(n, n);
        let mut rewards = DVector::<Value>::zeros(n);
        for s in 0..n {
            let transition = bellman.policy_transition(s, &decisions[s], &natures[s]);
            if transition.is_empty() {
                continue;
            }
            rewards[s] = transition.mean_reward();
            for (k, &target) in transition.indices().iter().enumerate() {
                system[(s, target)] -= discount * transition.probabilities()[k];
            }
        }
        match system.lu().solve(&rewards) {
            Some(solution) => {
                v = solution.iter().copied().collect();
            }
            None => {
                status = Status::InternalError;
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
    debug!("pi finished after {iterations} iterations with residual {residual:e}");

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
