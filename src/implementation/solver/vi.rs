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

//! This module implements the Gauss-Seidel variant of value iteration.
//!
//! The value vector is updated *in place*: the backup of a state already
//! sees the fresh values of the states swept before it within the same
//! iteration. Because the sweep runs in ascending state id order, ordering
//! the states in the temporal direction of the process lets a single sweep
//! compute the exact value function. The in-place update is also what makes
//! this variant strictly sequential (contrast with the Jacobi sweeps used
//! by modified policy iteration).

use std::time::Instant;

use log::{debug, trace};

use crate::abstraction::bellman::Bellman;
use crate::common::{Progress, Solution, SolveSpec, Status, Value};
use crate::errors::Error;
use crate::implementation::solver::{initial_value, timed_out};

/// Gauss-Seidel value iteration over any Bellman operator.
///
/// Stops when the largest in-place value change of a sweep falls below
/// `spec.maxresidual`, when `spec.iterations` sweeps have run, when the
/// timeout expires, or when the progress callback returns false. The
/// returned solution always carries the best value function and policy
/// computed so far; two runs on the same input produce identical output
/// (the sweep order and the tie breaking are part of the contract).
pub fn vi_gs<B: Bellman>(
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
        residual = 0.0;
        for s in 0..n {
            let up = bellman.policy_update(s, &v, discount);
            residual = residual.max((up.value - v[s]).abs());
            v[s] = up.value;
            if decisions.len() <= s {
                decisions.push(up.decision);
                natures.push(up.nature);
            } else {
                decisions[s] = up.decision;
                natures[s] = up.nature;
            }
        }
        trace!("vi_gs iteration {iterations}: residual {residual:e}");
        if residual < spec.maxresidual {
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
    }
    debug!("vi_gs finished after {iterations} iterations with residual {residual:e}");

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
