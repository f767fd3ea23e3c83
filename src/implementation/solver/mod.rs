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

//! This module provides the iterative solvers (value iteration, modified
//! policy iteration, policy iteration and robust partial policy iteration)
//! together with the occupancy-frequency computation and the LP/QP
//! formulations. Every solver is generic over the [`Bellman`] trait, which
//! is what lets one loop serve the plain, s,a-rectangular and s-rectangular
//! operator families alike.

pub mod lp;
pub mod mpi;
pub mod occupancy;
pub mod pi;
pub mod rppi;
pub mod soft_robust;
pub mod vi;

pub use self::lp::{primal_program, solve_lp_primal};
pub use self::mpi::mpi_jac;
pub use self::occupancy::occfreq_mat;
pub use self::pi::pi;
pub use self::rppi::{rppi, MdpSolver};
pub use self::soft_robust::{avar_quad_program, RandStaticSolution};
pub use self::vi::vi_gs;

use std::time::Instant;

use crate::abstraction::bellman::Bellman;
use crate::common::{SolveSpec, Value};
use crate::errors::Error;

/// Number of states below which a Jacobi sweep stays single threaded: the
/// cost of spawning scoped workers only pays off on larger models.
pub(crate) const JACOBI_PARALLEL_CUTOFF: usize = 4096;

/// Resolves the caller-provided initial value function: an empty vector
/// stands for all zeros, anything else must match the state count.
pub(crate) fn initial_value<B: Bellman>(
    bellman: &B,
    valuefunction: Vec<Value>,
) -> Result<Vec<Value>, Error> {
    let n = bellman.state_count();
    if valuefunction.is_empty() {
        Ok(vec![0.0; n])
    } else if valuefunction.len() == n {
        Ok(valuefunction)
    } else {
        Err(Error::InvalidArgument(format!(
            "the initial value function has length {} but the model has {} states",
            valuefunction.len(),
            n
        )))
    }
}

/// True iff the wall-clock budget of the spec is exhausted.
pub(crate) fn timed_out(start: Instant, spec: &SolveSpec) -> bool {
    spec.timeout.map_or(false, |budget| start.elapsed() >= budget)
}

/// One Jacobi policy-evaluation sweep: `out[s]` receives the value of state
/// `s` under the fixed policy pair, all states reading the same snapshot
/// `v`. Large models are split into per-worker chunks; each worker owns a
/// disjoint slice of the output vector so no synchronization is needed.
pub(crate) fn evaluation_sweep<B: Bellman>(
    bellman: &B,
    decisions: &[B::Decision],
    natures: &[B::NaturePol],
    v: &[Value],
    discount: Value,
    out: &mut [Value],
) {
    let n = out.len();
    let workers = num_cpus::get();
    if n < JACOBI_PARALLEL_CUTOFF || workers < 2 {
        for (s, slot) in out.iter_mut().enumerate() {
            *slot = bellman.compute_value(s, &decisions[s], &natures[s], v, discount);
        }
        return;
    }
    let chunk = n.div_ceil(workers);
    std::thread::scope(|scope| {
        for (ci, slice) in out.chunks_mut(chunk).enumerate() {
            let base = ci * chunk;
            scope.spawn(move || {
                for (k, slot) in slice.iter_mut().enumerate() {
                    let s = base + k;
                    *slot = bellman.compute_value(s, &decisions[s], &natures[s], v, discount);
                }
            });
        }
    });
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
