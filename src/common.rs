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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client code is likely to work with.

use std::time::Duration;

use derive_builder::Builder;

// ----------------------------------------------------------------------------
// --- SCALARS AND VECTORS ----------------------------------------------------
// ----------------------------------------------------------------------------

/// The precision used for all probabilities, rewards and values.
pub type Value = f64;

/// Identifies one action within a state. Actions are sequentially labeled
/// starting from 0; the special value -1 stands for "no action" (either a
/// terminal state, or a state whose action must still be optimized when it
/// occurs in a partial policy).
pub type ActionId = isize;

/// A deterministic policy: one action id per state (-1 = optimize / terminal).
pub type Policy = Vec<ActionId>;

/// A randomized policy: one probability distribution over the actions of each
/// state. An empty per-state vector means "optimize this state".
pub type RandPolicy = Vec<Vec<Value>>;

/// Default solution precision.
pub const SOLPREC: Value = 1e-4;

/// Tolerance used when comparing two probabilities or rewards for equality.
pub const EPSILON: Value = 1e-6;

/// Tolerance used when checking that a distribution is normalized.
pub const TOLERANCE: Value = 1e-5;

/// Default bound on the number of iterations of any iterative solver.
pub const MAXITER: usize = 100_000;

// ----------------------------------------------------------------------------
// --- STATUS -----------------------------------------------------------------
// ----------------------------------------------------------------------------

/// Tells how (and why) a solver run terminated. Any status other than `Ok`
/// still carries the best value function and policy computed so far in the
/// accompanying `Solution`, except for `Infeasible` which carries none.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    /// The requested precision was reached.
    Ok,
    /// The iteration budget was exhausted before the residual target was met.
    IterationLimit,
    /// The wall-clock timeout expired.
    Timeout,
    /// The problem (or its optimization backend counterpart) is infeasible.
    Infeasible,
    /// The progress callback requested the computation to stop.
    Cancelled,
    /// An internal numerical failure occurred (e.g. a singular linear system).
    InternalError,
}

impl Status {
    /// The stable numeric code of this status: 0=ok, 1=iteration limit,
    /// 2=timeout, 3=infeasible, 4=cancelled, 5=internal error.
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::IterationLimit => 1,
            Status::Timeout => 2,
            Status::Infeasible => 3,
            Status::Cancelled => 4,
            Status::InternalError => 5,
        }
    }
    /// True iff the run converged to the requested precision.
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

// ----------------------------------------------------------------------------
// --- SOLUTION ---------------------------------------------------------------
// ----------------------------------------------------------------------------

/// The outcome of a solver run. The type parameters describe the per-state
/// policies of the two players: `D` is the decision maker's choice in one
/// state (an action id, or a distribution over actions) and `N` is nature's
/// choice in that state (nothing, a distribution over the targets of the
/// chosen action, or a distribution over outcomes).
#[derive(Debug, Clone)]
pub struct Solution<D, N> {
    /// One value per state.
    pub valuefunction: Vec<Value>,
    /// The decision maker's policy, one entry per state.
    pub policy: Vec<D>,
    /// Nature's policy, one entry per state.
    pub nature: Vec<N>,
    /// The residual when the computation stopped.
    pub residual: Value,
    /// The number of (outer) iterations that were run.
    pub iterations: usize,
    /// Wall-clock duration of the run, in seconds.
    pub time: f64,
    /// How the run terminated.
    pub status: Status,
}

impl<D, N> Solution<D, N> {
    /// An empty solution with the given status. Used for degenerate inputs
    /// (e.g. a model with no state).
    pub fn empty(status: Status) -> Self {
        Solution {
            valuefunction: vec![],
            policy: vec![],
            nature: vec![],
            residual: 0.0,
            iterations: 0,
            time: 0.0,
            status,
        }
    }
}

/// Solution of a plain MDP with a deterministic policy.
pub type DetermSolution = Solution<ActionId, ()>;
/// Solution of a plain MDP evaluated under a randomized policy.
pub type RandSolution = Solution<Vec<Value>, ()>;
/// Solution of an s,a-rectangular robust MDP: a deterministic action plus
/// nature's distribution over the targets (or outcomes) of that action.
pub type SaRobustSolution = Solution<ActionId, Vec<Value>>;
/// Solution of an s-rectangular robust MDP: a randomized action choice plus
/// nature's distribution over the targets of every action.
pub type SRobustSolution = Solution<Vec<Value>, Vec<Vec<Value>>>;
/// Solution of an s-rectangular robust MDPO: a randomized action choice plus
/// one shared distribution over outcomes.
pub type SRobustOutcomeSolution = Solution<Vec<Value>, Vec<Value>>;

// ----------------------------------------------------------------------------
// --- SOLVER PARAMETERS ------------------------------------------------------
// ----------------------------------------------------------------------------

/// The numeric knobs shared by every iterative solver: iteration budgets,
/// residual targets and an optional wall-clock timeout. The `_vi` fields only
/// matter for modified policy iteration, where they control the inner
/// (policy evaluation) loop.
#[derive(Debug, Clone, Builder)]
pub struct SolveSpec {
    /// Bound on the number of (outer) iterations.
    #[builder(default = "MAXITER")]
    pub iterations: usize,
    /// Stop when the maximal per-state residual falls below this value.
    #[builder(default = "SOLPREC")]
    pub maxresidual: Value,
    /// Bound on the number of inner policy-evaluation iterations.
    #[builder(default = "MAXITER")]
    pub iterations_vi: usize,
    /// Stop the inner policy evaluation when its residual drops below
    /// `maxresidual_vi * last_outer_residual`.
    #[builder(default = "0.9")]
    pub maxresidual_vi: Value,
    /// Optional wall-clock budget, checked at the end of each outer iteration.
    #[builder(default)]
    pub timeout: Option<Duration>,
}

impl Default for SolveSpec {
    fn default() -> Self {
        SolveSpec {
            iterations: MAXITER,
            maxresidual: SOLPREC,
            iterations_vi: MAXITER,
            maxresidual_vi: 0.9,
            timeout: None,
        }
    }
}

/// An optional progress callback. It is invoked at the end of every outer
/// iteration with the iteration count and the current residual; returning
/// false cancels the computation (the solver then yields its best-so-far
/// solution with status `Cancelled`).
pub type Progress<'a> = Option<&'a (dyn Fn(usize, Value) -> bool + Sync)>;

// ----------------------------------------------------------------------------
// --- SMALL NUMERIC UTILITIES ------------------------------------------------
// ----------------------------------------------------------------------------

/// Returns the positions which would sort `values` in ascending order
/// (ties keep their original relative order).
///
/// # Example
/// ```
/// # use rmdp::sort_indexes;
/// assert_eq!(vec![2, 0, 1], sort_indexes(&[3.0, 5.0, 1.0]));
/// ```
pub fn sort_indexes(values: &[Value]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
    idx
}

/// Returns the positions which would sort `values` in descending order.
pub fn sort_indexes_desc(values: &[Value]) -> Vec<usize> {
    let mut idx = sort_indexes(values);
    idx.reverse();
    idx
}

/// The l1 distance between two vectors of equal length.
pub fn l1_distance(p1: &[Value], p2: &[Value]) -> Value {
    p1.iter().zip(p2.iter()).map(|(a, b)| (a - b).abs()).sum()
}

/// Tells whether the given values form a probability distribution: all
/// entries non-negative and summing to one (within `EPSILON`). An empty
/// slice is not considered a distribution.
pub fn is_probability_dist(values: &[Value]) -> bool {
    if values.is_empty() {
        return false;
    }
    if values.iter().any(|&p| p < 0.0) {
        return false;
    }
    (values.iter().sum::<Value>() - 1.0).abs() < EPSILON
}

/// The uniform distribution over `n` atoms (empty when `n` is 0).
pub fn uniform_dist(n: usize) -> Vec<Value> {
    if n == 0 {
        vec![]
    } else {
        vec![1.0 / n as Value; n]
    }
}

/// The inner product of two slices of equal length.
pub(crate) fn dot(a: &[Value], b: &[Value]) -> Value {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_status {
    use crate::common::Status;

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(0, Status::Ok.code());
        assert_eq!(1, Status::IterationLimit.code());
        assert_eq!(2, Status::Timeout.code());
        assert_eq!(3, Status::Infeasible.code());
        assert_eq!(4, Status::Cancelled.code());
        assert_eq!(5, Status::InternalError.code());
    }

    #[test]
    fn only_ok_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(!Status::IterationLimit.is_ok());
        assert!(!Status::Timeout.is_ok());
        assert!(!Status::Infeasible.is_ok());
        assert!(!Status::Cancelled.is_ok());
        assert!(!Status::InternalError.is_ok());
    }
}

#[cfg(test)]
mod test_spec {
    use crate::common::{SolveSpec, SolveSpecBuilder, MAXITER, SOLPREC};

    #[test]
    fn the_default_spec_uses_the_library_constants() {
        let spec = SolveSpec::default();
        assert_eq!(MAXITER, spec.iterations);
        assert_eq!(SOLPREC, spec.maxresidual);
        assert_eq!(MAXITER, spec.iterations_vi);
        assert_eq!(0.9, spec.maxresidual_vi);
        assert!(spec.timeout.is_none());
    }

    #[test]
    fn the_builder_overrides_single_fields() {
        let spec = SolveSpecBuilder::default()
            .maxresidual(1e-8)
            .iterations(42)
            .build()
            .unwrap();
        assert_eq!(42, spec.iterations);
        assert_eq!(1e-8, spec.maxresidual);
        assert_eq!(MAXITER, spec.iterations_vi);
    }
}

#[cfg(test)]
mod test_utils {
    use crate::common::{is_probability_dist, l1_distance, sort_indexes, sort_indexes_desc, uniform_dist};

    #[test]
    fn sort_indexes_is_ascending_and_stable() {
        assert_eq!(vec![2, 0, 1], sort_indexes(&[3.0, 5.0, 1.0]));
        assert_eq!(vec![0, 2, 1], sort_indexes(&[1.0, 2.0, 1.0]));
        assert_eq!(Vec::<usize>::new(), sort_indexes(&[]));
    }

    #[test]
    fn sort_indexes_desc_reverses_the_order() {
        assert_eq!(vec![1, 0, 2], sort_indexes_desc(&[3.0, 5.0, 1.0]));
    }

    #[test]
    fn l1_distance_sums_absolute_differences() {
        assert_eq!(0.0, l1_distance(&[0.5, 0.5], &[0.5, 0.5]));
        assert!((l1_distance(&[1.0, 0.0], &[0.5, 0.5]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn a_distribution_must_be_nonnegative_and_sum_to_one() {
        assert!(is_probability_dist(&[0.2, 0.8]));
        assert!(!is_probability_dist(&[0.2, 0.9]));
        assert!(!is_probability_dist(&[1.2, -0.2]));
        assert!(!is_probability_dist(&[]));
    }

    #[test]
    fn uniform_dist_spreads_the_mass_evenly() {
        assert_eq!(vec![0.25; 4], uniform_dist(4));
        assert!(uniform_dist(0).is_empty());
    }
}
