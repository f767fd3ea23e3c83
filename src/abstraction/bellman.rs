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

//! This module defines the central abstraction of the library: the
//! generalized *Bellman operator*. An operator binds a model to a nature
//! response and exposes a small capability set: optimize one state, evaluate
//! one state under a fixed policy pair, extract the mean transition of a
//! fixed pair, and freeze nature's response into a plain MDP. Every
//! iterative solver is written against this trait alone, which is what makes
//! the solvers polymorphic over plain, s,a-rectangular and s-rectangular
//! models (with or without outcomes).

use std::fmt::Debug;

use crate::common::Value;
use crate::model::mdp::Mdp;
use crate::model::transition::Transition;

/// The result of one per-state backup: the backed-up value together with the
/// choices of the two players in that state.
#[derive(Debug, Clone)]
pub struct StateUpdate<D, N> {
    /// The new value of the state.
    pub value: Value,
    /// The decision maker's choice.
    pub decision: D,
    /// Nature's choice.
    pub nature: N,
}

/// A generalized Bellman operator over a fixed model. The two associated
/// types describe the per-state policies of the players: `Decision` is an
/// action id for deterministic operators or a distribution over actions for
/// randomized ones, and `NaturePol` is whatever nature controls (nothing, a
/// distribution over the chosen action's targets, one distribution per
/// action, or a distribution over outcomes).
///
/// Operators are `Sync`: a Jacobi sweep may back up different states from
/// different threads, the model being read-only during a solve.
pub trait Bellman: Sync {
    /// The decision maker's per-state policy representation.
    type Decision: Clone + PartialEq + Debug + Send + Sync;
    /// Nature's per-state policy representation.
    type NaturePol: Clone + Debug + Send + Sync;

    /// The number of states of the underlying model.
    fn state_count(&self) -> usize;

    /// Runs one optimizing backup of `stateid` against the value function:
    /// picks the decision maker's best response (unless the operator carries
    /// a fixed policy for this state) with nature responding, and returns
    /// the new value along with both choices. Terminal states back up to 0.
    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<Self::Decision, Self::NaturePol>;

    /// Evaluates `stateid` under a fixed pair of choices (no optimization on
    /// either side). This is the inner kernel of policy evaluation.
    fn compute_value(
        &self,
        stateid: usize,
        decision: &Self::Decision,
        nature: &Self::NaturePol,
        valuefunction: &[Value],
        discount: Value,
    ) -> Value;

    /// The mean transition (probabilities and rewards) out of `stateid`
    /// under a fixed pair of choices; empty for terminal states. Policy
    /// iteration and the occupancy computation build their dense matrices
    /// from these rows.
    fn policy_transition(
        &self,
        stateid: usize,
        decision: &Self::Decision,
        nature: &Self::NaturePol,
    ) -> Transition;

    /// Freezes nature: computes nature's response to the given value
    /// function in every state (against the given decision maker policy
    /// when the ambiguity set couples the actions; pass an empty slice to
    /// let the response optimize the decision maker too) and bakes the
    /// chosen distributions into a plain MDP. Robust partial policy
    /// iteration alternates between solving this MDP and refreshing it.
    fn nature_fixed_mdp(
        &self,
        valuefunction: &[Value],
        discount: Value,
        decisions: &[Self::Decision],
    ) -> Mdp;

    /// Lifts a deterministic action choice (-1 for "none") into this
    /// operator's decision representation. Used to feed the result of an
    /// inner plain-MDP solve back into the operator.
    fn decision_from_action(&self, stateid: usize, action: crate::common::ActionId) -> Self::Decision;
}
