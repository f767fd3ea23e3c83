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

//! This module defines what an action looks like in the two supported model
//! families. In a plain MDP an action owns exactly one transition, so the
//! action type *is* [`Transition`]. In an MDP with outcomes (MDPO), an
//! action owns an ordered collection of outcome transitions together with an
//! optional nominal distribution over those outcomes; this is the
//! [`OutcomeAction`] type. The small [`ModelAction`] trait is the seam which
//! lets states and models stay generic over the two.

use serde_json::json;

use crate::common::{is_probability_dist, uniform_dist, Value, TOLERANCE};
use crate::errors::Error;
use crate::model::transition::Transition;

/// The capabilities a state container requires from its action type. The
/// plain action (a bare [`Transition`]) and the [`OutcomeAction`] both
/// provide them.
pub trait ModelAction: Default {
    /// True iff the action can actually be taken: it must reach at least one
    /// target state. A state whose actions are all invalid cannot be part of
    /// a well formed model (see `check_model`).
    fn is_valid(&self) -> bool;
    /// The largest target state id reachable through this action, or -1.
    fn max_index(&self) -> isize;
    /// Rescales every distribution owned by the action to sum to one.
    fn normalize(&mut self) -> Result<(), Error>;
    /// Checks the internal consistency of a *valid* action; the error carries
    /// the offending outcome id (-1 for actions without outcomes) and a
    /// message.
    fn validate(&self) -> Result<(), (isize, String)>;
}

impl ModelAction for Transition {
    fn is_valid(&self) -> bool {
        !self.is_empty()
    }
    fn max_index(&self) -> isize {
        Transition::max_index(self)
    }
    fn normalize(&mut self) -> Result<(), Error> {
        Transition::normalize(self)
    }
    fn validate(&self) -> Result<(), (isize, String)> {
        if self.is_normalized() {
            Ok(())
        } else {
            Err((-1, format!("transition probabilities sum to {} instead of 1", self.sum_probabilities())))
        }
    }
}

/// An action whose effect is uncertain beyond the stochasticity of the MDP
/// itself: each *outcome* is a full transition, and nature picks (or is
/// assigned) a distribution over the outcomes. The nominal distribution is
/// optional; when it is not set, the outcomes are weighted uniformly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeAction {
    /// One transition per outcome, indexed by outcome id.
    outcomes: Vec<Transition>,
    /// Nominal weights over the outcomes; empty stands for uniform.
    distribution: Vec<Value>,
}

impl OutcomeAction {
    /// Creates an action with no outcome (an invalid action).
    pub fn new() -> Self {
        OutcomeAction::default()
    }

    /// The number of outcomes of this action.
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }

    /// True iff the action has no outcome at all.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns the outcome transition with the given id, creating it (and
    /// every missing outcome before it, with a zero nominal weight) when it
    /// does not exist yet.
    pub fn create_outcome(&mut self, outcomeid: usize) -> &mut Transition {
        if outcomeid >= self.outcomes.len() {
            self.outcomes.resize_with(outcomeid + 1, Transition::new);
            if !self.distribution.is_empty() {
                self.distribution.resize(outcomeid + 1, 0.0);
            }
        }
        &mut self.outcomes[outcomeid]
    }

    /// The outcome transition with the given id.
    pub fn outcome(&self, outcomeid: usize) -> &Transition {
        &self.outcomes[outcomeid]
    }

    /// All outcome transitions, indexed by outcome id.
    pub fn outcomes(&self) -> &[Transition] {
        &self.outcomes
    }

    /// Sets the nominal distribution over the outcomes. The weights must be
    /// non-negative, sum to one, and cover every outcome.
    pub fn set_distribution(&mut self, distribution: Vec<Value>) -> Result<(), Error> {
        if distribution.len() != self.outcomes.len() {
            return Err(Error::InvalidArgument(
                "the distribution must assign a weight to every outcome".to_string(),
            ));
        }
        if !is_probability_dist(&distribution) {
            return Err(Error::InvalidArgument(
                "the nominal outcome weights must form a probability distribution".to_string(),
            ));
        }
        self.distribution = distribution;
        Ok(())
    }

    /// Sets one nominal weight, resizing the distribution to cover every
    /// outcome. The weights are not checked here; call
    /// [`OutcomeAction::normalize`] once the action is fully built.
    pub fn set_weight(&mut self, outcomeid: usize, weight: Value) {
        if self.distribution.len() < self.outcomes.len() {
            self.distribution.resize(self.outcomes.len(), 0.0);
        }
        self.distribution[outcomeid] = weight;
    }

    /// The nominal distribution over the outcomes: the stored one, or the
    /// uniform distribution when none was set.
    pub fn nominal_distribution(&self) -> Vec<Value> {
        if self.distribution.is_empty() {
            uniform_dist(self.outcomes.len())
        } else {
            self.distribution.clone()
        }
    }

    /// The single transition obtained by mixing the outcomes with the
    /// nominal distribution.
    pub fn mean_transition(&self) -> Result<Transition, Error> {
        self.mean_transition_with(&self.nominal_distribution())
    }

    /// The single transition obtained by mixing the outcomes with the given
    /// distribution (typically nature's choice). Probabilities are scaled by
    /// the outcome weights; the reward of a shared target becomes the
    /// probability-weighted average of the outcome rewards.
    pub fn mean_transition_with(&self, distribution: &[Value]) -> Result<Transition, Error> {
        if distribution.len() != self.outcomes.len() {
            return Err(Error::InvalidArgument(
                "the mixing distribution must assign a weight to every outcome".to_string(),
            ));
        }
        let mut mixed = Transition::new();
        for (weight, outcome) in distribution.iter().zip(self.outcomes.iter()) {
            mixed.probabilities_add(*weight, outcome)?;
        }
        Ok(mixed)
    }
}

impl ModelAction for OutcomeAction {
    fn is_valid(&self) -> bool {
        self.outcomes.iter().any(|o| !o.is_empty())
    }

    fn max_index(&self) -> isize {
        self.outcomes.iter().map(Transition::max_index).max().unwrap_or(-1)
    }

    fn normalize(&mut self) -> Result<(), Error> {
        for outcome in self.outcomes.iter_mut() {
            outcome.normalize()?;
        }
        if !self.distribution.is_empty() {
            let sum: Value = self.distribution.iter().sum();
            if sum > TOLERANCE {
                for w in self.distribution.iter_mut() {
                    *w /= sum;
                }
            } else {
                return Err(Error::Numeric(
                    "outcome weights sum to 0 (or close) and cannot be normalized".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), (isize, String)> {
        for (oid, outcome) in self.outcomes.iter().enumerate() {
            if outcome.is_empty() {
                return Err((oid as isize, "outcome has no transition".to_string()));
            }
            if !outcome.is_normalized() {
                return Err((
                    oid as isize,
                    format!("outcome probabilities sum to {} instead of 1", outcome.sum_probabilities()),
                ));
            }
        }
        if !self.distribution.is_empty() && !is_probability_dist(&self.distribution) {
            return Err((-1, "nominal outcome weights do not form a distribution".to_string()));
        }
        Ok(())
    }
}

impl OutcomeAction {
    /// A json representation of the action: one entry per outcome.
    pub fn to_json(&self, actionid: isize) -> serde_json::Value {
        let outcomes: Vec<serde_json::Value> = self
            .outcomes
            .iter()
            .enumerate()
            .map(|(oid, o)| o.to_json(oid as isize))
            .collect();
        json!({ "actionid": actionid, "outcomes": outcomes })
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_plain_action {
    use crate::model::action::ModelAction;
    use crate::model::transition::Transition;

    #[test]
    fn a_plain_action_is_valid_iff_it_has_a_target() {
        assert!(!Transition::new().is_valid());
        let t = Transition::from_parts(&[0], &[1.0], &[0.0]).unwrap();
        assert!(t.is_valid());
    }

    #[test]
    fn validation_flags_unnormalized_probabilities() {
        let t = Transition::from_parts(&[0, 1], &[0.4, 0.4], &[0.0, 0.0]).unwrap();
        let err = t.validate().unwrap_err();
        assert_eq!(-1, err.0);
    }
}
