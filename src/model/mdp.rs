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

//! This module defines the model type itself: an ordered collection of
//! states, generic over the kind of action the states own. The two concrete
//! families are [`Mdp`] (plain actions) and [`Mdpo`] (actions with
//! outcomes). It also provides the model-wide helpers: incremental
//! construction from samples, the global consistency check, and the
//! conversions between the two families and between the two policy shapes.

use log::debug;

use crate::common::{ActionId, RandPolicy, Value};
use crate::errors::{Error, ModelError};
use crate::model::action::{ModelAction, OutcomeAction};
use crate::model::state::SaState;
use crate::model::transition::Transition;

/// A Markov decision process: states labeled 0..n-1, each owning its
/// actions. Action ids are local to their state; target state ids refer to
/// positions in this collection. The ownership graph is strictly tree
/// shaped: states own actions, actions own transitions (and outcomes own
/// their own transitions); cross-state references are plain indices.
///
/// Solvers never mutate the model: they borrow it immutably and return
/// freshly computed value vectors and policies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericMdp<A> {
    states: Vec<SaState<A>>,
}

/// A plain MDP: every action owns exactly one transition.
pub type Mdp = GenericMdp<Transition>;
/// An MDP with outcomes: every action owns a set of candidate transitions
/// plus a nominal distribution over them.
pub type Mdpo = GenericMdp<OutcomeAction>;

impl<A: ModelAction> GenericMdp<A> {
    /// Creates an empty model.
    pub fn new() -> Self {
        GenericMdp { states: vec![] }
    }

    /// The number of states of the model.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// True iff the model has no state.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns the state with the given id, creating it (and every missing
    /// state before it, as terminal states) when it does not exist yet.
    pub fn create_state(&mut self, stateid: usize) -> &mut SaState<A> {
        if stateid >= self.states.len() {
            self.states.resize_with(stateid + 1, SaState::new);
        }
        &mut self.states[stateid]
    }

    /// The state with the given id.
    pub fn state(&self, stateid: usize) -> &SaState<A> {
        &self.states[stateid]
    }

    /// All states of the model, indexed by state id.
    pub fn states(&self) -> &[SaState<A>] {
        &self.states
    }

    /// Normalizes the distributions of every action of every state.
    pub fn normalize(&mut self) -> Result<(), Error> {
        for state in self.states.iter_mut() {
            state.normalize()?;
        }
        Ok(())
    }

    /// Removes the invalid actions of every state and reindexes the
    /// remaining ones. Returns, per state, the original ids of the actions
    /// that were kept. Requires exclusive access: never pack a model while a
    /// solver borrows it.
    pub fn pack_actions(&mut self) -> Vec<Vec<usize>> {
        self.states.iter_mut().map(SaState::pack_actions).collect()
    }

    /// Checks the global invariants of the model:
    /// - every non-terminal state has at least one valid action,
    /// - every valid action (and outcome) has normalized probabilities and a
    ///   well formed nominal distribution,
    /// - every target state id refers to an existing state.
    ///
    /// A violation is reported as a [`ModelError`] carrying the state,
    /// action and outcome ids.
    pub fn check_model(&self) -> Result<(), Error> {
        let nstates = self.states.len() as isize;
        for (sid, state) in self.states.iter().enumerate() {
            if state.is_terminal() {
                continue;
            }
            if !state.actions().iter().any(A::is_valid) {
                return Err(ModelError::new("state has actions but none of them is valid")
                    .for_state(sid)
                    .into());
            }
            for (aid, action) in state.actions().iter().enumerate() {
                if !action.is_valid() {
                    continue;
                }
                if let Err((oid, message)) = action.validate() {
                    let mut err = ModelError::new(message).for_state(sid).for_action(aid);
                    if oid >= 0 {
                        err = err.for_outcome(oid as usize);
                    }
                    return Err(err.into());
                }
                if action.max_index() >= nstates {
                    return Err(ModelError::new(format!(
                        "target state {} is out of range (the model has {} states)",
                        action.max_index(),
                        nstates
                    ))
                    .for_state(sid)
                    .for_action(aid)
                    .into());
                }
            }
        }
        debug!("model check passed: {} states", self.states.len());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// --- INCREMENTAL CONSTRUCTION -----------------------------------------------
// ----------------------------------------------------------------------------

/// Adds one sample to a plain MDP, creating the source state, the action and
/// the target state as needed. Samples with a non-positive probability are
/// dropped (see [`add_transition_force`]).
pub fn add_transition(
    mdp: &mut Mdp,
    fromid: usize,
    actionid: usize,
    toid: usize,
    probability: Value,
    reward: Value,
) -> Result<(), Error> {
    mdp.create_state(toid);
    mdp.create_state(fromid)
        .create_action(actionid)
        .add_sample(toid, probability, reward)
}

/// Same as [`add_transition`] but keeps zero-probability samples.
pub fn add_transition_force(
    mdp: &mut Mdp,
    fromid: usize,
    actionid: usize,
    toid: usize,
    probability: Value,
    reward: Value,
) -> Result<(), Error> {
    mdp.create_state(toid);
    mdp.create_state(fromid)
        .create_action(actionid)
        .add_sample_force(toid, probability, reward)
}

/// Adds one sample to an MDP with outcomes, creating the source state, the
/// action, the outcome and the target state as needed.
pub fn add_transition_outcome(
    mdpo: &mut Mdpo,
    fromid: usize,
    actionid: usize,
    outcomeid: usize,
    toid: usize,
    probability: Value,
    reward: Value,
) -> Result<(), Error> {
    mdpo.create_state(toid);
    mdpo.create_state(fromid)
        .create_action(actionid)
        .create_outcome(outcomeid)
        .add_sample(toid, probability, reward)
}

/// Same as [`add_transition_outcome`] but keeps zero-probability samples.
pub fn add_transition_outcome_force(
    mdpo: &mut Mdpo,
    fromid: usize,
    actionid: usize,
    outcomeid: usize,
    toid: usize,
    probability: Value,
    reward: Value,
) -> Result<(), Error> {
    mdpo.create_state(toid);
    mdpo.create_state(fromid)
        .create_action(actionid)
        .create_outcome(outcomeid)
        .add_sample_force(toid, probability, reward)
}

// ----------------------------------------------------------------------------
// --- MODEL CONVERSIONS ------------------------------------------------------
// ----------------------------------------------------------------------------

/// Adds parametric uncertainty to a plain MDP: every positive-probability
/// target of every action becomes one deterministic outcome, and the
/// original transition probabilities become the nominal weights over the
/// outcomes. When `allowzeros` is set, the outcomes also cover the states
/// the original transition reaches with probability zero (with a zero
/// nominal weight), which lets an adversarial nature move mass there.
pub fn robustify(mdp: &Mdp, allowzeros: bool) -> Result<Mdpo, Error> {
    let nstates = mdp.state_count();
    let mut rmdp = Mdpo::new();
    for (sid, state) in mdp.states().iter().enumerate() {
        let newstate = rmdp.create_state(sid);
        for (aid, transition) in state.actions().iter().enumerate() {
            let newaction = newstate.create_action(aid);
            if transition.is_empty() {
                continue;
            }
            if allowzeros {
                let probabilities = transition.probabilities_vector(nstates)?;
                let rewards = transition.rewards_vector(nstates)?;
                for target in 0..nstates {
                    let outcomeid = newaction.outcome_count();
                    newaction.create_outcome(outcomeid).add_sample(target, 1.0, rewards[target])?;
                    newaction.set_weight(outcomeid, probabilities[target]);
                }
            } else {
                for k in 0..transition.len() {
                    let outcomeid = newaction.outcome_count();
                    newaction
                        .create_outcome(outcomeid)
                        .add_sample(transition.indices()[k], 1.0, transition.rewards()[k])?;
                    newaction.set_weight(outcomeid, transition.probabilities()[k]);
                }
            }
        }
    }
    Ok(rmdp)
}

/// Converts a deterministic (partial) policy into a randomized one. Each
/// specified action becomes a one-hot distribution over the actions of its
/// state; a -1 entry becomes an empty vector (meaning "optimize this
/// state"). An empty input stays empty.
pub fn policy_det2rand<A: ModelAction>(
    mdp: &GenericMdp<A>,
    policy: &[ActionId],
) -> Result<RandPolicy, Error> {
    if policy.is_empty() {
        return Ok(vec![]);
    }
    if policy.len() != mdp.state_count() {
        return Err(Error::InvalidArgument(
            "the policy length does not match the number of states".to_string(),
        ));
    }
    let mut rpolicy = Vec::with_capacity(policy.len());
    for (sid, &action) in policy.iter().enumerate() {
        if action < 0 {
            rpolicy.push(vec![]);
        } else {
            let nactions = mdp.state(sid).action_count();
            if action as usize >= nactions {
                return Err(Error::InvalidArgument(format!(
                    "policy prescribes action {action} in state {sid} which only has {nactions} actions"
                )));
            }
            let mut rule = vec![0.0; nactions];
            rule[action as usize] = 1.0;
            rpolicy.push(rule);
        }
    }
    Ok(rpolicy)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################


#[cfg(test)]
mod test_check_model {
    use crate::errors::Error;
    use crate::model::mdp::{add_transition, add_transition_outcome, Mdp, Mdpo};

    #[test]
    fn a_well_formed_model_passes() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 1, 1.0, 0.0).unwrap();
        add_transition(&mut mdp, 1, 0, 1, 1.0, 1.0).unwrap();
        assert!(mdp.check_model().is_ok());
    }

    #[test]
    fn terminal_states_are_fine() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 3, 1.0, 0.0).unwrap();
        assert!(mdp.state(3).is_terminal());
        assert!(mdp.check_model().is_ok());
    }

    #[test]
    fn unnormalized_probabilities_are_reported_with_their_location() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 1, 0.5, 0.0).unwrap();
        add_transition(&mut mdp, 1, 0, 1, 1.0, 0.0).unwrap();
        match mdp.check_model() {
            Err(Error::Model(e)) => {
                assert_eq!(0, e.state);
                assert_eq!(0, e.action);
                assert_eq!(-1, e.outcome);
            }
            other => panic!("expected a model error, got {other:?}"),
        }
    }

    #[test]
    fn a_state_with_only_invalid_actions_is_rejected() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 0, 1.0, 0.0).unwrap();
        // create an empty action slot in state 1 without any transition
        mdp.create_state(1).create_action(0);
        match mdp.check_model() {
            Err(Error::Model(e)) => assert_eq!(1, e.state),
            other => panic!("expected a model error, got {other:?}"),
        }
    }

    #[test]
    fn bad_outcomes_are_reported_with_the_outcome_id() {
        let mut mdpo = Mdpo::new();
        add_transition_outcome(&mut mdpo, 0, 0, 0, 0, 1.0, 0.0).unwrap();
        add_transition_outcome(&mut mdpo, 0, 0, 1, 0, 0.4, 0.0).unwrap();
        match mdpo.check_model() {
            Err(Error::Model(e)) => {
                assert_eq!(0, e.state);
                assert_eq!(0, e.action);
                assert_eq!(1, e.outcome);
            }
            other => panic!("expected a model error, got {other:?}"),
        }
    }
}
