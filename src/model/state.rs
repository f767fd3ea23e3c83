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

//! This module defines the state container used by both model families
//! (s,a-rectangular uncertainty, or no uncertainty at all). A state owns its
//! actions; which kind of action it owns determines the kind of uncertainty
//! the model can express.

use crate::common::ActionId;
use crate::errors::Error;
use crate::model::action::ModelAction;

/// A state of the decision process: an ordered collection of actions,
/// sequentially labeled from 0. Creating action id 3 also creates actions
/// 0, 1 and 2 as *invalid* placeholders (no transition); invalid actions are
/// rejected by the model check unless the whole state is empty.
///
/// A state with no actions is terminal: its value is fixed at 0 and it never
/// carries an action in any policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaState<A> {
    /// The actions available in this state.
    actions: Vec<A>,
}

impl<A: ModelAction> SaState<A> {
    /// Creates a (terminal) state with no actions.
    pub fn new() -> Self {
        SaState { actions: vec![] }
    }

    /// Creates a state holding the given actions.
    pub fn with_actions(actions: Vec<A>) -> Self {
        SaState { actions }
    }

    /// The number of actions (valid or not) of this state.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// True iff the state has no actions at all.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// A state with no actions is terminal; its value is 0.
    pub fn is_terminal(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the action with the given id, creating it (and every missing
    /// action before it, as invalid placeholders) when it does not exist.
    pub fn create_action(&mut self, actionid: usize) -> &mut A {
        if actionid >= self.actions.len() {
            self.actions.resize_with(actionid + 1, A::default);
        }
        &mut self.actions[actionid]
    }

    /// The action with the given id.
    pub fn action(&self, actionid: usize) -> &A {
        &self.actions[actionid]
    }

    /// All actions of this state, indexed by action id.
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// True iff the given id designates an existing action of this state.
    pub fn is_action_correct(&self, actionid: ActionId) -> bool {
        actionid >= 0 && (actionid as usize) < self.actions.len()
    }

    /// Normalizes the distributions of every action.
    pub fn normalize(&mut self) -> Result<(), Error> {
        for action in self.actions.iter_mut() {
            action.normalize()?;
        }
        Ok(())
    }

    /// Removes the invalid actions and reindexes the remaining ones.
    /// Returns the original ids of the actions that were kept.
    ///
    /// This method requires exclusive access to the state; a model must
    /// never be packed while a solver borrows it.
    pub fn pack_actions(&mut self) -> Vec<usize> {
        let mut kept = Vec::with_capacity(self.actions.len());
        let mut packed = Vec::with_capacity(self.actions.len());
        for (actionid, action) in std::mem::take(&mut self.actions).into_iter().enumerate() {
            if action.is_valid() {
                packed.push(action);
                kept.push(actionid);
            }
        }
        self.actions = packed;
        kept
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_state {
    use crate::model::action::ModelAction;
    use crate::model::state::SaState;
    use crate::model::transition::Transition;

    fn valid_action(target: usize) -> Transition {
        Transition::from_parts(&[target], &[1.0], &[0.0]).unwrap()
    }

    #[test]
    fn a_state_with_no_action_is_terminal() {
        let s: SaState<Transition> = SaState::new();
        assert!(s.is_terminal());
        assert!(s.is_empty());
        assert_eq!(0, s.action_count());
    }

    #[test]
    fn create_action_fills_the_gaps_with_invalid_actions() {
        let mut s: SaState<Transition> = SaState::new();
        *s.create_action(2) = valid_action(0);
        assert_eq!(3, s.action_count());
        assert!(!s.action(0).is_valid());
        assert!(!s.action(1).is_valid());
        assert!(s.action(2).is_valid());
        assert!(!s.is_terminal());
    }

    #[test]
    fn action_ids_are_range_checked() {
        let mut s: SaState<Transition> = SaState::new();
        *s.create_action(1) = valid_action(0);
        assert!(!s.is_action_correct(-1));
        assert!(s.is_action_correct(0));
        assert!(s.is_action_correct(1));
        assert!(!s.is_action_correct(2));
    }

    #[test]
    fn pack_actions_drops_the_invalid_ones_and_reports_the_kept_ids() {
        let mut s: SaState<Transition> = SaState::new();
        *s.create_action(1) = valid_action(0);
        *s.create_action(3) = valid_action(1);
        let kept = s.pack_actions();
        assert_eq!(vec![1, 3], kept);
        assert_eq!(2, s.action_count());
        assert!(s.action(0).is_valid());
        assert!(s.action(1).is_valid());
    }

    #[test]
    fn normalize_rescales_every_action() {
        let mut s: SaState<Transition> = SaState::new();
        *s.create_action(0) = Transition::from_parts(&[0, 1], &[2.0, 2.0], &[0.0, 0.0]).unwrap();
        s.normalize().unwrap();
        assert!(s.action(0).is_normalized());
    }
}
