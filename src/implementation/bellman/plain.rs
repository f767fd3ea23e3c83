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

//! This module implements the Bellman operators of the plain (non robust)
//! MDP: the deterministic operator used to optimize a policy, and the
//! randomized operator used to evaluate stochastic policies. Nature plays no
//! role in either, so their nature policy type is the unit.

use crate::abstraction::bellman::{Bellman, StateUpdate};
use crate::common::{ActionId, Policy, RandPolicy, Value};
use crate::model::action::ModelAction;
use crate::model::mdp::Mdp;
use crate::model::transition::Transition;

/// The plain deterministic Bellman operator: in every state, pick the
/// action maximizing the expected backup (ties broken by the lowest action
/// id), unless the optional partial policy pins the action down.
pub struct PlainBellman<'a> {
    mdp: &'a Mdp,
    /// Partial policy: empty to optimize everywhere, otherwise one entry
    /// per state with -1 meaning "optimize this state".
    policy: Policy,
}

impl<'a> PlainBellman<'a> {
    /// An operator optimizing the action in every state.
    pub fn new(mdp: &'a Mdp) -> Self {
        PlainBellman { mdp, policy: vec![] }
    }

    /// An operator whose action choice is pinned wherever `policy` is not -1.
    pub fn with_policy(mdp: &'a Mdp, policy: Policy) -> Self {
        PlainBellman { mdp, policy }
    }

    fn fixed_action(&self, stateid: usize) -> Option<usize> {
        match self.policy.get(stateid) {
            Some(&a) if a >= 0 => Some(a as usize),
            _ => None,
        }
    }
}

impl Bellman for PlainBellman<'_> {
    type Decision = ActionId;
    type NaturePol = ();

    fn state_count(&self) -> usize {
        self.mdp.state_count()
    }

    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<ActionId, ()> {
        let state = self.mdp.state(stateid);
        if state.is_terminal() {
            return StateUpdate { value: 0.0, decision: -1, nature: () };
        }
        if let Some(action) = self.fixed_action(stateid) {
            let value = state.action(action).value(valuefunction, discount);
            return StateUpdate { value, decision: action as ActionId, nature: () };
        }
        let mut best: Option<(usize, Value)> = None;
        for (aid, transition) in state.actions().iter().enumerate() {
            if !transition.is_valid() {
                continue;
            }
            let value = transition.value(valuefunction, discount);
            if best.map_or(true, |(_, bv)| value > bv) {
                best = Some((aid, value));
            }
        }
        match best {
            Some((aid, value)) => StateUpdate { value, decision: aid as ActionId, nature: () },
            None => StateUpdate { value: 0.0, decision: -1, nature: () },
        }
    }

    fn compute_value(
        &self,
        stateid: usize,
        decision: &ActionId,
        _nature: &(),
        valuefunction: &[Value],
        discount: Value,
    ) -> Value {
        if *decision < 0 {
            0.0
        } else {
            self.mdp.state(stateid).action(*decision as usize).value(valuefunction, discount)
        }
    }

    fn policy_transition(&self, stateid: usize, decision: &ActionId, _nature: &()) -> Transition {
        if *decision < 0 {
            Transition::new()
        } else {
            self.mdp.state(stateid).action(*decision as usize).clone()
        }
    }

    fn nature_fixed_mdp(&self, _valuefunction: &[Value], _discount: Value, _decisions: &[ActionId]) -> Mdp {
        // nature has no freedom in the plain operator
        self.mdp.clone()
    }

    fn decision_from_action(&self, _stateid: usize, action: ActionId) -> ActionId {
        action
    }
}

/// The plain randomized Bellman operator: evaluates (or, where no rule is
/// given, optimizes) a stochastic policy. The optimal choice of a plain MDP
/// is deterministic, so the optimizing branch returns a one-hot rule.
pub struct PlainBellmanRand<'a> {
    mdp: &'a Mdp,
    /// Partial randomized policy: empty to optimize everywhere, otherwise
    /// one (possibly empty, meaning "optimize") rule per state.
    policy: RandPolicy,
}

impl<'a> PlainBellmanRand<'a> {
    /// An operator optimizing the action choice in every state.
    pub fn new(mdp: &'a Mdp) -> Self {
        PlainBellmanRand { mdp, policy: vec![] }
    }

    /// An operator whose action distribution is pinned wherever `policy`
    /// holds a non-empty rule.
    pub fn with_policy(mdp: &'a Mdp, policy: RandPolicy) -> Self {
        PlainBellmanRand { mdp, policy }
    }

    fn fixed_rule(&self, stateid: usize) -> Option<&[Value]> {
        match self.policy.get(stateid) {
            Some(rule) if !rule.is_empty() => Some(rule),
            _ => None,
        }
    }
}

impl Bellman for PlainBellmanRand<'_> {
    type Decision = Vec<Value>;
    type NaturePol = ();

    fn state_count(&self) -> usize {
        self.mdp.state_count()
    }

    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<Vec<Value>, ()> {
        let state = self.mdp.state(stateid);
        if state.is_terminal() {
            return StateUpdate { value: 0.0, decision: vec![], nature: () };
        }
        if let Some(rule) = self.fixed_rule(stateid) {
            let mut value = 0.0;
            for (aid, &weight) in rule.iter().enumerate() {
                if weight > 0.0 {
                    value += weight * state.action(aid).value(valuefunction, discount);
                }
            }
            return StateUpdate { value, decision: rule.to_vec(), nature: () };
        }
        let mut best: Option<(usize, Value)> = None;
        for (aid, transition) in state.actions().iter().enumerate() {
            if !transition.is_valid() {
                continue;
            }
            let value = transition.value(valuefunction, discount);
            if best.map_or(true, |(_, bv)| value > bv) {
                best = Some((aid, value));
            }
        }
        match best {
            Some((aid, value)) => {
                let mut rule = vec![0.0; state.action_count()];
                rule[aid] = 1.0;
                StateUpdate { value, decision: rule, nature: () }
            }
            None => StateUpdate { value: 0.0, decision: vec![], nature: () },
        }
    }

    fn compute_value(
        &self,
        stateid: usize,
        decision: &Vec<Value>,
        _nature: &(),
        valuefunction: &[Value],
        discount: Value,
    ) -> Value {
        if decision.is_empty() {
            return 0.0;
        }
        let state = self.mdp.state(stateid);
        let mut value = 0.0;
        for (aid, &weight) in decision.iter().enumerate() {
            if weight > 0.0 {
                value += weight * state.action(aid).value(valuefunction, discount);
            }
        }
        value
    }

    fn policy_transition(&self, stateid: usize, decision: &Vec<Value>, _nature: &()) -> Transition {
        let mut mixed = Transition::new();
        let state = self.mdp.state(stateid);
        for (aid, &weight) in decision.iter().enumerate() {
            if weight > 0.0 {
                // target ids and weights come from the model, merging is safe
                let _ = mixed.probabilities_add(weight, state.action(aid));
            }
        }
        mixed
    }

    fn nature_fixed_mdp(&self, _valuefunction: &[Value], _discount: Value, _decisions: &[Vec<Value>]) -> Mdp {
        self.mdp.clone()
    }

    fn decision_from_action(&self, stateid: usize, action: ActionId) -> Vec<Value> {
        if action < 0 {
            vec![]
        } else {
            let mut rule = vec![0.0; self.mdp.state(stateid).action_count()];
            rule[action as usize] = 1.0;
            rule
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################


#[cfg(test)]
mod test_plain {
    use crate::abstraction::bellman::Bellman;
    use crate::implementation::bellman::plain::test_support::chain;
    use crate::implementation::bellman::plain::PlainBellman;
    use crate::model::mdp::{add_transition, Mdp};

    #[test]
    fn the_backup_picks_the_argmax_action() {
        let mdp = chain();
        let bellman = PlainBellman::new(&mdp);
        // with v = [0, 0, 10] and discount 0.9, moving right wins everywhere
        let up = bellman.policy_update(1, &[0.0, 0.0, 10.0], 0.9);
        assert_eq!(1, up.decision);
        assert!((up.value - 9.0).abs() < 1e-12);
    }

    #[test]
    fn ties_break_toward_the_lowest_action_id() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 0, 1.0, 1.0).unwrap();
        add_transition(&mut mdp, 0, 1, 0, 1.0, 1.0).unwrap();
        let bellman = PlainBellman::new(&mdp);
        assert_eq!(0, bellman.policy_update(0, &[0.0], 0.9).decision);
    }

    #[test]
    fn terminal_states_back_up_to_zero_with_no_action() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 1, 1.0, 1.0).unwrap();
        let bellman = PlainBellman::new(&mdp);
        let up = bellman.policy_update(1, &[5.0, 5.0], 0.9);
        assert_eq!(-1, up.decision);
        assert_eq!(0.0, up.value);
    }

    #[test]
    fn a_partial_policy_pins_the_action() {
        let mdp = chain();
        let bellman = PlainBellman::with_policy(&mdp, vec![0, -1, -1]);
        let up = bellman.policy_update(0, &[0.0, 100.0, 0.0], 0.9);
        assert_eq!(0, up.decision);
        assert_eq!(0.0, up.value);
        // the -1 states still optimize
        assert_eq!(1, bellman.policy_update(1, &[0.0, 0.0, 100.0], 0.9).decision);
    }

    #[test]
    fn invalid_actions_are_skipped() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 1, 0, 1.0, 1.0).unwrap();
        // action 0 exists but has no transition
        let bellman = PlainBellman::new(&mdp);
        assert_eq!(1, bellman.policy_update(0, &[0.0], 0.9).decision);
    }

    #[test]
    fn contraction_holds_for_the_plain_operator() {
        let mdp = chain();
        let bellman = PlainBellman::new(&mdp);
        let discount = 0.9;
        let v = [1.0, -2.0, 0.5];
        let w = [0.0, 3.0, -1.0];
        let tv: Vec<f64> = (0..3).map(|s| bellman.policy_update(s, &v, discount).value).collect();
        let tw: Vec<f64> = (0..3).map(|s| bellman.policy_update(s, &w, discount).value).collect();
        let lhs = tv.iter().zip(tw.iter()).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
        let rhs = v.iter().zip(w.iter()).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
        assert!(lhs <= discount * rhs + 1e-12);
    }
}
