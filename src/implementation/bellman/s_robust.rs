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

//! This module implements the s-rectangular robust Bellman operators.
//! Nature's budget is shared across the actions of a state, so the backup
//! queries the nature once per state with the data of every valid action,
//! and gets back the decision maker's randomized hedge together with
//! nature's distribution for each action (or the single shared outcome
//! distribution for the MDPO variant).
//!
//! Invalid actions are filtered out before the nature is queried and get a
//! zero weight and an empty distribution in the expanded result.

use crate::abstraction::bellman::{Bellman, StateUpdate};
use crate::abstraction::nature::{SNature, SNatureOutcome};
use crate::common::{ActionId, RandPolicy, Value};
use crate::model::action::ModelAction;
use crate::model::mdp::{Mdp, Mdpo};
use crate::model::transition::Transition;

/// The z-function of one transition over its recorded targets.
fn zfunction(transition: &Transition, valuefunction: &[Value], discount: Value) -> Vec<Value> {
    transition
        .indices()
        .iter()
        .zip(transition.rewards().iter())
        .map(|(&i, &r)| r + discount * valuefunction[i])
        .collect()
}

/// Restricts a full-length per-action vector to the given action ids.
fn compact(full: &[Value], keep: &[usize]) -> Vec<Value> {
    keep.iter().map(|&a| full[a]).collect()
}

/// Expands a compact per-action vector back to `len` entries, zero filling
/// the positions that were filtered out.
fn expand(compacted: &[Value], keep: &[usize], len: usize) -> Vec<Value> {
    let mut full = vec![0.0; len];
    for (pos, &a) in keep.iter().enumerate() {
        full[a] = compacted[pos];
    }
    full
}

// ----------------------------------------------------------------------------
// --- PLAIN MDP VARIANT ------------------------------------------------------
// ----------------------------------------------------------------------------

/// The s-rectangular robust operator over a plain MDP.
pub struct SRobustBellman<'a> {
    mdp: &'a Mdp,
    nature: &'a dyn SNature,
    /// Partial randomized policy: empty to optimize everywhere, otherwise
    /// one (possibly empty, meaning "optimize") rule per state.
    policy: RandPolicy,
}

impl<'a> SRobustBellman<'a> {
    /// An operator jointly optimizing the decision maker in every state.
    pub fn new(mdp: &'a Mdp, nature: &'a dyn SNature) -> Self {
        SRobustBellman { mdp, nature, policy: vec![] }
    }

    /// An operator whose action distribution is pinned wherever `policy`
    /// holds a non-empty rule.
    pub fn with_policy(mdp: &'a Mdp, nature: &'a dyn SNature, policy: RandPolicy) -> Self {
        SRobustBellman { mdp, nature, policy }
    }

    fn fixed_rule(&self, stateid: usize) -> Option<&[Value]> {
        match self.policy.get(stateid) {
            Some(rule) if !rule.is_empty() => Some(rule),
            _ => None,
        }
    }

    /// Queries the nature with the valid actions of the state and the given
    /// (possibly empty) compactable rule; expands the answer back to full
    /// action indexing.
    fn state_response(
        &self,
        stateid: usize,
        rule: Option<&[Value]>,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<Vec<Value>, Vec<Vec<Value>>> {
        let state = self.mdp.state(stateid);
        let nactions = state.action_count();
        let keep: Vec<usize> =
            (0..nactions).filter(|&a| state.action(a).is_valid()).collect();
        if keep.is_empty() {
            return StateUpdate { value: 0.0, decision: vec![], nature: vec![] };
        }
        let nominals: Vec<Vec<Value>> =
            keep.iter().map(|&a| state.action(a).probabilities().to_vec()).collect();
        let zvalues: Vec<Vec<Value>> =
            keep.iter().map(|&a| zfunction(state.action(a), valuefunction, discount)).collect();
        let policy = rule.map(|r| compact(r, &keep)).unwrap_or_default();

        let (pi, dists, value) = self.nature.response(stateid, &policy, &nominals, &zvalues);

        let mut nature = vec![vec![]; nactions];
        for (pos, &a) in keep.iter().enumerate() {
            nature[a] = dists[pos].clone();
        }
        StateUpdate { value, decision: expand(&pi, &keep, nactions), nature }
    }
}

impl Bellman for SRobustBellman<'_> {
    type Decision = Vec<Value>;
    type NaturePol = Vec<Vec<Value>>;

    fn state_count(&self) -> usize {
        self.mdp.state_count()
    }

    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<Vec<Value>, Vec<Vec<Value>>> {
        if self.mdp.state(stateid).is_terminal() {
            return StateUpdate { value: 0.0, decision: vec![], nature: vec![] };
        }
        self.state_response(stateid, self.fixed_rule(stateid), valuefunction, discount)
    }

    fn compute_value(
        &self,
        stateid: usize,
        decision: &Vec<Value>,
        nature: &Vec<Vec<Value>>,
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
                value += weight * state.action(aid).value_with(valuefunction, discount, &nature[aid]);
            }
        }
        value
    }

    fn policy_transition(
        &self,
        stateid: usize,
        decision: &Vec<Value>,
        nature: &Vec<Vec<Value>>,
    ) -> Transition {
        let state = self.mdp.state(stateid);
        let mut mixed = Transition::new();
        for (aid, &weight) in decision.iter().enumerate() {
            if weight > 0.0 {
                let transition = state.action(aid);
                let perturbed = Transition::from_parts(
                    transition.indices(),
                    &nature[aid],
                    transition.rewards(),
                )
                .unwrap_or_default();
                let _ = mixed.probabilities_add(weight, &perturbed);
            }
        }
        mixed
    }

    fn nature_fixed_mdp(
        &self,
        valuefunction: &[Value],
        discount: Value,
        decisions: &[Vec<Value>],
    ) -> Mdp {
        let mut fixed = Mdp::new();
        if self.mdp.state_count() > 0 {
            fixed.create_state(self.mdp.state_count() - 1);
        }
        for (sid, state) in self.mdp.states().iter().enumerate() {
            if state.is_terminal() {
                continue;
            }
            let rule = decisions.get(sid).filter(|r| !r.is_empty()).map(Vec::as_slice);
            let response = self.state_response(sid, rule, valuefunction, discount);
            for (aid, transition) in state.actions().iter().enumerate() {
                fixed.create_state(sid).create_action(aid);
                if !transition.is_valid() {
                    continue;
                }
                for k in 0..transition.len() {
                    let _ = fixed.create_state(sid).create_action(aid).add_sample(
                        transition.indices()[k],
                        response.nature[aid][k],
                        transition.rewards()[k],
                    );
                }
            }
        }
        fixed
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

// ----------------------------------------------------------------------------
// --- OUTCOME (MDPO) VARIANT -------------------------------------------------
// ----------------------------------------------------------------------------

/// The s-rectangular robust operator over an MDP with outcomes: nature
/// picks a *single* distribution over the outcomes, shared by all the
/// actions of the state. The nominal outcome weights are taken from the
/// first valid action (outcome counts are expected to be uniform across the
/// actions of a state, as in models built by `robustify` or loaded from
/// csv).
pub struct SRobustOutcomeBellman<'a> {
    mdpo: &'a Mdpo,
    nature: &'a dyn SNatureOutcome,
    /// Partial randomized policy: empty to optimize everywhere, otherwise
    /// one (possibly empty, meaning "optimize") rule per state.
    policy: RandPolicy,
}

impl<'a> SRobustOutcomeBellman<'a> {
    /// An operator jointly optimizing the decision maker in every state.
    pub fn new(mdpo: &'a Mdpo, nature: &'a dyn SNatureOutcome) -> Self {
        SRobustOutcomeBellman { mdpo, nature, policy: vec![] }
    }

    /// An operator whose action distribution is pinned wherever `policy`
    /// holds a non-empty rule.
    pub fn with_policy(
        mdpo: &'a Mdpo,
        nature: &'a dyn SNatureOutcome,
        policy: RandPolicy,
    ) -> Self {
        SRobustOutcomeBellman { mdpo, nature, policy }
    }

    fn fixed_rule(&self, stateid: usize) -> Option<&[Value]> {
        match self.policy.get(stateid) {
            Some(rule) if !rule.is_empty() => Some(rule),
            _ => None,
        }
    }

    fn state_response(
        &self,
        stateid: usize,
        rule: Option<&[Value]>,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<Vec<Value>, Vec<Value>> {
        let state = self.mdpo.state(stateid);
        let nactions = state.action_count();
        let keep: Vec<usize> =
            (0..nactions).filter(|&a| state.action(a).is_valid()).collect();
        if keep.is_empty() {
            return StateUpdate { value: 0.0, decision: vec![], nature: vec![] };
        }
        let nominal = state.action(keep[0]).nominal_distribution();
        let zvalues: Vec<Vec<Value>> = keep
            .iter()
            .map(|&a| {
                state
                    .action(a)
                    .outcomes()
                    .iter()
                    .map(|o| o.value(valuefunction, discount))
                    .collect()
            })
            .collect();
        let policy = rule.map(|r| compact(r, &keep)).unwrap_or_default();

        let (pi, dist, value) = self.nature.response(stateid, &policy, &nominal, &zvalues);
        StateUpdate { value, decision: expand(&pi, &keep, nactions), nature: dist }
    }
}

impl Bellman for SRobustOutcomeBellman<'_> {
    type Decision = Vec<Value>;
    type NaturePol = Vec<Value>;

    fn state_count(&self) -> usize {
        self.mdpo.state_count()
    }

    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<Vec<Value>, Vec<Value>> {
        if self.mdpo.state(stateid).is_terminal() {
            return StateUpdate { value: 0.0, decision: vec![], nature: vec![] };
        }
        self.state_response(stateid, self.fixed_rule(stateid), valuefunction, discount)
    }

    fn compute_value(
        &self,
        stateid: usize,
        decision: &Vec<Value>,
        nature: &Vec<Value>,
        valuefunction: &[Value],
        discount: Value,
    ) -> Value {
        if decision.is_empty() {
            return 0.0;
        }
        let state = self.mdpo.state(stateid);
        let mut value = 0.0;
        for (aid, &weight) in decision.iter().enumerate() {
            if weight > 0.0 {
                let action_value: Value = state
                    .action(aid)
                    .outcomes()
                    .iter()
                    .zip(nature.iter())
                    .filter(|(_, &w)| w > 0.0)
                    .map(|(o, &w)| w * o.value(valuefunction, discount))
                    .sum();
                value += weight * action_value;
            }
        }
        value
    }

    fn policy_transition(
        &self,
        stateid: usize,
        decision: &Vec<Value>,
        nature: &Vec<Value>,
    ) -> Transition {
        let state = self.mdpo.state(stateid);
        let mut mixed = Transition::new();
        for (aid, &weight) in decision.iter().enumerate() {
            if weight > 0.0 {
                if let Ok(t) = state.action(aid).mean_transition_with(nature) {
                    let _ = mixed.probabilities_add(weight, &t);
                }
            }
        }
        mixed
    }

    fn nature_fixed_mdp(
        &self,
        valuefunction: &[Value],
        discount: Value,
        decisions: &[Vec<Value>],
    ) -> Mdp {
        let mut fixed = Mdp::new();
        if self.mdpo.state_count() > 0 {
            fixed.create_state(self.mdpo.state_count() - 1);
        }
        for (sid, state) in self.mdpo.states().iter().enumerate() {
            if state.is_terminal() {
                continue;
            }
            let rule = decisions.get(sid).filter(|r| !r.is_empty()).map(Vec::as_slice);
            let response = self.state_response(sid, rule, valuefunction, discount);
            for (aid, action) in state.actions().iter().enumerate() {
                fixed.create_state(sid).create_action(aid);
                if !action.is_valid() {
                    continue;
                }
                if let Ok(mixed) = action.mean_transition_with(&response.nature) {
                    let _ = fixed.create_state(sid).create_action(aid).probabilities_add(1.0, &mixed);
                }
            }
        }
        fixed
    }

    fn decision_from_action(&self, stateid: usize, action: ActionId) -> Vec<Value> {
        if action < 0 {
            vec![]
        } else {
            let mut rule = vec![0.0; self.mdpo.state(stateid).action_count()];
            rule[action as usize] = 1.0;
            rule
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_s_robust {
    use crate::abstraction::bellman::Bellman;
    use crate::implementation::bellman::plain::test_support::chain;
    use crate::implementation::bellman::s_robust::SRobustBellman;
    use crate::implementation::nature::s::{SAverage, SRobustL1};

    #[test]
    fn with_the_average_nature_the_backup_is_the_plain_greedy_one() {
        let mdp = chain();
        let nature = SAverage;
        let bellman = SRobustBellman::new(&mdp, &nature);
        let up = bellman.policy_update(1, &[0.0, 0.0, 10.0], 0.9);
        // action 1 (worth 9) beats action 0 (worth 1)
        assert_eq!(vec![0.0, 1.0], up.decision);
        assert!((up.value - 9.0).abs() < 1e-12);
    }

    #[test]
    fn a_fixed_rule_is_passed_through_to_the_nature() {
        let mdp = chain();
        let nature = SAverage;
        let bellman =
            SRobustBellman::with_policy(&mdp, &nature, vec![vec![], vec![0.5, 0.5], vec![]]);
        let up = bellman.policy_update(1, &[0.0, 0.0, 10.0], 0.9);
        assert_eq!(vec![0.5, 0.5], up.decision);
        assert!((up.value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn evaluating_the_fixed_pair_reproduces_the_backup_value() {
        let mdp = chain();
        let nature = SRobustL1 { budget: 0.4 };
        let bellman = SRobustBellman::new(&mdp, &nature);
        let v = [1.0, 4.0, 9.0];
        for s in 0..3 {
            let up = bellman.policy_update(s, &v, 0.9);
            let eval = bellman.compute_value(s, &up.decision, &up.nature, &v, 0.9);
            assert!((up.value - eval).abs() < 1e-9, "state {s}");
        }
    }

    #[test]
    fn terminal_states_have_empty_policies() {
        let mut mdp = crate::model::mdp::Mdp::new();
        crate::model::mdp::add_transition(&mut mdp, 0, 0, 1, 1.0, 1.0).unwrap();
        let nature = SAverage;
        let bellman = SRobustBellman::new(&mdp, &nature);
        let up = bellman.policy_update(1, &[0.0, 0.0], 0.9);
        assert!(up.decision.is_empty());
        assert_eq!(0.0, up.value);
    }
}

#[cfg(test)]
mod test_s_robust_outcome {
    use crate::abstraction::bellman::Bellman;
    use crate::implementation::bellman::s_robust::SRobustOutcomeBellman;
    use crate::implementation::nature::s::{AverageOutcome, SRobustOutcomeL1};
    use crate::model::mdp::{add_transition_outcome, Mdpo};

    /// One state, two actions, two outcomes each; the outcome distribution
    /// is shared by the actions.
    fn mdpo() -> Mdpo {
        let mut m = Mdpo::new();
        add_transition_outcome(&mut m, 0, 0, 0, 0, 1.0, 2.0).unwrap();
        add_transition_outcome(&mut m, 0, 0, 1, 0, 1.0, 0.0).unwrap();
        add_transition_outcome(&mut m, 0, 1, 0, 0, 1.0, 1.0).unwrap();
        add_transition_outcome(&mut m, 0, 1, 1, 0, 1.0, 1.0).unwrap();
        m
    }

    #[test]
    fn the_average_nature_compares_expected_outcome_values() {
        let m = mdpo();
        let nature = AverageOutcome;
        let bellman = SRobustOutcomeBellman::new(&m, &nature);
        let up = bellman.policy_update(0, &[0.0], 0.9);
        // both actions are worth 1 in expectation: ties go to action 0
        assert_eq!(vec![1.0, 0.0], up.decision);
        assert!((up.value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn the_robust_nature_prefers_the_outcome_immune_action() {
        let m = mdpo();
        let nature = SRobustOutcomeL1 { budget: 2.0, backend: None };
        let bellman = SRobustOutcomeBellman::new(&m, &nature);
        let up = bellman.policy_update(0, &[0.0], 0.9);
        // with an unbounded budget action 0 is worth 0, action 1 stays at 1
        assert_eq!(vec![0.0, 1.0], up.decision);
        assert!((up.value - 1.0).abs() < 1e-9);
        assert!((up.nature.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn the_nature_fixed_mdp_shares_one_outcome_distribution() {
        let m = mdpo();
        let nature = SRobustOutcomeL1 { budget: 2.0, backend: None };
        let bellman = SRobustOutcomeBellman::new(&m, &nature);
        let fixed = bellman.nature_fixed_mdp(&[0.0], 0.9, &[]);
        // both actions exist in the baked model, mixed with the same d
        assert_eq!(2, fixed.state(0).action_count());
        assert!((fixed.state(0).action(1).mean_reward() - 1.0).abs() < 1e-9);
    }
}
