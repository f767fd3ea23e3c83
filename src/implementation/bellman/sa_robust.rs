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

//! This module implements the s,a-rectangular robust Bellman operators.
//! Nature's choice factorizes per (state, action): for every action the
//! operator hands the nominal distribution and the z-function to the
//! nature, and the decision maker then takes the argmax over the
//! nature-adjusted action values. The two variants differ in what nature
//! distributes over: the targets of the action's single transition (plain
//! MDP), or the action's outcomes (MDPO).

use crate::abstraction::bellman::{Bellman, StateUpdate};
use crate::abstraction::nature::SaNature;
use crate::common::{ActionId, Policy, Value};
use crate::model::action::ModelAction;
use crate::model::mdp::{Mdp, Mdpo};
use crate::model::transition::Transition;

/// The z-function of one transition: `z[k] = r[k] + discount * v[i[k]]`,
/// defined over the recorded targets only.
fn zfunction(transition: &Transition, valuefunction: &[Value], discount: Value) -> Vec<Value> {
    transition
        .indices()
        .iter()
        .zip(transition.rewards().iter())
        .map(|(&i, &r)| r + discount * valuefunction[i])
        .collect()
}

// ----------------------------------------------------------------------------
// --- PLAIN MDP VARIANT ------------------------------------------------------
// ----------------------------------------------------------------------------

/// The s,a-rectangular robust operator over a plain MDP: nature perturbs
/// the transition probabilities of each action within its ambiguity set.
pub struct SaRobustBellman<'a> {
    mdp: &'a Mdp,
    nature: &'a dyn SaNature,
    /// Partial policy: empty to optimize everywhere, -1 entries optimize.
    policy: Policy,
}

impl<'a> SaRobustBellman<'a> {
    /// An operator optimizing the action in every state.
    pub fn new(mdp: &'a Mdp, nature: &'a dyn SaNature) -> Self {
        SaRobustBellman { mdp, nature, policy: vec![] }
    }

    /// An operator whose action choice is pinned wherever `policy` is not -1.
    pub fn with_policy(mdp: &'a Mdp, nature: &'a dyn SaNature, policy: Policy) -> Self {
        SaRobustBellman { mdp, nature, policy }
    }

    fn fixed_action(&self, stateid: usize) -> Option<usize> {
        match self.policy.get(stateid) {
            Some(&a) if a >= 0 => Some(a as usize),
            _ => None,
        }
    }

    fn nature_value(
        &self,
        stateid: usize,
        actionid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> (Vec<Value>, Value) {
        let transition = self.mdp.state(stateid).action(actionid);
        let zvalues = zfunction(transition, valuefunction, discount);
        self.nature.response(stateid, actionid, transition.probabilities(), &zvalues)
    }
}

impl Bellman for SaRobustBellman<'_> {
    type Decision = ActionId;
    type NaturePol = Vec<Value>;

    fn state_count(&self) -> usize {
        self.mdp.state_count()
    }

    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<ActionId, Vec<Value>> {
        let state = self.mdp.state(stateid);
        if state.is_terminal() {
            return StateUpdate { value: 0.0, decision: -1, nature: vec![] };
        }
        if let Some(action) = self.fixed_action(stateid) {
            let (dist, value) = self.nature_value(stateid, action, valuefunction, discount);
            return StateUpdate { value, decision: action as ActionId, nature: dist };
        }
        let mut best: Option<(usize, Vec<Value>, Value)> = None;
        for (aid, transition) in state.actions().iter().enumerate() {
            if !transition.is_valid() {
                continue;
            }
            let (dist, value) = self.nature_value(stateid, aid, valuefunction, discount);
            if best.as_ref().map_or(true, |(_, _, bv)| value > *bv) {
                best = Some((aid, dist, value));
            }
        }
        match best {
            Some((aid, dist, value)) => {
                StateUpdate { value, decision: aid as ActionId, nature: dist }
            }
            None => StateUpdate { value: 0.0, decision: -1, nature: vec![] },
        }
    }

    fn compute_value(
        &self,
        stateid: usize,
        decision: &ActionId,
        nature: &Vec<Value>,
        valuefunction: &[Value],
        discount: Value,
    ) -> Value {
        if *decision < 0 {
            return 0.0;
        }
        self.mdp
            .state(stateid)
            .action(*decision as usize)
            .value_with(valuefunction, discount, nature)
    }

    fn policy_transition(&self, stateid: usize, decision: &ActionId, nature: &Vec<Value>) -> Transition {
        if *decision < 0 {
            return Transition::new();
        }
        let transition = self.mdp.state(stateid).action(*decision as usize);
        Transition::from_parts(transition.indices(), nature, transition.rewards()).unwrap_or_default()
    }

    fn nature_fixed_mdp(&self, valuefunction: &[Value], discount: Value, _decisions: &[ActionId]) -> Mdp {
        let mut fixed = Mdp::new();
        if self.mdp.state_count() > 0 {
            fixed.create_state(self.mdp.state_count() - 1);
        }
        for (sid, state) in self.mdp.states().iter().enumerate() {
            for (aid, transition) in state.actions().iter().enumerate() {
                fixed.create_state(sid).create_action(aid);
                if !transition.is_valid() {
                    continue;
                }
                let (dist, _) = self.nature_value(sid, aid, valuefunction, discount);
                for k in 0..transition.len() {
                    // nature's mass can be zero on some targets, which simply
                    // drops them from the baked transition
                    let _ = fixed
                        .create_state(sid)
                        .create_action(aid)
                        .add_sample(transition.indices()[k], dist[k], transition.rewards()[k]);
                }
            }
        }
        fixed
    }

    fn decision_from_action(&self, _stateid: usize, action: ActionId) -> ActionId {
        action
    }
}

// ----------------------------------------------------------------------------
// --- OUTCOME (MDPO) VARIANT -------------------------------------------------
// ----------------------------------------------------------------------------

/// The s,a-rectangular robust operator over an MDP with outcomes: nature
/// distributes over each action's outcomes, with the action's nominal
/// outcome weights as the center of the ambiguity set. Plugging in the
/// average nature turns the MDPO into a plain MDP in expectation.
pub struct SaRobustOutcomeBellman<'a> {
    mdpo: &'a Mdpo,
    nature: &'a dyn SaNature,
    /// Partial policy: empty to optimize everywhere, -1 entries optimize.
    policy: Policy,
}

impl<'a> SaRobustOutcomeBellman<'a> {
    /// An operator optimizing the action in every state.
    pub fn new(mdpo: &'a Mdpo, nature: &'a dyn SaNature) -> Self {
        SaRobustOutcomeBellman { mdpo, nature, policy: vec![] }
    }

    /// An operator whose action choice is pinned wherever `policy` is not -1.
    pub fn with_policy(mdpo: &'a Mdpo, nature: &'a dyn SaNature, policy: Policy) -> Self {
        SaRobustOutcomeBellman { mdpo, nature, policy }
    }

    fn fixed_action(&self, stateid: usize) -> Option<usize> {
        match self.policy.get(stateid) {
            Some(&a) if a >= 0 => Some(a as usize),
            _ => None,
        }
    }

    /// One z-value per outcome: the full expected backup of that outcome.
    fn outcome_zvalues(
        &self,
        stateid: usize,
        actionid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> Vec<Value> {
        self.mdpo
            .state(stateid)
            .action(actionid)
            .outcomes()
            .iter()
            .map(|o| o.value(valuefunction, discount))
            .collect()
    }

    fn nature_value(
        &self,
        stateid: usize,
        actionid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> (Vec<Value>, Value) {
        let zvalues = self.outcome_zvalues(stateid, actionid, valuefunction, discount);
        let nominal = self.mdpo.state(stateid).action(actionid).nominal_distribution();
        self.nature.response(stateid, actionid, &nominal, &zvalues)
    }
}

impl Bellman for SaRobustOutcomeBellman<'_> {
    type Decision = ActionId;
    type NaturePol = Vec<Value>;

    fn state_count(&self) -> usize {
        self.mdpo.state_count()
    }

    fn policy_update(
        &self,
        stateid: usize,
        valuefunction: &[Value],
        discount: Value,
    ) -> StateUpdate<ActionId, Vec<Value>> {
        let state = self.mdpo.state(stateid);
        if state.is_terminal() {
            return StateUpdate { value: 0.0, decision: -1, nature: vec![] };
        }
        if let Some(action) = self.fixed_action(stateid) {
            let (dist, value) = self.nature_value(stateid, action, valuefunction, discount);
            return StateUpdate { value, decision: action as ActionId, nature: dist };
        }
        let mut best: Option<(usize, Vec<Value>, Value)> = None;
        for (aid, action) in state.actions().iter().enumerate() {
            if !action.is_valid() {
                continue;
            }
            let (dist, value) = self.nature_value(stateid, aid, valuefunction, discount);
            if best.as_ref().map_or(true, |(_, _, bv)| value > *bv) {
                best = Some((aid, dist, value));
            }
        }
        match best {
            Some((aid, dist, value)) => {
                StateUpdate { value, decision: aid as ActionId, nature: dist }
            }
            None => StateUpdate { value: 0.0, decision: -1, nature: vec![] },
        }
    }

    fn compute_value(
        &self,
        stateid: usize,
        decision: &ActionId,
        nature: &Vec<Value>,
        valuefunction: &[Value],
        discount: Value,
    ) -> Value {
        if *decision < 0 {
            return 0.0;
        }
        let action = self.mdpo.state(stateid).action(*decision as usize);
        action
            .outcomes()
            .iter()
            .zip(nature.iter())
            .filter(|(_, &w)| w > 0.0)
            .map(|(o, &w)| w * o.value(valuefunction, discount))
            .sum()
    }

    fn policy_transition(&self, stateid: usize, decision: &ActionId, nature: &Vec<Value>) -> Transition {
        if *decision < 0 {
            return Transition::new();
        }
        self.mdpo
            .state(stateid)
            .action(*decision as usize)
            .mean_transition_with(nature)
            .unwrap_or_default()
    }

    fn nature_fixed_mdp(&self, valuefunction: &[Value], discount: Value, _decisions: &[ActionId]) -> Mdp {
        let mut fixed = Mdp::new();
        if self.mdpo.state_count() > 0 {
            fixed.create_state(self.mdpo.state_count() - 1);
        }
        for (sid, state) in self.mdpo.states().iter().enumerate() {
            for (aid, action) in state.actions().iter().enumerate() {
                fixed.create_state(sid).create_action(aid);
                if !action.is_valid() {
                    continue;
                }
                let (dist, _) = self.nature_value(sid, aid, valuefunction, discount);
                if let Ok(mixed) = action.mean_transition_with(&dist) {
                    let _ = fixed.create_state(sid).create_action(aid).probabilities_add(1.0, &mixed);
                }
            }
        }
        fixed
    }

    fn decision_from_action(&self, _stateid: usize, action: ActionId) -> ActionId {
        action
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
