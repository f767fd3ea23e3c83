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

//! This module provides the s-rectangular nature responses, where nature's
//! budget is shared across all the actions of a state and the decision maker
//! may hedge with a randomized action choice.
//!
//! With a fixed decision maker policy, the joint worst case decomposes into
//! a single greedy budget allocation across actions (the marginal gain of
//! moving mass within action `a` is weighted by the policy's probability of
//! `a`). With a free policy, the update value is the smallest `v` such that
//! pushing *every* action down to `v` fits within nature's budget; that
//! value is found by bisection and the decision maker's hedge follows from
//! the marginal costs at the optimum.
//!
//! The outcome-sharing variants (one distribution over outcomes common to
//! all actions) reduce to the s,a-rectangular closed forms once the policy
//! is fixed; with a free policy the saddle point is an LP handed to the
//! pluggable backend (a backendless instance falls back to the best
//! deterministic action).
//!
//! All the responses assume every action passed in is valid (non-empty
//! z-values); the Bellman operators filter invalid actions out before
//! querying a nature.

use std::sync::Arc;

use crate::abstraction::backend::{LinearConstraint, LinearProgram, LpBackend, Sense};
use crate::abstraction::nature::{SNature, SNatureOutcome};
use crate::common::{dot, Value};
use crate::implementation::nature::sa::{avar_response, cost_to_reach, push_value_down, worstcase_l1};

// ----------------------------------------------------------------------------
// --- S-RECTANGULAR L1 -------------------------------------------------------
// ----------------------------------------------------------------------------

/// The worst case over a single l1 ball shared by all the actions of a
/// state: `sum_a || p_a - nominal_a ||_1 <= budget`.
#[derive(Debug, Clone, Copy)]
pub struct SRobustL1 {
    /// Radius of the shared ambiguity ball (in l1 norm).
    pub budget: Value,
}

impl SRobustL1 {
    /// The worst case against a fixed randomized policy: a single greedy
    /// allocation of the shared mass budget, ranked by the policy-weighted
    /// marginal gain of each admissible shift.
    fn respond_fixed(
        &self,
        policy: &[Value],
        nominals: &[Vec<Value>],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Vec<Value>>, Value) {
        let nactions = nominals.len();
        let mut dists: Vec<Vec<Value>> = nominals.to_vec();

        // the lowest-z atom of each action receives whatever mass moves
        let lowest: Vec<usize> = zvalues
            .iter()
            .map(|z| {
                let mut best = 0;
                for (j, &zj) in z.iter().enumerate() {
                    if zj < z[best] {
                        best = j;
                    }
                }
                best
            })
            .collect();

        // candidate shifts ranked by policy-weighted gain
        let mut shifts: Vec<(Value, usize, usize)> = vec![];
        for a in 0..nactions {
            if policy[a] <= 0.0 {
                continue;
            }
            let floor = zvalues[a][lowest[a]];
            for (j, &zj) in zvalues[a].iter().enumerate() {
                if zj > floor {
                    shifts.push((policy[a] * (zj - floor), a, j));
                }
            }
        }
        shifts.sort_by(|x, y| y.0.partial_cmp(&x.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut mass = self.budget / 2.0;
        for (_, a, j) in shifts {
            if mass <= 0.0 {
                break;
            }
            let moved = dists[a][j].min(mass);
            dists[a][j] -= moved;
            dists[a][lowest[a]] += moved;
            mass -= moved;
        }

        let value = (0..nactions)
            .map(|a| {
                if policy[a] > 0.0 {
                    policy[a] * dot(&dists[a], &zvalues[a])
                } else {
                    0.0
                }
            })
            .sum();
        (policy.to_vec(), dists, value)
    }

    /// The joint optimization: the update value is the smallest `v` such
    /// that `sum_a cost_a(v) <= budget`, where `cost_a(v)` is the least
    /// budget needed to force action `a` down to `v`. Found by bisection;
    /// the decision maker's weights are proportional to the marginal costs
    /// at the optimum.
    fn respond_free(
        &self,
        nominals: &[Vec<Value>],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Vec<Value>>, Value) {
        let nactions = nominals.len();
        let nominal_values: Vec<Value> =
            (0..nactions).map(|a| dot(&nominals[a], &zvalues[a])).collect();
        let floors: Vec<Value> = zvalues
            .iter()
            .map(|z| z.iter().cloned().fold(Value::INFINITY, Value::min))
            .collect();

        let v_hi = nominal_values.iter().cloned().fold(Value::NEG_INFINITY, Value::max);
        let v_lo = floors.iter().cloned().fold(Value::NEG_INFINITY, Value::max);

        let total_cost = |v: Value| -> Value {
            (0..nactions).map(|a| cost_to_reach(&zvalues[a], &nominals[a], v)).sum()
        };

        let vstar = if v_lo >= v_hi || total_cost(v_lo) <= self.budget {
            v_lo.min(v_hi)
        } else {
            let (mut lo, mut hi) = (v_lo, v_hi);
            for _ in 0..100 {
                let mid = 0.5 * (lo + hi);
                if total_cost(mid) > self.budget {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            hi
        };

        // nature pushes every pushable action down to (at most) vstar
        let mut dists = Vec::with_capacity(nactions);
        let mut slopes = vec![0.0; nactions];
        for a in 0..nactions {
            if nominal_values[a] > vstar {
                let (dist, slope) = push_value_down(&zvalues[a], &nominals[a], vstar);
                dists.push(dist);
                slopes[a] = if slope.is_finite() { slope } else { 0.0 };
            } else {
                dists.push(nominals[a].clone());
            }
        }

        // the decision maker hedges proportionally to the marginal costs of
        // the actions still standing at vstar
        let tol = 1e-9 * (1.0 + vstar.abs());
        let mut policy = vec![0.0; nactions];
        let slope_total: Value = (0..nactions)
            .filter(|&a| nominal_values[a] >= vstar - tol)
            .map(|a| slopes[a])
            .sum();
        if slope_total > 0.0 {
            for a in 0..nactions {
                if nominal_values[a] >= vstar - tol {
                    policy[a] = slopes[a] / slope_total;
                }
            }
        } else {
            // no action was pushed: play the best nominal action deterministically
            let mut best = 0;
            for a in 1..nactions {
                if nominal_values[a] > nominal_values[best] {
                    best = a;
                }
            }
            policy[best] = 1.0;
        }

        let value = (0..nactions).map(|a| policy[a] * dot(&dists[a], &zvalues[a])).sum();
        (policy, dists, value)
    }
}

impl SNature for SRobustL1 {
    fn response(
        &self,
        _stateid: usize,
        policy: &[Value],
        nominals: &[Vec<Value>],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Vec<Value>>, Value) {
        if nominals.is_empty() {
            return (vec![], vec![], 0.0);
        }
        if policy.is_empty() {
            self.respond_free(nominals, zvalues)
        } else {
            self.respond_fixed(policy, nominals, zvalues)
        }
    }
}

/// The s-rectangular nature that never deviates: nominal distributions for
/// every action, and a deterministic best response (or the given policy)
/// for the decision maker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SAverage;

impl SNature for SAverage {
    fn response(
        &self,
        _stateid: usize,
        policy: &[Value],
        nominals: &[Vec<Value>],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Vec<Value>>, Value) {
        let nactions = nominals.len();
        if nactions == 0 {
            return (vec![], vec![], 0.0);
        }
        let values: Vec<Value> = (0..nactions).map(|a| dot(&nominals[a], &zvalues[a])).collect();
        if policy.is_empty() {
            let mut best = 0;
            for a in 1..nactions {
                if values[a] > values[best] {
                    best = a;
                }
            }
            let mut pi = vec![0.0; nactions];
            pi[best] = 1.0;
            (pi, nominals.to_vec(), values[best])
        } else {
            let value = dot(policy, &values);
            (policy.to_vec(), nominals.to_vec(), value)
        }
    }
}

// ----------------------------------------------------------------------------
// --- OUTCOME SHARING VARIANTS -----------------------------------------------
// ----------------------------------------------------------------------------

/// The outcome nature that keeps the nominal distribution over the models.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageOutcome;

impl SNatureOutcome for AverageOutcome {
    fn response(
        &self,
        _stateid: usize,
        policy: &[Value],
        nominal: &[Value],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Value>, Value) {
        let nactions = zvalues.len();
        if nactions == 0 {
            return (vec![], nominal.to_vec(), 0.0);
        }
        let values: Vec<Value> = zvalues.iter().map(|z| dot(nominal, z)).collect();
        if policy.is_empty() {
            let mut best = 0;
            for a in 1..nactions {
                if values[a] > values[best] {
                    best = a;
                }
            }
            let mut pi = vec![0.0; nactions];
            pi[best] = 1.0;
            (pi, nominal.to_vec(), values[best])
        } else {
            (policy.to_vec(), nominal.to_vec(), dot(policy, &values))
        }
    }
}

/// Mixes the per-action z-values with the policy: `ztilde[w] = sum_a
/// policy[a] * z[a][w]`.
fn mix_zvalues(policy: &[Value], zvalues: &[Vec<Value>]) -> Vec<Value> {
    let noutcomes = zvalues.first().map_or(0, Vec::len);
    let mut mixed = vec![0.0; noutcomes];
    for (a, z) in zvalues.iter().enumerate() {
        if policy[a] > 0.0 {
            for (w, &zw) in z.iter().enumerate() {
                mixed[w] += policy[a] * zw;
            }
        }
    }
    mixed
}

/// Picks, among deterministic decision maker choices, the action whose
/// worst case (per `respond`) is the largest; ties go to the lowest id.
fn best_deterministic(
    zvalues: &[Vec<Value>],
    respond: impl Fn(&[Value]) -> (Vec<Value>, Value),
) -> (Vec<Value>, Vec<Value>, Value) {
    let mut best: Option<(usize, Vec<Value>, Value)> = None;
    for (a, z) in zvalues.iter().enumerate() {
        let (dist, value) = respond(z);
        let better = best.as_ref().map_or(true, |(_, _, v)| value > *v);
        if better {
            best = Some((a, dist, value));
        }
    }
    match best {
        Some((a, dist, value)) => {
            let mut pi = vec![0.0; zvalues.len()];
            pi[a] = 1.0;
            (pi, dist, value)
        }
        None => (vec![], vec![], 0.0),
    }
}

/// The worst case over an l1 ball around the nominal outcome distribution,
/// shared by all the actions of the state. With a fixed policy this is the
/// s,a-rectangular closed form applied to the policy-mixed z-values; with a
/// free policy the saddle point is solved as an LP through the backend (the
/// dual of nature's inner minimization is joined with the decision maker's
/// simplex). Without a backend the decision maker is restricted to
/// deterministic actions.
#[derive(Clone)]
pub struct SRobustOutcomeL1 {
    /// Radius of the ambiguity ball (in l1 norm).
    pub budget: Value,
    /// Optional LP backend for the randomized decision maker.
    pub backend: Option<Arc<dyn LpBackend + Send + Sync>>,
}

impl std::fmt::Debug for SRobustOutcomeL1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SRobustOutcomeL1")
            .field("budget", &self.budget)
            .field("backend", &self.backend.is_some())
            .finish()
    }
}

impl SRobustOutcomeL1 {
    /// Builds the joint LP: maximize over the policy and the dual variables
    /// of nature's inner minimization. Layout: policy (one variable per
    /// action), then `nu` (free), `mu >= 0`, and one `beta_w >= 0` per
    /// outcome.
    fn free_policy_lp(&self, nominal: &[Value], zvalues: &[Vec<Value>]) -> LinearProgram {
        let nactions = zvalues.len();
        let noutcomes = nominal.len();
        let nu = nactions;
        let mu = nactions + 1;
        let beta0 = nactions + 2;

        let mut lp = LinearProgram::new(beta0 + noutcomes);
        lp.maximize = true;
        lp.lower[nu] = Value::NEG_INFINITY;

        // objective: sum_a pi_a (nominal . z_a) - budget * mu - nominal . beta
        for a in 0..nactions {
            lp.objective[a] = dot(nominal, &zvalues[a]);
        }
        lp.objective[mu] = -self.budget;
        for w in 0..noutcomes {
            lp.objective[beta0 + w] = -nominal[w];
        }

        // for each outcome w with c_w = sum_a pi_a z[a][w]:
        //   nu - mu - c_w <= 0
        //   nu + mu + beta_w - c_w >= 0
        for w in 0..noutcomes {
            let mut low: Vec<(usize, Value)> = (0..nactions).map(|a| (a, -zvalues[a][w])).collect();
            low.push((nu, 1.0));
            low.push((mu, -1.0));
            lp.constraints.push(LinearConstraint { linear: low, sense: Sense::LessEqual, rhs: 0.0 });

            let mut high: Vec<(usize, Value)> = (0..nactions).map(|a| (a, -zvalues[a][w])).collect();
            high.push((nu, 1.0));
            high.push((mu, 1.0));
            high.push((beta0 + w, 1.0));
            lp.constraints.push(LinearConstraint { linear: high, sense: Sense::GreaterEqual, rhs: 0.0 });
        }

        // the policy lives on the simplex
        lp.constraints.push(LinearConstraint {
            linear: (0..nactions).map(|a| (a, 1.0)).collect(),
            sense: Sense::Equal,
            rhs: 1.0,
        });
        lp
    }
}

impl SNatureOutcome for SRobustOutcomeL1 {
    fn response(
        &self,
        _stateid: usize,
        policy: &[Value],
        nominal: &[Value],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Value>, Value) {
        if zvalues.is_empty() {
            return (vec![], nominal.to_vec(), 0.0);
        }
        if !policy.is_empty() {
            let mixed = mix_zvalues(policy, zvalues);
            let (dist, value) = worstcase_l1(&mixed, nominal, self.budget);
            return (policy.to_vec(), dist, value);
        }
        if let Some(backend) = &self.backend {
            let lp = self.free_policy_lp(nominal, zvalues);
            if let Ok(solution) = backend.solve_lp(&lp) {
                if solution.status == crate::abstraction::backend::BackendStatus::Optimal {
                    let pi: Vec<Value> = solution.values[..zvalues.len()].to_vec();
                    let mixed = mix_zvalues(&pi, zvalues);
                    let (dist, value) = worstcase_l1(&mixed, nominal, self.budget);
                    return (pi, dist, value);
                }
            }
        }
        best_deterministic(zvalues, |z| worstcase_l1(z, nominal, self.budget))
    }
}

/// The average value at risk over the nominal outcome distribution, shared
/// by all the actions of the state. Same structure as [`SRobustOutcomeL1`]:
/// closed form under a fixed policy, LP through the backend for a
/// randomized decision maker, best deterministic action without a backend.
#[derive(Clone)]
pub struct SRobustOutcomeAvar {
    /// Risk level of the average value at risk.
    pub alpha: Value,
    /// Optional LP backend for the randomized decision maker.
    pub backend: Option<Arc<dyn LpBackend + Send + Sync>>,
}

impl std::fmt::Debug for SRobustOutcomeAvar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SRobustOutcomeAvar")
            .field("alpha", &self.alpha)
            .field("backend", &self.backend.is_some())
            .finish()
    }
}

impl SRobustOutcomeAvar {
    /// Builds the joint LP. Layout: policy (one variable per action), then
    /// `nu` (free) and one `lambda_w >= 0` per outcome; the inner
    /// minimization `min c . d` over `{0 <= d <= nominal/alpha, sum d = 1}`
    /// dualizes to `max nu - (nominal/alpha) . lambda` subject to
    /// `nu - lambda_w <= c_w`.
    fn free_policy_lp(&self, nominal: &[Value], zvalues: &[Vec<Value>]) -> LinearProgram {
        let alpha = self.alpha.clamp(crate::implementation::nature::sa::AVAR_MIN_ALPHA, 1.0);
        let nactions = zvalues.len();
        let noutcomes = nominal.len();
        let nu = nactions;
        let lambda0 = nactions + 1;

        let mut lp = LinearProgram::new(lambda0 + noutcomes);
        lp.maximize = true;
        lp.lower[nu] = Value::NEG_INFINITY;

        lp.objective[nu] = 1.0;
        for w in 0..noutcomes {
            lp.objective[lambda0 + w] = -nominal[w] / alpha;
        }

        // nu - lambda_w - sum_a pi_a z[a][w] <= 0 for each outcome
        for w in 0..noutcomes {
            let mut row: Vec<(usize, Value)> = (0..nactions).map(|a| (a, -zvalues[a][w])).collect();
            row.push((nu, 1.0));
            row.push((lambda0 + w, -1.0));
            lp.constraints.push(LinearConstraint { linear: row, sense: Sense::LessEqual, rhs: 0.0 });
        }

        lp.constraints.push(LinearConstraint {
            linear: (0..nactions).map(|a| (a, 1.0)).collect(),
            sense: Sense::Equal,
            rhs: 1.0,
        });
        lp
    }
}

impl SNatureOutcome for SRobustOutcomeAvar {
    fn response(
        &self,
        _stateid: usize,
        policy: &[Value],
        nominal: &[Value],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Value>, Value) {
        if zvalues.is_empty() {
            return (vec![], nominal.to_vec(), 0.0);
        }
        if !policy.is_empty() {
            let mixed = mix_zvalues(policy, zvalues);
            let (dist, value) = avar_response(&mixed, nominal, self.alpha);
            return (policy.to_vec(), dist, value);
        }
        if let Some(backend) = &self.backend {
            let lp = self.free_policy_lp(nominal, zvalues);
            if let Ok(solution) = backend.solve_lp(&lp) {
                if solution.status == crate::abstraction::backend::BackendStatus::Optimal {
                    let pi: Vec<Value> = solution.values[..zvalues.len()].to_vec();
                    let mixed = mix_zvalues(&pi, zvalues);
                    let (dist, value) = avar_response(&mixed, nominal, self.alpha);
                    return (pi, dist, value);
                }
            }
        }
        best_deterministic(zvalues, |z| avar_response(z, nominal, self.alpha))
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_srobust_l1 {
    use crate::abstraction::nature::SNature;
    use crate::common::dot;
    use crate::implementation::nature::s::SRobustL1;
    use crate::implementation::nature::sa::worstcase_l1;

    #[test]
    fn a_single_action_matches_the_sa_closed_form() {
        let nature = SRobustL1 { budget: 0.5 };
        let nominals = vec![vec![0.5, 0.5]];
        let zvalues = vec![vec![1.0, 2.0]];
        let (pi, dists, value) = nature.response(0, &[], &nominals, &zvalues);
        let (sa_dist, sa_value) = worstcase_l1(&zvalues[0], &nominals[0], 0.5);
        assert_eq!(vec![1.0], pi);
        assert_eq!(sa_dist, dists[0]);
        assert!((value - sa_value).abs() < 1e-9);
    }

    #[test]
    fn a_zero_budget_picks_the_best_nominal_action() {
        let nature = SRobustL1 { budget: 0.0 };
        let nominals = vec![vec![1.0], vec![1.0]];
        let zvalues = vec![vec![2.0], vec![5.0]];
        let (pi, _, value) = nature.response(0, &[], &nominals, &zvalues);
        assert_eq!(vec![0.0, 1.0], pi);
        assert!((value - 5.0).abs() < 1e-9);
    }

    #[test]
    fn the_fixed_policy_response_allocates_by_weighted_gain() {
        let nature = SRobustL1 { budget: 0.4 };
        // two identical actions, but the policy plays only the first one:
        // the whole budget goes there
        let nominals = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        let zvalues = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        let (pi, dists, value) = nature.response(0, &[1.0, 0.0], &nominals, &zvalues);
        assert_eq!(vec![1.0, 0.0], pi);
        assert!((dists[0][0] - 0.7).abs() < 1e-9);
        assert!((dists[0][1] - 0.3).abs() < 1e-9);
        // the unplayed action keeps its nominal
        assert_eq!(vec![0.5, 0.5], dists[1]);
        assert!((value - 0.3).abs() < 1e-9);
    }

    #[test]
    fn the_free_policy_value_is_between_floor_and_nominal() {
        let nature = SRobustL1 { budget: 0.3 };
        let nominals = vec![vec![0.5, 0.5], vec![0.2, 0.8]];
        let zvalues = vec![vec![0.0, 2.0], vec![1.0, 1.5]];
        let (pi, dists, value) = nature.response(0, &[], &nominals, &zvalues);
        assert!((pi.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert!(pi.iter().all(|&p| p >= 0.0));
        for (a, dist) in dists.iter().enumerate() {
            assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-6, "action {a}");
        }
        // the nominal best is action 1 at 1.4; the floor of the best action
        // bounds the worst case from below
        assert!(value <= 1.4 + 1e-9);
        assert!(value >= 1.0 - 1e-9);
    }

    #[test]
    fn an_enormous_budget_pins_every_action_to_its_floor() {
        let nature = SRobustL1 { budget: 100.0 };
        let nominals = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        let zvalues = vec![vec![0.0, 2.0], vec![1.0, 3.0]];
        let (_, _, value) = nature.response(0, &[], &nominals, &zvalues);
        // floors are 0 and 1; the decision maker can still guarantee 1
        assert!((value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn the_hedge_splits_between_symmetric_actions() {
        let nature = SRobustL1 { budget: 0.4 };
        let nominals = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        let zvalues = vec![vec![0.0, 2.0], vec![0.0, 2.0]];
        let (pi, _, value) = nature.response(0, &[], &nominals, &zvalues);
        assert!((pi[0] - 0.5).abs() < 1e-6);
        assert!((pi[1] - 0.5).abs() < 1e-6);
        // nature splits 0.2 of mass between the two actions: each loses 0.1
        // of mass worth 2 of value
        assert!((value - 0.8).abs() < 1e-6);
        // consistency: evaluating the fixed policy reproduces the value
        let (_, _, fixed_value) = nature.response(0, &pi, &nominals, &zvalues);
        assert!((fixed_value - value).abs() < 1e-6);
    }
}

#[cfg(test)]
mod test_outcome_natures {
    use crate::abstraction::nature::SNatureOutcome;
    use crate::implementation::nature::s::{AverageOutcome, SRobustOutcomeAvar, SRobustOutcomeL1};

    #[test]
    fn average_outcome_picks_the_best_nominal_action() {
        let zvalues = vec![vec![1.0, 2.0], vec![3.0, 0.0]];
        let nominal = vec![0.5, 0.5];
        let (pi, d, value) = AverageOutcome.response(0, &[], &nominal, &zvalues);
        // expectations are 1.5 and 1.5: ties go to the lowest id
        assert_eq!(vec![1.0, 0.0], pi);
        assert_eq!(nominal, d);
        assert!((value - 1.5).abs() < 1e-12);
    }

    #[test]
    fn average_outcome_evaluates_a_fixed_policy() {
        let zvalues = vec![vec![1.0, 2.0], vec![3.0, 1.0]];
        let nominal = vec![0.5, 0.5];
        let (_, _, value) = AverageOutcome.response(0, &[0.5, 0.5], &nominal, &zvalues);
        assert!((value - (0.5 * 1.5 + 0.5 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn outcome_l1_with_fixed_policy_uses_the_mixed_zvalues() {
        let nature = SRobustOutcomeL1 { budget: 0.5, backend: None };
        let zvalues = vec![vec![0.0, 2.0], vec![2.0, 0.0]];
        // the 50/50 policy mixes to a flat z: nature cannot hurt it
        let (_, d, value) = nature.response(0, &[0.5, 0.5], &[0.5, 0.5], &zvalues);
        assert!((value - 1.0).abs() < 1e-9);
        assert!((d.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn backendless_outcome_l1_falls_back_to_the_best_deterministic_action() {
        let nature = SRobustOutcomeL1 { budget: 1.0, backend: None };
        let zvalues = vec![vec![0.0, 4.0], vec![2.0, 2.0]];
        let (pi, _, value) = nature.response(0, &[], &[0.5, 0.5], &zvalues);
        // action 0 is worth 2 - 0.5*4 = 0 after the shift, action 1 is immune
        assert_eq!(vec![0.0, 1.0], pi);
        assert!((value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn outcome_avar_with_fixed_policy_caps_the_tail() {
        let nature = SRobustOutcomeAvar { alpha: 0.5, backend: None };
        let zvalues = vec![vec![0.0, 2.0]];
        let (_, d, value) = nature.response(0, &[1.0], &[0.5, 0.5], &zvalues);
        // cap is 1.0 on each atom: all mass lands on the z=0 outcome
        assert_eq!(vec![1.0, 0.0], d);
        assert!(value.abs() < 1e-9);
    }

    #[test]
    fn the_lp_formulations_have_the_documented_shape() {
        let l1 = SRobustOutcomeL1 { budget: 0.5, backend: None };
        let lp = l1.free_policy_lp(&[0.5, 0.5], &[vec![1.0, 2.0], vec![0.0, 3.0]]);
        // 2 actions + nu + mu + 2 betas
        assert_eq!(6, lp.num_vars);
        // two rows per outcome plus the simplex row
        assert_eq!(5, lp.constraints.len());
        assert!(lp.maximize);

        let avar = SRobustOutcomeAvar { alpha: 0.5, backend: None };
        let lp = avar.free_policy_lp(&[0.5, 0.5], &[vec![1.0, 2.0], vec![0.0, 3.0]]);
        // 2 actions + nu + 2 lambdas
        assert_eq!(5, lp.num_vars);
        // one row per outcome plus the simplex row
        assert_eq!(3, lp.constraints.len());
    }
}
