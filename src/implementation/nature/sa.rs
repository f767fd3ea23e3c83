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

//! This module provides the s,a-rectangular nature responses: the average
//! (nominal) response, the worst case over an l1 ball around the nominal
//! distribution, and the average value at risk response. All three are
//! closed forms built on one primitive: reorder the atoms by ascending
//! z-value and move (or cap) probability mass greedily.

use crate::abstraction::nature::SaNature;
use crate::common::{dot, sort_indexes, sort_indexes_desc, Value};

/// Smallest admissible risk level for the average value at risk.
pub const AVAR_MIN_ALPHA: Value = 1e-5;

// ----------------------------------------------------------------------------
// --- CLOSED FORMS -----------------------------------------------------------
// ----------------------------------------------------------------------------

/// Solves `min p . z` subject to `||p - nominal||_1 <= budget` and `p` in
/// the probability simplex. The minimizer shifts up to `budget / 2` of mass
/// onto the lowest-z atom, taking it from the highest-z atoms first.
/// Returns the minimizing distribution and its value.
pub fn worstcase_l1(zvalues: &[Value], nominal: &[Value], budget: Value) -> (Vec<Value>, Value) {
    debug_assert!(zvalues.len() == nominal.len());
    debug_assert!(!zvalues.is_empty());

    let sorted = sort_indexes(zvalues);
    let lowest = sorted[0];

    let mut dist = nominal.to_vec();
    let mut eps = (budget / 2.0).min(1.0 - nominal[lowest]).max(0.0);
    dist[lowest] += eps;
    for &j in sorted.iter().skip(1).rev() {
        if eps <= 0.0 {
            break;
        }
        let removed = dist[j].min(eps);
        dist[j] -= removed;
        eps -= removed;
    }
    let value = dot(&dist, zvalues);
    (dist, value)
}

/// Solves `min p . z` subject to `p <= nominal / alpha`, `sum p = 1` and
/// `p >= 0`: the distribution of the worst `alpha` tail of the nominal.
/// The minimizer fills the atoms in ascending z order, each capped at
/// `nominal / alpha`. `alpha` is clamped to `[AVAR_MIN_ALPHA, 1]`; at
/// `alpha = 1` the response degenerates to the nominal distribution.
pub fn avar_response(zvalues: &[Value], nominal: &[Value], alpha: Value) -> (Vec<Value>, Value) {
    debug_assert!(zvalues.len() == nominal.len());
    debug_assert!(!zvalues.is_empty());

    let alpha = alpha.clamp(AVAR_MIN_ALPHA, 1.0);
    let sorted = sort_indexes(zvalues);

    let mut dist = vec![0.0; nominal.len()];
    let mut remaining = 1.0;
    for &j in &sorted {
        let take = (nominal[j] / alpha).min(remaining);
        dist[j] = take;
        remaining -= take;
        if remaining <= 0.0 {
            break;
        }
    }
    if remaining > 0.0 {
        // the nominal did not sum to one; park the leftover on the worst atom
        if let Some(&last) = sorted.last() {
            dist[last] += remaining;
        }
    }
    let value = dot(&dist, zvalues);
    (dist, value)
}

/// Pushes the expected value of `nominal` over `zvalues` down to `target`
/// (or to the distribution's floor, whichever is higher) by moving mass
/// from the highest-z atoms onto the lowest-z atom. Returns the resulting
/// distribution and the marginal l1 budget needed per unit of further
/// decrease (infinite once the floor is reached). This is the allocation
/// primitive shared with the s-rectangular natures.
pub(crate) fn push_value_down(
    zvalues: &[Value],
    nominal: &[Value],
    target: Value,
) -> (Vec<Value>, Value) {
    let sorted = sort_indexes(zvalues);
    let lowest = sorted[0];
    let floor = zvalues[lowest];

    let mut dist = nominal.to_vec();
    let mut delta = dot(nominal, zvalues) - target;
    let mut slope = Value::INFINITY;
    for &j in sort_indexes_desc(zvalues).iter() {
        let gap = zvalues[j] - floor;
        if gap <= 0.0 {
            continue;
        }
        if delta <= 1e-12 {
            slope = 2.0 / gap;
            break;
        }
        let capacity = dist[j] * gap;
        if capacity >= delta {
            let moved = delta / gap;
            dist[j] -= moved;
            dist[lowest] += moved;
            delta = 0.0;
            slope = 2.0 / gap;
            break;
        } else {
            dist[lowest] += dist[j];
            delta -= capacity;
            dist[j] = 0.0;
        }
    }
    (dist, slope)
}

/// The l1 budget nature must spend to push the expected value of `nominal`
/// over `zvalues` down to `target` (infinite when `target` lies below the
/// lowest z). Zero when the nominal value is already at most `target`.
pub(crate) fn cost_to_reach(zvalues: &[Value], nominal: &[Value], target: Value) -> Value {
    let floor = zvalues.iter().cloned().fold(Value::INFINITY, Value::min);
    let mut delta = dot(nominal, zvalues) - target;
    if delta <= 0.0 {
        return 0.0;
    }
    let mut cost = 0.0;
    for &j in sort_indexes_desc(zvalues).iter() {
        let gap = zvalues[j] - floor;
        if gap <= 0.0 {
            continue;
        }
        let capacity = nominal[j] * gap;
        let used = capacity.min(delta);
        cost += 2.0 * used / gap;
        delta -= used;
        if delta <= 1e-12 {
            return cost;
        }
    }
    Value::INFINITY
}

// ----------------------------------------------------------------------------
// --- NATURES ----------------------------------------------------------------
// ----------------------------------------------------------------------------

/// The nature that never deviates: it returns the nominal distribution and
/// the plain expectation. Plugging it into a robust operator recovers the
/// non-robust solution (outcomes are averaged rather than adversarial).
#[derive(Debug, Clone, Copy, Default)]
pub struct Average;

impl SaNature for Average {
    fn response(
        &self,
        _stateid: usize,
        _actionid: usize,
        nominal: &[Value],
        zvalues: &[Value],
    ) -> (Vec<Value>, Value) {
        (nominal.to_vec(), dot(nominal, zvalues))
    }
}

/// The worst case over an l1 ball of the given radius around the nominal
/// distribution.
#[derive(Debug, Clone, Copy)]
pub struct RobustL1 {
    /// Radius of the ambiguity ball (in l1 norm).
    pub budget: Value,
}

impl SaNature for RobustL1 {
    fn response(
        &self,
        _stateid: usize,
        _actionid: usize,
        nominal: &[Value],
        zvalues: &[Value],
    ) -> (Vec<Value>, Value) {
        worstcase_l1(zvalues, nominal, self.budget)
    }
}

/// The average value at risk response at level `alpha`: the expectation
/// conditional on the worst `alpha` tail of the nominal distribution.
/// `alpha = 1` is the plain expectation; `alpha` near 0 approaches the
/// worst case over the nominal's support.
#[derive(Debug, Clone, Copy)]
pub struct Avar {
    /// Risk level, clamped to `[AVAR_MIN_ALPHA, 1]`.
    pub alpha: Value,
}

impl SaNature for Avar {
    fn response(
        &self,
        _stateid: usize,
        _actionid: usize,
        nominal: &[Value],
        zvalues: &[Value],
    ) -> (Vec<Value>, Value) {
        avar_response(zvalues, nominal, self.alpha)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_worstcase_l1 {
    use crate::implementation::nature::sa::worstcase_l1;

    #[test]
    fn a_zero_budget_keeps_the_nominal() {
        let (dist, value) = worstcase_l1(&[1.0, 2.0], &[0.5, 0.5], 0.0);
        assert_eq!(vec![0.5, 0.5], dist);
        assert!((value - 1.5).abs() < 1e-12);
    }

    #[test]
    fn mass_moves_from_the_worst_to_the_best_atom_for_nature() {
        // budget 0.5 moves 0.25 of mass from z=2 to z=1
        let (dist, value) = worstcase_l1(&[1.0, 2.0], &[0.5, 0.5], 0.5);
        assert!((dist[0] - 0.75).abs() < 1e-12);
        assert!((dist[1] - 0.25).abs() < 1e-12);
        assert!((value - (0.75 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn a_large_budget_puts_all_mass_on_the_lowest_z() {
        let (dist, value) = worstcase_l1(&[3.0, 1.0, 2.0], &[0.2, 0.3, 0.5], 2.0);
        assert_eq!(vec![0.0, 1.0, 0.0], dist);
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn removal_starts_at_the_highest_z() {
        // budget 0.4 moves 0.2; the z=5 atom loses first
        let (dist, _) = worstcase_l1(&[1.0, 4.0, 5.0], &[0.4, 0.3, 0.3], 0.4);
        assert!((dist[0] - 0.6).abs() < 1e-12);
        assert!((dist[1] - 0.3).abs() < 1e-12);
        assert!((dist[2] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn a_single_atom_cannot_move() {
        let (dist, value) = worstcase_l1(&[4.0], &[1.0], 10.0);
        assert_eq!(vec![1.0], dist);
        assert!((value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn the_result_stays_a_distribution() {
        let (dist, _) = worstcase_l1(&[0.3, 0.1, 0.9, 0.5], &[0.25, 0.25, 0.25, 0.25], 0.7);
        assert!(dist.iter().all(|&p| p >= 0.0));
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}


#[cfg(test)]
mod test_push_down {
    use crate::common::dot;
    use crate::implementation::nature::sa::{cost_to_reach, push_value_down};

    #[test]
    fn cost_is_zero_when_already_below_target() {
        assert_eq!(0.0, cost_to_reach(&[1.0, 2.0], &[0.5, 0.5], 2.0));
    }

    #[test]
    fn cost_is_twice_the_moved_mass() {
        // decreasing from 1.5 to 1.25 moves 0.25 of mass across a gap of 1
        let cost = cost_to_reach(&[1.0, 2.0], &[0.5, 0.5], 1.25);
        assert!((cost - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unreachable_targets_cost_infinity() {
        assert!(cost_to_reach(&[1.0, 2.0], &[0.5, 0.5], 0.5).is_infinite());
    }

    #[test]
    fn push_value_down_reaches_the_target() {
        let (dist, slope) = push_value_down(&[1.0, 2.0], &[0.5, 0.5], 1.25);
        assert!((dot(&dist, &[1.0, 2.0]) - 1.25).abs() < 1e-12);
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
