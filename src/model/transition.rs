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

//! This module defines the sparse transition representation and its
//! value-backup arithmetic. A `Transition` holds the probabilities and
//! rewards of moving from one (state, action) to every reachable target
//! state. It is the innermost type consulted by every Bellman backup, so its
//! operations are written to stay cache friendly: target ids are kept
//! sorted, and the hot inner product runs over three parallel vectors.

use serde_json::json;

use crate::common::{Value, EPSILON, TOLERANCE};
use crate::errors::Error;

/// Sparse transition probabilities and rewards from a single state, under a
/// single action (or a single outcome of an action). The type can also be
/// used to represent a generic sparse distribution, e.g. the initial state
/// distribution of a model.
///
/// The target indices are kept sorted in strictly increasing order. This
/// makes it cheap to aggregate several samples pointing to the same target
/// and keeps value iteration cache friendly. Adding the samples in
/// increasing target order is the fast path; out-of-order additions fall
/// back to a binary search and an insertion.
///
/// # Example
/// ```
/// # use rmdp::Transition;
/// let mut t = Transition::new();
/// t.add_sample(2, 0.4, 1.0).unwrap();
/// t.add_sample(0, 0.6, 0.0).unwrap();
/// assert_eq!(&[0, 2], t.indices());
/// assert_eq!(&[0.6, 0.4], t.probabilities());
/// assert!(t.is_normalized());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// Target state ids, strictly increasing.
    indices: Vec<usize>,
    /// Probability of reaching each target, parallel to `indices`.
    probabilities: Vec<Value>,
    /// Reward collected when each target is reached, parallel to `indices`.
    rewards: Vec<Value>,
}

impl Transition {
    /// Creates an empty transition (no target state).
    pub fn new() -> Self {
        Transition::default()
    }

    /// Creates a transition from raw parallel vectors. The entries need not
    /// be sorted: they are re-added one by one, so duplicate targets are
    /// aggregated exactly as with [`Transition::add_sample`].
    pub fn from_parts(
        indices: &[usize],
        probabilities: &[Value],
        rewards: &[Value],
    ) -> Result<Self, Error> {
        if indices.len() != probabilities.len() || indices.len() != rewards.len() {
            return Err(Error::InvalidArgument(
                "indices, probabilities and rewards must have the same length".to_string(),
            ));
        }
        let mut result = Transition::new();
        let mut order: Vec<usize> = (0..indices.len()).collect();
        order.sort_by_key(|&k| indices[k]);
        for k in order {
            result.add_sample(indices[k], probabilities[k], rewards[k])?;
        }
        Ok(result)
    }

    /// Creates a transition with uniformly zero rewards.
    pub fn from_probabilities(indices: &[usize], probabilities: &[Value]) -> Result<Self, Error> {
        Transition::from_parts(indices, probabilities, &vec![0.0; indices.len()])
    }

    /// Creates a transition from a dense probability vector; the target ids
    /// are implicit (0, 1, 2, ...) and zero entries are dropped. Rewards are
    /// uniformly zero.
    pub fn from_dense(probabilities: &[Value]) -> Result<Self, Error> {
        let mut result = Transition::new();
        for (id, &p) in probabilities.iter().enumerate() {
            result.add_sample(id, p, 0.0)?;
        }
        Ok(result)
    }

    /// Adds one transition sample to the existing probabilities.
    ///
    /// If no transition to `stateid` exists yet, it is inserted at its sorted
    /// position. If one exists, the probability is summed and the reward is
    /// replaced by the probability-weighted average
    /// `(p_old * r_old + p * r) / (p_old + p)`, falling back to `reward`
    /// when the combined probability stays below `EPSILON`.
    ///
    /// Samples with a non-positive probability are silently dropped (see
    /// [`Transition::add_sample_force`] to keep them); probabilities below
    /// -1e-3 are rejected. The probabilities are never checked to sum to one.
    pub fn add_sample(&mut self, stateid: usize, probability: Value, reward: Value) -> Result<(), Error> {
        self.add_sample_impl(stateid, probability, reward, false)
    }

    /// Same as [`Transition::add_sample`] but keeps zero-probability samples
    /// instead of dropping them. Used by forced csv imports that must round
    /// trip a model exactly.
    pub fn add_sample_force(&mut self, stateid: usize, probability: Value, reward: Value) -> Result<(), Error> {
        self.add_sample_impl(stateid, probability, reward, true)
    }

    fn add_sample_impl(
        &mut self,
        stateid: usize,
        probability: Value,
        reward: Value,
        force: bool,
    ) -> Result<(), Error> {
        if probability < -1e-3 {
            return Err(Error::InvalidArgument(
                format!("transition probabilities must be non-negative (got {probability})"),
            ));
        }
        if probability <= 0.0 && !force {
            return Ok(());
        }

        // fast path: the target id extends the sorted sequence
        if self.indices.last().map_or(true, |&last| last < stateid) {
            self.indices.push(stateid);
            self.probabilities.push(probability);
            self.rewards.push(reward);
            return Ok(());
        }

        match self.indices.binary_search(&stateid) {
            Ok(pos) => {
                let p_old = self.probabilities[pos];
                let p_new = p_old + probability;
                self.probabilities[pos] = p_new;
                self.rewards[pos] = if p_new > EPSILON {
                    (p_old * self.rewards[pos] + probability * reward) / p_new
                } else {
                    reward
                };
            }
            Err(pos) => {
                self.indices.insert(pos, stateid);
                self.probabilities.insert(pos, probability);
                self.rewards.insert(pos, reward);
            }
        }
        Ok(())
    }

    /// The number of target states with a recorded transition probability.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True iff the transition has no target state.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The largest target id involved in the transition, or -1 when empty.
    pub fn max_index(&self) -> isize {
        self.indices.last().map_or(-1, |&i| i as isize)
    }

    /// Target state ids (strictly increasing).
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Probabilities, parallel to [`Transition::indices`].
    pub fn probabilities(&self) -> &[Value] {
        &self.probabilities
    }

    /// Rewards, parallel to [`Transition::indices`].
    pub fn rewards(&self) -> &[Value] {
        &self.rewards
    }

    /// Sets the reward of the `sample`-th recorded target.
    pub fn set_reward(&mut self, sample: usize, reward: Value) {
        self.rewards[sample] = reward;
    }

    /// The reward of the `sample`-th recorded target.
    pub fn reward(&self, sample: usize) -> Value {
        self.rewards[sample]
    }

    /// The sum of all recorded probabilities.
    pub fn sum_probabilities(&self) -> Value {
        self.probabilities.iter().sum()
    }

    /// Rescales the probabilities so that they sum to one. Fails when the
    /// current sum is (close to) zero; does nothing on an empty transition.
    pub fn normalize(&mut self) -> Result<(), Error> {
        if self.probabilities.is_empty() {
            return Ok(());
        }
        let sum = self.sum_probabilities();
        if sum > TOLERANCE {
            for p in self.probabilities.iter_mut() {
                *p /= sum;
            }
            Ok(())
        } else {
            Err(Error::Numeric(
                "probabilities sum to 0 (or close) and cannot be normalized".to_string(),
            ))
        }
    }

    /// Whether the probabilities sum to one (within `TOLERANCE`). The empty
    /// transition is considered normalized.
    pub fn is_normalized(&self) -> bool {
        self.indices.is_empty() || (1.0 - self.sum_probabilities()).abs() < TOLERANCE
    }

    /// The expected backup of this transition under the value function `v`:
    /// `sum_k p[k] * (r[k] + discount * v[i[k]])`.
    ///
    /// Returns NaN for an empty transition; the caller is expected to have
    /// handled terminal and invalid actions beforehand.
    pub fn value(&self, valuefunction: &[Value], discount: Value) -> Value {
        self.value_with(valuefunction, discount, &self.probabilities)
    }

    /// Same as [`Transition::value`] but under a custom distribution over
    /// the *recorded* targets (same length as [`Transition::probabilities`]).
    pub fn value_with(&self, valuefunction: &[Value], discount: Value, probabilities: &[Value]) -> Value {
        debug_assert!(probabilities.len() == self.indices.len());
        debug_assert!(valuefunction.len() as isize > self.max_index());

        if self.indices.is_empty() {
            return Value::NAN;
        }
        let mut value = 0.0;
        for k in 0..self.indices.len() {
            value += probabilities[k] * (self.rewards[k] + discount * valuefunction[self.indices[k]]);
        }
        value
    }

    /// The expected immediate reward of this transition; NaN when empty.
    pub fn mean_reward(&self) -> Value {
        self.mean_reward_with(&self.probabilities)
    }

    /// The expected immediate reward under a custom distribution over the
    /// recorded targets; NaN when empty.
    pub fn mean_reward_with(&self, probabilities: &[Value]) -> Value {
        debug_assert!(probabilities.len() == self.len());
        if self.indices.is_empty() {
            return Value::NAN;
        }
        probabilities.iter().zip(self.rewards.iter()).map(|(p, r)| p * r).sum()
    }

    /// The probability of transitioning to `stateid` (0 when unrecorded).
    pub fn probability_to(&self, stateid: usize) -> Value {
        match self.indices.binary_search(&stateid) {
            Ok(pos) => self.probabilities[pos],
            Err(_) => 0.0,
        }
    }

    /// The position of `stateid` among the recorded targets, or -1 when the
    /// transition does not reach it.
    pub fn index_of(&self, stateid: usize) -> isize {
        match self.indices.binary_search(&stateid) {
            Ok(pos) => pos as isize,
            Err(_) => -1,
        }
    }

    /// A dense probability vector of length `size` (zero filled). Fails when
    /// `size` does not cover the maximal target id.
    pub fn probabilities_vector(&self, size: usize) -> Result<Vec<Value>, Error> {
        if self.max_index() >= size as isize {
            return Err(Error::InvalidArgument(
                "size must be greater than the maximal target index".to_string(),
            ));
        }
        let mut result = vec![0.0; size];
        for (k, &i) in self.indices.iter().enumerate() {
            result[i] = self.probabilities[k];
        }
        Ok(result)
    }

    /// A dense reward vector of length `size`; positions with no recorded
    /// transition hold zero. An empty transition densifies to NaN. Fails when
    /// `size` does not cover the maximal target id.
    pub fn rewards_vector(&self, size: usize) -> Result<Vec<Value>, Error> {
        if self.indices.is_empty() {
            return Ok(vec![Value::NAN; size]);
        }
        if self.max_index() >= size as isize {
            return Err(Error::InvalidArgument(
                "size must be greater than the maximal target index".to_string(),
            ));
        }
        let mut result = vec![0.0; size];
        for (k, &i) in self.indices.iter().enumerate() {
            result[i] = self.rewards[k];
        }
        Ok(result)
    }

    /// Adds `scale * p[k]` to `dense[i[k]]` for every recorded target,
    /// ignoring the rewards. The dense vector must cover the maximal index.
    pub fn probabilities_addto(&self, scale: Value, dense: &mut [Value]) {
        for (k, &i) in self.indices.iter().enumerate() {
            dense[i] += scale * self.probabilities[k];
        }
    }

    /// Merges another transition into this one, with its probabilities
    /// scaled by `scale`. Rewards are carried unscaled so that the
    /// weighted-average rule of [`Transition::add_sample`] yields the mean
    /// reward of the mixture.
    pub fn probabilities_add(&mut self, scale: Value, other: &Transition) -> Result<(), Error> {
        for k in 0..other.len() {
            self.add_sample(other.indices[k], scale * other.probabilities[k], other.rewards[k])?;
        }
        Ok(())
    }

    /// A json representation of the transition, optionally tagged with the
    /// id of the outcome it belongs to (-1 when it belongs to none).
    pub fn to_json(&self, outcomeid: isize) -> serde_json::Value {
        json!({
            "outcomeid": outcomeid,
            "stateids": self.indices,
            "probabilities": self.probabilities,
            "rewards": self.rewards,
        })
    }
}

/// Joins the probability vectors of two transitions over the union of their
/// target indices, in ascending index order. A target absent from one of the
/// transitions contributes a zero in the corresponding output. Used when two
/// policies over the same state must be compared position by position.
pub fn join_probs(t1: &Transition, t2: &Transition) -> (Vec<Value>, Vec<Value>) {
    let (i1, p1) = (t1.indices(), t1.probabilities());
    let (i2, p2) = (t2.indices(), t2.probabilities());

    let mut result1 = Vec::with_capacity(i1.len().max(i2.len()));
    let mut result2 = Vec::with_capacity(i1.len().max(i2.len()));

    let (mut a, mut b) = (0, 0);
    while a < i1.len() && b < i2.len() {
        if i1[a] == i2[b] {
            result1.push(p1[a]);
            result2.push(p2[b]);
            a += 1;
            b += 1;
        } else if i1[a] < i2[b] {
            result1.push(p1[a]);
            result2.push(0.0);
            a += 1;
        } else {
            result1.push(0.0);
            result2.push(p2[b]);
            b += 1;
        }
    }
    while a < i1.len() {
        result1.push(p1[a]);
        result2.push(0.0);
        a += 1;
    }
    while b < i2.len() {
        result1.push(0.0);
        result2.push(p2[b]);
        b += 1;
    }
    (result1, result2)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################


#[cfg(test)]
mod test_value {
    use crate::model::transition::Transition;

    #[test]
    fn value_discounts_the_target_values() {
        let t = Transition::from_parts(&[0, 1], &[0.5, 0.5], &[1.0, 2.0]).unwrap();
        let v = [10.0, 20.0];
        // 0.5*(1 + 0.9*10) + 0.5*(2 + 0.9*20)
        assert!((t.value(&v, 0.9) - (0.5 * 11.0 + 0.5 * 20.0)).abs() < 1e-12);
    }

    #[test]
    fn value_of_an_empty_transition_is_nan() {
        let t = Transition::new();
        assert!(t.value(&[0.0], 0.9).is_nan());
    }

    #[test]
    fn value_with_substitutes_natures_distribution() {
        let t = Transition::from_parts(&[0, 1], &[0.5, 0.5], &[0.0, 0.0]).unwrap();
        let v = [0.0, 10.0];
        assert!((t.value_with(&v, 1.0, &[1.0, 0.0]) - 0.0).abs() < 1e-12);
        assert!((t.value_with(&v, 1.0, &[0.0, 1.0]) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn mean_reward_ignores_the_value_function() {
        let t = Transition::from_parts(&[0, 1], &[0.25, 0.75], &[4.0, 8.0]).unwrap();
        assert!((t.mean_reward() - (0.25 * 4.0 + 0.75 * 8.0)).abs() < 1e-12);
    }
}

#[cfg(test)]
mod test_lookup {
    use crate::model::transition::Transition;

    #[test]
    fn probability_to_absent_state_is_zero() {
        let t = Transition::from_parts(&[1, 4], &[0.3, 0.7], &[0.0, 0.0]).unwrap();
        assert_eq!(0.3, t.probability_to(1));
        assert_eq!(0.7, t.probability_to(4));
        assert_eq!(0.0, t.probability_to(0));
        assert_eq!(0.0, t.probability_to(9));
    }

    #[test]
    fn index_of_returns_minus_one_when_absent() {
        let t = Transition::from_parts(&[1, 4], &[0.3, 0.7], &[0.0, 0.0]).unwrap();
        assert_eq!(0, t.index_of(1));
        assert_eq!(1, t.index_of(4));
        assert_eq!(-1, t.index_of(2));
        assert_eq!(-1, t.index_of(100));
    }

    #[test]
    fn max_index_of_an_empty_transition_is_minus_one() {
        assert_eq!(-1, Transition::new().max_index());
        let t = Transition::from_parts(&[7], &[1.0], &[0.0]).unwrap();
        assert_eq!(7, t.max_index());
    }
}

#[cfg(test)]
mod test_normalize {
    use crate::model::transition::Transition;

    #[test]
    fn normalize_rescales_to_one() {
        let mut t = Transition::from_parts(&[0, 1], &[2.0, 6.0], &[0.0, 0.0]).unwrap();
        assert!(!t.is_normalized());
        t.normalize().unwrap();
        assert!(t.is_normalized());
        assert!((t.probabilities()[0] - 0.25).abs() < 1e-12);
        assert!((t.probabilities()[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn normalize_fails_on_a_zero_sum() {
        let mut t = Transition::new();
        t.add_sample_force(0, 0.0, 0.0).unwrap();
        assert!(t.normalize().is_err());
    }

    #[test]
    fn an_empty_transition_is_normalized() {
        assert!(Transition::new().is_normalized());
        assert!(Transition::new().normalize().is_ok());
    }
}

#[cfg(test)]
mod test_dense {
    use crate::model::transition::Transition;

    #[test]
    fn dense_vectors_are_zero_filled() {
        let t = Transition::from_parts(&[1, 3], &[0.4, 0.6], &[5.0, 7.0]).unwrap();
        assert_eq!(vec![0.0, 0.4, 0.0, 0.6], t.probabilities_vector(4).unwrap());
        assert_eq!(vec![0.0, 5.0, 0.0, 7.0], t.rewards_vector(4).unwrap());
    }

    #[test]
    fn densification_must_cover_the_maximal_index() {
        let t = Transition::from_parts(&[1, 3], &[0.4, 0.6], &[0.0, 0.0]).unwrap();
        assert!(t.probabilities_vector(3).is_err());
        assert!(t.probabilities_vector(4).is_ok());
    }

    #[test]
    fn probabilities_addto_accumulates_scaled_mass() {
        let t = Transition::from_parts(&[0, 2], &[0.5, 0.5], &[0.0, 0.0]).unwrap();
        let mut dense = vec![0.1, 0.0, 0.0];
        t.probabilities_addto(2.0, &mut dense);
        assert!((dense[0] - 1.1).abs() < 1e-12);
        assert!((dense[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn probabilities_add_merges_and_averages_rewards() {
        let mut t = Transition::from_parts(&[0], &[0.5, ], &[2.0]).unwrap();
        let other = Transition::from_parts(&[0, 1], &[0.5, 1.0], &[4.0, 1.0]).unwrap();
        t.probabilities_add(0.5, &other).unwrap();
        // target 0: 0.5 + 0.5*0.5 mass, reward (0.5*2 + 0.25*4)/0.75
        assert!((t.probabilities()[0] - 0.75).abs() < 1e-12);
        assert!((t.rewards()[0] - (0.5 * 2.0 + 0.25 * 4.0) / 0.75).abs() < 1e-12);
        // target 1 carried over with scaled probability and unscaled reward
        assert!((t.probabilities()[1] - 0.5).abs() < 1e-12);
        assert!((t.rewards()[1] - 1.0).abs() < 1e-12);
    }
}


#[cfg(test)]
mod test_json {
    use crate::model::transition::Transition;

    #[test]
    fn json_lists_targets_probabilities_and_rewards() {
        let t = Transition::from_parts(&[0, 3], &[0.4, 0.6], &[1.0, 2.0]).unwrap();
        let js = t.to_json(2);
        assert_eq!(2, js["outcomeid"]);
        assert_eq!(serde_json::json!([0, 3]), js["stateids"]);
        assert_eq!(serde_json::json!([0.4, 0.6]), js["probabilities"]);
        assert_eq!(serde_json::json!([1.0, 2.0]), js["rewards"]);
    }
}
