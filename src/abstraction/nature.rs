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

//! This module defines the contracts of the *nature responses*: the
//! adversarial (or merely uncertain) player that picks the realized
//! transition kernel within an ambiguity set. The Bellman operators do not
//! know the shape of the ambiguity set; the nature does. Natures are first
//! class values: plain closures implement the traits, and the registry in
//! the implementation layer maps string names to boxed instances.
//!
//! All responses are pure and stateless per call. The `z`-function handed to
//! a nature is `z[k] = r[k] + discount * v[i[k]]`, defined only over the
//! targets the transition actually reaches (same positions as the nominal
//! distribution).

use crate::common::Value;

/// The s,a-rectangular nature contract: nature's choice factorizes per
/// (state, action), so the worst case can be evaluated one action at a
/// time. Given the nominal distribution of the action (over its recorded
/// targets, or over its outcomes) and the matching z-values, the response is
/// nature's distribution together with the resulting value
/// `sum_k p*[k] * z[k]`. Called once per state-action per backup.
pub trait SaNature: Sync {
    fn response(
        &self,
        stateid: usize,
        actionid: usize,
        nominal: &[Value],
        zvalues: &[Value],
    ) -> (Vec<Value>, Value);
}

/// Any closure of the right shape is an s,a-rectangular nature.
impl<F> SaNature for F
where
    F: Fn(usize, usize, &[Value], &[Value]) -> (Vec<Value>, Value) + Sync,
{
    fn response(
        &self,
        stateid: usize,
        actionid: usize,
        nominal: &[Value],
        zvalues: &[Value],
    ) -> (Vec<Value>, Value) {
        self(stateid, actionid, nominal, zvalues)
    }
}

/// The s-rectangular nature contract: nature's choice factorizes per state,
/// jointly across all actions, and jointly with the decision maker's
/// randomized action choice. When `policy` is fully specified (non-empty),
/// only nature optimizes and the returned action distribution equals
/// `policy`; when it is empty, the response also optimizes the decision
/// maker's distribution. The response returns, in order: the action
/// distribution, nature's distribution for *every* action, and the value
/// `sum_a pi[a] * sum_k p*_a[k] * z_a[k]`.
pub trait SNature: Sync {
    fn response(
        &self,
        stateid: usize,
        policy: &[Value],
        nominals: &[Vec<Value>],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Vec<Value>>, Value);
}

/// Any closure of the right shape is an s-rectangular nature.
impl<F> SNature for F
where
    F: Fn(usize, &[Value], &[Vec<Value>], &[Vec<Value>]) -> (Vec<Value>, Vec<Vec<Value>>, Value)
        + Sync,
{
    fn response(
        &self,
        stateid: usize,
        policy: &[Value],
        nominals: &[Vec<Value>],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Vec<Value>>, Value) {
        self(stateid, policy, nominals, zvalues)
    }
}

/// The s-rectangular nature contract specialized to models with outcomes:
/// nature shares a *single* distribution over the outcomes across all
/// actions of the state. The z-values are indexed by action first and
/// outcome second. The returned value is
/// `sum_a pi[a] * sum_w d*[w] * z[a][w]`.
pub trait SNatureOutcome: Sync {
    fn response(
        &self,
        stateid: usize,
        policy: &[Value],
        nominal: &[Value],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Value>, Value);
}

/// Any closure of the right shape is an s-rectangular outcome nature.
impl<F> SNatureOutcome for F
where
    F: Fn(usize, &[Value], &[Value], &[Vec<Value>]) -> (Vec<Value>, Vec<Value>, Value) + Sync,
{
    fn response(
        &self,
        stateid: usize,
        policy: &[Value],
        nominal: &[Value],
        zvalues: &[Vec<Value>],
    ) -> (Vec<Value>, Vec<Value>, Value) {
        self(stateid, policy, nominal, zvalues)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
