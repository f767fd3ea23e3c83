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

//! This module computes stationary discounted occupancy frequencies through
//! a dense matrix representation of the policy's transition probabilities:
//! `u^T (I - discount * P) = alpha^T`, solved by LU factorization. A
//! discount strictly below one (or an absorbing structure) is required for
//! the system to be regular.

use nalgebra::{DMatrix, DVector};

use crate::abstraction::bellman::Bellman;
use crate::common::Value;
use crate::errors::Error;
use crate::model::transition::Transition;

/// The discounted state occupancy of the fixed policy pair, starting from
/// the distribution `initial`: the solution of
/// `u^T (I - discount * P) = alpha^T`.
pub fn occfreq_mat<B: Bellman>(
    bellman: &B,
    initial: &Transition,
    discount: Value,
    decisions: &[B::Decision],
    natures: &[B::NaturePol],
) -> Result<Vec<Value>, Error> {
    let n = bellman.state_count();
    if decisions.len() != n || natures.len() != n {
        return Err(Error::InvalidArgument(
            "the policy must assign a decision and a nature choice to every state".to_string(),
        ));
    }
    let alpha = DVector::from_vec(initial.probabilities_vector(n)?);

    // (I - discount P)^T u = alpha
    let mut system = DMatrix::<Value>::identity(n, n);
    for s in 0..n {
        let transition = bellman.policy_transition(s, &decisions[s], &natures[s]);
        for (k, &target) in transition.indices().iter().enumerate() {
            system[(target, s)] -= discount * transition.probabilities()[k];
        }
    }
    match system.lu().solve(&alpha) {
        Some(solution) => Ok(solution.iter().copied().collect()),
        None => Err(Error::Numeric(
            "the occupancy system is singular; a discount below 1 (or an absorbing policy) is required"
                .to_string(),
        )),
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
