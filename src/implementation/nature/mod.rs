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

//! This module provides the concrete nature responses and the registry which
//! maps a string name plus parameters to a boxed instance of the matching
//! contract. The registry is what lets callers select an ambiguity set from
//! configuration (or from a binding layer) without touching the operator
//! code.

pub mod s;
pub mod sa;

pub use self::s::*;
pub use self::sa::*;

use crate::abstraction::nature::{SNature, SNatureOutcome, SaNature};
use crate::common::Value;
use crate::errors::Error;

fn single_param(name: &str, params: &[Value]) -> Result<Value, Error> {
    match params {
        [p] => Ok(*p),
        _ => Err(Error::InvalidArgument(format!(
            "nature '{name}' takes exactly one parameter, got {}",
            params.len()
        ))),
    }
}

/// Builds an s,a-rectangular nature from its name. Known natures:
/// `"average"` (no parameter), `"l1"` (ball radius), `"avar"` (risk level).
pub fn sa_nature_from_name(name: &str, params: &[Value]) -> Result<Box<dyn SaNature>, Error> {
    match name {
        "average" => Ok(Box::new(Average)),
        "l1" => Ok(Box::new(RobustL1 { budget: single_param(name, params)? })),
        "avar" => Ok(Box::new(Avar { alpha: single_param(name, params)? })),
        _ => Err(Error::InvalidArgument(format!("unknown s,a-rectangular nature '{name}'"))),
    }
}

/// Builds an s-rectangular nature from its name. Known natures:
/// `"average"` (no parameter) and `"l1"` (shared ball radius).
pub fn s_nature_from_name(name: &str, params: &[Value]) -> Result<Box<dyn SNature>, Error> {
    match name {
        "average" => Ok(Box::new(SAverage)),
        "l1" => Ok(Box::new(SRobustL1 { budget: single_param(name, params)? })),
        _ => Err(Error::InvalidArgument(format!("unknown s-rectangular nature '{name}'"))),
    }
}

/// Builds an s-rectangular outcome nature from its name. Known natures:
/// `"average"` (no parameter), `"l1"` (ball radius over the outcome
/// weights) and `"avar"` (risk level over the outcome weights). The
/// returned natures carry no LP backend: with a free decision maker policy
/// they fall back to the best deterministic action.
pub fn s_outcome_nature_from_name(
    name: &str,
    params: &[Value],
) -> Result<Box<dyn SNatureOutcome>, Error> {
    match name {
        "average" => Ok(Box::new(AverageOutcome)),
        "l1" => Ok(Box::new(SRobustOutcomeL1 { budget: single_param(name, params)?, backend: None })),
        "avar" => Ok(Box::new(SRobustOutcomeAvar { alpha: single_param(name, params)?, backend: None })),
        _ => Err(Error::InvalidArgument(format!("unknown s-rectangular outcome nature '{name}'"))),
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_registry {
    use crate::implementation::nature::{s_nature_from_name, s_outcome_nature_from_name, sa_nature_from_name};

    #[test]
    fn known_names_resolve() {
        assert!(sa_nature_from_name("average", &[]).is_ok());
        assert!(sa_nature_from_name("l1", &[0.5]).is_ok());
        assert!(sa_nature_from_name("avar", &[0.2]).is_ok());
        assert!(s_nature_from_name("average", &[]).is_ok());
        assert!(s_nature_from_name("l1", &[0.5]).is_ok());
        assert!(s_outcome_nature_from_name("average", &[]).is_ok());
        assert!(s_outcome_nature_from_name("l1", &[0.5]).is_ok());
        assert!(s_outcome_nature_from_name("avar", &[0.1]).is_ok());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(sa_nature_from_name("linf", &[0.5]).is_err());
        assert!(s_nature_from_name("avar", &[0.5]).is_err());
        assert!(s_outcome_nature_from_name("wasserstein", &[1.0]).is_err());
    }

    #[test]
    fn parameter_arity_is_checked() {
        assert!(sa_nature_from_name("l1", &[]).is_err());
        assert!(sa_nature_from_name("l1", &[0.1, 0.2]).is_err());
        assert!(sa_nature_from_name("avar", &[]).is_err());
    }
}
