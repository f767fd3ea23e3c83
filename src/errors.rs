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

//! This module defines the error taxonomy of the library. Errors are only
//! raised at input validation boundaries (model checks, constructors and
//! argument parsing); inside the solver loops, abnormal terminations are
//! reported through the `Status` of the returned solution instead.

use thiserror::Error;

/// Tells that a model was misspecified, and where. The state, action and
/// outcome ids are -1 when the corresponding coordinate does not apply.
#[derive(Debug, Clone, Error)]
#[error("state: {state}, action: {action}, outcome: {outcome}, message: '{message}'")]
pub struct ModelError {
    /// Id of the offending state (-1 when unknown).
    pub state: isize,
    /// Id of the offending action (-1 when unknown).
    pub action: isize,
    /// Id of the offending outcome (-1 when the model has no outcomes).
    pub outcome: isize,
    /// Human readable description of the violation.
    pub message: String,
}

impl ModelError {
    /// Creates a model error with no location information.
    pub fn new(message: impl Into<String>) -> Self {
        ModelError { state: -1, action: -1, outcome: -1, message: message.into() }
    }
    /// Attaches the id of the offending state.
    pub fn for_state(mut self, state: usize) -> Self {
        self.state = state as isize;
        self
    }
    /// Attaches the id of the offending action.
    pub fn for_action(mut self, action: usize) -> Self {
        self.action = action as isize;
        self
    }
    /// Attaches the id of the offending outcome.
    pub fn for_outcome(mut self, outcome: usize) -> Self {
        self.outcome = outcome as isize;
        self
    }
}

/// The error type shared by all fallible operations of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The model failed its consistency check.
    #[error("misspecified model: {0}")]
    Model(#[from] ModelError),
    /// An argument had the wrong shape or an out-of-range value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A numerical operation could not be carried out (e.g. normalizing a
    /// distribution that sums to zero, or inverting a singular system).
    #[error("numeric failure: {0}")]
    Numeric(String),
    /// The optimization backend reported a failure.
    #[error("backend failure ({code}): {message}")]
    Backend { code: i32, message: String },
    /// An i/o operation failed while reading or writing a model.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A csv record could not be parsed or written.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_model_error {
    use crate::errors::ModelError;

    #[test]
    fn location_defaults_to_minus_one() {
        let e = ModelError::new("whatever");
        assert_eq!(-1, e.state);
        assert_eq!(-1, e.action);
        assert_eq!(-1, e.outcome);
    }

    #[test]
    fn location_can_be_attached_fluently() {
        let e = ModelError::new("bad distribution").for_state(3).for_action(1).for_outcome(2);
        assert_eq!(3, e.state);
        assert_eq!(1, e.action);
        assert_eq!(2, e.outcome);
    }

    #[test]
    fn the_message_spells_out_the_full_location() {
        let e = ModelError::new("oops").for_state(7);
        let txt = format!("{e}");
        assert!(txt.contains("state: 7"));
        assert!(txt.contains("action: -1"));
        assert!(txt.contains("'oops'"));
    }
}
