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

//! This module defines the black-box interface to the mathematical
//! programming backends. The library formulates its linear and quadratic
//! programs as plain data (sparse rows over a dense variable vector) and
//! hands them to whatever backend the caller plugs in; no vendor driver
//! lives in this crate. A backend session is scoped to a single solve and
//! must be released on every exit path.

use crate::common::Value;
use crate::errors::Error;

/// The sense of one constraint row.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sense {
    /// The row must equal the right-hand side.
    Equal,
    /// The row must be at least the right-hand side.
    GreaterEqual,
    /// The row must be at most the right-hand side.
    LessEqual,
}

/// One linear constraint: a sparse list of (variable, coefficient) terms,
/// a sense and a right-hand side.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub linear: Vec<(usize, Value)>,
    pub sense: Sense,
    pub rhs: Value,
}

/// One (possibly) quadratic constraint: linear terms plus bilinear
/// `coefficient * x_i * x_j` terms.
#[derive(Debug, Clone)]
pub struct QuadConstraint {
    pub linear: Vec<(usize, Value)>,
    pub quadratic: Vec<(usize, usize, Value)>,
    pub sense: Sense,
    pub rhs: Value,
}

/// A linear program over `num_vars` continuous variables with box bounds.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// The number of decision variables.
    pub num_vars: usize,
    /// Dense objective coefficients (one per variable).
    pub objective: Vec<Value>,
    /// True to maximize, false to minimize.
    pub maximize: bool,
    /// Lower bound of each variable (may be -inf).
    pub lower: Vec<Value>,
    /// Upper bound of each variable (may be +inf).
    pub upper: Vec<Value>,
    /// The constraint rows.
    pub constraints: Vec<LinearConstraint>,
}

impl LinearProgram {
    /// An empty program over `num_vars` variables, all bounded in
    /// [0, +inf), with a zero objective.
    pub fn new(num_vars: usize) -> Self {
        LinearProgram {
            num_vars,
            objective: vec![0.0; num_vars],
            maximize: false,
            lower: vec![0.0; num_vars],
            upper: vec![Value::INFINITY; num_vars],
            constraints: vec![],
        }
    }
}

/// A quadratic program: a linear program plus bilinear objective terms and
/// quadratic constraint rows. The bilinear terms need not form a convex
/// objective; backends able to handle non-convex quadratics (spatial
/// branching) are expected.
#[derive(Debug, Clone)]
pub struct QuadProgram {
    /// The number of decision variables.
    pub num_vars: usize,
    /// Dense linear objective coefficients (one per variable).
    pub objective: Vec<Value>,
    /// Bilinear objective terms `coefficient * x_i * x_j`.
    pub objective_quadratic: Vec<(usize, usize, Value)>,
    /// True to maximize, false to minimize.
    pub maximize: bool,
    /// Lower bound of each variable (may be -inf).
    pub lower: Vec<Value>,
    /// Upper bound of each variable (may be +inf).
    pub upper: Vec<Value>,
    /// The constraint rows.
    pub constraints: Vec<QuadConstraint>,
}

impl QuadProgram {
    /// An empty program over `num_vars` variables, all bounded in
    /// [0, +inf), with a zero objective.
    pub fn new(num_vars: usize) -> Self {
        QuadProgram {
            num_vars,
            objective: vec![0.0; num_vars],
            objective_quadratic: vec![],
            maximize: false,
            lower: vec![0.0; num_vars],
            upper: vec![Value::INFINITY; num_vars],
            constraints: vec![],
        }
    }
}

/// The backend's verdict on a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BackendStatus {
    /// An optimal solution is available.
    Optimal,
    /// The program was proven infeasible.
    Infeasible,
    /// The program is either infeasible or unbounded.
    InfeasibleOrUnbounded,
    /// The program was proven unbounded.
    Unbounded,
    /// Any other backend-specific condition, carried by its native code.
    Other(i32),
}

/// What a backend hands back: its status, the variable values (empty unless
/// optimal) and the objective value.
#[derive(Debug, Clone)]
pub struct BackendSolution {
    pub status: BackendStatus,
    pub values: Vec<Value>,
    pub objective: Value,
}

/// A linear programming backend. Implementations wrap a vendor solver; the
/// library only ever sees this trait.
pub trait LpBackend: Sync {
    fn solve_lp(&self, program: &LinearProgram) -> Result<BackendSolution, Error>;
}

/// A quadratic programming backend, able to handle the non-convex bilinear
/// programs produced by the soft-robust formulation.
pub trait QpBackend: Sync {
    fn solve_qp(&self, program: &QuadProgram) -> Result<BackendSolution, Error>;
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_programs {
    use crate::abstraction::backend::{LinearProgram, QuadProgram};

    #[test]
    fn a_fresh_lp_is_bounded_below_by_zero() {
        let lp = LinearProgram::new(3);
        assert_eq!(3, lp.num_vars);
        assert_eq!(vec![0.0; 3], lp.lower);
        assert!(lp.upper.iter().all(|u| u.is_infinite()));
        assert!(lp.constraints.is_empty());
        assert!(!lp.maximize);
    }

    #[test]
    fn a_fresh_qp_has_no_quadratic_terms() {
        let qp = QuadProgram::new(2);
        assert!(qp.objective_quadratic.is_empty());
        assert_eq!(vec![0.0; 2], qp.objective);
    }
}
