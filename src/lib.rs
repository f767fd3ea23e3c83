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

//! # RMDP
//! RMDP is a generic and efficient framework for solving plain and *robust*
//! Markov decision processes in Rust. A robust MDP is a sequential decision
//! problem whose transition probabilities (or rewards) are themselves
//! uncertain: an adversarial "nature" picks the realized kernel within a
//! constrained ambiguity set, and the decision maker optimizes against that
//! worst case (or against a risk-weighted mixture of models).
//!
//! The library is organized around one central abstraction, the generalized
//! [`Bellman`] operator: a small capability set (optimize one state,
//! evaluate one state, extract the mean transition of a fixed policy pair,
//! freeze nature into a plain model) against which every iterative solver
//! is written once. Concrete operators bind a model to a *nature response*
//! ([`SaNature`], [`SNature`], [`SNatureOutcome`]): the operator does not
//! know the shape of the ambiguity set, the nature does.
//!
//! The solvers are Gauss-Seidel value iteration ([`vi_gs`]), Jacobi
//! modified policy iteration ([`mpi_jac`]), policy iteration with exact
//! dense evaluation ([`pi`]) and robust partial policy iteration
//! ([`rppi`]), the variant with a convergence guarantee on robust models.
//! On top of those, the [`solvers`] module offers a validated, one-call
//! surface (`solve_*`, `rsolve_*`, `rsolve_s_*`), and the library also
//! provides occupancy frequencies, a primal LP formulation and a
//! soft-robust (average value at risk) quadratic program behind pluggable
//! optimization backends.
//!
//! ## Quick Example
//! A three state chain where moving right eventually collects a reward of
//! 1.1 per step in the absorbing state:
//! ```
//! use rmdp::*;
//!
//! let mut mdp = Mdp::new();
//! // action 1 moves right, action 0 moves (back) left
//! add_transition(&mut mdp, 0, 1, 1, 1.0, 0.0).unwrap();
//! add_transition(&mut mdp, 1, 1, 2, 1.0, 0.0).unwrap();
//! add_transition(&mut mdp, 2, 1, 2, 1.0, 1.1).unwrap();
//! add_transition(&mut mdp, 0, 0, 0, 1.0, 0.0).unwrap();
//! add_transition(&mut mdp, 1, 0, 0, 1.0, 1.0).unwrap();
//! add_transition(&mut mdp, 2, 0, 1, 1.0, 1.0).unwrap();
//!
//! let spec = SolveSpec::default();
//! let solution = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
//!
//! assert_eq!(Status::Ok, solution.status);
//! assert_eq!(vec![1, 1, 1], solution.policy);
//! assert!((solution.valuefunction[2] - 11.0).abs() < 1e-2);
//!
//! // the same model under an adversarial nature with an l1 budget
//! let nature = RobustL1 { budget: 0.5 };
//! let robust = rsolve_ppi(&mdp, 0.9, &nature, vec![], &[], &spec, None).unwrap();
//! assert_eq!(Status::Ok, robust.status);
//! ```

pub mod abstraction;
pub mod common;
pub mod errors;
pub mod implementation;
pub mod model;
pub mod solvers;

pub use crate::abstraction::backend::*;
pub use crate::abstraction::bellman::*;
pub use crate::abstraction::nature::*;
pub use crate::common::*;
pub use crate::errors::*;
pub use crate::implementation::bellman::*;
pub use crate::implementation::nature::*;
pub use crate::implementation::solver::*;
pub use crate::model::*;
pub use crate::solvers::*;
