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

//! This module solves an MDP with outcomes under a *soft-robust* objective
//! with static uncertainty: nature draws one model (outcome) once, at the
//! start, and the objective blends the average value at risk of the return
//! with its expectation:
//!
//! ```text
//! max_pi  beta * AVaR_alpha[return(pi, P)] + (1 - beta) * E[return(pi, P)]
//! ```
//!
//! The formulation is a *non-convex* quadratic program over the randomized
//! stationary policy `pi` and the per-model occupancy `d` (their product
//! appears in the objective and in the occupancy balance), with the
//! Rockafellar-Uryasev variables `z` and `y` encoding the average value at
//! risk. It is handed to the pluggable QP backend; any status other than
//! optimal surfaces as an infeasible solution with no policy.

use std::time::Instant;

use log::debug;

use crate::abstraction::backend::{QpBackend, QuadConstraint, QuadProgram, Sense};
use crate::common::{uniform_dist, RandPolicy, Status, Value};
use crate::errors::{Error, ModelError};
use crate::implementation::nature::sa::AVAR_MIN_ALPHA;
use crate::model::mdp::Mdpo;

/// The result of a static-uncertainty (soft-robust) solve: a randomized
/// stationary policy and the attained objective, rather than a value
/// function per state.
#[derive(Debug, Clone)]
pub struct RandStaticSolution {
    /// One distribution over actions per state (empty for terminal states;
    /// empty altogether when the solve failed).
    pub policy: RandPolicy,
    /// The attained soft-robust objective.
    pub objective: Value,
    /// Wall-clock duration of the solve, in seconds.
    pub time: f64,
    /// How the solve terminated.
    pub status: Status,
    /// Human readable detail, mostly useful on failure.
    pub message: String,
}

impl RandStaticSolution {
    fn degenerate(message: &str) -> Self {
        RandStaticSolution {
            policy: vec![],
            objective: 0.0,
            time: 0.0,
            status: Status::Ok,
            message: message.to_string(),
        }
    }
}

/// The variable layout of the quadratic program.
struct Layout {
    /// First policy variable of each state (cumulative action counts).
    pi_base: Vec<usize>,
    /// Offset of the occupancy block.
    d_base: usize,
    /// Offset of the `y` block.
    y_base: usize,
    /// Index of the `z` variable.
    z: usize,
    noutcomes: usize,
}

impl Layout {
    fn pi(&self, state: usize, action: usize) -> usize {
        self.pi_base[state] + action
    }
    fn d(&self, state: usize, outcome: usize) -> usize {
        self.d_base + state * self.noutcomes + outcome
    }
    fn y(&self, outcome: usize) -> usize {
        self.y_base + outcome
    }
}

/// The number of outcomes shared by every (state, action) of the model, or
/// a model error pointing at the first offender. `None` when every state is
/// terminal.
fn uniform_outcome_count(mdpo: &Mdpo) -> Result<Option<usize>, Error> {
    let mut expected: Option<usize> = None;
    for (sid, state) in mdpo.states().iter().enumerate() {
        for (aid, action) in state.actions().iter().enumerate() {
            let count = action.outcome_count();
            match expected {
                None => expected = Some(count),
                Some(e) if e != count => {
                    return Err(ModelError::new(
                        "the number of outcomes is not uniform across all states and actions",
                    )
                    .for_state(sid)
                    .for_action(aid)
                    .into());
                }
                _ => {}
            }
        }
    }
    Ok(expected)
}

/// Builds the soft-robust quadratic program. Exposed separately so that the
/// formulation itself can be inspected and tested without a backend.
pub fn avar_quad_program(
    mdpo: &Mdpo,
    alpha: Value,
    beta: Value,
    gamma: Value,
    init_dist: &[Value],
    model_dist: &[Value],
    noutcomes: usize,
) -> QuadProgram {
    let nstates = mdpo.state_count();
    let alpha = alpha.clamp(AVAR_MIN_ALPHA, 1.0);
    let beta = beta.clamp(0.0, 1.0);
    let gamma = gamma.clamp(0.0, 1.0);
    // keep the risk weight finite when alpha is (clamped to) 1
    let tail_weight = beta / (1.0 - alpha).max(AVAR_MIN_ALPHA);

    let mut pi_base = Vec::with_capacity(nstates);
    let mut nstateactions = 0;
    for state in mdpo.states() {
        pi_base.push(nstateactions);
        nstateactions += state.action_count();
    }
    let layout = Layout {
        pi_base,
        d_base: nstateactions,
        y_base: nstateactions + nstates * noutcomes,
        z: nstateactions + nstates * noutcomes + noutcomes,
        noutcomes,
    };

    let mut qp = QuadProgram::new(layout.z + 1);
    qp.maximize = true;
    qp.lower[layout.z] = Value::NEG_INFINITY;

    // objective: z + sum_w ( (1-beta) sum_{s,a} r d pi - tail_weight * y_w )
    qp.objective[layout.z] = 1.0;
    for w in 0..noutcomes {
        for (sid, state) in mdpo.states().iter().enumerate() {
            for (aid, action) in state.actions().iter().enumerate() {
                let reward = action.outcome(w).mean_reward();
                if reward.is_nan() {
                    continue;
                }
                qp.objective_quadratic.push((
                    layout.d(sid, w),
                    layout.pi(sid, aid),
                    (1.0 - beta) * reward,
                ));
            }
        }
        qp.objective[layout.y(w)] = -tail_weight;
    }

    // y_w - z + sum_{s,a} r d pi >= 0 for each outcome
    for w in 0..noutcomes {
        let mut quadratic = vec![];
        for (sid, state) in mdpo.states().iter().enumerate() {
            for (aid, action) in state.actions().iter().enumerate() {
                let reward = action.outcome(w).mean_reward();
                if reward.is_nan() {
                    continue;
                }
                quadratic.push((layout.d(sid, w), layout.pi(sid, aid), reward));
            }
        }
        qp.constraints.push(QuadConstraint {
            linear: vec![(layout.y(w), 1.0), (layout.z, -1.0)],
            quadratic,
            sense: Sense::GreaterEqual,
            rhs: 0.0,
        });
    }

    // occupancy balance, for each outcome and state:
    // d(s,w) - gamma sum_{s',a'} d(s',w) pi(s',a') P^w(s',a',s) = f(w) p0(s)
    for w in 0..noutcomes {
        for sid in 0..nstates {
            let mut quadratic = vec![];
            for (spid, source) in mdpo.states().iter().enumerate() {
                for (apid, action) in source.actions().iter().enumerate() {
                    let probability = action.outcome(w).probability_to(sid);
                    if probability > 0.0 {
                        quadratic.push((
                            layout.d(spid, w),
                            layout.pi(spid, apid),
                            -gamma * probability,
                        ));
                    }
                }
            }
            qp.constraints.push(QuadConstraint {
                linear: vec![(layout.d(sid, w), 1.0)],
                quadratic,
                sense: Sense::Equal,
                rhs: model_dist[w] * init_dist[sid],
            });
        }
    }

    // sum_a pi(s,a) = 1 for each non-terminal state
    for (sid, state) in mdpo.states().iter().enumerate() {
        if state.is_terminal() {
            continue;
        }
        qp.constraints.push(QuadConstraint {
            linear: (0..state.action_count()).map(|a| (layout.pi(sid, a), 1.0)).collect(),
            quadratic: vec![],
            sense: Sense::Equal,
            rhs: 1.0,
        });
    }
    qp
}

/// Solves the MDPO under the soft-robust static-uncertainty objective.
///
/// `alpha` is the risk level of the average value at risk (clamped to
/// `[1e-5, 1]`), `beta` the weight of the risk term (clamped to `[0, 1]`),
/// `gamma` the discount (clamped to `[0, 1]`). `init_dist` is the initial
/// state distribution and `model_dist` the nominal distribution over the
/// models; pass an empty slice for the uniform one.
pub fn srsolve_avar_quad(
    backend: &dyn QpBackend,
    mdpo: &Mdpo,
    alpha: Value,
    beta: Value,
    gamma: Value,
    init_dist: &[Value],
    model_dist: &[Value],
) -> Result<RandStaticSolution, Error> {
    let start = Instant::now();
    let nstates = mdpo.state_count();
    if nstates == 0 {
        return Ok(RandStaticSolution::degenerate("empty model"));
    }
    if init_dist.len() != nstates {
        return Err(Error::InvalidArgument(
            "the initial distribution must have one entry per state".to_string(),
        ));
    }
    let noutcomes = match uniform_outcome_count(mdpo)? {
        Some(count) if count > 0 => count,
        _ => return Ok(RandStaticSolution::degenerate("all states are terminal")),
    };
    let model_dist = if model_dist.is_empty() {
        uniform_dist(noutcomes)
    } else if model_dist.len() == noutcomes {
        model_dist.to_vec()
    } else {
        return Err(Error::InvalidArgument(
            "the model distribution must be empty or have one entry per outcome".to_string(),
        ));
    };

    let qp = avar_quad_program(mdpo, alpha, beta, gamma, init_dist, &model_dist, noutcomes);
    debug!(
        "soft-robust qp: {} variables, {} constraints ({} states, {} outcomes)",
        qp.num_vars,
        qp.constraints.len(),
        nstates,
        noutcomes
    );
    let backend_solution = backend.solve_qp(&qp)?;
    if backend_solution.status != crate::abstraction::backend::BackendStatus::Optimal {
        return Ok(RandStaticSolution {
            policy: vec![],
            objective: 0.0,
            time: start.elapsed().as_secs_f64(),
            status: Status::Infeasible,
            message: "solution infeasible or unbounded".to_string(),
        });
    }

    // extract the randomized policy, state by state
    let mut policy = Vec::with_capacity(nstates);
    let mut offset = 0;
    for state in mdpo.states() {
        let nactions = state.action_count();
        policy.push(backend_solution.values[offset..offset + nactions].to_vec());
        offset += nactions;
    }

    Ok(RandStaticSolution {
        policy,
        objective: backend_solution.objective,
        time: start.elapsed().as_secs_f64(),
        status: Status::Ok,
        message: String::new(),
    })
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################


#[cfg(test)]
mod test_solve {
    use crate::abstraction::backend::{BackendSolution, BackendStatus, QpBackend, QuadProgram};
    use crate::common::Status;
    use crate::errors::Error;
    use crate::implementation::solver::soft_robust::srsolve_avar_quad;
    use crate::model::mdp::{add_transition_outcome, Mdpo};

    struct Canned(BackendStatus, Vec<f64>, f64);
    impl QpBackend for Canned {
        fn solve_qp(&self, _program: &QuadProgram) -> Result<BackendSolution, Error> {
            Ok(BackendSolution { status: self.0, values: self.1.clone(), objective: self.2 })
        }
    }

    fn small_mdpo() -> Mdpo {
        let mut m = Mdpo::new();
        add_transition_outcome(&mut m, 0, 0, 0, 0, 1.0, 1.0).unwrap();
        add_transition_outcome(&mut m, 0, 0, 1, 0, 1.0, 2.0).unwrap();
        add_transition_outcome(&mut m, 0, 1, 0, 0, 1.0, 0.5).unwrap();
        add_transition_outcome(&mut m, 0, 1, 1, 0, 1.0, 0.5).unwrap();
        m
    }

    #[test]
    fn the_policy_is_read_back_per_state() {
        let mdpo = small_mdpo();
        // values: pi(0,0), pi(0,1), then d, y, z
        let backend =
            Canned(BackendStatus::Optimal, vec![0.25, 0.75, 10.0, 10.0, 0.0, 0.0, 1.0], 4.2);
        let solution = srsolve_avar_quad(&backend, &mdpo, 0.2, 0.5, 0.9, &[1.0], &[]).unwrap();
        assert_eq!(Status::Ok, solution.status);
        assert_eq!(vec![vec![0.25, 0.75]], solution.policy);
        assert!((solution.objective - 4.2).abs() < 1e-12);
    }

    #[test]
    fn a_failed_backend_yields_infeasible_without_policy() {
        let mdpo = small_mdpo();
        let backend = Canned(BackendStatus::InfeasibleOrUnbounded, vec![], 0.0);
        let solution = srsolve_avar_quad(&backend, &mdpo, 0.2, 0.5, 0.9, &[1.0], &[]).unwrap();
        assert_eq!(Status::Infeasible, solution.status);
        assert!(solution.policy.is_empty());
        assert!(!solution.message.is_empty());
    }

    #[test]
    fn shape_mismatches_are_argument_errors() {
        let mdpo = small_mdpo();
        let backend = Canned(BackendStatus::Optimal, vec![], 0.0);
        assert!(srsolve_avar_quad(&backend, &mdpo, 0.2, 0.5, 0.9, &[1.0, 0.0], &[]).is_err());
        assert!(srsolve_avar_quad(&backend, &mdpo, 0.2, 0.5, 0.9, &[1.0], &[0.3, 0.3, 0.4]).is_err());
    }

    #[test]
    fn an_empty_model_short_circuits() {
        let mdpo = Mdpo::new();
        let backend = Canned(BackendStatus::Optimal, vec![], 0.0);
        let solution = srsolve_avar_quad(&backend, &mdpo, 0.2, 0.5, 0.9, &[], &[]).unwrap();
        assert_eq!(Status::Ok, solution.status);
        assert!(solution.policy.is_empty());
    }
}
