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

//! This module is the user-facing solver surface. Every function validates
//! the model (and the shape of the optional partial policy) before
//! dispatching to the generic algorithm with the right Bellman operator.
//! The naming scheme follows the structure of the library:
//!
//! - `solve_*` covers the plain (non robust) objectives; the `_r` suffix
//!   accepts a randomized partial policy, the `_o` suffix operates on a
//!   model with outcomes by averaging them.
//! - `rsolve_*` covers the s,a-rectangular robust objectives and
//!   `rsolve_s_*` the s-rectangular ones; the `_o` suffix again marks the
//!   outcome models.
//! - `*_ppi`, `*_mppi` and `*_vppi` run robust partial policy iteration
//!   with a policy-iteration, modified-policy-iteration or value-iteration
//!   inner solver. These are the variants with a convergence guarantee;
//!   the plain robust `*_mpi`/`*_pi` may fail to converge on robust
//!   models.

use crate::abstraction::backend::{LpBackend, QpBackend};
use crate::abstraction::nature::{SNature, SNatureOutcome, SaNature};
use crate::common::{
    ActionId, DetermSolution, Progress, RandSolution, SRobustOutcomeSolution, SRobustSolution,
    SaRobustSolution, Solution, SolveSpec, Value,
};
use crate::errors::Error;
use crate::implementation::bellman::plain::{PlainBellman, PlainBellmanRand};
use crate::implementation::bellman::s_robust::{SRobustBellman, SRobustOutcomeBellman};
use crate::implementation::bellman::sa_robust::{SaRobustBellman, SaRobustOutcomeBellman};
use crate::implementation::nature::sa::Average;
use crate::implementation::solver::lp::solve_lp_primal;
use crate::implementation::solver::mpi::mpi_jac;
use crate::implementation::solver::occupancy::occfreq_mat;
use crate::implementation::solver::pi::pi;
use crate::implementation::solver::rppi::{rppi, MdpSolver};
use crate::implementation::solver::soft_robust::{self, RandStaticSolution};
use crate::implementation::solver::vi::vi_gs;
use crate::model::action::ModelAction;
use crate::model::mdp::{policy_det2rand, GenericMdp, Mdp, Mdpo};
use crate::model::transition::Transition;

// ----------------------------------------------------------------------------
// --- ARGUMENT VALIDATION ----------------------------------------------------
// ----------------------------------------------------------------------------

fn check_policy<A: ModelAction>(mdp: &GenericMdp<A>, policy: &[ActionId]) -> Result<(), Error> {
    if policy.is_empty() {
        return Ok(());
    }
    if policy.len() != mdp.state_count() {
        return Err(Error::InvalidArgument(
            "the policy length does not match the number of states".to_string(),
        ));
    }
    for (sid, &action) in policy.iter().enumerate() {
        if action >= 0 && action as usize >= mdp.state(sid).action_count() {
            return Err(Error::InvalidArgument(format!(
                "policy prescribes action {action} in state {sid} which only has {} actions",
                mdp.state(sid).action_count()
            )));
        }
    }
    Ok(())
}

fn check_rpolicy<A: ModelAction>(mdp: &GenericMdp<A>, rpolicy: &[Vec<Value>]) -> Result<(), Error> {
    if rpolicy.is_empty() {
        return Ok(());
    }
    if rpolicy.len() != mdp.state_count() {
        return Err(Error::InvalidArgument(
            "the randomized policy length does not match the number of states".to_string(),
        ));
    }
    for (sid, rule) in rpolicy.iter().enumerate() {
        if !rule.is_empty() && rule.len() != mdp.state(sid).action_count() {
            return Err(Error::InvalidArgument(format!(
                "the randomized rule of state {sid} must cover its {} actions",
                mdp.state(sid).action_count()
            )));
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// --- PLAIN MDP --------------------------------------------------------------
// ----------------------------------------------------------------------------

/// Gauss-Seidel value iteration on a plain MDP. `policy` is a partial
/// deterministic policy (-1 entries are optimized; empty means optimize
/// everywhere).
pub fn solve_vi(
    mdp: &Mdp,
    discount: Value,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<DetermSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    vi_gs(&PlainBellman::with_policy(mdp, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Modified policy iteration (Jacobi evaluation) on a plain MDP.
pub fn solve_mpi(
    mdp: &Mdp,
    discount: Value,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<DetermSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    mpi_jac(&PlainBellman::with_policy(mdp, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Policy iteration (dense linear solves) on a plain MDP. Limited to a few
/// thousand states by its dense evaluation step.
pub fn solve_pi(
    mdp: &Mdp,
    discount: Value,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<DetermSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    pi(&PlainBellman::with_policy(mdp, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Gauss-Seidel value iteration under a (partial) randomized policy.
pub fn solve_vi_r(
    mdp: &Mdp,
    discount: Value,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<RandSolution, Error> {
    mdp.check_model()?;
    check_rpolicy(mdp, rpolicy)?;
    vi_gs(&PlainBellmanRand::with_policy(mdp, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Modified policy iteration under a (partial) randomized policy.
pub fn solve_mpi_r(
    mdp: &Mdp,
    discount: Value,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<RandSolution, Error> {
    mdp.check_model()?;
    check_rpolicy(mdp, rpolicy)?;
    mpi_jac(&PlainBellmanRand::with_policy(mdp, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Policy iteration under a (partial) randomized policy.
pub fn solve_pi_r(
    mdp: &Mdp,
    discount: Value,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<RandSolution, Error> {
    mdp.check_model()?;
    check_rpolicy(mdp, rpolicy)?;
    pi(&PlainBellmanRand::with_policy(mdp, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Discounted state occupancy frequencies of a deterministic policy,
/// computed through a dense matrix inverse.
pub fn occupancies(
    mdp: &Mdp,
    initial: &Transition,
    discount: Value,
    policy: &[ActionId],
) -> Result<Vec<Value>, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    if policy.len() != mdp.state_count() {
        return Err(Error::InvalidArgument(
            "occupancies require a full policy (one action per state)".to_string(),
        ));
    }
    let bellman = PlainBellman::new(mdp);
    let natures = vec![(); mdp.state_count()];
    occfreq_mat(&bellman, initial, discount, policy, &natures)
}

/// Solves a plain MDP through the primal LP formulation using the given
/// backend.
pub fn solve_lp(backend: &dyn LpBackend, mdp: &Mdp, discount: Value) -> Result<DetermSolution, Error> {
    mdp.check_model()?;
    solve_lp_primal(backend, mdp, discount)
}

// ----------------------------------------------------------------------------
// --- ROBUST SA-RECTANGULAR MDP ----------------------------------------------
// ----------------------------------------------------------------------------

/// Robust value iteration with an s,a-rectangular nature.
pub fn rsolve_vi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    vi_gs(&SaRobustBellman::with_policy(mdp, nature, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust modified policy iteration with an s,a-rectangular nature.
///
/// There is no proof of convergence for this method on robust models; use
/// [`rsolve_ppi`] (or a sibling) when a guarantee is needed.
pub fn rsolve_mpi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    mpi_jac(&SaRobustBellman::with_policy(mdp, nature, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust policy iteration with an s,a-rectangular nature.
///
/// The method may loop forever without converging on robust models; use
/// [`rsolve_ppi`] (or a sibling) when a guarantee is needed.
pub fn rsolve_pi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    pi(&SaRobustBellman::with_policy(mdp, nature, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust partial policy iteration with an s,a-rectangular nature and a
/// policy-iteration inner solver. Converges to the optimal robust value
/// function and policy; very fast on small models, limited by the dense
/// inner solves on large ones.
pub fn rsolve_ppi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    rppi(
        &SaRobustBellman::with_policy(mdp, nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Pi,
        progress,
    )
}

/// Robust partial policy iteration with a modified-policy-iteration inner
/// solver. Converges, and scales to larger state spaces than
/// [`rsolve_ppi`].
pub fn rsolve_mppi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    rppi(
        &SaRobustBellman::with_policy(mdp, nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Mpi,
        progress,
    )
}

/// Robust partial policy iteration with a value-iteration inner solver.
/// Converges; scales best, usually slower than [`rsolve_mppi`].
pub fn rsolve_vppi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    rppi(
        &SaRobustBellman::with_policy(mdp, nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Vi,
        progress,
    )
}

// ----------------------------------------------------------------------------
// --- ROBUST S-RECTANGULAR MDP -----------------------------------------------
// ----------------------------------------------------------------------------

/// Robust value iteration with an s-rectangular nature and a deterministic
/// partial policy (converted to one-hot randomized rules).
pub fn rsolve_s_vi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    let rpolicy = policy_det2rand(mdp, policy)?;
    vi_gs(&SRobustBellman::with_policy(mdp, nature, rpolicy), discount, valuefunction, spec, progress)
}

/// Robust value iteration with an s-rectangular nature and a randomized
/// partial policy.
pub fn rsolve_s_vi_r(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_rpolicy(mdp, rpolicy)?;
    vi_gs(&SRobustBellman::with_policy(mdp, nature, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust modified policy iteration with an s-rectangular nature (no
/// convergence proof on robust models).
pub fn rsolve_s_mpi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    let rpolicy = policy_det2rand(mdp, policy)?;
    mpi_jac(&SRobustBellman::with_policy(mdp, nature, rpolicy), discount, valuefunction, spec, progress)
}

/// Robust modified policy iteration with an s-rectangular nature and a
/// randomized partial policy (no convergence proof on robust models).
pub fn rsolve_s_mpi_r(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_rpolicy(mdp, rpolicy)?;
    mpi_jac(&SRobustBellman::with_policy(mdp, nature, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust policy iteration with an s-rectangular nature (no convergence
/// proof on robust models).
pub fn rsolve_s_pi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    let rpolicy = policy_det2rand(mdp, policy)?;
    pi(&SRobustBellman::with_policy(mdp, nature, rpolicy), discount, valuefunction, spec, progress)
}

/// Robust partial policy iteration with an s-rectangular nature and a
/// policy-iteration inner solver. Converges to the optimal robust value.
pub fn rsolve_s_ppi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    let rpolicy = policy_det2rand(mdp, policy)?;
    rppi(
        &SRobustBellman::with_policy(mdp, nature, rpolicy),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Pi,
        progress,
    )
}

/// Robust partial policy iteration with an s-rectangular nature and a
/// modified-policy-iteration inner solver.
pub fn rsolve_s_mppi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    let rpolicy = policy_det2rand(mdp, policy)?;
    rppi(
        &SRobustBellman::with_policy(mdp, nature, rpolicy),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Mpi,
        progress,
    )
}

/// Robust partial policy iteration with an s-rectangular nature and a
/// value-iteration inner solver.
pub fn rsolve_s_vppi(
    mdp: &Mdp,
    discount: Value,
    nature: &dyn SNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustSolution, Error> {
    mdp.check_model()?;
    check_policy(mdp, policy)?;
    let rpolicy = policy_det2rand(mdp, policy)?;
    rppi(
        &SRobustBellman::with_policy(mdp, nature, rpolicy),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Vi,
        progress,
    )
}

// ----------------------------------------------------------------------------
// --- MDPO (OUTCOME) VARIANTS ------------------------------------------------
// ----------------------------------------------------------------------------

fn strip_nature(solution: SaRobustSolution) -> DetermSolution {
    Solution {
        valuefunction: solution.valuefunction,
        policy: solution.policy,
        nature: solution.nature.iter().map(|_| ()).collect(),
        residual: solution.residual,
        iterations: solution.iterations,
        time: solution.time,
        status: solution.status,
    }
}

/// Value iteration on a model with outcomes, treating the outcomes as
/// averaging (weighted by their nominal distribution) rather than
/// adversarial. The nature's trivial choice is stripped from the solution.
pub fn solve_vi_o(
    mdpo: &Mdpo,
    discount: Value,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<DetermSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    let nature = Average;
    let solution = vi_gs(
        &SaRobustOutcomeBellman::with_policy(mdpo, &nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        progress,
    )?;
    Ok(strip_nature(solution))
}

/// Modified policy iteration on a model with outcomes, averaging the
/// outcomes.
pub fn solve_mpi_o(
    mdpo: &Mdpo,
    discount: Value,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<DetermSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    let nature = Average;
    let solution = mpi_jac(
        &SaRobustOutcomeBellman::with_policy(mdpo, &nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        progress,
    )?;
    Ok(strip_nature(solution))
}

/// Robust value iteration on a model with outcomes, with an
/// s,a-rectangular nature over each action's outcome distribution.
pub fn rsolve_vi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    vi_gs(&SaRobustOutcomeBellman::with_policy(mdpo, nature, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust modified policy iteration on a model with outcomes (no
/// convergence proof on robust models).
pub fn rsolve_mpi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    mpi_jac(&SaRobustOutcomeBellman::with_policy(mdpo, nature, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust policy iteration on a model with outcomes (no convergence proof
/// on robust models).
pub fn rsolve_pi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    pi(&SaRobustOutcomeBellman::with_policy(mdpo, nature, policy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust partial policy iteration on a model with outcomes, with a
/// policy-iteration inner solver. Converges to the optimal robust value.
pub fn rsolve_ppi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    rppi(
        &SaRobustOutcomeBellman::with_policy(mdpo, nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Pi,
        progress,
    )
}

/// Robust partial policy iteration on a model with outcomes, with a
/// modified-policy-iteration inner solver.
pub fn rsolve_mppi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SaNature,
    valuefunction: Vec<Value>,
    policy: &[ActionId],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SaRobustSolution, Error> {
    mdpo.check_model()?;
    check_policy(mdpo, policy)?;
    rppi(
        &SaRobustOutcomeBellman::with_policy(mdpo, nature, policy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Mpi,
        progress,
    )
}

/// Robust value iteration on a model with outcomes, with an s-rectangular
/// nature sharing one outcome distribution across the actions of a state.
pub fn rsolve_s_vi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SNatureOutcome,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustOutcomeSolution, Error> {
    mdpo.check_model()?;
    check_rpolicy(mdpo, rpolicy)?;
    vi_gs(&SRobustOutcomeBellman::with_policy(mdpo, nature, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust modified policy iteration on a model with outcomes and an
/// s-rectangular nature (no convergence proof on robust models).
pub fn rsolve_s_mpi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SNatureOutcome,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustOutcomeSolution, Error> {
    mdpo.check_model()?;
    check_rpolicy(mdpo, rpolicy)?;
    mpi_jac(&SRobustOutcomeBellman::with_policy(mdpo, nature, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust policy iteration on a model with outcomes and an s-rectangular
/// nature (no convergence proof on robust models).
pub fn rsolve_s_pi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SNatureOutcome,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustOutcomeSolution, Error> {
    mdpo.check_model()?;
    check_rpolicy(mdpo, rpolicy)?;
    pi(&SRobustOutcomeBellman::with_policy(mdpo, nature, rpolicy.to_vec()), discount, valuefunction, spec, progress)
}

/// Robust partial policy iteration on a model with outcomes and an
/// s-rectangular nature, with a policy-iteration inner solver.
pub fn rsolve_s_ppi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SNatureOutcome,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustOutcomeSolution, Error> {
    mdpo.check_model()?;
    check_rpolicy(mdpo, rpolicy)?;
    rppi(
        &SRobustOutcomeBellman::with_policy(mdpo, nature, rpolicy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Pi,
        progress,
    )
}

/// Robust partial policy iteration on a model with outcomes and an
/// s-rectangular nature, with a modified-policy-iteration inner solver.
pub fn rsolve_s_mppi_o(
    mdpo: &Mdpo,
    discount: Value,
    nature: &dyn SNatureOutcome,
    valuefunction: Vec<Value>,
    rpolicy: &[Vec<Value>],
    spec: &SolveSpec,
    progress: Progress,
) -> Result<SRobustOutcomeSolution, Error> {
    mdpo.check_model()?;
    check_rpolicy(mdpo, rpolicy)?;
    rppi(
        &SRobustOutcomeBellman::with_policy(mdpo, nature, rpolicy.to_vec()),
        discount,
        valuefunction,
        spec,
        1.0,
        discount * discount,
        MdpSolver::Mpi,
        progress,
    )
}

/// Solves the MDPO under the soft-robust static-uncertainty objective
/// (average value at risk blended with the expectation) through the QP
/// backend. See the `soft_robust` module for the formulation.
pub fn srsolve_avar_quad(
    backend: &dyn QpBackend,
    mdpo: &Mdpo,
    alpha: Value,
    beta: Value,
    gamma: Value,
    init_dist: &[Value],
    model_dist: &[Value],
) -> Result<RandStaticSolution, Error> {
    mdpo.check_model()?;
    soft_robust::srsolve_avar_quad(backend, mdpo, alpha, beta, gamma, init_dist, model_dist)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
