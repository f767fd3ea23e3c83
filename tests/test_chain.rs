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

//! End to end scenarios on small hand-checked models: the three state
//! chain, its robust counterpart, and the terminal-state semantics.

use rmdp::*;

/// The three state chain: action 1 moves right toward the absorbing state
/// that pays 1.1 per step; action 0 moves back left, collecting 1 on the
/// way.
fn chain() -> Mdp {
    let mut mdp = Mdp::new();
    add_transition(&mut mdp, 0, 1, 1, 1.0, 0.0).unwrap();
    add_transition(&mut mdp, 1, 1, 2, 1.0, 0.0).unwrap();
    add_transition(&mut mdp, 2, 1, 2, 1.0, 1.1).unwrap();
    add_transition(&mut mdp, 0, 0, 0, 1.0, 0.0).unwrap();
    add_transition(&mut mdp, 1, 0, 0, 1.0, 1.0).unwrap();
    add_transition(&mut mdp, 2, 0, 1, 1.0, 1.0).unwrap();
    mdp
}

#[test]
fn value_iteration_on_the_chain_finds_the_known_solution() {
    let mdp = chain();
    let spec = SolveSpecBuilder::default().maxresidual(1e-4).build().unwrap();
    let solution = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();

    assert_eq!(Status::Ok, solution.status);
    assert_eq!(vec![1, 1, 1], solution.policy);
    assert!((solution.valuefunction[0] - 8.91).abs() < 1e-2);
    assert!((solution.valuefunction[1] - 9.90).abs() < 1e-2);
    assert!((solution.valuefunction[2] - 11.00).abs() < 1e-2);
}

#[test]
fn all_solvers_agree_with_each_other_on_the_chain() {
    let mdp = chain();
    let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
    let by_vi = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    let by_mpi = solve_mpi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    let by_pi = solve_pi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    for s in 0..3 {
        assert!((by_vi.valuefunction[s] - by_mpi.valuefunction[s]).abs() < 1e-4);
        assert!((by_vi.valuefunction[s] - by_pi.valuefunction[s]).abs() < 1e-4);
    }
    assert_eq!(by_vi.policy, by_mpi.policy);
    assert_eq!(by_vi.policy, by_pi.policy);
}

#[test]
fn a_terminal_state_has_value_zero_and_no_action() {
    let mut mdp = Mdp::new();
    add_transition(&mut mdp, 0, 0, 1, 1.0, 5.0).unwrap();
    let spec = SolveSpec::default();
    let solution = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();

    assert_eq!(Status::Ok, solution.status);
    assert_eq!(0.0, solution.valuefunction[1]);
    assert_eq!(-1, solution.policy[1]);
    assert!((solution.valuefunction[0] - 5.0).abs() < 1e-3);
}

#[test]
fn the_l1_nature_shifts_up_to_half_the_budget_onto_the_worst_successor() {
    // a state whose single action reaches a good and a bad successor with
    // equal probability
    let mut mdp = Mdp::new();
    add_transition(&mut mdp, 0, 0, 1, 0.5, 0.0).unwrap();
    add_transition(&mut mdp, 0, 0, 2, 0.5, 0.0).unwrap();
    add_transition(&mut mdp, 1, 0, 1, 1.0, 0.0).unwrap();
    add_transition(&mut mdp, 2, 0, 2, 1.0, 1.0).unwrap();

    let nature = RobustL1 { budget: 0.5 };
    let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
    let solution = rsolve_vi(&mdp, 0.9, &nature, vec![], &[], &spec, None).unwrap();
    assert_eq!(Status::Ok, solution.status);

    // a quarter of the mass (half the budget) moved to the bad successor
    assert!((solution.nature[0][0] - 0.75).abs() < 1e-6);
    assert!((solution.nature[0][1] - 0.25).abs() < 1e-6);

    // and the robust value is below the nominal one
    let nominal = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    assert!(solution.valuefunction[0] < nominal.valuefunction[0]);
}

#[test]
fn degenerate_transitions_leave_nature_without_leverage() {
    // every transition of the chain is deterministic: the l1 ball around a
    // point mass contains only that point mass
    let mdp = chain();
    let nature = RobustL1 { budget: 0.5 };
    let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
    let robust = rsolve_vi(&mdp, 0.9, &nature, vec![], &[], &spec, None).unwrap();
    let plain = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    assert_eq!(plain.policy, robust.policy);
    for s in 0..3 {
        assert!((plain.valuefunction[s] - robust.valuefunction[s]).abs() < 1e-6);
    }
}

#[test]
fn rppi_converges_on_the_robust_chain_within_thirty_iterations() {
    let mdp = chain();
    let nature = RobustL1 { budget: 0.1 };
    let spec = SolveSpecBuilder::default().iterations(30).maxresidual(1e-4).build().unwrap();
    let solution = rsolve_mppi(&mdp, 0.9, &nature, vec![], &[], &spec, None).unwrap();

    assert_eq!(Status::Ok, solution.status);
    assert!(solution.iterations <= 30);
    assert!(solution.residual < 1e-4);
}

#[test]
fn rppi_and_robust_vi_agree_on_an_uncertain_model() {
    let mut mdp = Mdp::new();
    add_transition(&mut mdp, 0, 0, 1, 0.5, 0.0).unwrap();
    add_transition(&mut mdp, 0, 0, 2, 0.5, 0.0).unwrap();
    add_transition(&mut mdp, 0, 1, 1, 0.9, 0.2).unwrap();
    add_transition(&mut mdp, 0, 1, 2, 0.1, 0.2).unwrap();
    add_transition(&mut mdp, 1, 0, 1, 1.0, 0.1).unwrap();
    add_transition(&mut mdp, 2, 0, 2, 1.0, 1.0).unwrap();

    let nature = RobustL1 { budget: 0.2 };
    let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
    let by_vi = rsolve_vi(&mdp, 0.9, &nature, vec![], &[], &spec, None).unwrap();
    let by_ppi = rsolve_ppi(&mdp, 0.9, &nature, vec![], &[], &spec, None).unwrap();

    assert_eq!(by_vi.policy, by_ppi.policy);
    for s in 0..3 {
        assert!((by_vi.valuefunction[s] - by_ppi.valuefunction[s]).abs() < 1e-4);
    }
}

#[test]
fn the_partial_policy_surface_pins_states_down() {
    let mdp = chain();
    let spec = SolveSpecBuilder::default().maxresidual(1e-6).build().unwrap();
    // pin state 1 to the left move, optimize the rest
    let solution = solve_vi(&mdp, 0.9, vec![], &[-1, 0, -1], &spec, None).unwrap();
    assert_eq!(vec![1, 0, 1], solution.policy);
    // pinning a state can only hurt the value
    let free = solve_vi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    assert!(solution.valuefunction[1] < free.valuefunction[1]);
}
