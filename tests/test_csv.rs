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

//! Round trip scenarios through the csv representation: exporting a model
//! and importing it back must not change what the solvers compute.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rmdp::*;

/// A randomized model with the given number of states and actions: every
/// action reaches two distinct states with normalized probabilities and a
/// random reward.
fn random_mdp(nstates: usize, nactions: usize, seed: u64) -> Mdp {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mdp = Mdp::new();
    for s in 0..nstates {
        for a in 0..nactions {
            let first = rng.gen_range(0..nstates);
            let second = (first + 1 + rng.gen_range(0..nstates - 1)) % nstates;
            let split = rng.gen_range(0.05..0.95);
            let reward = rng.gen_range(-1.0..1.0);
            add_transition(&mut mdp, s, a, first, split, reward).unwrap();
            add_transition(&mut mdp, s, a, second, 1.0 - split, reward).unwrap();
        }
    }
    mdp
}

#[test]
fn a_random_model_round_trips_through_csv() {
    let mdp = random_mdp(5, 2, 42);
    assert!(mdp.check_model().is_ok());

    let mut buffer = Vec::new();
    mdp_to_csv(&mdp, &mut buffer).unwrap();
    let back = mdp_from_csv(buffer.as_slice(), false).unwrap();

    let spec = SolveSpecBuilder::default().maxresidual(1e-9).build().unwrap();
    let original = solve_mpi(&mdp, 0.9, vec![], &[], &spec, None).unwrap();
    let reloaded = solve_mpi(&back, 0.9, vec![], &[], &spec, None).unwrap();

    assert_eq!(original.policy, reloaded.policy);
    for s in 0..5 {
        assert!((original.valuefunction[s] - reloaded.valuefunction[s]).abs() < 1e-6);
    }
}

#[test]
fn several_seeds_round_trip_as_well() {
    for seed in [1, 7, 1234] {
        let mdp = random_mdp(6, 3, seed);
        let mut buffer = Vec::new();
        mdp_to_csv(&mdp, &mut buffer).unwrap();
        let back = mdp_from_csv(buffer.as_slice(), false).unwrap();
        assert_eq!(mdp, back, "seed {seed}");
    }
}

#[test]
fn an_mdpo_round_trips_with_its_outcomes() {
    let mut mdpo = Mdpo::new();
    add_transition_outcome(&mut mdpo, 0, 0, 0, 0, 0.5, 1.0).unwrap();
    add_transition_outcome(&mut mdpo, 0, 0, 0, 1, 0.5, 1.0).unwrap();
    add_transition_outcome(&mut mdpo, 0, 0, 1, 1, 1.0, -1.0).unwrap();
    add_transition_outcome(&mut mdpo, 1, 0, 0, 1, 1.0, 0.0).unwrap();
    add_transition_outcome(&mut mdpo, 1, 0, 1, 1, 1.0, 0.5).unwrap();

    let mut buffer = Vec::new();
    mdpo_to_csv(&mdpo, &mut buffer).unwrap();
    let back = mdpo_from_csv(buffer.as_slice(), false).unwrap();
    assert_eq!(mdpo, back);

    let spec = SolveSpecBuilder::default().maxresidual(1e-9).build().unwrap();
    let original = solve_vi_o(&mdpo, 0.9, vec![], &[], &spec, None).unwrap();
    let reloaded = solve_vi_o(&back, 0.9, vec![], &[], &spec, None).unwrap();
    assert_eq!(original.policy, reloaded.policy);
    for s in 0..2 {
        assert!((original.valuefunction[s] - reloaded.valuefunction[s]).abs() < 1e-6);
    }
}

#[test]
fn the_json_dump_mirrors_the_model() {
    let mdp = random_mdp(3, 2, 9);
    let js = mdp_to_json(&mdp);
    assert_eq!(3, js.as_array().unwrap().len());
    for (sid, state) in js.as_array().unwrap().iter().enumerate() {
        assert_eq!(sid, state["stateid"].as_u64().unwrap() as usize);
        assert_eq!(2, state["actions"].as_array().unwrap().len());
    }
}
