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

//! This module defines the external text representations of the models: the
//! csv sample format (one row per transition sample) and a json dump of the
//! full model. States, actions and outcomes are identified by 0-based ids;
//! duplicate rows aggregate exactly like repeated `add_sample` calls.
//!
//! An exported model and its re-import are slightly asymmetric on purpose:
//! zero-probability samples are never written, so an action whose targets
//! all had probability zero comes back as an invalid action. Importing with
//! the `force` flag keeps zero-probability rows and is the escape hatch for
//! a byte-faithful round trip.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::common::Value;
use crate::errors::{Error, ModelError};
use crate::model::mdp::{
    add_transition, add_transition_force, add_transition_outcome, add_transition_outcome_force,
    Mdp, Mdpo,
};

/// One sample row of the plain MDP csv format.
#[derive(Debug, Serialize, Deserialize)]
struct MdpRow {
    idstatefrom: usize,
    idaction: usize,
    idstateto: usize,
    probability: Value,
    reward: Value,
}

/// One sample row of the MDPO csv format (the outcome id sits between the
/// action and the target state).
#[derive(Debug, Serialize, Deserialize)]
struct MdpoRow {
    idstatefrom: usize,
    idaction: usize,
    idoutcome: usize,
    idstateto: usize,
    probability: Value,
    reward: Value,
}

// ----------------------------------------------------------------------------
// --- MDP CSV ----------------------------------------------------------------
// ----------------------------------------------------------------------------

/// Loads a plain MDP from csv data with the header
/// `idstatefrom,idaction,idstateto,probability,reward`. Rows with a
/// non-positive probability are skipped unless `force` is set.
pub fn mdp_from_csv<R: Read>(input: R, force: bool) -> Result<Mdp, Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let mut mdp = Mdp::new();
    for row in reader.deserialize() {
        let row: MdpRow = row?;
        if force {
            add_transition_force(&mut mdp, row.idstatefrom, row.idaction, row.idstateto, row.probability, row.reward)?;
        } else {
            add_transition(&mut mdp, row.idstatefrom, row.idaction, row.idstateto, row.probability, row.reward)?;
        }
    }
    Ok(mdp)
}

/// Loads a plain MDP from a csv file. See [`mdp_from_csv`].
pub fn mdp_from_csv_file<P: AsRef<Path>>(path: P, force: bool) -> Result<Mdp, Error> {
    mdp_from_csv(File::open(path)?, force)
}

/// Writes a plain MDP as csv. Zero-probability samples are omitted, so an
/// export/import round trip can mark some actions invalid (see the module
/// documentation).
pub fn mdp_to_csv<W: Write>(mdp: &Mdp, output: W) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(output);
    for (sid, state) in mdp.states().iter().enumerate() {
        for (aid, transition) in state.actions().iter().enumerate() {
            for k in 0..transition.len() {
                if transition.probabilities()[k] == 0.0 {
                    continue;
                }
                writer.serialize(MdpRow {
                    idstatefrom: sid,
                    idaction: aid,
                    idstateto: transition.indices()[k],
                    probability: transition.probabilities()[k],
                    reward: transition.rewards()[k],
                })?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes a plain MDP to a csv file. See [`mdp_to_csv`].
pub fn mdp_to_csv_file<P: AsRef<Path>>(mdp: &Mdp, path: P) -> Result<(), Error> {
    mdp_to_csv(mdp, File::create(path)?)
}

// ----------------------------------------------------------------------------
// --- MDPO CSV ---------------------------------------------------------------
// ----------------------------------------------------------------------------

/// Loads an MDP with outcomes from csv data with the header
/// `idstatefrom,idaction,idoutcome,idstateto,probability,reward`. The
/// outcomes of every action must come out contiguous and 0-based; a gap is
/// reported as a model error.
pub fn mdpo_from_csv<R: Read>(input: R, force: bool) -> Result<Mdpo, Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let mut mdpo = Mdpo::new();
    for row in reader.deserialize() {
        let row: MdpoRow = row?;
        if force {
            add_transition_outcome_force(&mut mdpo, row.idstatefrom, row.idaction, row.idoutcome, row.idstateto, row.probability, row.reward)?;
        } else {
            add_transition_outcome(&mut mdpo, row.idstatefrom, row.idaction, row.idoutcome, row.idstateto, row.probability, row.reward)?;
        }
    }
    // a gap in the outcome ids would leave an empty outcome behind
    for (sid, state) in mdpo.states().iter().enumerate() {
        for (aid, action) in state.actions().iter().enumerate() {
            for (oid, outcome) in action.outcomes().iter().enumerate() {
                if outcome.is_empty() {
                    return Err(ModelError::new("outcome ids are not contiguous")
                        .for_state(sid)
                        .for_action(aid)
                        .for_outcome(oid)
                        .into());
                }
            }
        }
    }
    Ok(mdpo)
}

/// Loads an MDP with outcomes from a csv file. See [`mdpo_from_csv`].
pub fn mdpo_from_csv_file<P: AsRef<Path>>(path: P, force: bool) -> Result<Mdpo, Error> {
    mdpo_from_csv(File::open(path)?, force)
}

/// Writes an MDP with outcomes as csv. The nominal outcome distributions are
/// not part of the format and are lost on export.
pub fn mdpo_to_csv<W: Write>(mdpo: &Mdpo, output: W) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(output);
    for (sid, state) in mdpo.states().iter().enumerate() {
        for (aid, action) in state.actions().iter().enumerate() {
            for (oid, transition) in action.outcomes().iter().enumerate() {
                for k in 0..transition.len() {
                    if transition.probabilities()[k] == 0.0 {
                        continue;
                    }
                    writer.serialize(MdpoRow {
                        idstatefrom: sid,
                        idaction: aid,
                        idoutcome: oid,
                        idstateto: transition.indices()[k],
                        probability: transition.probabilities()[k],
                        reward: transition.rewards()[k],
                    })?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes an MDP with outcomes to a csv file. See [`mdpo_to_csv`].
pub fn mdpo_to_csv_file<P: AsRef<Path>>(mdpo: &Mdpo, path: P) -> Result<(), Error> {
    mdpo_to_csv(mdpo, File::create(path)?)
}

// ----------------------------------------------------------------------------
// --- JSON -------------------------------------------------------------------
// ----------------------------------------------------------------------------

/// A json dump of a plain MDP: one entry per state, each action represented
/// as a single outcome (outcome id 0).
pub fn mdp_to_json(mdp: &Mdp) -> serde_json::Value {
    let states: Vec<serde_json::Value> = mdp
        .states()
        .iter()
        .enumerate()
        .map(|(sid, state)| {
            let actions: Vec<serde_json::Value> = state
                .actions()
                .iter()
                .enumerate()
                .map(|(aid, t)| json!({ "actionid": aid, "outcomes": [t.to_json(0)] }))
                .collect();
            json!({ "stateid": sid, "actions": actions })
        })
        .collect();
    json!(states)
}

/// A json dump of an MDP with outcomes: one entry per state, one entry per
/// action, one entry per outcome.
pub fn mdpo_to_json(mdpo: &Mdpo) -> serde_json::Value {
    let states: Vec<serde_json::Value> = mdpo
        .states()
        .iter()
        .enumerate()
        .map(|(sid, state)| {
            let actions: Vec<serde_json::Value> = state
                .actions()
                .iter()
                .enumerate()
                .map(|(aid, a)| a.to_json(aid as isize))
                .collect();
            json!({ "stateid": sid, "actions": actions })
        })
        .collect();
    json!(states)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_mdp_csv {
    use crate::model::io::{mdp_from_csv, mdp_to_csv};
    use crate::model::mdp::{add_transition, Mdp};

    const SAMPLE: &str = "\
idstatefrom,idaction,idstateto,probability,reward
0,0,1,1.0,2.0
1,0,0,0.4,0.0
1,0,1,0.6,1.0
";

    #[test]
    fn import_builds_the_sampled_model() {
        let mdp = mdp_from_csv(SAMPLE.as_bytes(), false).unwrap();
        assert_eq!(2, mdp.state_count());
        assert_eq!(1.0, mdp.state(0).action(0).probability_to(1));
        assert_eq!(0.4, mdp.state(1).action(0).probability_to(0));
        assert!(mdp.check_model().is_ok());
    }

    #[test]
    fn duplicate_rows_aggregate() {
        let csv = "\
idstatefrom,idaction,idstateto,probability,reward
0,0,1,0.5,0.0
0,0,1,0.5,2.0
";
        let mdp = mdp_from_csv(csv.as_bytes(), false).unwrap();
        let t = mdp.state(0).action(0);
        assert!((t.probability_to(1) - 1.0).abs() < 1e-12);
        assert!((t.rewards()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_probability_rows_are_skipped_unless_forced() {
        let csv = "\
idstatefrom,idaction,idstateto,probability,reward
0,0,1,0.0,5.0
0,0,2,1.0,0.0
";
        let mdp = mdp_from_csv(csv.as_bytes(), false).unwrap();
        assert_eq!(1, mdp.state(0).action(0).len());

        let forced = mdp_from_csv(csv.as_bytes(), true).unwrap();
        assert_eq!(2, forced.state(0).action(0).len());
    }

    #[test]
    fn export_then_import_restores_the_model() {
        let mdp = mdp_from_csv(SAMPLE.as_bytes(), false).unwrap();
        let mut buffer = Vec::new();
        mdp_to_csv(&mdp, &mut buffer).unwrap();
        let back = mdp_from_csv(buffer.as_slice(), false).unwrap();
        assert_eq!(mdp, back);
    }

    #[test]
    fn export_omits_zero_probability_samples() {
        let mut mdp = Mdp::new();
        add_transition(&mut mdp, 0, 0, 0, 1.0, 0.0).unwrap();
        mdp.create_state(0).create_action(0).add_sample_force(1, 0.0, 0.0).unwrap();
        let mut buffer = Vec::new();
        mdp_to_csv(&mdp, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(2, text.lines().count()); // header + the single positive sample
    }
}

#[cfg(test)]
mod test_mdpo_csv {
    use crate::errors::Error;
    use crate::model::io::{mdpo_from_csv, mdpo_to_csv};

    const SAMPLE: &str = "\
idstatefrom,idaction,idoutcome,idstateto,probability,reward
0,0,0,0,1.0,1.0
0,0,1,1,1.0,2.0
1,0,0,1,1.0,0.0
1,0,1,1,1.0,0.0
";

    #[test]
    fn import_builds_the_outcomes() {
        let mdpo = mdpo_from_csv(SAMPLE.as_bytes(), false).unwrap();
        assert_eq!(2, mdpo.state_count());
        assert_eq!(2, mdpo.state(0).action(0).outcome_count());
        assert_eq!(1.0, mdpo.state(0).action(0).outcome(1).probability_to(1));
    }

    #[test]
    fn a_gap_in_outcome_ids_is_a_model_error() {
        let csv = "\
idstatefrom,idaction,idoutcome,idstateto,probability,reward
0,0,0,0,1.0,0.0
0,0,2,0,1.0,0.0
";
        match mdpo_from_csv(csv.as_bytes(), false) {
            Err(Error::Model(e)) => {
                assert_eq!(0, e.state);
                assert_eq!(0, e.action);
                assert_eq!(1, e.outcome);
            }
            other => panic!("expected a model error, got {other:?}"),
        }
    }

    #[test]
    fn export_then_import_restores_the_model() {
        let mdpo = mdpo_from_csv(SAMPLE.as_bytes(), false).unwrap();
        let mut buffer = Vec::new();
        mdpo_to_csv(&mdpo, &mut buffer).unwrap();
        let back = mdpo_from_csv(buffer.as_slice(), false).unwrap();
        assert_eq!(mdpo, back);
    }
}
