// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: flow construction through Metropolis sampling.
//!
//! These exercise the public API across module boundaries: configuration →
//! model building → chain → statistics, with the exact free flow as the
//! analytically controlled reference point.

use latticeflow::config::{FlowSpec, RunConfig};
use latticeflow::flow::FlowLayer;
use latticeflow::lattice::FieldBatch;
use latticeflow::model::{ess_per_sample, log_weight_stats};
use latticeflow::sampler::run_metropolis;
use latticeflow::tolerances;

fn free_config(l: usize, m_sq: f64, n_samples: usize) -> RunConfig {
    RunConfig {
        label: format!("it_L{l}_m{m_sq}"),
        lattice_length: l,
        m_sq,
        lambda: 0.0,
        n_samples,
        n_thermalization: 100,
        seed: 42,
        flow: FlowSpec::default(),
    }
}

#[test]
fn exact_free_flow_end_to_end() {
    let config = free_config(8, 1.0, 500);
    let model = config.build_model().expect("free model builds");
    let run = run_metropolis(&model, &config.sampler_config(false));

    assert!(
        run.acceptance_rate > tolerances::EXACT_FLOW_RATE,
        "exact flow must accept everything, got {}",
        run.acceptance_rate
    );
    assert_eq!(run.longest_rejection_run, 0);
    assert!(run.ess_per_sample > tolerances::EXACT_FLOW_RATE);
    assert!(
        run.var_log_weight < tolerances::EXACT_FLOW_LOGW_VARIANCE,
        "constant log-weights expected, var = {}",
        run.var_log_weight
    );
}

#[test]
fn stencil_model_round_trips_through_flow() {
    let config = RunConfig {
        label: "stencil".into(),
        lattice_length: 6,
        m_sq: 1.0,
        lambda: 0.5,
        n_samples: 10,
        n_thermalization: 0,
        seed: 13,
        flow: FlowSpec {
            n_blocks: 2,
            radius: 1,
            hidden: vec![8],
        },
    };
    let model = config.build_model().expect("interacting model builds");
    let mut seed = 21u64;
    let (mut fields, _) = model.sample_base(4, &mut seed);
    let orig = fields.data.clone();
    let ldj_f = model.flow_forward(&mut fields);
    let ldj_i = model.flow_inverse(&mut fields);
    for (got, want) in fields.data.iter().zip(orig.iter()) {
        assert!(
            (got - want).abs() < tolerances::EXACT_F64,
            "flow round trip must restore the base draw"
        );
    }
    for (f, i) in ldj_f.iter().zip(ldj_i.iter()) {
        assert!((f + i).abs() < tolerances::EXACT_F64, "ldj must cancel");
    }
}

#[test]
fn identity_initialized_model_matches_reweighting() {
    // A fresh stencil flow is the identity, so its log-weights must equal
    // S_z − S(φ = z) sample by sample.
    let config = RunConfig {
        label: "identity".into(),
        lattice_length: 4,
        m_sq: 2.0,
        lambda: 0.25,
        n_samples: 10,
        n_thermalization: 0,
        seed: 5,
        flow: FlowSpec::default(),
    };
    let model = config.build_model().expect("model builds");
    let mut seed = 9u64;
    let sample = model.sample(16, &mut seed);
    for i in 0..16 {
        let z = sample.fields.sample(i);
        let s_z: f64 = 0.5 * z.iter().map(|v| v * v).sum::<f64>();
        let expected = s_z - model.target.action(z);
        assert!(
            (sample.log_weights[i] - expected).abs() < tolerances::EXACT_F64,
            "identity-initialized flow: log w = S_z − S(z)"
        );
    }
}

#[test]
fn chains_reproduce_across_processes() {
    // Same config twice: bit-identical chains and statistics.
    let config = free_config(4, 0.5, 200);
    let model_a = config.build_model().expect("builds");
    let model_b = config.build_model().expect("builds");
    let run_a = run_metropolis(&model_a, &config.sampler_config(false));
    let run_b = run_metropolis(&model_b, &config.sampler_config(false));
    assert_eq!(run_a.samples.data, run_b.samples.data);
    assert!((run_a.mean_log_weight - run_b.mean_log_weight).abs() < f64::EPSILON);
}

#[test]
fn reweighting_quality_degrades_away_from_exactness() {
    // The exact flow has ESS/N = 1; the identity flow against the same
    // target has strictly worse weights. Ordering must be strict and
    // reproducible.
    let config = free_config(4, 1.0, 10);
    let exact = config.build_model().expect("exact model");

    let identity_config = RunConfig {
        lambda: 0.25, // forces the stencil (identity-initialized) flow
        ..free_config(4, 1.0, 10)
    };
    let identity = identity_config.build_model().expect("stencil model");

    let mut seed_a = 3u64;
    let mut seed_b = 3u64;
    let ess_exact = ess_per_sample(&exact.sample(256, &mut seed_a).log_weights);
    let ess_identity = ess_per_sample(&identity.sample(256, &mut seed_b).log_weights);
    assert!(
        ess_exact > ess_identity,
        "exact flow ({ess_exact}) must beat the identity flow ({ess_identity})"
    );
}

#[test]
fn flow_batches_are_batch_size_independent() {
    // Applying the flow to a stacked batch must equal applying it to each
    // configuration separately.
    let config = free_config(4, 1.0, 10);
    let model = config.build_model().expect("builds");

    let mut seed = 77u64;
    let (z_batch, _) = model.sample_base(3, &mut seed);

    let mut stacked = z_batch.clone();
    let ldj_stacked = model.flow_forward(&mut stacked);

    for b in 0..3 {
        let mut single = FieldBatch {
            lattice: z_batch.lattice,
            batch: 1,
            data: z_batch.sample(b).to_vec(),
        };
        let ldj_single = model.flow_forward(&mut single);
        assert_eq!(single.data.as_slice(), stacked.sample(b), "sample {b} differs");
        assert!((ldj_single[0] - ldj_stacked[b]).abs() < f64::EPSILON);
    }
}

#[test]
fn log_weight_stats_track_flow_quality() {
    let config = free_config(4, 4.0, 10);
    let exact = config.build_model().expect("builds");
    let mut seed = 31u64;
    let sample = exact.sample(128, &mut seed);
    let (mean, var) = log_weight_stats(&sample.log_weights);
    assert!(mean.is_finite());
    assert!(var < tolerances::EXACT_FLOW_LOGW_VARIANCE);
}
