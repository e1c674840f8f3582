// SPDX-License-Identifier: AGPL-3.0-only

//! Free-theory flow validation against analytic baselines.
//!
//! Builds the exact normalizing flow for the free scalar theory (the
//! triangular Cholesky factor of the free covariance) and checks every
//! identity the construction implies:
//!
//!   - K·Σ = 1 and L Lᵀ = Σ (linear algebra)
//!   - χ = 1/m², ξ = 1/m, m_pole = 2 asinh(m/2) on the exact correlator
//!   - constant log-weights, unit ESS, unit Metropolis acceptance
//!   - sampled observables within statistical tolerance of the same values
//!
//! **Provenance**: all expected values are analytic identities of the free
//! lattice theory; see `provenance::ALL_BASELINES`.

use latticeflow::action::Phi4Action;
use latticeflow::config::{FlowSpec, RunConfig};
use latticeflow::flow::FlowLayer;
use latticeflow::lattice::{FieldBatch, Lattice2d};
use latticeflow::linalg::cholesky;
use latticeflow::model::log_weight_stats;
use latticeflow::observables::{
    bootstrap_two_point, integrated_autocorrelation_time, one_point, replica_mean_std,
    TwoPointObservables,
};
use latticeflow::provenance::ALL_BASELINES;
use latticeflow::sampler::run_metropolis;
use latticeflow::tolerances;
use latticeflow::validation::CheckHarness;

const LATTICE_LENGTH: usize = 8;
const M_SQ: f64 = 1.0;
const N_SAMPLES: usize = 2000;
const N_BOOTSTRAP: usize = 32;

fn main() {
    println!("═══════════════════════════════════════════════════════════");
    println!(" Free scalar flow validation — L={LATTICE_LENGTH}, m²={M_SQ}");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Analytic baselines:");
    for b in ALL_BASELINES {
        println!("  - {}: {} [doi:{}]", b.label, b.identity, b.doi);
    }
    println!();

    let mut harness = CheckHarness::new("validate_free_flow");
    let lat = Lattice2d::square(LATTICE_LENGTH);
    let vol = lat.volume();
    let target = Phi4Action::free(M_SQ, lat);

    // ── Covariance identities ────────────────────────────────────────
    println!("[1/4] Free covariance and factorization");
    let sigma = match target.free_covariance() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    let mut max_ks_dev = 0.0f64;
    for j in 0..vol {
        let col: Vec<f64> = (0..vol).map(|i| sigma[i * vol + j]).collect();
        let k_col = target.apply_kinetic(&col);
        for (i, v) in k_col.iter().enumerate() {
            let expected = f64::from(u8::from(i == j));
            max_ks_dev = max_ks_dev.max((v - expected).abs());
        }
    }
    harness.check_upper("K·Σ = 1 (max deviation)", max_ks_dev, tolerances::ACCUMULATED_F64);

    let l_factor = match cholesky(&sigma, vol) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("FATAL: covariance not SPD: {e}");
            std::process::exit(1);
        }
    };
    let mut max_llt_dev = 0.0f64;
    for i in 0..vol {
        for j in 0..vol {
            let mut s = 0.0;
            for k in 0..vol {
                s += l_factor[i * vol + k] * l_factor[j * vol + k];
            }
            max_llt_dev = max_llt_dev.max((s - sigma[i * vol + j]).abs());
        }
    }
    harness.check_upper("L·Lᵀ = Σ (max deviation)", max_llt_dev, tolerances::ACCUMULATED_F64);

    // ── Exact-correlator observables ─────────────────────────────────
    println!("[2/4] Exact correlator observables");
    let g_exact = target.free_correlator().expect("m_sq > 0 checked above");
    let exact_obs = TwoPointObservables::from_correlator(g_exact, lat.dims);

    harness.check_abs(
        "χ = 1/m² (exact correlator)",
        exact_obs.susceptibility(),
        1.0 / M_SQ,
        tolerances::ACCUMULATED_F64,
    );
    harness.check_abs(
        "ξ = 1/m (exact correlator)",
        exact_obs.correlation_length(),
        1.0 / M_SQ.sqrt(),
        tolerances::FINITE_DIFFERENCE,
    );
    let m_pole_expected = 2.0 * (M_SQ.sqrt() / 2.0).asinh();
    let max_pole_dev = exact_obs
        .effective_pole_mass()
        .iter()
        .map(|m| (m - m_pole_expected).abs())
        .fold(0.0f64, f64::max);
    harness.check_upper(
        "m_pole = 2 asinh(m/2) (max deviation)",
        max_pole_dev,
        tolerances::ACCUMULATED_F64,
    );

    // ── Flow identities ──────────────────────────────────────────────
    println!("[3/4] Flow identities");
    let run_cfg = RunConfig {
        label: "validate".into(),
        lattice_length: LATTICE_LENGTH,
        m_sq: M_SQ,
        lambda: 0.0,
        n_samples: N_SAMPLES,
        n_thermalization: 200,
        seed: 42,
        flow: FlowSpec::default(),
    };

    // A freshly built stencil flow has a zero conditioner head: identity.
    let stencil = run_cfg.build_stencil_flow();
    let mut probe_seed = 7u64;
    let mut probe = FieldBatch::gaussian(lat, 4, &mut probe_seed);
    let orig = probe.data.clone();
    let mut ldj = vec![0.0; 4];
    stencil.forward(&mut probe, &mut ldj);
    let max_id_dev = probe
        .data
        .iter()
        .zip(orig.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f64, f64::max);
    harness.check_upper("fresh stencil flow is identity", max_id_dev, tolerances::EXACT_F64);

    let model = run_cfg.build_model().expect("free model builds");
    let mut w_seed = 11u64;
    let weighted = model.sample(512, &mut w_seed);
    let (_, var_log_w) = log_weight_stats(&weighted.log_weights);
    harness.check_upper(
        "exact flow log-weight variance",
        var_log_w,
        tolerances::EXACT_FLOW_LOGW_VARIANCE,
    );
    harness.check_lower(
        "exact flow ESS/N",
        latticeflow::model::ess_per_sample(&weighted.log_weights),
        tolerances::EXACT_FLOW_RATE,
    );

    // ── Metropolis chain and sampled observables ─────────────────────
    println!("[4/4] Metropolis chain ({N_SAMPLES} samples)");
    let run = run_metropolis(&model, &run_cfg.sampler_config(false));
    harness.check_lower("Metropolis acceptance", run.acceptance_rate, tolerances::EXACT_FLOW_RATE);
    harness.check_upper(
        "longest rejection run",
        run.longest_rejection_run as f64,
        1.0,
    );

    let sampled_obs = TwoPointObservables::from_samples(&run.samples);
    let mut boot_seed = 99u64;
    let replicas = bootstrap_two_point(&run.samples, N_BOOTSTRAP, &mut boot_seed);
    let chis: Vec<f64> = replicas
        .iter()
        .map(TwoPointObservables::susceptibility)
        .collect();
    let (_, chi_err) = replica_mean_std(&chis);
    harness.check_sigma(
        "sampled χ vs 1/m²",
        sampled_obs.susceptibility(),
        1.0 / M_SQ,
        chi_err.max(0.01),
        6.0,
    );
    harness.check_abs(
        "sampled ξ vs 1/m",
        sampled_obs.correlation_length(),
        1.0 / M_SQ.sqrt(),
        tolerances::STATISTICAL_XI,
    );

    let phi_sq = one_point(&run.samples, |phi| {
        phi.iter().map(|v| v * v).sum::<f64>() / phi.len() as f64
    });
    let tau = integrated_autocorrelation_time(&phi_sq);
    harness.check_abs(
        "τ_int(φ²) of an accepted-everywhere chain",
        tau,
        tolerances::TAU_INT_IID,
        tolerances::STATISTICAL_TAU_INT,
    );

    harness.finish();
}
