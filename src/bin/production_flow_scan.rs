// SPDX-License-Identifier: AGPL-3.0-only

//! Free-scalar scan: sample every case of the study matrix and write a
//! JSON report.
//!
//! Each case builds its flow model (exact Cholesky flow for λ = 0), runs
//! the Metropolis independence chain, measures the two-point suite with
//! bootstrap errors, and appends a record. Use `--lite` for the reduced
//! matrix and `--out=DIR` to choose the report directory.

use latticeflow::config::{free_scalar_cases, RunConfig};
use latticeflow::error::LatticeFlowError;
use latticeflow::observables::{
    bootstrap_two_point, integrated_autocorrelation_time, one_point, replica_mean_std,
    TwoPointObservables,
};
use latticeflow::report::{CaseRecord, ScanReport};
use latticeflow::sampler::run_metropolis;

const N_BOOTSTRAP: usize = 32;

fn parse_out_dir() -> String {
    std::env::args()
        .find(|a| a.starts_with("--out="))
        .map_or_else(|| "results".to_string(), |a| a[6..].to_string())
}

fn run_case(config: &RunConfig) -> Result<CaseRecord, LatticeFlowError> {
    config.validate()?;
    let model = config.build_model()?;
    let run = run_metropolis(&model, &config.sampler_config(false));

    let obs = TwoPointObservables::from_samples(&run.samples);
    let mut boot_seed = config.seed.wrapping_add(1);
    let replicas = bootstrap_two_point(&run.samples, N_BOOTSTRAP, &mut boot_seed);
    let chis: Vec<f64> = replicas
        .iter()
        .map(TwoPointObservables::susceptibility)
        .collect();
    let (_, chi_err) = replica_mean_std(&chis);

    let phi_sq = one_point(&run.samples, |phi| {
        phi.iter().map(|v| v * v).sum::<f64>() / phi.len() as f64
    });

    Ok(CaseRecord {
        label: config.label.clone(),
        lattice_length: config.lattice_length,
        m_sq: config.m_sq,
        lambda: config.lambda,
        n_samples: config.n_samples,
        acceptance_rate: run.acceptance_rate,
        ess_per_sample: run.ess_per_sample,
        mean_log_weight: run.mean_log_weight,
        var_log_weight: run.var_log_weight,
        susceptibility: obs.susceptibility(),
        susceptibility_err: chi_err,
        correlation_length: obs.correlation_length(),
        energy_density: obs.energy_density(),
        tau_int_phi_sq: integrated_autocorrelation_time(&phi_sq),
    })
}

fn main() {
    let lite = std::env::args().any(|a| a == "--lite");
    let out_dir = parse_out_dir();
    let cases = free_scalar_cases(lite);

    println!("═══════════════════════════════════════════════════════════");
    println!(
        " Free scalar flow scan — {} cases{}",
        cases.len(),
        if lite { " (lite)" } else { "" }
    );
    println!("═══════════════════════════════════════════════════════════");

    let mut report = ScanReport::new();
    let mut failed = false;

    for config in &cases {
        println!();
        println!(
            "  case {}: L={}, m²={}, n={}",
            config.label, config.lattice_length, config.m_sq, config.n_samples
        );
        match run_case(config) {
            Ok(record) => {
                println!(
                    "    acc={:.3}, ESS/N={:.3}, χ={:.4}±{:.4} (1/m²={:.4}), ξ={:.3}, τ_int={:.2}",
                    record.acceptance_rate,
                    record.ess_per_sample,
                    record.susceptibility,
                    record.susceptibility_err,
                    1.0 / record.m_sq,
                    record.correlation_length,
                    record.tau_int_phi_sq
                );
                report.add_case(record);
            }
            Err(e) => {
                eprintln!("    FAILED: {e}");
                failed = true;
            }
        }
    }

    println!();
    match report.save_json(&out_dir) {
        Ok(path) => println!("Report written to {path}"),
        Err(e) => {
            eprintln!("Report write failed: {e}");
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
}
