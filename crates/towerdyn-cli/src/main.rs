use std::process::ExitCode;

use chrono::Utc;

use towerdyn_model::ModelConfig;
use towerdyn_solver::{EigenvalueAnalysis, StructureModel};

fn usage() {
    eprintln!("usage: towerdyn analyze <config.json> [--modes N] [--json <report.json>]");
}

struct Options {
    config_path: String,
    considered_modes: usize,
    json_path: Option<String>,
}

fn parse_args(args: &[String]) -> Option<Options> {
    if args.len() < 3 || args[1] != "analyze" {
        return None;
    }
    let mut options = Options {
        config_path: args[2].clone(),
        considered_modes: 10,
        json_path: None,
    };
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--modes" => {
                options.considered_modes = args.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "--json" => {
                options.json_path = Some(args.get(i + 1)?.clone());
                i += 2;
            }
            _ => return None,
        }
    }
    Some(options)
}

fn run(options: &Options) -> Result<(), towerdyn_model::ModelError> {
    let config = ModelConfig::from_path(&options.config_path)?;
    let mut model = StructureModel::from_config(&config)?;

    println!("towerdyn analysis report ({})", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("model: {}", model.name);
    println!("domain: {}", model.domain.name());
    println!("support: {}", model.support.name());
    println!("elements: {}", model.parameters.n_el);
    println!(
        "DOFs: {} total, {} free",
        model.n_full_dofs(),
        model.n_reduced_dofs()
    );
    println!("total mass: {:.3} kg", model.total_mass());

    let report = EigenvalueAnalysis::new(&mut model, options.considered_modes).solve()?;

    println!();
    println!("natural frequencies (first {} modes):", report.considered_modes);
    for (i, frequency) in report
        .frequencies_hz
        .iter()
        .take(report.considered_modes)
        .enumerate()
    {
        println!("  mode {:>3}: {:>10.4} Hz", i + 1, frequency);
    }

    println!();
    println!("mode categories:");
    for (category, mode_ids) in &report.mode_categories {
        let ids: Vec<String> = mode_ids.iter().map(|id| id.to_string()).collect();
        println!("  {:>12}: {}", category, ids.join(", "));
    }

    if let Some(path) = &options.json_path {
        let text = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, text)?;
        println!();
        println!("report written to {path}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let Some(options) = parse_args(&args) else {
        usage();
        return ExitCode::from(2);
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}
