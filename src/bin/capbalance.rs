use anyhow::Result;
use capbalance::dataset::{load_config, load_units, write_units};
use capbalance::debug::{format_f64, format_f64_map};
use capbalance::{run_balance, BalanceResults, LogProgress, OptimizeOpt, RackId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Capacitor bank unbalance analysis and balancing.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the current unbalance without moving any unit
    Status(StatusArgs),

    /// Search for unit swaps that reduce the unbalance
    Optimize(OptimizeArgs),
}

#[derive(Args)]
struct StatusArgs {
    /// Prepared dataset (CSV)
    #[arg(required = true)]
    input: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Rack that would be optimized.
    #[arg(long, default_value = "R1")]
    rack: String,

    /// Print the results as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
struct OptimizeArgs {
    /// Prepared dataset (CSV)
    #[arg(required = true)]
    input: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Rack whose legs exchange units.
    #[arg(long)]
    rack: String,

    /// Maximum number of swaps.
    #[arg(long, default_value_t = 10)]
    max_swaps: usize,

    /// Output file for the updated dataset.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the results as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let (input, config) = match &cli.command {
        Commands::Status(args) => (&args.input, &args.config),
        Commands::Optimize(args) => (&args.input, &args.config),
    };

    let config = load_config(config)?;
    let units = load_units(input)?;

    let (opt, json, output) = match &cli.command {
        Commands::Status(args) => {
            // any positive budget will do, the search never runs
            let opt = OptimizeOpt::new(&args.rack, 1)?.report_only();
            (opt, args.json, None)
        }
        Commands::Optimize(args) => {
            let opt = OptimizeOpt::new(&args.rack, args.max_swaps)?;
            (opt, args.json, args.output.as_ref())
        }
    };

    let progress = LogProgress {};
    let (results, units) = run_balance(units, &config, &opt, Some(&progress))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_report(&results, opt.rack);
    }

    if let Some(out_path) = output {
        write_units(out_path, &units)?;
    }

    Ok(())
}

fn print_report(results: &BalanceResults, rack: RackId) {
    let p = &results.params;

    println!("Rack: {}", rack);
    println!("Status: {:?}", results.status);
    println!("Balanced: {}", results.is_balanced);
    println!(
        "Unbalance current (A): {} -> {}",
        format_f64(results.initial_unbalance_current_a),
        format_f64(p.unbalance_current_a)
    );

    if !results.permutations.is_empty() {
        println!();
        println!(" #   from        to          unbalance (A)");
        println!("--- ----------- ----------- ---------------");
        for s in results.permutations.iter() {
            println!(
                "{:<3} {:<4} {:<6} {:<4} {:<6} {}",
                s.index,
                s.source_branch,
                s.source_position,
                s.target_branch,
                s.target_position,
                format_f64(s.unbalance_current_a)
            );
        }
    }

    println!();
    println!("Capacitance (uF)");
    println!("  phase:    {}", format_f64(p.phase_capacitance_uf));
    println!("  racks:    {}", format_f64_map(&p.rack_capacitance_uf));
    println!("  legs:     {}", format_f64_map(&p.leg_capacitance_uf));
    println!("  branches: {}", format_f64_map(&p.branch_capacitance_uf));
    println!("Reactance (ohm)");
    println!("  phase:    {}", format_f64(p.phase_reactance_ohm));
    println!("  racks:    {}", format_f64_map(&p.rack_reactance_ohm));
    println!("  legs:     {}", format_f64_map(&p.leg_reactance_ohm));
    println!("  branches: {}", format_f64_map(&p.branch_reactance_ohm));
    println!("Phase voltage (V): {}", format_f64(p.phase_voltage_v));
    println!("Phase current (A): {}", format_f64(p.phase_current_a));
    println!("Rack voltages (V): {}", format_f64_map(&p.rack_voltage_v));
    println!("Leg currents (A):  {}", format_f64_map(&p.leg_current_a));
}
