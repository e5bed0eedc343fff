use clap::{Parser, Subcommand};
use mx_batch::deck::{self, CellResult, DeckRun};
use mx_batch::{BatchDeck, DeckResult};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::debug;
use uom::si::available_energy::joule_per_kilogram;
use uom::si::mass_density::kilogram_per_cubic_meter;
use uom::si::pressure::megapascal;
use uom::si::specific_heat_capacity::joule_per_kilogram_kelvin;
use uom::si::specific_volume::cubic_meter_per_kilogram;
use uom::si::thermodynamic_temperature::kelvin;

/// Temperature at which `materials` reports each model's reference state
const REFERENCE_TEMPERATURE: f64 = 298.15;

#[derive(Parser)]
#[command(name = "mx-cli")]
#[command(about = "mixeos CLI - mixed-cell equation-of-state closure", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate deck syntax and structure
    Validate {
        /// Path to the deck (YAML, or JSON by extension)
        deck_path: PathBuf,
    },
    /// List the materials of a deck
    Materials {
        /// Path to the deck (YAML, or JSON by extension)
        deck_path: PathBuf,
    },
    /// Evaluate every cell of a deck
    Run {
        /// Path to the deck (YAML, or JSON by extension)
        deck_path: PathBuf,
        /// Print per-cell results as JSON
        #[arg(long)]
        json: bool,
        /// Worker threads (defaults to the global rayon pool)
        #[arg(long)]
        threads: Option<usize>,
        /// Write per-cell JSON results to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { deck_path } => cmd_validate(&deck_path),
        Commands::Materials { deck_path } => cmd_materials(&deck_path),
        Commands::Run {
            deck_path,
            json,
            threads,
            output,
        } => cmd_run(&deck_path, json, threads, output.as_deref()),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        // Some cells were left unsolved
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(deck_path: &Path) -> DeckResult<bool> {
    println!("Validating deck: {}", deck_path.display());
    let deck = deck::load(deck_path)?;
    // Building the context checks every model's parameters
    let ctx = deck.context(None)?;
    println!(
        "✓ Deck is valid ({} materials registered, {} cells, {} mode)",
        ctx.registry().registered_count(),
        deck.cells.len(),
        deck.mode.label()
    );
    Ok(true)
}

fn cmd_materials(deck_path: &Path) -> DeckResult<bool> {
    let deck = deck::load(deck_path)?;
    if deck.materials.is_empty() {
        println!("No materials found in deck");
    } else {
        let ctx = deck.context(None)?;
        println!("Materials in deck (reference states at {REFERENCE_TEMPERATURE} K):");
        for (index, material) in deck.materials.iter().enumerate() {
            let cells = deck
                .cells
                .iter()
                .filter(|c| c.materials.iter().any(|f| f.material == material.name))
                .count();
            println!(
                "  {index}: {} - {} (in {cells} cells)",
                material.name,
                material.model.kind()
            );
            match ctx.reference_state(index, REFERENCE_TEMPERATURE) {
                Ok(state) => {
                    println!(
                        "      rho = {:.4e} kg/m3, v = {:.4e} m3/kg, e = {:.4e} J/kg",
                        state.density_q().get::<kilogram_per_cubic_meter>(),
                        state.specific_volume_q().get::<cubic_meter_per_kilogram>(),
                        state.sie_q().get::<joule_per_kilogram>()
                    );
                    println!(
                        "      P = {:.4e} MPa, T = {:.2} K, B_s = {:.4e} MPa, cv = {:.4e} J/(kg K)",
                        state.pressure_q().get::<megapascal>(),
                        state.temperature_q().get::<kelvin>(),
                        state.bulk_modulus_q().get::<megapascal>(),
                        state.cv_q().get::<joule_per_kilogram_kelvin>()
                    );
                }
                Err(e) => println!("      no reference state: {e}"),
            }
        }
    }
    Ok(true)
}

fn cmd_run(
    deck_path: &Path,
    json: bool,
    threads: Option<usize>,
    output: Option<&Path>,
) -> DeckResult<bool> {
    let deck = deck::load(deck_path)?;
    if !json {
        println!("Running deck: {} ({} cells)", deck.name, deck.cells.len());
    }

    debug!(deck = %deck.name, ?threads, "running deck");
    let start = Instant::now();
    let run = deck.run(threads)?;
    let elapsed = start.elapsed();

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&run.cells)?)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&run.cells)?);
    } else {
        print_table(&run.cells);
        print_summary(&deck, &run, elapsed.as_secs_f64());
        if let Some(path) = output {
            println!("✓ Results written to {}", path.display());
        }
    }
    Ok(run.report.is_clean())
}

fn print_table(cells: &[CellResult]) {
    println!(
        "  {:>5}  {:<10} {:>13} {:>11} {:>13} {:>13} {:>13}",
        "cell", "status", "P [Pa]", "T [K]", "spvol", "sie", "bmod"
    );
    for cell in cells {
        println!(
            "  {:>5}  {:<10} {:>13.6e} {:>11.3} {:>13.6e} {:>13.6e} {:>13.6e}",
            cell.cell,
            format!("{:?}", cell.status),
            cell.press,
            cell.temp,
            cell.spvol,
            cell.sie,
            cell.bmod
        );
        for m in &cell.materials {
            println!(
                "         {:<12} fv = {:.6}  e = {:.6e}",
                m.material, m.frac_vol, m.sie
            );
        }
        if let Some(error) = &cell.error {
            println!("         ! {error}");
        }
    }
}

fn print_summary(deck: &BatchDeck, run: &DeckRun, seconds: f64) {
    let r = &run.report;
    if r.is_clean() {
        println!("✓ Closed {} cells in {:.3} ms", r.cells, seconds * 1e3);
    } else {
        println!(
            "✗ {} of {} cells left unsolved ({:.3} ms)",
            r.status_code(),
            r.cells,
            seconds * 1e3
        );
    }
    println!("  Mode: {}", deck.mode.label());
    println!(
        "  Empty: {}, direct: {}, converged: {}, recovered: {}",
        r.empty, r.direct, r.converged, r.recovered
    );
    println!(
        "  Iterations: {} total, {} max",
        r.total_iterations, r.max_iterations
    );
}
