//! Paging simulator - command line driver
//!
//! Usage: paging-sim [OPTIONS] <setup_file> <input_file> <output_file>
//!
//! Replays the setup file into a fresh session, converts every hex address
//! of the input file in order and writes one result per line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use serde_json::json;

use paging_sim::io::{read_addresses, write_results, SetupData};
use paging_sim::{Direction, Outcome, Result, TranslationResponse, VmManager};

#[derive(Parser)]
#[command(name = "paging-sim")]
#[command(about = "Virtual/physical address conversion with FIFO page replacement")]
struct Args {
    /// Setup file: sizes, present page mappings and arrival order
    setup_file: PathBuf,

    /// File of hex addresses separated by whitespace
    input_file: PathBuf,

    /// Output file, one result per line
    output_file: PathBuf,

    /// Conversion direction
    #[arg(short, long, value_enum, default_value_t = Mode::V2p)]
    mode: Mode,

    /// Write results as JSON lines
    #[arg(long)]
    json: bool,

    /// Print detailed translation information
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Virtual to physical
    V2p,
    /// Physical to virtual
    P2v,
}

impl From<Mode> for Direction {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::V2p => Direction::VirtualToPhysical,
            Mode::P2v => Direction::PhysicalToVirtual,
        }
    }
}

#[derive(Default)]
struct Summary {
    successes: usize,
    faults: usize,
    unmapped: usize,
    errors: usize,
    rejected: usize,
}

impl Summary {
    fn record(&mut self, result: &Result<TranslationResponse>) {
        match result.as_ref().map(|r| &r.outcome) {
            Ok(Outcome::Success { .. }) => self.successes += 1,
            Ok(Outcome::PageFault { .. }) => self.faults += 1,
            Ok(Outcome::Unmapped { .. }) => self.unmapped += 1,
            Ok(Outcome::Error { .. }) => self.errors += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // Run the simulation and handle any errors
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn format_result(address: &str, result: &Result<TranslationResponse>, as_json: bool) -> Result<String> {
    let line = match (result, as_json) {
        (Ok(response), true) => serde_json::to_string(response)?,
        (Ok(response), false) => response.to_string(),
        (Err(e), true) => json!({
            "input_hex": address,
            "status": "rejected",
            "message": e.to_string(),
        })
        .to_string(),
        (Err(e), false) => format!("{} -> rejected: {}", address, e),
    };
    Ok(line)
}

/// Main logic separated from main() for cleaner error handling
fn run(args: &Args) -> Result<()> {
    // Step 1: Build the session from the setup file
    let setup = SetupData::from_file(&args.setup_file)?;
    let mut vm = VmManager::new();
    let layout = setup.apply(&mut vm)?;
    log::info!("Setup file:  {}", args.setup_file.display());
    log::info!("Layout:      {}", layout);

    // Step 2: Read addresses
    let addresses = read_addresses(&args.input_file)?;
    log::info!("Read {} addresses from {}", addresses.len(), args.input_file.display());

    // Step 3: Convert in order, faults carry over between addresses
    let direction = Direction::from(args.mode);
    let results = vm.translate_batch(&addresses, direction)?;
    let mut summary = Summary::default();
    let mut lines = Vec::with_capacity(addresses.len());
    for (address, result) in addresses.iter().zip(&results) {
        summary.record(result);
        let line = format_result(address, result, args.json)?;
        if args.verbose {
            eprintln!("{}", line);
        }
        lines.push(line);
    }

    // Step 4: Write results
    write_results(&args.output_file, &lines)?;

    if args.verbose {
        eprintln!();
        eprintln!("=== Summary ===");
        eprintln!("Hits:          {}", summary.successes);
        eprintln!("Page faults:   {}", summary.faults);
        eprintln!("Unmapped:      {}", summary.unmapped);
        eprintln!("Errors:        {}", summary.errors);
        eprintln!("Rejected:      {}", summary.rejected);
        if let Some(queue) = vm.queue() {
            eprintln!("Arrival queue: {:?}", queue.to_vec());
        }
        eprintln!("Results written to: {}", args.output_file.display());
    }

    Ok(())
}
