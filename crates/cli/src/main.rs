//! AST2400 machine assembler CLI.
//!
//! This binary assembles the AST2400 board and either reports its topology or runs it.
//! It provides:
//! 1. **Map:** Print the memory map, interrupt wiring and component states.
//! 2. **Run:** Attach stdin/stdout as the UART5 console and tick the machine.
//!
//! Log output is controlled with `RUST_LOG` (e.g. `RUST_LOG=bmcsim_core=debug`).

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, process, thread};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bmcsim_core::config::MachineConfig;
use bmcsim_core::soc::{BufferBackend, ComponentId, HostBackends, Machine, StdioBackend};

#[derive(Parser, Debug)]
#[command(
    name = "bmcsim",
    author,
    version,
    about = "AST2400 BMC machine assembler",
    long_about = "Assemble an AST2400-class BMC SoC from a JSON configuration and inspect or run it.\n\nExamples:\n  bmcsim map\n  bmcsim map --config board.json --json\n  bmcsim run --ticks 100000"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble the machine and print its memory map and interrupt wiring.
    Map {
        /// JSON machine configuration; defaults to the stock AST2400 board.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Leave the serial port unconnected (UART5 is omitted).
        #[arg(long)]
        no_serial: bool,

        /// Emit the topology as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Assemble the machine with the console on stdin/stdout and tick it.
    Run {
        /// JSON machine configuration; defaults to the stock AST2400 board.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Leave the serial port unconnected (UART5 is omitted).
        #[arg(long)]
        no_serial: bool,

        /// Stop after this many ticks; runs until interrupted when absent.
        #[arg(long)]
        ticks: Option<u64>,

        /// Sleep between ticks, in microseconds.
        #[arg(long, default_value_t = 100)]
        period_us: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Map { config, no_serial, json } => cmd_map(config.as_deref(), no_serial, json),
        Commands::Run { config, no_serial, ticks, period_us } => {
            cmd_run(config.as_deref(), no_serial, ticks, period_us)
        }
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        process::exit(1);
    }
}

/// Loads the configuration file, or the AST2400 defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<MachineConfig, String> {
    let Some(path) = path else {
        return Ok(MachineConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    MachineConfig::from_json(&text).map_err(|e| format!("parsing {}: {e}", path.display()))
}

fn assemble(config: &MachineConfig, backends: HostBackends) -> Result<Machine, String> {
    Machine::assemble(config, backends).map_err(|e| e.to_string())
}

fn cmd_map(path: Option<&Path>, no_serial: bool, json: bool) -> Result<(), String> {
    let config = load_config(path)?;
    // The map only needs the UART to exist, so its output is captured rather than shown.
    let backends = if no_serial {
        HostBackends::none()
    } else {
        HostBackends::none().with_serial(BufferBackend::new())
    };
    let machine = assemble(&config, backends)?;

    if json {
        let text = serde_json::to_string_pretty(&topology_json(&machine)).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }
    print_topology(&machine);
    Ok(())
}

fn name_of(machine: &Machine, id: ComponentId) -> String {
    machine.registry().name(id).map_or_else(|| id.to_string(), str::to_owned)
}

fn print_topology(machine: &Machine) {
    println!("machine {}", machine.name());
    println!();
    println!("memory map:");
    for entry in machine.memory_map() {
        let indent = "  ".repeat(entry.depth + 1);
        println!(
            "{indent}{:#010x}-{:#010x} (prio {:>2}) {}",
            entry.base,
            entry.end.saturating_sub(1),
            entry.priority,
            entry.name
        );
    }
    println!();
    println!("interrupts:");
    for c in machine.connections() {
        println!(
            "  {}[{}] -> {}[{}]",
            name_of(machine, c.source),
            c.output,
            name_of(machine, c.controller),
            c.input
        );
    }
    println!();
    println!("components:");
    for (id, name, state) in machine.registry().iter() {
        let kind = machine.registry().kind(id).unwrap_or("?");
        match machine.registry().parent(id) {
            Some(bus) => println!(
                "  {name:<10} {kind:<14} {state:?} on {} bus {} @ {:#04x}",
                name_of(machine, bus.controller),
                bus.bus,
                bus.address
            ),
            None => println!("  {name:<10} {kind:<14} {state:?}"),
        }
    }
}

fn topology_json(machine: &Machine) -> serde_json::Value {
    let map: Vec<_> = machine
        .memory_map()
        .into_iter()
        .map(|e| {
            serde_json::json!({
                "name": e.name,
                "base": e.base,
                "end": e.end,
                "priority": e.priority,
                "depth": e.depth,
                "component": e.component.map(|id| name_of(machine, id)),
            })
        })
        .collect();
    let irqs: Vec<_> = machine
        .connections()
        .iter()
        .map(|c| {
            serde_json::json!({
                "source": name_of(machine, c.source),
                "output": c.output,
                "controller": name_of(machine, c.controller),
                "input": c.input,
            })
        })
        .collect();
    let components: Vec<_> = machine
        .registry()
        .iter()
        .map(|(id, name, state)| {
            serde_json::json!({
                "name": name,
                "kind": machine.registry().kind(id),
                "state": format!("{state:?}"),
            })
        })
        .collect();
    serde_json::json!({
        "machine": machine.name(),
        "memory_map": map,
        "interrupts": irqs,
        "components": components,
    })
}

fn cmd_run(path: Option<&Path>, no_serial: bool, ticks: Option<u64>, period_us: u64) -> Result<(), String> {
    let config = load_config(path)?;
    let backends =
        if no_serial { HostBackends::none() } else { HostBackends::none().with_serial(StdioBackend::new()) };
    let machine = assemble(&config, backends)?;
    info!(machine = machine.name(), components = machine.registry().len(), "machine running");

    let period = Duration::from_micros(period_us);
    let mut elapsed = 0u64;
    while ticks.is_none_or(|limit| elapsed < limit) {
        machine.tick();
        elapsed += 1;
        if !period.is_zero() {
            thread::sleep(period);
        }
    }
    info!(ticks = elapsed, "tick limit reached");
    Ok(())
}
