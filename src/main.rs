use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gridlife::bff::Bff;
use gridlife::config::{ExecConfig, SimConfig, parse_grid};
use gridlife::metrics::{
    byte_frequency_histogram, high_order_entropy, instruction_density, unique_program_count,
    zero_byte_count,
};
use gridlife::render::Frame;
use gridlife::seed::Seeder;
use gridlife::substrate::Substrate;
use gridlife::world::World;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Registers persist; one instruction per program per tick.
    Persistent,
    /// Registers reset every tick; each program runs to a halt or the bound.
    Run,
}

#[derive(Parser)]
#[command(name = "gridlife", about = "Self-replicating BFF programs on a toroidal grid")]
struct Cli {
    /// Random seed for the initial tapes.
    #[arg(long)]
    seed: u64,

    /// Number of ticks to run.
    #[arg(long)]
    ticks: usize,

    /// Side of the square each tape is drawn as; tapes hold side^2 cells.
    #[arg(long, default_value_t = 4)]
    tape_side: usize,

    /// Programs along each side of a square world.
    #[arg(long, default_value_t = 256)]
    world_size: usize,

    /// Rectangular world as WxH (overrides --world-size).
    #[arg(long)]
    grid: Option<String>,

    /// Execution mode.
    #[arg(long, value_enum, default_value_t = Mode::Persistent)]
    mode: Mode,

    /// Treat opcode 0 as a halt instead of a no-op.
    #[arg(long)]
    halt_on_zero: bool,

    /// Iteration bound per program in run mode (default max(256, 4 * tape length)).
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Worker threads (default: one per core).
    #[arg(long)]
    threads: Option<usize>,

    /// Compute and output metrics every N ticks.
    #[arg(long, default_value_t = 1)]
    metrics_interval: usize,

    /// Run in benchmark mode: suppress CSV, print throughput stats.
    #[arg(long)]
    benchmark: bool,

    /// Write PNG frames into this directory.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Write a frame every N ticks.
    #[arg(long, default_value_t = 100)]
    frame_interval: usize,

    /// Print the disassembly of the first N tapes after the run.
    #[arg(long, default_value_t = 0)]
    disassemble: usize,
}

impl Cli {
    fn sim_config(&self) -> Result<SimConfig> {
        let (width, height) = match &self.grid {
            Some(spec) => parse_grid(spec)?,
            None => (self.world_size, self.world_size),
        };
        let exec = ExecConfig {
            persist_registers: matches!(self.mode, Mode::Persistent),
            halt_on_zero_opcode: self.halt_on_zero,
            max_iterations: self.max_iterations,
        };
        let config = SimConfig {
            tape_length: self.tape_side * self.tape_side,
            width,
            height,
            exec,
            threads: self.threads,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.metrics_interval == 0 || cli.frame_interval == 0 {
        anyhow::bail!("--metrics-interval and --frame-interval must be positive");
    }
    let config = cli.sim_config().context("invalid simulation configuration")?;
    let mut world = World::new(config).context("failed to set up the simulation")?;
    Seeder::default().seed(&mut world, cli.seed)?;
    info!(seed = cli.seed, ticks = cli.ticks, mode = ?cli.mode, "starting run");

    if let Some(dir) = &cli.frames {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create frame directory {}", dir.display()))?;
    }

    if cli.benchmark {
        run_benchmark::<Bff>(&mut world, &cli);
    } else {
        run_simulation::<Bff>(&mut world, &cli)?;
    }

    for program in 0..cli.disassemble.min(world.grid().len()) {
        let tape = world.tape().program_bytes(program);
        println!("{program:6}: {}", Bff::disassemble(&tape));
    }
    Ok(())
}

fn print_metrics<S: Substrate>(tick: usize, population: &[u8], tape_length: usize) {
    let hist = byte_frequency_histogram(population);
    let (top_byte, _) = hist
        .iter()
        .enumerate()
        .max_by_key(|&(byte, &count)| (count, std::cmp::Reverse(byte)))
        .unwrap_or((0, &0));
    println!(
        "{tick},{:.6},{:.6},{},{},{top_byte}",
        high_order_entropy(population),
        instruction_density::<S>(population),
        unique_program_count(population, tape_length),
        zero_byte_count(population),
    );
}

fn run_simulation<S: Substrate>(world: &mut World, cli: &Cli) -> Result<()> {
    let mut population = Vec::new();
    let tape_length = world.tape().tape_length();

    println!("tick,hoe,instructions,unique,zeros,top_byte");
    world.tape().population_bytes_into(&mut population);
    print_metrics::<S>(0, &population, tape_length);
    write_frame(world, cli, 0)?;

    for tick in 1..=cli.ticks {
        world.tick::<S>();

        if tick % cli.metrics_interval == 0 {
            world.tape().population_bytes_into(&mut population);
            print_metrics::<S>(tick, &population, tape_length);
        }
        if tick % cli.frame_interval == 0 || tick == cli.ticks {
            write_frame(world, cli, tick)?;
        }

        if tick % 100 == 0 || tick == cli.ticks {
            eprint!("\rtick {tick}/{}", cli.ticks);
        }
    }
    eprintln!();
    Ok(())
}

fn write_frame(world: &World, cli: &Cli, tick: usize) -> Result<()> {
    let Some(dir) = &cli.frames else {
        return Ok(());
    };
    let grid = world.grid();
    let frame = Frame::render(
        &world.tape().snapshot(),
        world.tape().tape_length(),
        grid.width(),
        grid.height(),
    )?;
    let path = dir.join(format!("{tick:08}.png"));
    frame
        .save_png(&path)
        .with_context(|| format!("failed to write frame {}", path.display()))?;
    Ok(())
}

fn run_benchmark<S: Substrate>(world: &mut World, cli: &Cli) {
    let programs = world.grid().len();

    let start = std::time::Instant::now();
    let stats = world.run_ticks::<S>(cli.ticks);
    let elapsed = start.elapsed();

    let ticks_per_sec = cli.ticks as f64 / elapsed.as_secs_f64();
    let instructions_per_sec = stats.instructions as f64 / elapsed.as_secs_f64();

    eprintln!("Benchmark results:");
    eprintln!("  Ticks:             {}", cli.ticks);
    eprintln!("  Grid:              {}x{}", world.grid().width(), world.grid().height());
    eprintln!("  Programs:          {programs}");
    eprintln!("  Instructions:      {}", stats.instructions);
    eprintln!("  Halted programs:   {}", stats.halted);
    eprintln!("  Elapsed:           {elapsed:.2?}");
    eprintln!("  Ticks/sec:         {ticks_per_sec:.1}");
    eprintln!("  Instructions/sec:  {instructions_per_sec:.0}");
}
