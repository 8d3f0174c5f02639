use rayon::prelude::*;
use tracing::{info, trace};

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::registers::{ProgramRegisters, Registers};
use crate::substrate::{Machine, Step, Substrate};
use crate::tape::TapeStore;
use crate::topology::GridTopology;

/// Counters for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Instructions dispatched across all programs.
    pub instructions: u64,
    /// Programs that reached a halt (off-tape bracket scan, tape end, or
    /// opcode 0 when configured).
    pub halted: usize,
    /// Run-to-completion programs stopped by the iteration bound.
    pub exhausted: usize,
}

impl TickStats {
    fn merge(self, other: Self) -> Self {
        Self {
            instructions: self.instructions + other.instructions,
            halted: self.halted + other.halted,
            exhausted: self.exhausted + other.exhausted,
        }
    }
}

/// A toroidal grid of programs sharing one tape arena.
///
/// Each tick runs every program in parallel on the world's rayon pool.
/// Workers own their register triple exclusively and share the tape store;
/// the only cross-program traffic is the neighbour cell touched by the copy
/// instructions, which is left unsynchronized.
pub struct World {
    config: SimConfig,
    grid: GridTopology,
    tape: TapeStore,
    registers: ProgramRegisters,
    pool: rayon::ThreadPool,
    ticks: u64,
}

impl World {
    /// Create a world with zeroed tapes and registers.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let grid = GridTopology::new(config.width, config.height)?;
        let tape = TapeStore::new(config.tape_length, grid.len())?;
        let registers = ProgramRegisters::new(grid.len(), config.tape_length);
        Self::assemble(config, grid, tape, registers)
    }

    /// Create a world from host buffers in the flat tape / register layouts.
    ///
    /// `registers` may be omitted, in which case every program starts at
    /// `{0, 0, 0}`.
    pub fn from_buffers(config: SimConfig, tape: &[u32], registers: Option<&[u32]>) -> Result<Self> {
        config.validate()?;
        let grid = GridTopology::new(config.width, config.height)?;
        let expected = grid.len() * config.tape_length;
        if tape.len() != expected {
            return Err(Error::Config(format!(
                "tape buffer has {} cells, {} programs x {} cells needs {expected}",
                tape.len(),
                grid.len(),
                config.tape_length
            )));
        }
        let tape = TapeStore::from_cells(config.tape_length, tape)?;
        let registers = match registers {
            Some(flat) => ProgramRegisters::from_flat(flat, config.tape_length)?,
            None => ProgramRegisters::new(grid.len(), config.tape_length),
        };
        if registers.len() != grid.len() {
            return Err(Error::Config(format!(
                "register buffer holds {} programs, grid has {}",
                registers.len(),
                grid.len()
            )));
        }
        Self::assemble(config, grid, tape, registers)
    }

    fn assemble(
        config: SimConfig,
        grid: GridTopology,
        tape: TapeStore,
        registers: ProgramRegisters,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(0))
            .thread_name(|i| format!("gridlife-worker-{i}"))
            .build()?;
        info!(
            width = grid.width(),
            height = grid.height(),
            tape_length = config.tape_length,
            persist_registers = config.exec.persist_registers,
            halt_on_zero_opcode = config.exec.halt_on_zero_opcode,
            workers = pool.current_num_threads(),
            "world created"
        );
        Ok(Self {
            config,
            grid,
            tape,
            registers,
            pool,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridTopology {
        &self.grid
    }

    pub fn tape(&self) -> &TapeStore {
        &self.tape
    }

    pub fn registers(&self) -> &ProgramRegisters {
        &self.registers
    }

    /// Overwrite one program's registers, rejecting values outside its tape.
    pub fn set_registers(&mut self, program: usize, registers: Registers) -> Result<()> {
        self.registers.set(program, registers)
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Overwrite every tape from a host buffer. Registers are left alone.
    pub fn load_tape(&mut self, cells: &[u32]) -> Result<()> {
        self.tape.write_cells(cells)
    }

    pub fn reset_registers(&mut self) {
        self.registers.reset();
    }

    /// Run one tick in the configured mode.
    pub fn tick<S: Substrate>(&mut self) -> TickStats {
        if self.config.exec.persist_registers {
            self.step::<S>()
        } else {
            self.run::<S>()
        }
    }

    /// Run `n` ticks, returning the summed counters.
    pub fn run_ticks<S: Substrate>(&mut self, n: usize) -> TickStats {
        (0..n).fold(TickStats::default(), |acc, _| acc.merge(self.tick::<S>()))
    }

    /// Single-step tick: every program executes exactly one instruction
    /// against its persisted registers.
    pub fn step<S: Substrate>(&mut self) -> TickStats {
        let machine = Machine {
            tape: &self.tape,
            grid: &self.grid,
            exec: &self.config.exec,
        };
        let registers = self.registers.as_mut_slice();

        let stats = self.pool.install(|| {
            registers
                .par_iter_mut()
                .enumerate()
                .map(|(idx, regs)| {
                    let halted = S::step(&machine, idx, regs) == Step::Halt;
                    TickStats {
                        instructions: 1,
                        halted: halted as usize,
                        exhausted: 0,
                    }
                })
                .reduce(TickStats::default, TickStats::merge)
        });

        self.ticks += 1;
        trace!(tick = self.ticks, halted = stats.halted, "step");
        stats
    }

    /// Run-to-completion tick: every program restarts at `{0, 0, 0}` and runs
    /// until it halts or hits the iteration bound.
    pub fn run<S: Substrate>(&mut self) -> TickStats {
        let limit = self.config.exec.iteration_limit(self.config.tape_length);
        let machine = Machine {
            tape: &self.tape,
            grid: &self.grid,
            exec: &self.config.exec,
        };
        let registers = self.registers.as_mut_slice();

        let stats = self.pool.install(|| {
            registers
                .par_iter_mut()
                .enumerate()
                .map(|(idx, regs)| run_program::<S>(&machine, idx, regs, limit))
                .reduce(TickStats::default, TickStats::merge)
        });

        self.ticks += 1;
        trace!(
            tick = self.ticks,
            instructions = stats.instructions,
            halted = stats.halted,
            exhausted = stats.exhausted,
            "run"
        );
        stats
    }
}

fn run_program<S: Substrate>(
    machine: &Machine<'_>,
    program: usize,
    regs: &mut Registers,
    limit: usize,
) -> TickStats {
    *regs = Registers::default();
    let mut stats = TickStats::default();
    while (stats.instructions as usize) < limit {
        stats.instructions += 1;
        if S::step(machine, program, regs) == Step::Halt {
            stats.halted = 1;
            return stats;
        }
    }
    stats.exhausted = 1;
    stats
}
