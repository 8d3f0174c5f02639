use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::debug;

use crate::bff::{DOT, GREATER, LBRACE, LBRACKET, MINUS, OPCODES, RBRACKET};
use crate::error::Result;
use crate::world::World;

/// Default injected symbols: a loop-and-copy biased subset of the opcodes
/// plus `^`, which is inert.
pub const DEFAULT_SYMBOLS: [u8; 7] = [LBRACKET, LBRACE, DOT, GREATER, RBRACKET, MINUS, b'^'];

/// Initial tape contents: uniformly random bytes, then a number of
/// instruction symbols dropped at random positions of every tape so a fresh
/// world is not mostly no-ops.
#[derive(Clone, Debug)]
pub struct Seeder {
    /// Symbols to inject. Empty disables injection.
    pub extra_symbols: Vec<u8>,
    /// Injections per program. `None` injects once per tape cell.
    pub extra_per_program: Option<usize>,
}

impl Default for Seeder {
    fn default() -> Self {
        Self {
            extra_symbols: DEFAULT_SYMBOLS.to_vec(),
            extra_per_program: None,
        }
    }
}

impl Seeder {
    /// Inject every opcode with equal weight instead of the default subset.
    pub fn all_opcodes() -> Self {
        Self {
            extra_symbols: OPCODES.to_vec(),
            extra_per_program: None,
        }
    }

    /// Produce a flat tape buffer for `programs` tapes of `tape_length` cells.
    pub fn fill(&self, tape_length: usize, programs: usize, seed: u64) -> Vec<u32> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut cells: Vec<u32> = (0..tape_length * programs)
            .map(|_| rng.r#gen::<u8>() as u32)
            .collect();

        if self.extra_symbols.is_empty() || tape_length == 0 {
            return cells;
        }
        let extras = self.extra_per_program.unwrap_or(tape_length);
        for tape in cells.chunks_exact_mut(tape_length) {
            for _ in 0..extras {
                let pos = rng.gen_range(0..tape_length);
                let symbol = self.extra_symbols[rng.gen_range(0..self.extra_symbols.len())];
                tape[pos] = symbol as u32;
            }
        }
        cells
    }

    /// Overwrite the world's tapes with freshly seeded contents and reset
    /// every program's registers to `{0, 0, 0}`.
    pub fn seed(&self, world: &mut World, seed: u64) -> Result<()> {
        let tape_length = world.tape().tape_length();
        let programs = world.tape().programs();
        let cells = self.fill(tape_length, programs, seed);
        world.load_tape(&cells)?;
        world.reset_registers();
        debug!(seed, programs, tape_length, "seeded world");
        Ok(())
    }
}
