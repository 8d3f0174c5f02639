use crate::config::ExecConfig;
use crate::registers::Registers;
use crate::tape::TapeStore;
use crate::topology::GridTopology;

/// Result of executing one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The program advanced and can keep running.
    Continue,
    /// The program reached a terminal state. After an off-tape bracket scan
    /// or a zero-opcode halt the registers are untouched; after running past
    /// the tape end the last instruction has taken effect.
    Halt,
}

/// Everything an instruction may touch besides the program's own registers.
pub struct Machine<'a> {
    pub tape: &'a TapeStore,
    pub grid: &'a GridTopology,
    pub exec: &'a ExecConfig,
}

/// An instruction set for grid programs.
///
/// The scheduler is generic over `Substrate`, so an alternative instruction
/// set only has to implement single-instruction execution.
pub trait Substrate {
    /// Execute the instruction at `regs.instruction_pointer` of `program`.
    ///
    /// Reads and writes go through `machine.tape`; cells of other programs
    /// may only be reached by explicit neighbour addressing.
    fn step(machine: &Machine<'_>, program: usize, regs: &mut Registers) -> Step;

    /// Returns true if the byte is a meaningful instruction in this substrate
    /// (as opposed to a no-op). Used for metrics and visualization.
    fn is_instruction(byte: u8) -> bool;

    /// Pretty-print a disassembly of the given tape for human inspection.
    fn disassemble(tape: &[u8]) -> String;
}
