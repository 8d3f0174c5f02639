use crate::error::{Error, Result};

/// One program's register triple. Every field indexes the program's own tape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub instruction_pointer: u32,
    pub head0: u32,
    pub head1: u32,
}

impl Registers {
    pub fn new(instruction_pointer: u32, head0: u32, head1: u32) -> Self {
        Self {
            instruction_pointer,
            head0,
            head1,
        }
    }

    fn within(&self, tape_length: usize) -> bool {
        let l = tape_length as u64;
        (self.instruction_pointer as u64) < l && (self.head0 as u64) < l && (self.head1 as u64) < l
    }
}

/// Register arena: one triple per program, in program-index order.
///
/// Every stored triple is within `0..tape_length`; the public mutators check
/// this so a program never addresses another program's tape.
pub struct ProgramRegisters {
    registers: Vec<Registers>,
    tape_length: usize,
}

impl ProgramRegisters {
    /// All programs start at `{0, 0, 0}`.
    pub fn new(programs: usize, tape_length: usize) -> Self {
        Self {
            registers: vec![Registers::default(); programs],
            tape_length,
        }
    }

    /// Load from the flat `(ip, head0, head1)` buffer layout.
    pub fn from_flat(flat: &[u32], tape_length: usize) -> Result<Self> {
        if flat.len() % 3 != 0 {
            return Err(Error::Config(format!(
                "register buffer length {} is not a multiple of 3",
                flat.len()
            )));
        }
        let registers: Vec<Registers> = flat
            .chunks_exact(3)
            .map(|t| Registers::new(t[0], t[1], t[2]))
            .collect();
        if let Some(idx) = registers.iter().position(|r| !r.within(tape_length)) {
            return Err(Error::Config(format!(
                "registers of program {idx} ({:?}) exceed tape length {tape_length}",
                registers[idx]
            )));
        }
        Ok(Self {
            registers,
            tape_length,
        })
    }

    pub fn to_flat(&self) -> Vec<u32> {
        self.registers
            .iter()
            .flat_map(|r| [r.instruction_pointer, r.head0, r.head1])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn get(&self, program: usize) -> Registers {
        self.registers[program]
    }

    pub fn tape_length(&self) -> usize {
        self.tape_length
    }

    /// Replace one program's registers. Fails on an unknown program or a
    /// register outside the tape.
    pub fn set(&mut self, program: usize, registers: Registers) -> Result<()> {
        let programs = self.registers.len();
        let slot = self.registers.get_mut(program).ok_or_else(|| {
            Error::Config(format!("program {program} out of range for {programs} programs"))
        })?;
        if !registers.within(self.tape_length) {
            return Err(Error::Config(format!(
                "registers {registers:?} exceed tape length {}",
                self.tape_length
            )));
        }
        *slot = registers;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.registers.fill(Registers::default());
    }

    pub fn as_slice(&self) -> &[Registers] {
        &self.registers
    }

    /// Mutable view for the interpreter, which keeps every register in range.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Registers] {
        &mut self.registers
    }
}
