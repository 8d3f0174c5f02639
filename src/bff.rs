use crate::registers::Registers;
use crate::substrate::{Machine, Step, Substrate};
use crate::tape::TapeStore;
use crate::topology::Direction;

/// The grid variant of the BFF instruction set.
///
/// Each program owns one tape and three registers:
/// - IP (instruction pointer)
/// - head0 (read/write head for arithmetic and the local side of copies)
/// - head1 (the remote side of copies)
///
/// Head movement wraps modulo the tape length. Cell arithmetic wraps
/// modulo 256. `.` and `,` copy between this program's `head0` cell and a
/// neighbour's `head1` cell; the neighbour is selected by the value of this
/// program's last tape cell.
pub struct Bff;

pub const NUL: u8 = 0;
pub const LESS: u8 = b'<';
pub const GREATER: u8 = b'>';
pub const LBRACE: u8 = b'{';
pub const RBRACE: u8 = b'}';
pub const MINUS: u8 = b'-';
pub const PLUS: u8 = b'+';
pub const DOT: u8 = b'.';
pub const COMMA: u8 = b',';
pub const LBRACKET: u8 = b'[';
pub const RBRACKET: u8 = b']';

/// The ten recognized opcodes, in table order.
pub const OPCODES: [u8; 10] = [
    LESS, GREATER, LBRACE, RBRACE, MINUS, PLUS, DOT, COMMA, LBRACKET, RBRACKET,
];

impl Substrate for Bff {
    fn step(machine: &Machine<'_>, program: usize, regs: &mut Registers) -> Step {
        let tape = machine.tape;
        let len = tape.tape_length();
        let last = len - 1;

        let ip = regs.instruction_pointer as usize;
        let head0 = regs.head0 as usize;
        let head1 = regs.head1 as usize;
        let mut next = *regs;
        let mut next_ip = ip;

        match tape.load(program, ip) {
            NUL if machine.exec.halt_on_zero_opcode => return Step::Halt,
            LESS => next.head0 = ring_prev(head0, last),
            GREATER => next.head0 = ring_next(head0, last),
            LBRACE => next.head1 = ring_prev(head1, last),
            RBRACE => next.head1 = ring_next(head1, last),
            MINUS => {
                let value = tape.load(program, head0);
                tape.store(program, head0, value.wrapping_sub(1));
            }
            PLUS => {
                let value = tape.load(program, head0);
                tape.store(program, head0, value.wrapping_add(1));
            }
            DOT => {
                let target = copy_target(machine, program);
                tape.store(target, head1, tape.load(program, head0));
            }
            COMMA => {
                let source = copy_target(machine, program);
                tape.store(program, head0, tape.load(source, head1));
            }
            LBRACKET => {
                if tape.load(program, head0) == 0 {
                    match match_forward(tape, program, ip) {
                        Some(target) => next_ip = target,
                        None => return Step::Halt,
                    }
                }
            }
            RBRACKET => {
                if tape.load(program, head0) != 0 {
                    match match_backward(tape, program, ip) {
                        Some(target) => next_ip = target,
                        None => return Step::Halt,
                    }
                }
            }
            _ => {} // no-op
        }

        next_ip += 1;
        let outcome = if next_ip == len {
            next_ip = 0;
            // Run-to-completion programs stop once they pass the tape end.
            if machine.exec.persist_registers {
                Step::Continue
            } else {
                Step::Halt
            }
        } else {
            Step::Continue
        };
        next.instruction_pointer = next_ip as u32;
        *regs = next;
        outcome
    }

    fn is_instruction(byte: u8) -> bool {
        OPCODES.contains(&byte)
    }

    fn disassemble(tape: &[u8]) -> String {
        tape.iter()
            .map(|&b| if Self::is_instruction(b) { b as char } else { '_' })
            .collect()
    }
}

#[inline]
fn ring_prev(pos: usize, last: usize) -> u32 {
    (if pos == 0 { last } else { pos - 1 }) as u32
}

#[inline]
fn ring_next(pos: usize, last: usize) -> u32 {
    (if pos == last { 0 } else { pos + 1 }) as u32
}

/// The neighbour a copy instruction of `program` talks to.
#[inline]
fn copy_target(machine: &Machine<'_>, program: usize) -> usize {
    let last = machine.tape.tape_length() - 1;
    let selector = machine.tape.load(program, last);
    machine
        .grid
        .neighbor(program, Direction::from_selector(selector as u32))
}

/// Find the `]` matching the `[` at `ip`, scanning forward by depth.
/// `None` if the scan runs off the end of the tape.
fn match_forward(tape: &TapeStore, program: usize, ip: usize) -> Option<usize> {
    let last = tape.tape_length() - 1;
    let mut depth = 1usize;
    let mut pos = ip;
    while depth > 0 {
        if pos >= last {
            return None;
        }
        pos += 1;
        match tape.load(program, pos) {
            LBRACKET => depth += 1,
            RBRACKET => depth -= 1,
            _ => {}
        }
    }
    Some(pos)
}

/// Find the `[` matching the `]` at `ip`, scanning backward by depth.
/// `None` if the scan runs off the start of the tape.
fn match_backward(tape: &TapeStore, program: usize, ip: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut pos = ip;
    while depth > 0 {
        if pos == 0 {
            return None;
        }
        pos -= 1;
        match tape.load(program, pos) {
            RBRACKET => depth += 1,
            LBRACKET => depth -= 1,
            _ => {}
        }
    }
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecConfig;
    use crate::topology::GridTopology;

    /// A world of `width x height` programs with the given flat tape contents.
    struct Fixture {
        tape: TapeStore,
        grid: GridTopology,
        exec: ExecConfig,
    }

    impl Fixture {
        fn new(tape_length: usize, width: usize, height: usize, cells: &[u32]) -> Self {
            Self {
                tape: TapeStore::from_cells(tape_length, cells).unwrap(),
                grid: GridTopology::new(width, height).unwrap(),
                exec: ExecConfig::persistent(),
            }
        }

        fn step(&self, program: usize, regs: &mut Registers) -> Step {
            let machine = Machine {
                tape: &self.tape,
                grid: &self.grid,
                exec: &self.exec,
            };
            Bff::step(&machine, program, regs)
        }
    }

    #[test]
    fn test_head0_decrement() {
        // tape [255, 255, '<', 0 | 0, 0, 0, 0], program 0 at IP=2, head0=1.
        let f = Fixture::new(4, 2, 1, &[255, 255, 60, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(2, 1, 0);
        assert_eq!(f.step(0, &mut regs), Step::Continue);
        assert_eq!(regs, Registers::new(3, 0, 0));
        assert_eq!(f.tape.snapshot(), vec![255, 255, 60, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_head0_decrement_from_two() {
        let f = Fixture::new(4, 2, 1, &[255, 255, 60, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(2, 2, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(3, 1, 0));
        assert_eq!(f.tape.snapshot(), vec![255, 255, 60, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_head0_decrement_wraps() {
        let f = Fixture::new(4, 2, 1, &[255, 255, 60, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(2, 0, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(3, 3, 0));
    }

    #[test]
    fn test_head0_increment_wraps() {
        let f = Fixture::new(4, 2, 1, &[255, 255, 62, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(2, 3, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(3, 0, 0));
    }

    #[test]
    fn test_head1_movement_wraps() {
        let f = Fixture::new(4, 2, 1, &[0, 0, 123, 0, 0, 0, 125, 0]);
        let mut regs = Registers::new(2, 0, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(3, 0, 3));

        let mut regs = Registers::new(2, 0, 3);
        f.step(1, &mut regs);
        assert_eq!(regs, Registers::new(3, 0, 0));
    }

    #[test]
    fn test_minus_wraps_at_zero() {
        let f = Fixture::new(4, 2, 1, &[45, 0, 0, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(0, 1, 0);
        f.step(0, &mut regs);
        assert_eq!(f.tape.load(0, 1), 255);
        assert_eq!(regs, Registers::new(1, 1, 0));
    }

    #[test]
    fn test_plus_wraps_at_255() {
        let f = Fixture::new(4, 2, 1, &[43, 255, 0, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(0, 1, 0);
        f.step(0, &mut regs);
        assert_eq!(f.tape.load(0, 1), 0);
    }

    #[test]
    fn test_dot_copies_to_neighbor_head1() {
        // Last cell 0 selects East: program 0 writes into program 1.
        let f = Fixture::new(4, 2, 1, &[46, 5, 6, 0, 0, 6, 7, 0]);
        let mut regs = Registers::new(0, 1, 2);
        f.step(0, &mut regs);
        assert_eq!(f.tape.snapshot(), vec![46, 5, 6, 0, 0, 6, 5, 0]);
        assert_eq!(regs, Registers::new(1, 1, 2));
    }

    #[test]
    fn test_comma_copies_from_neighbor_head1() {
        let f = Fixture::new(4, 2, 1, &[44, 5, 6, 0, 0, 6, 7, 0]);
        let mut regs = Registers::new(0, 1, 2);
        f.step(0, &mut regs);
        assert_eq!(f.tape.snapshot(), vec![44, 7, 6, 0, 0, 6, 7, 0]);
    }

    #[test]
    fn test_copy_direction_follows_last_cell() {
        // 3x3 grid, program 4 in the middle. Last cell 2 selects South (program 7).
        let mut cells = vec![0u32; 9 * 4];
        cells[4 * 4] = DOT as u32;
        cells[4 * 4 + 1] = 77;
        cells[4 * 4 + 3] = 2;
        let f = Fixture::new(4, 3, 3, &cells);
        let mut regs = Registers::new(0, 1, 0);
        f.step(4, &mut regs);
        assert_eq!(f.tape.load(7, 0), 77);
        assert_eq!(f.tape.load(1, 0), 0);

        // Selector 3 selects North (program 1), selector 5 wraps to West (program 3).
        f.tape.store(4, 3, 3);
        let mut regs = Registers::new(0, 1, 0);
        f.step(4, &mut regs);
        assert_eq!(f.tape.load(1, 0), 77);

        f.tape.store(4, 3, 5);
        let mut regs = Registers::new(0, 1, 0);
        f.step(4, &mut regs);
        assert_eq!(f.tape.load(3, 0), 77);
    }

    #[test]
    fn test_open_bracket_jumps_when_zero() {
        let f = Fixture::new(4, 2, 1, &[91, 43, 93, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(0, 3, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(3, 3, 0));
        assert_eq!(f.tape.snapshot(), vec![91, 43, 93, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_open_bracket_falls_through_when_nonzero() {
        let f = Fixture::new(4, 2, 1, &[91, 43, 93, 1, 0, 0, 0, 0]);
        let mut regs = Registers::new(0, 3, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(1, 3, 0));
    }

    #[test]
    fn test_close_bracket_jumps_back_when_nonzero() {
        let f = Fixture::new(4, 2, 1, &[91, 43, 93, 1, 0, 0, 0, 0]);
        let mut regs = Registers::new(2, 3, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(1, 3, 0));
    }

    #[test]
    fn test_close_bracket_falls_through_when_zero() {
        let f = Fixture::new(4, 2, 1, &[91, 43, 93, 0, 0, 0, 0, 0]);
        let mut regs = Registers::new(2, 3, 0);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(3, 3, 0));
    }

    #[test]
    fn test_nested_brackets_match_by_depth() {
        // "[[+]]" then head0 cell (5) is zero: jump past the outer ']'.
        let f = Fixture::new(8, 1, 1, &[91, 91, 43, 93, 93, 0, 0, 0]);
        let mut regs = Registers::new(0, 5, 0);
        f.step(0, &mut regs);
        assert_eq!(regs.instruction_pointer, 5);

        // And backwards from the outer ']' with a nonzero cell.
        f.tape.store(0, 5, 1);
        let mut regs = Registers::new(4, 5, 0);
        f.step(0, &mut regs);
        assert_eq!(regs.instruction_pointer, 1);
    }

    #[test]
    fn test_unmatched_open_bracket_halts() {
        let f = Fixture::new(4, 1, 1, &[0, 91, 43, 0]);
        let mut regs = Registers::new(1, 0, 0);
        assert_eq!(f.step(0, &mut regs), Step::Halt);
        assert_eq!(regs, Registers::new(1, 0, 0));
    }

    #[test]
    fn test_open_bracket_on_last_cell_halts() {
        // Scanning from the last cell has nowhere to go, even with wrap-around IP.
        let f = Fixture::new(4, 1, 1, &[0, 0, 0, 91]);
        let mut regs = Registers::new(3, 0, 0);
        assert_eq!(f.step(0, &mut regs), Step::Halt);
    }

    #[test]
    fn test_unmatched_close_bracket_halts() {
        let f = Fixture::new(4, 1, 1, &[43, 93, 0, 1]);
        let mut regs = Registers::new(1, 3, 0);
        assert_eq!(f.step(0, &mut regs), Step::Halt);
        assert_eq!(regs, Registers::new(1, 3, 0));
    }

    #[test]
    fn test_ip_wraps_in_persistent_mode() {
        let f = Fixture::new(4, 1, 1, &[0, 0, 0, 0]);
        let mut regs = Registers::new(3, 0, 0);
        assert_eq!(f.step(0, &mut regs), Step::Continue);
        assert_eq!(regs.instruction_pointer, 0);
    }

    #[test]
    fn test_tape_end_halts_in_run_mode() {
        let mut f = Fixture::new(4, 1, 1, &[0, 0, 0, 62]);
        f.exec = ExecConfig::run_to_completion();
        let mut regs = Registers::new(3, 0, 0);
        assert_eq!(f.step(0, &mut regs), Step::Halt);
        // The last instruction still took effect.
        assert_eq!(regs.head0, 1);
    }

    #[test]
    fn test_zero_opcode_policy() {
        let mut f = Fixture::new(4, 1, 1, &[0, 0, 0, 0]);
        let mut regs = Registers::default();
        assert_eq!(f.step(0, &mut regs), Step::Continue);
        assert_eq!(regs.instruction_pointer, 1);

        f.exec.halt_on_zero_opcode = true;
        let mut regs = Registers::default();
        assert_eq!(f.step(0, &mut regs), Step::Halt);
        assert_eq!(regs, Registers::default());
    }

    #[test]
    fn test_noop_bytes() {
        let f = Fixture::new(4, 1, 1, &[b'A' as u32, 200, 1, 0]);
        let mut regs = Registers::new(0, 2, 1);
        f.step(0, &mut regs);
        f.step(0, &mut regs);
        assert_eq!(regs, Registers::new(2, 2, 1));
        assert_eq!(f.tape.snapshot(), vec![b'A' as u32, 200, 1, 0]);
    }

    #[test]
    fn test_disassemble() {
        assert_eq!(Bff::disassemble(&[91, 43, 93, 0, b'x']), "[+]__");
        assert!(Bff::is_instruction(b','));
        assert!(!Bff::is_instruction(0));
    }
}
