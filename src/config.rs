use crate::error::{Error, Result};

/// How a tick executes programs.
///
/// `persist_registers = true` is the single-step mode: registers survive
/// between ticks and each tick runs one instruction per program.
/// `persist_registers = false` is the run-to-completion mode: each tick
/// restarts every program at `{0, 0, 0}` and runs it to a halt or the
/// iteration bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecConfig {
    pub persist_registers: bool,
    /// Treat opcode 0 as an explicit halt instead of a no-op.
    pub halt_on_zero_opcode: bool,
    /// Iteration bound for run-to-completion ticks. `None` means
    /// `max(256, 4 * tape_length)`. Ignored by single-step ticks.
    pub max_iterations: Option<u32>,
}

impl ExecConfig {
    pub fn persistent() -> Self {
        Self {
            persist_registers: true,
            halt_on_zero_opcode: false,
            max_iterations: None,
        }
    }

    pub fn run_to_completion() -> Self {
        Self {
            persist_registers: false,
            ..Self::persistent()
        }
    }

    pub fn iteration_limit(&self, tape_length: usize) -> usize {
        match self.max_iterations {
            Some(limit) => limit as usize,
            None => default_iteration_limit(tape_length),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self::persistent()
    }
}

pub fn default_iteration_limit(tape_length: usize) -> usize {
    (4 * tape_length).max(256)
}

/// Configuration for a simulation instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Cells per program tape.
    pub tape_length: usize,
    /// Grid width in programs.
    pub width: usize,
    /// Grid height in programs.
    pub height: usize,
    pub exec: ExecConfig,
    /// Worker threads. `None` uses rayon's default (one per core).
    pub threads: Option<usize>,
}

impl SimConfig {
    /// A `world_size x world_size` world of `tape_side^2`-cell tapes.
    pub fn square(tape_side: usize, world_size: usize) -> Self {
        Self {
            tape_length: tape_side * tape_side,
            width: world_size,
            height: world_size,
            ..Default::default()
        }
    }

    pub fn programs(&self) -> usize {
        self.width * self.height
    }

    /// Reject configurations that cannot be simulated. Runs before any
    /// buffer is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.tape_length == 0 {
            return Err(Error::Config("tape_length must be positive".to_string()));
        }
        if u32::try_from(self.tape_length).is_err() {
            return Err(Error::Config(format!(
                "tape_length {} does not fit the 32-bit register layout",
                self.tape_length
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let programs = self.width.checked_mul(self.height).ok_or_else(|| {
            Error::Config(format!("grid {}x{} overflows", self.width, self.height))
        })?;
        programs.checked_mul(self.tape_length).ok_or_else(|| {
            Error::Config(format!(
                "{programs} programs x {} cells overflows",
                self.tape_length
            ))
        })?;
        if self.threads == Some(0) {
            return Err(Error::Config("threads must be positive".to_string()));
        }
        if self.exec.max_iterations == Some(0) {
            return Err(Error::Config("max_iterations must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tape_length: 16,
            width: 256,
            height: 256,
            exec: ExecConfig::default(),
            threads: None,
        }
    }
}

/// Parse a "WxH" grid specification string.
pub fn parse_grid(s: &str) -> Result<(usize, usize)> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid grid format '{s}', expected WxH (e.g. 256x128)"
        )));
    }
    let w = parts[0]
        .parse::<usize>()
        .map_err(|e| Error::Config(format!("Invalid grid width: {e}")))?;
    let h = parts[1]
        .parse::<usize>()
        .map_err(|e| Error::Config(format!("Invalid grid height: {e}")))?;
    if w == 0 || h == 0 {
        return Err(Error::Config("Grid dimensions must be positive".to_string()));
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_config() {
        let config = SimConfig::square(4, 8);
        assert_eq!(config.tape_length, 16);
        assert_eq!(config.programs(), 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_tape_rejected() {
        let config = SimConfig {
            tape_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_grid_rejected() {
        let config = SimConfig {
            width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = SimConfig {
            height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = SimConfig {
            threads: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_iteration_limit() {
        assert_eq!(default_iteration_limit(4), 256);
        assert_eq!(default_iteration_limit(100), 400);
        let exec = ExecConfig {
            max_iterations: Some(10),
            ..ExecConfig::run_to_completion()
        };
        assert_eq!(exec.iteration_limit(100), 10);
    }

    #[test]
    fn test_parse_grid() {
        assert_eq!(parse_grid("240x135").unwrap(), (240, 135));
        assert!(parse_grid("240").is_err());
        assert!(parse_grid("0x5").is_err());
        assert!(parse_grid("axb").is_err());
    }
}
