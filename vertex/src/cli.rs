//! Command-line argument parsing.
//!
//! Hand-rolled rather than pulled in from a crate: the surface is tiny
//! (two required paths, one optional level, two optional shared-memory
//! flags) and matches how the rest of this corpus's emulator binaries
//! parse arguments.

use std::path::PathBuf;

use crate::error::ArgError;
use crate::rom::LoadMode;

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Result<Self, ArgError> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            other => Err(ArgError::UnknownLogLevel(other.to_string())),
        }
    }

    #[must_use]
    pub fn filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

/// Fully parsed run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub control_rom_path: PathBuf,
    pub program_rom_path: PathBuf,
    pub log_level: LogLevel,
    pub ram_shm: Option<PathBuf>,
    pub interrupt_shm: Option<PathBuf>,
    pub load_mode: LoadMode,
}

const USAGE: &str = "usage: vertex <control-rom> <program-rom> [log-level] \
[--ram-shm <path>] [--interrupt-shm <path>] [--legacy-load]";

/// Parse `args` (excluding the program name).
pub fn parse_args(args: &[String]) -> Result<RunConfig, ArgError> {
    let mut positional = Vec::new();
    let mut ram_shm = None;
    let mut interrupt_shm = None;
    let mut load_mode = LoadMode::High;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ram-shm" => {
                let value = iter
                    .next()
                    .ok_or_else(|| ArgError::MissingValue("--ram-shm".to_string()))?;
                ram_shm = Some(PathBuf::from(value));
            }
            "--interrupt-shm" => {
                let value = iter
                    .next()
                    .ok_or_else(|| ArgError::MissingValue("--interrupt-shm".to_string()))?;
                interrupt_shm = Some(PathBuf::from(value));
            }
            "--legacy-load" => load_mode = LoadMode::Legacy,
            other => positional.push(other.to_string()),
        }
    }

    if positional.len() < 2 {
        return Err(ArgError::Usage(USAGE.to_string()));
    }

    let control_rom_path = PathBuf::from(&positional[0]);
    let program_rom_path = PathBuf::from(&positional[1]);
    let log_level = match positional.get(2) {
        Some(level) => LogLevel::parse(level)?,
        None => LogLevel::default(),
    };

    Ok(RunConfig {
        control_rom_path,
        program_rom_path,
        log_level,
        ram_shm,
        interrupt_shm,
        load_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn requires_two_positional_arguments() {
        let err = parse_args(&args(&["only-one"])).unwrap_err();
        assert!(matches!(err, ArgError::Usage(_)));
    }

    #[test]
    fn parses_minimal_invocation() {
        let cfg = parse_args(&args(&["control.rom", "program.bin"])).unwrap();
        assert_eq!(cfg.control_rom_path, PathBuf::from("control.rom"));
        assert_eq!(cfg.program_rom_path, PathBuf::from("program.bin"));
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.load_mode, LoadMode::High);
        assert!(cfg.ram_shm.is_none());
    }

    #[test]
    fn parses_log_level_and_shm_flags() {
        let cfg = parse_args(&args(&[
            "control.rom",
            "program.bin",
            "debug",
            "--ram-shm",
            "/tmp/ram",
            "--interrupt-shm",
            "/tmp/irq",
            "--legacy-load",
        ]))
        .unwrap();
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.ram_shm, Some(PathBuf::from("/tmp/ram")));
        assert_eq!(cfg.interrupt_shm, Some(PathBuf::from("/tmp/irq")));
        assert_eq!(cfg.load_mode, LoadMode::Legacy);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = parse_args(&args(&["a", "b", "verbose"])).unwrap_err();
        assert!(matches!(err, ArgError::UnknownLogLevel(_)));
    }
}
