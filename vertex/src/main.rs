use std::process::ExitCode;

use vertex::cli::{self, RunConfig};
use vertex::interrupt::{InterruptBacking, LocalInterrupt, SharedInterrupt};
use vertex::memory::{Ram, SharedRam};
use vertex::rom::{install_program, load_program, ControlRom};
use vertex::{Machine, VertexError};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match cli::parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vertex: {e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.filter())
        .target(env_logger::Target::Stderr)
        .init();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: RunConfig) -> Result<(), VertexError> {
    let rom = ControlRom::load(&config.control_rom_path)?;
    let program = load_program(&config.program_rom_path)?;

    let interrupt: Box<dyn InterruptBacking> = match &config.interrupt_shm {
        Some(path) => Box::new(SharedInterrupt::open(path)?),
        None => Box::new(LocalInterrupt::new()),
    };

    match config.ram_shm {
        Some(path) => {
            let mut bus = SharedRam::open(&path)?;
            let entry = install_program(&mut bus, &program, config.load_mode);
            let mut machine = Machine::new(rom, bus, interrupt);
            machine.seed(entry);
            machine.run();
        }
        None => {
            let mut bus = Ram::new();
            let entry = install_program(&mut bus, &program, config.load_mode);
            let mut machine = Machine::new(rom, bus, interrupt);
            machine.seed(entry);
            machine.run();
        }
    }

    Ok(())
}
