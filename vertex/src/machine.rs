//! The microsequencer: the tick/tock engine that drives everything else.

use emu_core::{Bus, Observable, Tickable, Value};

use crate::address_unit;
use crate::alu;
use crate::control_word::ControlWord;
use crate::flags::Flags;
use crate::interrupt::InterruptBacking;
use crate::registers::{code, Registers};
use crate::rom::{ControlRom, EntryPoint};

/// The interrupt-call opcode the sequencer injects into `INSTRUCTION` when
/// dispatching a latched peripheral interrupt.
pub const INTCAL: u8 = 1;

/// The machine: register file, flags, micro-tick counter, control ROM, and
/// whatever [`Bus`] backs RAM.
pub struct Machine<B: Bus> {
    registers: Registers,
    flags: Flags,
    micro: u8,
    bus: B,
    rom: ControlRom,
    interrupt: Box<dyn InterruptBacking>,
    raised_peripheral: Option<u8>,
    halted: bool,
    cycles: u64,
}

impl<B: Bus> Machine<B> {
    #[must_use]
    pub fn new(rom: ControlRom, bus: B, interrupt: Box<dyn InterruptBacking>) -> Self {
        Self {
            registers: Registers::new(),
            flags: Flags::new(),
            micro: 0,
            bus,
            rom,
            interrupt,
            raised_peripheral: None,
            halted: false,
            cycles: 0,
        }
    }

    /// Seed `COUNTER`/`STACK` from a program installation's entry point.
    pub fn seed(&mut self, entry: EntryPoint) {
        self.registers.set_counter(entry.counter);
        self.registers.set_stack(entry.stack);
    }

    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Directly poke a register, bypassing the bus. For test fixtures and
    /// debug tooling that need to seed state a control ROM can't reach in
    /// one cycle.
    pub fn set_register(&mut self, reg: u8, value: u8) {
        self.registers.write(reg, value);
    }

    fn control_index(&self) -> u16 {
        let flags = u16::from(self.flags.as_byte());
        let instruction = u16::from(self.registers.read(code::INSTRUCTION));
        (flags << 12) | (instruction << 4) | u16::from(self.micro & 0x0F)
    }

    fn fetch(&mut self) -> ControlWord {
        let index = self.control_index();
        let word = ControlWord::new(self.rom.fetch(index));
        self.micro = self.micro.wrapping_add(1) & 0x0F;
        word
    }

    fn apply_increments(&mut self, cw: ControlWord) {
        if cw.counter_inc() {
            let counter = self.registers.counter();
            if counter == 0xFFFF {
                log::error!("COUNTER overflow: wrapped from 0xFFFF to 0x0000");
            }
            self.registers.set_counter(address_unit::increment(counter));
        }
        if cw.address_inc() {
            self.registers.set_address(address_unit::increment(self.registers.address()));
        }
        if cw.stack_inc() {
            self.registers.set_stack(address_unit::increment(self.registers.stack()));
        }
        if cw.stack_dec() {
            self.registers.set_stack(address_unit::decrement(self.registers.stack()));
        }
    }

    fn drive_bus(&mut self, cw: ControlWord) -> u8 {
        let mut bus_value = 0u8;

        if cw.out_reg() != code::NONE {
            bus_value = self.registers.read(cw.out_reg());
        }

        match cw.flag_out() {
            0 => {}
            1 => bus_value = u8::from(self.flags.zero()),
            2 => bus_value = u8::from(self.flags.sign()),
            3 => bus_value = self.flags.as_byte(),
            _ => unreachable!("flag_out is a 2-bit field"),
        }

        if cw.ram_out() {
            bus_value = self.bus.read(self.registers.address());
        }

        if cw.interrupt_enable() {
            self.interrupt.set_enabled(true);
        }
        if self.interrupt.enabled() {
            for slot in 0..crate::interrupt::RAISE_LINES {
                if self.interrupt.raise(slot) {
                    self.interrupt.clear_raise(slot);
                    self.interrupt.set_enabled(false);
                    self.raised_peripheral = Some(slot as u8);
                    break;
                }
            }
        }

        if let Some(result) = alu::eval(
            cw.alu_op(),
            self.registers.read(code::A),
            self.registers.read(code::A_TEMP),
            self.flags.carry(),
        ) {
            bus_value = result.value;
            if let Some(carry) = result.carry {
                self.flags.set_carry(carry);
            }
        }

        bus_value
    }

    fn latch_bus(&mut self, cw: ControlWord, bus_value: u8) {
        if cw.in_reg() != code::NONE {
            self.registers.write(cw.in_reg(), bus_value);
            if cw.in_reg() == code::A {
                self.flags.set_zero_sign(bus_value);
            }
        }

        if cw.move_address_counter() {
            self.registers.set_address(self.registers.counter());
        }
        if cw.move_address_stack() {
            self.registers.set_address(self.registers.stack());
        }
        if cw.move_address_hl() {
            self.registers.set_address(self.registers.hl());
        }
        if cw.move_counter_interrupt() {
            self.registers.set_counter(self.interrupt.handler_address());
        }

        if cw.ram_in() {
            self.bus.write(self.registers.address(), bus_value);
        }

        if cw.flag_in() {
            self.flags = Flags::from_byte(bus_value);
        }

        if cw.reset_micro_tick() {
            self.micro = 0;
            if let Some(slot) = self.raised_peripheral.take() {
                self.registers.write(code::INSTRUCTION, INTCAL);
                self.interrupt.clear_raise(slot as usize);
            }
        }

        if cw.out() {
            println!("OUTPUT: {bus_value}");
        }

        if cw.halt() {
            self.halted = true;
        }
    }

    /// Run one full tick/tock cycle, unless already halted.
    pub fn step(&mut self) {
        if self.halted {
            return;
        }
        let cw = self.fetch();
        self.apply_increments(cw);
        let bus_value = self.drive_bus(cw);
        self.latch_bus(cw, bus_value);
        self.cycles += 1;
        log::debug!("cycle {}: {}", self.cycles, cw);
    }

    /// Run until the machine halts.
    pub fn run(&mut self) {
        while !self.halted {
            self.step();
        }
    }
}

impl<B: Bus> Tickable for Machine<B> {
    fn tick(&mut self) {
        self.step();
    }
}

impl<B: Bus> Observable for Machine<B> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "a" => Some(Value::U8(self.registers.read(code::A))),
            "b" => Some(Value::U8(self.registers.read(code::B))),
            "c" => Some(Value::U8(self.registers.read(code::C))),
            "counter" => Some(Value::U16(self.registers.counter())),
            "address" => Some(Value::U16(self.registers.address())),
            "stack" => Some(Value::U16(self.registers.stack())),
            "hl" => Some(Value::U16(self.registers.hl())),
            "flags.zero" => Some(Value::Bool(self.flags.zero())),
            "flags.sign" => Some(Value::Bool(self.flags.sign())),
            "flags.carry" => Some(Value::Bool(self.flags.carry())),
            "halted" => Some(Value::Bool(self.halted)),
            "cycles" => Some(Value::U64(self.cycles)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "a", "b", "c", "counter", "address", "stack", "hl", "flags.zero", "flags.sign",
            "flags.carry", "halted", "cycles",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::LocalInterrupt;
    use emu_core::SimpleBus;

    /// A control ROM with every word set to `word` except where `patch`
    /// overrides a specific index.
    fn rom_with(patches: &[(u16, u32)]) -> ControlRom {
        let mut bytes = vec![0u8; crate::rom::CONTROL_ROM_ENTRIES * 4];
        for &(index, word) in patches {
            let offset = index as usize * 4;
            bytes[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.rom");
        std::fs::write(&path, &bytes).unwrap();
        ControlRom::load(&path).unwrap()
    }

    fn machine_with(patches: &[(u16, u32)]) -> Machine<SimpleBus> {
        let rom = rom_with(patches);
        Machine::new(rom, SimpleBus::new(), Box::new(LocalInterrupt::new()))
    }

    #[test]
    fn halt_takes_effect_between_cycles_not_mid_cycle() {
        // instruction 0, micro 0: load A from OUT=NONE with ALU op 0 (no-op),
        // but assert HALT. The whole tock must still run before halted=true
        // is observed by the *next* step() call.
        let halt_bit = 1u32 << 28;
        let mut m = machine_with(&[(0, halt_bit)]);
        assert!(!m.halted());
        m.step();
        assert!(m.halted());
        let cycles_before = m.cycles();
        m.step();
        assert_eq!(m.cycles(), cycles_before, "step() after halt is a no-op");
    }

    #[test]
    fn interrupt_dispatch_writes_intcal_on_reset_micro_tick() {
        let reset_bit = 1u32 << 25;
        let interrupt_enable_bit = 1u32 << 26;
        let mut m = machine_with(&[(0, interrupt_enable_bit), (0x10, reset_bit)]);
        // crude peripheral simulation: reach into the boxed interrupt trait
        // object isn't possible from here, so this is covered end-to-end in
        // tests/scenarios.rs instead, grounded on a concrete LocalInterrupt.
        m.step(); // enables interrupts; control index becomes 0x10 next (instr 0 unchanged, micro 1)
        assert_eq!(m.registers().read(code::INSTRUCTION), 0);
    }
}
