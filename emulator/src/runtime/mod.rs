use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::constants::{self as C, Address, Word};
use crate::loader::{LoadError, LoadReport, Loader, RomSource};
use crate::status::Status;

mod alu;
mod instructions;
mod interrupt;
mod memory;
mod registers;

pub use self::instructions::{Instruction, Location, Opcode};
pub use self::interrupt::{vector_slot, Interrupt};
pub use self::memory::Memory;
pub use self::registers::{Flag, Flags, Mode, Reg, Registers};

use self::instructions::Fetch;

/// Why a step did not complete normally.
///
/// `ExecutionEnded` is the graceful end of a program. The other variants are fatal: the
/// driver must stop stepping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("execution ended")]
    ExecutionEnded,

    #[error("program counter out of bounds ({pc:#x})")]
    MemoryOutOfBounds { pc: usize },

    #[error("unknown instruction {opcode:#04x} at {address:#06x}")]
    UnknownInstruction { opcode: Word, address: usize },
}

type Result<T> = std::result::Result<T, ProcessorError>;

pub struct Computer {
    pub registers: Registers,
    pub memory: Memory,
    loader: Loader,

    /// Set while a call frame is being pushed. Flags raised meanwhile do not dispatch.
    saving_frame: bool,
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {:?}, memory: [...] }}",
            self.registers
        )
    }
}

impl Fetch for Computer {
    fn byte(&mut self) -> Word {
        let byte = self.memory.fetch(self.registers.pc);
        self.registers.pc += 1;
        byte
    }
}

impl Computer {
    /// A computer with blank memory, reading ROMs from `source`
    #[must_use]
    pub fn new(source: impl RomSource + 'static) -> Self {
        Self {
            registers: Registers::default(),
            memory: Memory::default(),
            loader: Loader::new(source),
            saving_frame: false,
        }
    }

    /// Start a computer by loading the kernel ROM
    ///
    /// # Errors
    ///
    /// Fails if the kernel ROM cannot be loaded.
    pub fn boot(source: impl RomSource + 'static) -> std::result::Result<Self, LoadError> {
        Self::boot_with(source, C::KERNEL_IMAGE)
    }

    /// Start a computer by loading the given ROM as the kernel
    ///
    /// # Errors
    ///
    /// Fails if the kernel ROM cannot be loaded.
    #[tracing::instrument(skip(source))]
    pub fn boot_with(
        source: impl RomSource + 'static,
        kernel: &str,
    ) -> std::result::Result<Self, LoadError> {
        let mut computer = Self::new(source);
        let report = computer.load(kernel)?;
        computer.jump(C::KERNEL_ORIGIN);
        info!(
            bytes = report.bytes_written,
            code_start = report.code_start,
            "Kernel loaded"
        );
        Ok(computer)
    }

    /// Load a ROM into memory, without touching the registers
    ///
    /// # Errors
    ///
    /// Fails if the ROM cannot be opened or is malformed.
    pub fn load(&mut self, name: &str) -> std::result::Result<LoadReport, LoadError> {
        self.loader.load(name, &mut self.memory)
    }

    /// Take a snapshot of the computer state
    #[must_use]
    pub fn status(&self) -> Status {
        Status {
            registers: self.registers.clone(),
            memory: self.memory.clone(),
        }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.registers.is_halted()
    }

    /// Execute one instruction
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::ExecutionEnded`] once halted, and a fatal error if the
    /// program counter left memory or points to an unknown instruction.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<()> {
        if self.registers.is_halted() {
            return Err(ProcessorError::ExecutionEnded);
        }

        let address = self.registers.pc;
        if address >= C::MEMORY_LENGTH {
            return Err(ProcessorError::MemoryOutOfBounds { pc: address });
        }

        let byte = self.byte();
        let opcode = Opcode::from_byte(byte).ok_or(ProcessorError::UnknownInstruction {
            opcode: byte,
            address,
        })?;
        let inst = Instruction::decode(opcode, self);
        debug!(address, "Executing instruction \"{}\"", inst);
        inst.execute(self)?;
        trace!(registers = %self.registers, "Register state");
        Ok(())
    }

    /// Run until the program halts
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the program, if any.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.step() {
                Ok(()) => {}
                Err(ProcessorError::ExecutionEnded) => return Ok(()),
                Err(v) => return Err(v),
            }
        }
    }

    /// Run at most `steps` instructions, returning how many completed before the program
    /// halted or the budget ran out
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the program, if any.
    #[tracing::instrument(skip(self))]
    pub fn run_for(&mut self, steps: usize) -> Result<usize> {
        for done in 0..steps {
            match self.step() {
                Ok(()) => {}
                Err(ProcessorError::ExecutionEnded) => return Ok(done),
                Err(v) => return Err(v),
            }
        }
        Ok(steps)
    }

    /// Dispatch an interrupt by identifier.
    ///
    /// Nothing happens if interrupts are disabled, if the identifier has no slot in the
    /// vector table or if no handler is registered in its slot.
    #[tracing::instrument(skip(self))]
    pub fn dispatch(&mut self, id: u8) {
        if !self.registers.interrupts_enabled() {
            debug!("Interrupts are disabled");
            return;
        }

        let Some(slot) = vector_slot(id) else {
            debug!("Interrupt has no vector");
            return;
        };

        let handler = self.memory.read_address(slot);
        if handler == 0 {
            debug!(slot, "No handler registered");
            return;
        }

        debug!(handler, "Calling interrupt handler");
        self.call(handler);
    }

    pub fn interrupt(&mut self, interrupt: Interrupt) {
        debug!(%interrupt, "Interrupt raised");
        self.dispatch(interrupt.id());
    }

    /// Store a key code in the keyboard buffer and raise the keyboard interrupt
    pub fn key_down(&mut self, key: Word) {
        self.memory.write(C::KEYBOARD_BUFFER.start, key);
        self.interrupt(Interrupt::Keyboard);
    }

    fn jump(&mut self, address: Address) {
        debug!("Jumping to address {:#06x}", address);
        self.registers.pc = usize::from(address);
    }

    /// Put the result of an arithmetic operation in the accumulator
    fn accumulate(&mut self, result: Option<Word>) {
        if let Some(value) = result {
            self.registers.acc = value;
        } else {
            debug!(acc = self.registers.acc, "Accumulator overflow");
            self.registers.acc = 0;
            self.raise(Flag::AccOverflow);
        }
    }

    /// Set a flag and dispatch its interrupt
    fn raise(&mut self, flag: Flag) {
        self.registers.flags.insert(flag.bits());
        if self.saving_frame {
            debug!(%flag, "Flag raised while saving a call frame");
        } else {
            self.interrupt(flag.interrupt());
        }
    }

    fn push(&mut self, value: Word) {
        let sp = self.registers.sp;
        if sp.saturating_add(1) >= C::KERNEL_ORIGIN {
            warn!(sp, value, "Stack overflow");
            self.raise(Flag::StackOverflow);
            return;
        }

        trace!(sp, value, "push");
        self.memory.write(sp, value);
        self.registers.sp = sp + 1;
    }

    fn pop(&mut self) -> Word {
        if self.registers.sp > C::STACK_BASE {
            self.registers.sp -= 1;
        }

        let value = self.memory.read(self.registers.sp);
        trace!(sp = self.registers.sp, value, "pop");
        value
    }

    /// Save the return address, the accumulator and every register, then jump
    fn call(&mut self, target: Address) {
        let ret = Address::try_from(self.registers.pc % C::MEMORY_LENGTH).unwrap_or_default();
        let [high, low] = ret.to_be_bytes();

        let nested = std::mem::replace(&mut self.saving_frame, true);
        self.push(high);
        self.push(low);
        self.push(self.registers.acc);
        for value in self.registers.general {
            self.push(value);
        }
        self.saving_frame = nested;

        self.jump(target);
    }

    /// Restore what [`Computer::call`] saved and jump back
    fn ret(&mut self) {
        for index in (0..C::REGISTER_COUNT).rev() {
            let value = self.pop();
            self.registers.general[index] = value;
        }
        self.registers.acc = self.pop();

        let low = self.pop();
        let high = self.pop();
        let ret = Address::from_be_bytes([high, low]);
        debug!("Returning to {:#06x}", ret);
        self.jump(ret);
    }

    /// Load the ROM whose NUL-terminated name is stored at `name`, raising the I/O error
    /// flag on failure
    fn load_disk(&mut self, name: Address) {
        let name = String::from_utf8_lossy(&self.memory.read_string(name)).into_owned();
        match self.load(&name) {
            Ok(report) => debug!(
                name,
                bytes = report.bytes_written,
                code_start = report.code_start,
                "Disk loaded"
            ),
            Err(error) => {
                warn!(name, %error, "Could not load disk");
                self.raise(Flag::IoError);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::loader::InMemoryDrive;

    const ORIGIN: Address = C::KERNEL_ORIGIN;

    fn write(computer: &mut Computer, address: Address, bytes: &[Word]) {
        for (offset, byte) in bytes.iter().enumerate() {
            let offset = Address::try_from(offset).unwrap();
            computer.memory.write(address + offset, *byte);
        }
    }

    fn computer_with(drive: InMemoryDrive, program: &[Word]) -> Computer {
        let mut computer = Computer::new(drive);
        write(&mut computer, ORIGIN, program);
        computer
    }

    fn computer(program: &[Word]) -> Computer {
        computer_with(InMemoryDrive::default(), program)
    }

    fn op(opcode: Opcode) -> Word {
        opcode.into()
    }

    #[test]
    fn halt_test() {
        let mut computer = computer(&[op(Opcode::Hlt)]);

        assert_eq!(computer.step(), Err(ProcessorError::ExecutionEnded));
        assert!(computer.is_halted());
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 1);

        for _ in 0..3 {
            assert_eq!(computer.step(), Err(ProcessorError::ExecutionEnded));
            assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 1);
        }
    }

    #[test]
    fn out_of_bounds_test() {
        let mut computer = computer(&[]);
        computer.registers.pc = C::MEMORY_LENGTH;
        let before = computer.registers.clone();

        assert_eq!(
            computer.step(),
            Err(ProcessorError::MemoryOutOfBounds {
                pc: C::MEMORY_LENGTH
            })
        );
        assert_eq!(computer.registers, before);
    }

    #[test]
    fn run_off_the_end_test() {
        let mut computer = computer(&[]);
        write(&mut computer, 0xFFFE, &[op(Opcode::Addi), 0x01]);
        computer.registers.pc = 0xFFFE;

        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 1);
        assert_eq!(
            computer.step(),
            Err(ProcessorError::MemoryOutOfBounds {
                pc: C::MEMORY_LENGTH
            })
        );
    }

    #[test]
    fn operands_past_the_end_test() {
        let mut computer = computer(&[]);
        write(&mut computer, 0xFFFF, &[op(Opcode::Addi)]);
        computer.registers.pc = 0xFFFF;
        computer.registers.acc = 5;

        // The missing immediate reads as zero
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 5);
        assert_eq!(computer.registers.pc, C::MEMORY_LENGTH + 1);
    }

    #[test]
    fn unknown_instruction_test() {
        let mut computer = computer(&[0xFF]);
        let mut expected = computer.registers.clone();
        expected.pc += 1;

        assert_eq!(
            computer.step(),
            Err(ProcessorError::UnknownInstruction {
                opcode: 0xFF,
                address: usize::from(ORIGIN)
            })
        );
        assert_eq!(computer.registers, expected);
    }

    #[test]
    #[rustfmt::skip]
    fn arithmetic_test() {
        let mut computer = computer(&[
            op(Opcode::Movi), 10, 1,
            op(Opcode::Addi), 5,
            op(Opcode::Add), 1,
            op(Opcode::Subi), 3,
            op(Opcode::Sub), 1,
            op(Opcode::Sil),
            op(Opcode::Sir),
            op(Opcode::Not),
        ]);

        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 5);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 15);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 12);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 2);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 4);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 2);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 0xFD);
        assert_eq!(computer.registers.flags, Flags::empty());
    }

    #[test]
    #[rustfmt::skip]
    fn bitwise_test() {
        let mut computer = computer(&[
            op(Opcode::Movi), 0b1010, 2,
            op(Opcode::And), 2,
            op(Opcode::Or), 2,
            op(Opcode::Xor), 2,
        ]);
        computer.registers.acc = 0b1100;

        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 0b1000);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 0b1010);
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 0);
    }

    #[test]
    fn add_overflow_test() {
        for (a, b) in [(255, 1), (200, 100), (128, 128), (1, 255)] {
            let mut computer = computer(&[op(Opcode::Addi), b]);
            computer.registers.acc = a;

            computer.step().unwrap();
            assert_eq!(computer.registers.acc, 0, "{a} + {b}");
            assert!(computer.registers.flag(Flag::AccOverflow));
            // Interrupts are disabled, execution continues
            assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 2);
        }
    }

    #[test]
    fn sub_overflow_test() {
        let mut computer = computer(&[op(Opcode::Sub), 4]);
        computer.registers.acc = 3;
        computer.registers.set(Reg(4), 4);

        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 0);
        assert!(computer.registers.flag(Flag::AccOverflow));
    }

    #[test]
    #[rustfmt::skip]
    fn overflow_dispatch_test() {
        let mut computer = computer(&[
            op(Opcode::Ein),
            op(Opcode::Addi), 200,
            op(Opcode::Addi), 100,
            op(Opcode::Hlt),
        ]);
        let slot = vector_slot(Interrupt::AccOverflow.id()).unwrap();
        computer.memory.write_address(slot, 0x0300);
        write(&mut computer, 0x0300, &[op(Opcode::Crn)]);

        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 200);
        computer.step().unwrap();

        assert_eq!(computer.registers.acc, 0);
        assert!(computer.registers.flag(Flag::AccOverflow));
        assert_eq!(computer.registers.pc, 0x0300);
        assert_eq!(computer.registers.sp, C::STACK_BASE + 19);

        // Returning resumes after the faulting instruction
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 5);
        assert_eq!(computer.registers.sp, C::STACK_BASE);
        assert_eq!(computer.step(), Err(ProcessorError::ExecutionEnded));
    }

    #[test]
    #[rustfmt::skip]
    fn call_return_test() {
        let mut computer = computer(&[
            op(Opcode::Movi), 1, 0,
            op(Opcode::Movi), 2, 15,
            op(Opcode::Addi), 7,
            op(Opcode::Cll), 0x03, 0x00,
            op(Opcode::Hlt),
        ]);
        write(
            &mut computer,
            0x0300,
            &[
                op(Opcode::Movi), 9, 0,
                op(Opcode::Movi), 9, 15,
                op(Opcode::Addi), 1,
                op(Opcode::Crn),
            ],
        );

        for _ in 0..3 {
            computer.step().unwrap();
        }
        let before = computer.registers.clone();

        // cll
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 0x0300);
        assert_eq!(computer.registers.sp, C::STACK_BASE + 19);
        assert_eq!(computer.memory.read(C::STACK_BASE), 0x02);
        assert_eq!(computer.memory.read(C::STACK_BASE + 1), 0x0B);
        assert_eq!(computer.memory.read(C::STACK_BASE + 2), 7);

        for _ in 0..3 {
            computer.step().unwrap();
        }
        assert_eq!(computer.registers.get(Reg(0)), 9);
        assert_eq!(computer.registers.get(Reg(15)), 9);
        assert_eq!(computer.registers.acc, 8);

        // crn
        computer.step().unwrap();
        assert_eq!(computer.registers.general, before.general);
        assert_eq!(computer.registers.acc, before.acc);
        assert_eq!(computer.registers.sp, before.sp);
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 11);
        assert_eq!(computer.step(), Err(ProcessorError::ExecutionEnded));
    }

    #[test]
    #[rustfmt::skip]
    fn stack_test() {
        let mut computer = computer(&[
            op(Opcode::Movi), 0x42, 3,
            op(Opcode::Psr), 3,
            op(Opcode::Addi), 0x24,
            op(Opcode::Psa),
            op(Opcode::Poa),
            op(Opcode::Por), 4,
        ]);

        for _ in 0..4 {
            computer.step().unwrap();
        }
        assert_eq!(computer.registers.sp, C::STACK_BASE + 2);

        computer.step().unwrap();
        assert_eq!(computer.registers.acc, 0x24);
        computer.step().unwrap();
        assert_eq!(computer.registers.get(Reg(4)), 0x42);
        assert_eq!(computer.registers.sp, C::STACK_BASE);
    }

    #[test]
    fn push_pop_round_trip_test() {
        let mut computer = computer(&[]);
        for sp in [C::STACK_BASE, 0x0150, C::KERNEL_ORIGIN - 2] {
            computer.registers.sp = sp;
            computer.push(0x5A);
            assert_eq!(computer.pop(), 0x5A);
            assert_eq!(computer.registers.sp, sp);
        }
        assert_eq!(computer.registers.flags, Flags::empty());
    }

    #[test]
    fn stack_overflow_test() {
        let mut computer = computer(&[]);
        computer.registers.sp = C::KERNEL_ORIGIN - 1;

        computer.push(0x77);
        assert!(computer.registers.flag(Flag::StackOverflow));
        assert_eq!(computer.registers.sp, C::KERNEL_ORIGIN - 1);
        assert_eq!(computer.memory.read(C::KERNEL_ORIGIN - 1), 0);
    }

    #[test]
    fn stack_overflow_dispatch_test() {
        let mut computer = computer(&[op(Opcode::Psa), op(Opcode::Hlt)]);
        computer.registers.mode.insert(Mode::INTERRUPT_ENABLE);
        let slot = vector_slot(Interrupt::StackOverflow.id()).unwrap();
        computer.memory.write_address(slot, 0x0300);
        computer.registers.sp = C::KERNEL_ORIGIN - 1;
        computer.registers.acc = 0x66;

        computer.step().unwrap();
        assert!(computer.registers.flag(Flag::StackOverflow));
        assert_eq!(computer.registers.pc, 0x0300);
        assert_eq!(computer.registers.sp, C::KERNEL_ORIGIN - 1);
        assert_eq!(computer.memory.read(C::KERNEL_ORIGIN - 1), 0);
    }

    #[test]
    fn stack_overflow_register_push_dispatch_test() {
        let mut computer = computer(&[op(Opcode::Psr), 3]);
        computer.registers.mode.insert(Mode::INTERRUPT_ENABLE);
        let slot = vector_slot(Interrupt::StackOverflow.id()).unwrap();
        computer.memory.write_address(slot, 0x0300);
        computer.registers.sp = C::KERNEL_ORIGIN - 1;

        computer.step().unwrap();
        assert!(computer.registers.flag(Flag::StackOverflow));
        assert_eq!(computer.registers.pc, 0x0300);
    }

    #[test]
    fn stack_underflow_test() {
        let mut computer = computer(&[]);
        computer.memory.write(C::STACK_BASE, 0x13);

        assert_eq!(computer.pop(), 0x13);
        assert_eq!(computer.pop(), 0x13);
        assert_eq!(computer.registers.sp, C::STACK_BASE);
    }

    #[test]
    fn stack_overflow_in_call_test() {
        let mut computer = computer(&[op(Opcode::Cll), 0x03, 0x00]);
        computer.registers.mode.insert(Mode::INTERRUPT_ENABLE);
        let slot = vector_slot(Interrupt::StackOverflow.id()).unwrap();
        computer.memory.write_address(slot, 0x0400);
        computer.registers.sp = C::KERNEL_ORIGIN - 5;

        computer.step().unwrap();
        assert!(computer.registers.flag(Flag::StackOverflow));
        assert_eq!(computer.registers.sp, C::KERNEL_ORIGIN - 1);
        assert_eq!(computer.registers.pc, 0x0300);
    }

    #[test]
    fn conditional_jump_test() {
        let cases = [
            (Opcode::Jeq, 0, true),
            (Opcode::Jeq, 1, false),
            (Opcode::Jne, 0, false),
            (Opcode::Jne, 1, true),
            (Opcode::Jgt, 0, false),
            (Opcode::Jgt, 0x80, true),
            (Opcode::Jlt, 0, false),
            (Opcode::Jlt, 0xFF, false),
        ];

        for (opcode, acc, taken) in cases {
            let mut computer = computer(&[op(opcode), 0x12, 0x34]);
            computer.registers.acc = acc;
            computer.step().unwrap();

            let expected = if taken { 0x1234 } else { usize::from(ORIGIN) + 3 };
            assert_eq!(computer.registers.pc, expected, "{opcode:?} with acc = {acc}");
        }
    }

    #[test]
    #[rustfmt::skip]
    fn flag_jump_test() {
        let program = [
            op(Opcode::Jfg), 2, 0x12, 0x34,
            op(Opcode::Cfg), 2,
            op(Opcode::Cfg), 9,
            op(Opcode::Jfg), 9, 0x12, 0x34,
        ];

        let mut computer = computer(&program);
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 4);

        let mut computer = self::computer(&program);
        computer.registers.flags = Flags::all();
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 0x1234);

        computer.registers.pc = usize::from(ORIGIN) + 4;
        computer.step().unwrap();
        assert_eq!(
            computer.registers.flags,
            Flags::ACC_OVERFLOW | Flags::STACK_OVERFLOW
        );
        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 12);
    }

    #[test]
    #[rustfmt::skip]
    fn move_test() {
        let mut computer = computer(&[
            op(Opcode::Ldr), 0x03, 0x00, 1,
            op(Opcode::Mov), 1, 2,
            op(Opcode::Str), 2, 0x03, 0x01,
            op(Opcode::Tra), 2,
            op(Opcode::Addi), 1,
            op(Opcode::Tar), 3,
            op(Opcode::Movi), 0x99, 200,
        ]);
        computer.memory.write(0x0300, 0x55);

        for _ in 0..7 {
            computer.step().unwrap();
        }
        assert_eq!(computer.registers.get(Reg(1)), 0x55);
        assert_eq!(computer.registers.get(Reg(2)), 0x55);
        assert_eq!(computer.memory.read(0x0301), 0x55);
        assert_eq!(computer.registers.acc, 0x56);
        assert_eq!(computer.registers.get(Reg(3)), 0x56);
        assert_eq!(computer.registers.get(Reg(200)), 0);
    }

    #[test]
    #[rustfmt::skip]
    fn indirect_test() {
        let mut computer = computer(&[
            op(Opcode::Inr), 0x03, 0x00, 1,
            op(Opcode::Movi), 0x77, 2,
            op(Opcode::Inw), 2, 0x03, 0x02,
        ]);
        computer.memory.write_address(0x0300, 0x0500);
        computer.memory.write(0x0500, 0x31);
        computer.memory.write_address(0x0302, 0x0600);

        for _ in 0..3 {
            computer.step().unwrap();
        }
        assert_eq!(computer.registers.get(Reg(1)), 0x31);
        assert_eq!(computer.memory.read(0x0600), 0x77);
        assert_eq!(computer.memory.read(0x0302), 0x06);
    }

    #[test]
    fn movm_test() {
        let mut computer = computer(&[op(Opcode::Movm), 0xAB, 0xCD, 0x03, 0x00]);
        computer.memory.write(0xABCD, 0x11);

        computer.step().unwrap();
        assert_eq!(computer.memory.read(0x0300), 0xAB);
        assert_eq!(computer.memory.read(0x0301), 0xCD);
    }

    #[test]
    fn mode_test() {
        let mut computer = computer(&[
            op(Opcode::Pmd),
            op(Opcode::Ein),
            op(Opcode::Din),
        ]);

        computer.step().unwrap();
        assert!(computer.registers.is_protected());
        computer.step().unwrap();
        assert!(computer.registers.interrupts_enabled());
        computer.step().unwrap();
        assert!(!computer.registers.interrupts_enabled());
    }

    #[test]
    #[rustfmt::skip]
    fn software_interrupt_test() {
        let mut computer = computer(&[
            op(Opcode::Int), 127,
            op(Opcode::Int), 200,
            op(Opcode::Int), 5,
        ]);
        computer.registers.mode.insert(Mode::INTERRUPT_ENABLE);
        computer.memory.write_address(vector_slot(127).unwrap(), 0x0280);
        write(
            &mut computer,
            0x0280,
            &[op(Opcode::Crn)],
        );

        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 0x0280);
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 2);

        // Outside of the vector table, then an empty slot
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 4);
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 6);
        assert_eq!(computer.registers.sp, C::STACK_BASE);
    }

    #[test]
    fn disabled_interrupts_test() {
        let mut computer = computer(&[op(Opcode::Int), 1]);
        computer.memory.write_address(vector_slot(1).unwrap(), 0x0280);

        computer.step().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 2);
    }

    #[test]
    fn key_down_test() {
        let mut computer = computer(&[]);
        computer.registers.mode.insert(Mode::INTERRUPT_ENABLE);
        let slot = vector_slot(Interrupt::Keyboard.id()).unwrap();
        computer.memory.write_address(slot, 0x0280);

        computer.key_down(b'a');
        assert_eq!(computer.memory.read(C::KEYBOARD_BUFFER.start), b'a');
        assert_eq!(computer.registers.pc, 0x0280);
    }

    #[test]
    fn disk_test() {
        let drive = InMemoryDrive::default().with_image(
            "disk.rom",
            vec![0xFF, 0xFE, 0xFE, 0xFF, 0x01, 0x04, 0x00, op(Opcode::Hlt)],
        );
        let mut computer = computer_with(
            drive,
            &[op(Opcode::Dsk), 0x03, 0x00, op(Opcode::Jmp), 0x04, 0x00],
        );
        write(&mut computer, 0x0300, b"disk.rom\0");

        computer.run().unwrap();
        assert_eq!(computer.memory.read(0x0400), op(Opcode::Hlt));
        assert_eq!(computer.registers.pc, 0x0401);
        assert!(!computer.registers.flag(Flag::IoError));
    }

    #[test]
    #[rustfmt::skip]
    fn disk_error_test() {
        let mut computer = computer(&[
            op(Opcode::Ein),
            op(Opcode::Dsk), 0x03, 0x00,
            op(Opcode::Hlt),
        ]);
        write(&mut computer, 0x0300, b"missing.rom\0");
        let slot = vector_slot(Interrupt::IoError.id()).unwrap();
        computer.memory.write_address(slot, 0x0280);
        write(&mut computer, 0x0280, &[op(Opcode::Crn)]);

        computer.step().unwrap();
        computer.step().unwrap();
        assert!(computer.registers.flag(Flag::IoError));
        assert_eq!(computer.registers.pc, 0x0280);

        computer.run().unwrap();
        assert_eq!(computer.registers.pc, usize::from(ORIGIN) + 5);
    }

    #[test]
    #[rustfmt::skip]
    fn run_test() {
        let mut computer = computer(&[
            op(Opcode::Addi), 5,
            op(Opcode::Subi), 1,
            op(Opcode::Jne), 0x02, 0x02,
            op(Opcode::Hlt),
        ]);

        computer.run().unwrap();
        assert_eq!(computer.registers.acc, 0);
        assert!(computer.is_halted());
        assert_eq!(computer.run(), Ok(()));
    }

    #[test]
    fn run_fatal_test() {
        let mut computer = computer(&[op(Opcode::Addi), 1, 0xEE]);
        assert_eq!(
            computer.run(),
            Err(ProcessorError::UnknownInstruction {
                opcode: 0xEE,
                address: usize::from(ORIGIN) + 2
            })
        );
    }

    #[test]
    fn run_for_test() {
        let mut computer = computer(&[op(Opcode::Jmp), 0x02, 0x00]);
        assert_eq!(computer.run_for(10), Ok(10));
        assert!(!computer.is_halted());

        let mut computer = self::computer(&[op(Opcode::Addi), 1, op(Opcode::Hlt)]);
        assert_eq!(computer.run_for(10), Ok(1));
    }

    #[test]
    fn boot_test() {
        let drive = InMemoryDrive::default().with_image(
            C::KERNEL_IMAGE,
            vec![0xFF, 0xFE, 0xFE, 0xFF, 0x01, 0x02, 0x00, op(Opcode::Hlt)],
        );
        let mut computer = Computer::boot(drive).unwrap();

        assert_eq!(computer.registers.pc, usize::from(C::KERNEL_ORIGIN));
        assert_eq!(computer.memory.read(C::KERNEL_ORIGIN), op(Opcode::Hlt));
        assert_eq!(computer.run(), Ok(()));
    }

    #[test]
    fn boot_failure_test() {
        let err = Computer::boot(InMemoryDrive::default()).unwrap_err();
        assert!(matches!(err, LoadError::RomRead { .. }));

        let drive = InMemoryDrive::default().with_image(C::KERNEL_IMAGE, vec![0xFF, 0x00]);
        let err = Computer::boot(drive).unwrap_err();
        assert!(matches!(err, LoadError::RomFormat(_)));
    }
}
