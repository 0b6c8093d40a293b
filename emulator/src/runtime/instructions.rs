use parse_display::Display;
use tracing::debug;

use crate::constants::{Address, Word};

use super::{
    alu,
    registers::{Flag, Mode, Reg},
    Computer, ProcessorError,
};

/// An absolute address operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location(pub Address);

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:04x}", self.0)
    }
}

/// Source of operand bytes while decoding an instruction
pub(crate) trait Fetch {
    /// Consume the next byte
    fn byte(&mut self) -> Word;

    /// Consume a big-endian address
    fn location(&mut self) -> Location {
        let high = self.byte();
        let low = self.byte();
        Location(Address::from_be_bytes([high, low]))
    }

    fn reg(&mut self) -> Reg {
        Reg(self.byte())
    }
}

/// Instruction opcodes, as emitted by the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Add = 0x00,
    Addi = 0x01,
    Sub = 0x02,
    Subi = 0x03,
    Sil = 0x04,
    Sir = 0x05,
    And = 0x06,
    Or = 0x07,
    Not = 0x08,
    Xor = 0x09,

    Jmp = 0x20,
    Jeq = 0x21,
    Jne = 0x22,
    Jgt = 0x23,
    Jlt = 0x24,
    Jfg = 0x25,

    Ldr = 0x30,
    Str = 0x31,
    Mov = 0x32,
    Movi = 0x33,
    Tar = 0x34,
    Tra = 0x35,
    Inr = 0x36,
    Inw = 0x37,
    Dsk = 0x38,
    Movm = 0x39,

    Int = 0x40,
    Hlt = 0x41,
    Cll = 0x42,
    Crn = 0x43,
    Pmd = 0x44,
    Ein = 0x45,
    Din = 0x46,
    Cfg = 0x47,

    Psa = 0x50,
    Poa = 0x51,
    Psr = 0x52,
    Por = 0x53,
}

impl Opcode {
    #[must_use]
    pub const fn from_byte(byte: Word) -> Option<Self> {
        let opcode = match byte {
            0x00 => Self::Add,
            0x01 => Self::Addi,
            0x02 => Self::Sub,
            0x03 => Self::Subi,
            0x04 => Self::Sil,
            0x05 => Self::Sir,
            0x06 => Self::And,
            0x07 => Self::Or,
            0x08 => Self::Not,
            0x09 => Self::Xor,
            0x20 => Self::Jmp,
            0x21 => Self::Jeq,
            0x22 => Self::Jne,
            0x23 => Self::Jgt,
            0x24 => Self::Jlt,
            0x25 => Self::Jfg,
            0x30 => Self::Ldr,
            0x31 => Self::Str,
            0x32 => Self::Mov,
            0x33 => Self::Movi,
            0x34 => Self::Tar,
            0x35 => Self::Tra,
            0x36 => Self::Inr,
            0x37 => Self::Inw,
            0x38 => Self::Dsk,
            0x39 => Self::Movm,
            0x40 => Self::Int,
            0x41 => Self::Hlt,
            0x42 => Self::Cll,
            0x43 => Self::Crn,
            0x44 => Self::Pmd,
            0x45 => Self::Ein,
            0x46 => Self::Din,
            0x47 => Self::Cfg,
            0x50 => Self::Psa,
            0x51 => Self::Poa,
            0x52 => Self::Psr,
            0x53 => Self::Por,
            _ => return None,
        };
        Some(opcode)
    }
}

impl From<Opcode> for Word {
    fn from(opcode: Opcode) -> Self {
        opcode as Word
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum Instruction {
    /// Add a register to the accumulator
    #[display("add  {0}")]
    Add(Reg),

    /// Add an immediate to the accumulator
    #[display("addi {0}")]
    Addi(Word),

    /// Subtract a register from the accumulator
    #[display("sub  {0}")]
    Sub(Reg),

    /// Subtract an immediate from the accumulator
    #[display("subi {0}")]
    Subi(Word),

    /// Shift the accumulator left
    #[display("sil")]
    Sil,

    /// Shift the accumulator right
    #[display("sir")]
    Sir,

    #[display("and  {0}")]
    And(Reg),

    #[display("or   {0}")]
    Or(Reg),

    #[display("not")]
    Not,

    #[display("xor  {0}")]
    Xor(Reg),

    /// Unconditional jump
    #[display("jmp  {0}")]
    Jmp(Location),

    /// Jump if the accumulator is zero
    #[display("jeq  {0}")]
    Jeq(Location),

    /// Jump if the accumulator is not zero
    #[display("jne  {0}")]
    Jne(Location),

    /// Jump if the accumulator is greater than zero
    #[display("jgt  {0}")]
    Jgt(Location),

    /// Jump if the accumulator is lower than zero
    #[display("jlt  {0}")]
    Jlt(Location),

    /// Jump if a flag is set
    #[display("jfg  {0}, {1}")]
    Jfg(Word, Location),

    /// Load a register from memory
    #[display("ldr  {0}, {1}")]
    Ldr(Location, Reg),

    /// Store a register in memory
    #[display("str  {0}, {1}")]
    Str(Reg, Location),

    /// Copy a register to another
    #[display("mov  {0}, {1}")]
    Mov(Reg, Reg),

    /// Set a register to an immediate
    #[display("movi {0}, {1}")]
    Movi(Word, Reg),

    /// Copy the accumulator to a register
    #[display("tar  {0}")]
    Tar(Reg),

    /// Copy a register to the accumulator
    #[display("tra  {0}")]
    Tra(Reg),

    /// Load a register through a pointer stored in memory
    #[display("inr  {0}, {1}")]
    Inr(Location, Reg),

    /// Store a register through a pointer stored in memory
    #[display("inw  {0}, {1}")]
    Inw(Reg, Location),

    /// Load the ROM whose name is stored at the given address
    #[display("dsk  {0}")]
    Dsk(Location),

    /// Store the first address, as a value, at the second one
    #[display("movm {0}, {1}")]
    Movm(Location, Location),

    /// Dispatch an interrupt
    #[display("int  {0}")]
    Int(Word),

    #[display("hlt")]
    Hlt,

    /// Call a subroutine
    #[display("cll  {0}")]
    Cll(Location),

    /// Return from a subroutine or an interrupt handler
    #[display("crn")]
    Crn,

    /// Enter protected mode
    #[display("pmd")]
    Pmd,

    /// Enable interrupts
    #[display("ein")]
    Ein,

    /// Disable interrupts
    #[display("din")]
    Din,

    /// Clear a flag
    #[display("cfg  {0}")]
    Cfg(Word),

    /// Push the accumulator
    #[display("psa")]
    Psa,

    /// Pop the accumulator
    #[display("poa")]
    Poa,

    /// Push a register
    #[display("psr  {0}")]
    Psr(Reg),

    /// Pop a register
    #[display("por  {0}")]
    Por(Reg),
}

impl Instruction {
    /// Decode the instruction for `opcode`, consuming its operands from `operands`
    pub(crate) fn decode<F: Fetch>(opcode: Opcode, operands: &mut F) -> Self {
        use Instruction as I;

        match opcode {
            Opcode::Add => I::Add(operands.reg()),
            Opcode::Addi => I::Addi(operands.byte()),
            Opcode::Sub => I::Sub(operands.reg()),
            Opcode::Subi => I::Subi(operands.byte()),
            Opcode::Sil => I::Sil,
            Opcode::Sir => I::Sir,
            Opcode::And => I::And(operands.reg()),
            Opcode::Or => I::Or(operands.reg()),
            Opcode::Not => I::Not,
            Opcode::Xor => I::Xor(operands.reg()),
            Opcode::Jmp => I::Jmp(operands.location()),
            Opcode::Jeq => I::Jeq(operands.location()),
            Opcode::Jne => I::Jne(operands.location()),
            Opcode::Jgt => I::Jgt(operands.location()),
            Opcode::Jlt => I::Jlt(operands.location()),
            Opcode::Jfg => {
                let flag = operands.byte();
                I::Jfg(flag, operands.location())
            }
            Opcode::Ldr => {
                let src = operands.location();
                I::Ldr(src, operands.reg())
            }
            Opcode::Str => {
                let reg = operands.reg();
                I::Str(reg, operands.location())
            }
            Opcode::Mov => {
                let src = operands.reg();
                I::Mov(src, operands.reg())
            }
            Opcode::Movi => {
                let value = operands.byte();
                I::Movi(value, operands.reg())
            }
            Opcode::Tar => I::Tar(operands.reg()),
            Opcode::Tra => I::Tra(operands.reg()),
            Opcode::Inr => {
                let pointer = operands.location();
                I::Inr(pointer, operands.reg())
            }
            Opcode::Inw => {
                let reg = operands.reg();
                I::Inw(reg, operands.location())
            }
            Opcode::Dsk => I::Dsk(operands.location()),
            Opcode::Movm => {
                let value = operands.location();
                I::Movm(value, operands.location())
            }
            Opcode::Int => I::Int(operands.byte()),
            Opcode::Hlt => I::Hlt,
            Opcode::Cll => I::Cll(operands.location()),
            Opcode::Crn => I::Crn,
            Opcode::Pmd => I::Pmd,
            Opcode::Ein => I::Ein,
            Opcode::Din => I::Din,
            Opcode::Cfg => I::Cfg(operands.byte()),
            Opcode::Psa => I::Psa,
            Opcode::Poa => I::Poa,
            Opcode::Psr => I::Psr(operands.reg()),
            Opcode::Por => I::Por(operands.reg()),
        }
    }

    /// Execute the instruction
    #[tracing::instrument(skip(computer))]
    pub(crate) fn execute(&self, computer: &mut Computer) -> Result<(), ProcessorError> {
        use Instruction::*;

        match self {
            Add(reg) => {
                let operand = computer.registers.get(*reg);
                computer.accumulate(alu::add(computer.registers.acc, operand));
            }

            Addi(value) => {
                computer.accumulate(alu::add(computer.registers.acc, *value));
            }

            Sub(reg) => {
                let operand = computer.registers.get(*reg);
                computer.accumulate(alu::subtract(computer.registers.acc, operand));
            }

            Subi(value) => {
                computer.accumulate(alu::subtract(computer.registers.acc, *value));
            }

            Sil => computer.registers.acc = alu::shift_left(computer.registers.acc),

            Sir => computer.registers.acc = alu::shift_right(computer.registers.acc),

            And(reg) => {
                let operand = computer.registers.get(*reg);
                computer.registers.acc = alu::and(computer.registers.acc, operand);
            }

            Or(reg) => {
                let operand = computer.registers.get(*reg);
                computer.registers.acc = alu::or(computer.registers.acc, operand);
            }

            Not => computer.registers.acc = alu::not(computer.registers.acc),

            Xor(reg) => {
                let operand = computer.registers.get(*reg);
                computer.registers.acc = alu::xor(computer.registers.acc, operand);
            }

            Jmp(target) => computer.jump(target.0),

            Jeq(target) => {
                if computer.registers.acc == 0 {
                    computer.jump(target.0);
                }
            }

            Jne(target) => {
                if computer.registers.acc != 0 {
                    computer.jump(target.0);
                }
            }

            Jgt(target) => {
                if computer.registers.acc > 0 {
                    computer.jump(target.0);
                }
            }

            // The accumulator is unsigned and never below zero
            Jlt(_) => {}

            Jfg(code, target) => {
                if Flag::from_code(*code).is_some_and(|flag| computer.registers.flag(flag)) {
                    computer.jump(target.0);
                }
            }

            Ldr(src, reg) => {
                let value = computer.memory.read(src.0);
                computer.registers.set(*reg, value);
            }

            Str(reg, dst) => {
                let value = computer.registers.get(*reg);
                computer.memory.write(dst.0, value);
            }

            Mov(src, dst) => {
                let value = computer.registers.get(*src);
                computer.registers.set(*dst, value);
            }

            Movi(value, reg) => computer.registers.set(*reg, *value),

            Tar(reg) => computer.registers.set(*reg, computer.registers.acc),

            Tra(reg) => computer.registers.acc = computer.registers.get(*reg),

            Inr(pointer, reg) => {
                let address = computer.memory.indirect(pointer.0);
                let value = computer.memory.read(address);
                debug!("[[{}]] = [${:04x}] = {}", pointer, address, value);
                computer.registers.set(*reg, value);
            }

            Inw(reg, pointer) => {
                let address = computer.memory.indirect(pointer.0);
                let value = computer.registers.get(*reg);
                debug!("[[{}]] = [${:04x}] <- {}", pointer, address, value);
                computer.memory.write(address, value);
            }

            Dsk(name) => computer.load_disk(name.0),

            Movm(value, dst) => computer.memory.write_address(dst.0, value.0),

            Int(id) => computer.dispatch(*id),

            Hlt => {
                computer.registers.mode.insert(Mode::HALTED);
                return Err(ProcessorError::ExecutionEnded);
            }

            Cll(target) => computer.call(target.0),

            Crn => computer.ret(),

            Pmd => computer.registers.mode.insert(Mode::PROTECTED),

            Ein => computer.registers.mode.insert(Mode::INTERRUPT_ENABLE),

            Din => computer.registers.mode.remove(Mode::INTERRUPT_ENABLE),

            Cfg(code) => {
                if let Some(flag) = Flag::from_code(*code) {
                    computer.registers.flags.remove(flag.bits());
                }
            }

            Psa => computer.push(computer.registers.acc),

            Poa => computer.registers.acc = computer.pop(),

            Psr(reg) => computer.push(computer.registers.get(*reg)),

            Por(reg) => {
                let value = computer.pop();
                computer.registers.set(*reg, value);
            }
        };

        Ok(())
    }
}
