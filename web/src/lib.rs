#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tsify::Tsify;
use wasm_bindgen::prelude::*;

use tis80_emulator::{InMemoryDrive, ProcessorError};

#[wasm_bindgen(start)]
fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// ROM images by name
#[derive(Default, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
pub struct RomFiles(HashMap<String, Vec<u8>>);

#[derive(Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Registers {
    general: Vec<u8>,
    acc: u8,
    pc: u32,
    sp: u16,
    flags: u8,
    halted: bool,
    protected: bool,
    interrupts: bool,
}

#[derive(Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MemoryView {
    start: u32,
    end: u32,
    bytes: Vec<u8>,
}

#[wasm_bindgen]
pub struct Emulator {
    computer: tis80_emulator::Computer,
}

#[wasm_bindgen]
impl Emulator {
    /// Boot from the kernel ROM found in `roms`
    #[wasm_bindgen(constructor)]
    pub fn new(roms: RomFiles) -> Result<Emulator, JsValue> {
        let drive = InMemoryDrive::new(roms.0);
        let computer =
            tis80_emulator::Computer::boot(drive).map_err(|e| JsValue::from(format!("{e}")))?;
        Ok(Self { computer })
    }

    /// Execute one instruction. Returns `true` once the program halted.
    pub fn step(&mut self) -> Result<bool, JsValue> {
        match self.computer.step() {
            Ok(()) => Ok(false),
            Err(ProcessorError::ExecutionEnded) => {
                debug!("Program halted");
                Ok(true)
            }
            Err(e) => Err(format!("{e}").into()),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn registers(&self) -> Registers {
        let registers = &self.computer.registers;
        Registers {
            general: registers.general.to_vec(),
            acc: registers.acc,
            pc: u32::try_from(registers.pc).unwrap_or(u32::MAX),
            sp: registers.sp,
            flags: registers.flags.bits(),
            halted: registers.is_halted(),
            protected: registers.is_protected(),
            interrupts: registers.interrupts_enabled(),
        }
    }

    pub fn memory_view(&self, start: u32, end: u32) -> Result<MemoryView, JsValue> {
        let memory = self.computer.memory.as_slice();
        let range = usize::try_from(start).map_err(|e| format!("{e}"))?
            ..usize::try_from(end).map_err(|e| format!("{e}"))?;
        let bytes = memory
            .get(range)
            .ok_or_else(|| format!("invalid memory range {start:#x}..{end:#x}"))?
            .to_vec();
        Ok(MemoryView { start, end, bytes })
    }

    /// The text in video memory, one entry per row
    #[wasm_bindgen(getter)]
    pub fn screen(&self) -> Vec<String> {
        self.computer.status().screen_rows()
    }

    pub fn key_down(&mut self, key: u8) {
        debug!(key, "Key down");
        self.computer.key_down(key);
    }
}
