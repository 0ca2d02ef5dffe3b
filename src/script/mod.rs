//! Contract scripting
//!
//! A small stack-based script language in the spirit of Bitcoin script:
//! - `value`: the tagged values on the operand stack
//! - `opcodes`: the instruction set
//! - `engine`: the gas-metered interpreter

pub mod engine;
pub mod opcodes;
pub mod value;

pub use engine::{ExecOutcome, ScriptContext, ScriptEngine, ScriptError, DEFAULT_GAS_LIMIT};
pub use opcodes::{Instruction, OpCode};
pub use value::Value;
