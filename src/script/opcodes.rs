//! Opcodes for the contract script engine
//!
//! Defines the instruction set: stack manipulation, arithmetic, comparison,
//! logic, hashing, locktime and verification opcodes. Scripts are sequences
//! of literals and opcodes; opcodes serialize as their upper-case names so
//! persisted contracts stay human-readable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::script::value::Value;

/// Opcodes understood by the script engine.
///
/// The flow-control and contract-management opcodes (IF/ELSE/ENDIF,
/// CALL/CREATE/SELFDESTRUCT) are declared but have no interpreter dispatch;
/// executing them fails with an "opcode not implemented" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpCode {
    // Stack operations
    Dup,
    Drop,
    Swap,

    // Arithmetic operations
    Add,
    Sub,
    Mul,
    Div,

    // Comparison operations
    Equal,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Min,
    Max,

    // Logic operations
    Not,
    And,

    // Crypto operations
    Sha256,

    // Time operations
    CheckLockTimeVerify,

    // Control
    Verify,

    // Flow control (declared, not interpreted)
    If,
    Else,
    EndIf,

    // Contract management (declared, not interpreted)
    Call,
    Create,
    SelfDestruct,
}

impl OpCode {
    /// Opcode name as it appears in scripts and operation logs
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Dup => "DUP",
            OpCode::Drop => "DROP",
            OpCode::Swap => "SWAP",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Equal => "EQUAL",
            OpCode::LessThan => "LESSTHAN",
            OpCode::GreaterThan => "GREATERTHAN",
            OpCode::LessThanOrEqual => "LESSTHANOREQUAL",
            OpCode::GreaterThanOrEqual => "GREATERTHANOREQUAL",
            OpCode::Min => "MIN",
            OpCode::Max => "MAX",
            OpCode::Not => "NOT",
            OpCode::And => "AND",
            OpCode::Sha256 => "SHA256",
            OpCode::CheckLockTimeVerify => "CHECKLOCKTIMEVERIFY",
            OpCode::Verify => "VERIFY",
            OpCode::If => "IF",
            OpCode::Else => "ELSE",
            OpCode::EndIf => "ENDIF",
            OpCode::Call => "CALL",
            OpCode::Create => "CREATE",
            OpCode::SelfDestruct => "SELFDESTRUCT",
        }
    }

    /// Whether the interpreter has a handler for this opcode
    pub fn is_implemented(&self) -> bool {
        !matches!(
            self,
            OpCode::If
                | OpCode::Else
                | OpCode::EndIf
                | OpCode::Call
                | OpCode::Create
                | OpCode::SelfDestruct
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single script instruction: a literal pushed onto the stack, or an opcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instruction {
    Op(OpCode),
    Lit(Value),
}

impl From<OpCode> for Instruction {
    fn from(op: OpCode) -> Self {
        Instruction::Op(op)
    }
}

impl From<i64> for Instruction {
    fn from(v: i64) -> Self {
        Instruction::Lit(Value::Int(v))
    }
}

impl From<f64> for Instruction {
    fn from(v: f64) -> Self {
        Instruction::Lit(Value::Float(v))
    }
}

impl From<&str> for Instruction {
    fn from(v: &str) -> Self {
        Instruction::Lit(Value::Str(v.to_string()))
    }
}
