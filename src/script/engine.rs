//! Stack-based script engine
//!
//! Executes opcode/literal sequences against an execution context carrying
//! the current block height. Every internal fault (stack underflow, division
//! by zero, gas exhaustion, unimplemented opcode) is caught and converted to
//! a `(success, message)` outcome; faults never propagate to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::sha256_hex;
use crate::script::opcodes::{Instruction, OpCode};
use crate::script::value::Value;

/// Default per-execution gas budget
pub const DEFAULT_GAS_LIMIT: u64 = 10_000;

/// Maximum operand stack depth
pub const MAX_STACK_SIZE: usize = 1024;

/// Script execution errors
#[derive(Error, Debug, Clone)]
pub enum ScriptError {
    #[error("{0}: stack underflow")]
    StackUnderflow(&'static str),
    #[error("stack overflow")]
    StackOverflow,
    #[error("DIV: division by zero")]
    DivisionByZero,
    #[error("gas limit exceeded")]
    GasLimitExceeded,
    #[error("opcode not implemented: {0}")]
    NotImplemented(OpCode),
    #[error("VERIFY: verification failed")]
    VerifyFailed,
    #[error("CHECKLOCKTIMEVERIFY: block height {height} < locktime {locktime}")]
    LocktimeNotReached { height: u64, locktime: i64 },
    #[error("{op}: expected numeric operand, got {found}")]
    TypeError { op: &'static str, found: &'static str },
}

/// Context a script executes against
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    pub contract_id: String,
    pub creator: String,
    pub block_height: u64,
    pub timestamp: i64,
}

/// Result of a script execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub success: bool,
    pub message: String,
}

/// The script engine.
///
/// Holds no state across executions: `execute` resets the stack, the gas
/// counter and the operation log before running, so a single engine can be
/// reused but never shared concurrently.
#[derive(Debug, Default)]
pub struct ScriptEngine {
    /// Operand stack, top at the end
    pub stack: Vec<Value>,
    /// Gas consumed by the current execution (one unit per instruction)
    pub gas_used: u64,
    /// Gas budget per execution
    pub gas_limit: u64,
    /// Human-readable log of executed operations
    pub ops: Vec<String>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            gas_used: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
            ops: Vec::new(),
        }
    }

    pub fn with_gas_limit(gas_limit: u64) -> Self {
        Self {
            gas_limit,
            ..Self::new()
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.gas_used = 0;
        self.ops.clear();
    }

    /// Execute a script against the given context.
    ///
    /// Success requires the script to run to completion with a non-empty
    /// stack whose top value is truthy.
    pub fn execute(&mut self, script: &[Instruction], context: &ScriptContext) -> ExecOutcome {
        self.reset();

        for instruction in script {
            if self.gas_used >= self.gas_limit {
                return self.fail(ScriptError::GasLimitExceeded);
            }
            if let Err(e) = self.step(instruction, context) {
                return self.fail(e);
            }
            self.gas_used += 1;
        }

        match self.stack.last() {
            None => ExecOutcome {
                success: false,
                message: "Empty stack".to_string(),
            },
            Some(top) => ExecOutcome {
                success: top.is_truthy(),
                message: format!("Script executed. Gas used: {}", self.gas_used),
            },
        }
    }

    fn fail(&self, error: ScriptError) -> ExecOutcome {
        ExecOutcome {
            success: false,
            message: format!("Script execution failed: {}", error),
        }
    }

    fn step(&mut self, instruction: &Instruction, context: &ScriptContext) -> Result<(), ScriptError> {
        match instruction {
            Instruction::Lit(value) => {
                self.ops.push(format!("PUSH {}", value));
                self.push(value.clone())
            }
            Instruction::Op(op) => self.dispatch(*op, context),
        }
    }

    fn dispatch(&mut self, op: OpCode, context: &ScriptContext) -> Result<(), ScriptError> {
        match op {
            OpCode::Dup => {
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or(ScriptError::StackUnderflow("DUP"))?;
                self.push(top)?;
                self.ops.push("DUP".to_string());
            }
            OpCode::Drop => {
                self.pop("DROP")?;
                self.ops.push("DROP".to_string());
            }
            OpCode::Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return Err(ScriptError::StackUnderflow("SWAP"));
                }
                self.stack.swap(len - 1, len - 2);
                self.ops.push("SWAP".to_string());
            }

            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                self.arithmetic(op)?;
            }

            OpCode::Equal => {
                let b = self.pop("EQUAL")?;
                let a = self.pop("EQUAL")?;
                let equal = match (&a, &b) {
                    (Value::Str(x), Value::Str(y)) => x == y,
                    _ => match (a.as_f64(), b.as_f64()) {
                        (Some(x), Some(y)) => x == y,
                        _ => false,
                    },
                };
                self.ops.push(format!("EQUAL ({} == {} = {})", a, b, equal));
                self.push(Value::Int(equal as i64))?;
            }
            OpCode::LessThan
            | OpCode::GreaterThan
            | OpCode::LessThanOrEqual
            | OpCode::GreaterThanOrEqual => {
                self.comparison(op)?;
            }
            OpCode::Min | OpCode::Max => {
                let name = op.name();
                let b = self.pop(name)?;
                let a = self.pop(name)?;
                let (x, y) = numeric_pair(name, &a, &b)?;
                let take_a = if op == OpCode::Min { x <= y } else { x >= y };
                let selected = if take_a { a.clone() } else { b.clone() };
                self.ops
                    .push(format!("{} ({}, {} = {})", name, a, b, selected));
                self.push(selected)?;
            }

            OpCode::Not => {
                let a = self.pop("NOT")?;
                let result = !a.is_truthy();
                self.ops.push(format!("NOT (!{} = {})", a, result));
                self.push(Value::Int(result as i64))?;
            }
            OpCode::And => {
                let b = self.pop("AND")?;
                let a = self.pop("AND")?;
                let result = a.is_truthy() && b.is_truthy();
                self.ops.push(format!("AND ({} && {} = {})", a, b, result));
                self.push(Value::Int(result as i64))?;
            }

            OpCode::Sha256 => {
                let a = self.pop("SHA256")?;
                let digest = sha256_hex(a.to_string().as_bytes());
                self.ops.push("SHA256".to_string());
                self.push(Value::Str(digest))?;
            }

            OpCode::CheckLockTimeVerify => {
                let value = self.pop("CHECKLOCKTIMEVERIFY")?;
                let locktime = match value {
                    Value::Int(i) => i,
                    Value::Float(f) => f as i64,
                    Value::Str(_) => {
                        return Err(ScriptError::TypeError {
                            op: "CHECKLOCKTIMEVERIFY",
                            found: "string",
                        })
                    }
                };
                if (context.block_height as i64) < locktime {
                    return Err(ScriptError::LocktimeNotReached {
                        height: context.block_height,
                        locktime,
                    });
                }
                // Pushes nothing; the script must supply its own truthy result
                self.ops.push(format!(
                    "CHECKLOCKTIMEVERIFY (height {} >= {})",
                    context.block_height, locktime
                ));
            }

            OpCode::Verify => {
                let value = self.pop("VERIFY")?;
                if !value.is_truthy() {
                    return Err(ScriptError::VerifyFailed);
                }
                self.ops.push("VERIFY (passed)".to_string());
            }

            OpCode::If
            | OpCode::Else
            | OpCode::EndIf
            | OpCode::Call
            | OpCode::Create
            | OpCode::SelfDestruct => {
                return Err(ScriptError::NotImplemented(op));
            }
        }

        Ok(())
    }

    fn arithmetic(&mut self, op: OpCode) -> Result<(), ScriptError> {
        let name = op.name();
        let b = self.pop(name)?;
        let a = self.pop(name)?;

        let result = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => match op {
                OpCode::Add => Value::Int(x.wrapping_add(*y)),
                OpCode::Sub => Value::Int(x.wrapping_sub(*y)),
                OpCode::Mul => Value::Int(x.wrapping_mul(*y)),
                OpCode::Div => {
                    if *y == 0 {
                        return Err(ScriptError::DivisionByZero);
                    }
                    // Floor division, so -7 / 2 is -4 on either numeric path
                    let q = x / y;
                    let r = x % y;
                    Value::Int(if r != 0 && (r < 0) != (*y < 0) { q - 1 } else { q })
                }
                _ => unreachable!(),
            },
            _ => {
                let (x, y) = numeric_pair(name, &a, &b)?;
                match op {
                    OpCode::Add => Value::Float(x + y),
                    OpCode::Sub => Value::Float(x - y),
                    OpCode::Mul => Value::Float(x * y),
                    OpCode::Div => {
                        if y == 0.0 {
                            return Err(ScriptError::DivisionByZero);
                        }
                        Value::Float((x / y).floor())
                    }
                    _ => unreachable!(),
                }
            }
        };

        self.ops.push(format!("{} ({}, {} = {})", name, a, b, result));
        self.push(result)
    }

    fn comparison(&mut self, op: OpCode) -> Result<(), ScriptError> {
        let name = op.name();
        let b = self.pop(name)?;
        let a = self.pop(name)?;
        let (x, y) = numeric_pair(name, &a, &b)?;
        let result = match op {
            OpCode::LessThan => x < y,
            OpCode::GreaterThan => x > y,
            OpCode::LessThanOrEqual => x <= y,
            OpCode::GreaterThanOrEqual => x >= y,
            _ => unreachable!(),
        };
        self.ops.push(format!("{} ({}, {} = {})", name, a, b, result));
        self.push(Value::Int(result as i64))
    }

    fn push(&mut self, value: Value) -> Result<(), ScriptError> {
        if self.stack.len() >= MAX_STACK_SIZE {
            return Err(ScriptError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, op: &'static str) -> Result<Value, ScriptError> {
        self.stack.pop().ok_or(ScriptError::StackUnderflow(op))
    }
}

fn numeric_pair(
    op: &'static str,
    a: &Value,
    b: &Value,
) -> Result<(f64, f64), ScriptError> {
    let x = a.as_f64().ok_or(ScriptError::TypeError {
        op,
        found: a.type_name(),
    })?;
    let y = b.as_f64().ok_or(ScriptError::TypeError {
        op,
        found: b.type_name(),
    })?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: Vec<Instruction>) -> (ScriptEngine, ExecOutcome) {
        let mut engine = ScriptEngine::new();
        let outcome = engine.execute(&script, &ScriptContext::default());
        (engine, outcome)
    }

    #[test]
    fn test_arithmetic_add() {
        let (engine, outcome) = run(vec![2.into(), 3.into(), OpCode::Add.into()]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Int(5)));
    }

    #[test]
    fn test_division_floors() {
        let (engine, outcome) = run(vec![7.into(), 2.into(), OpCode::Div.into()]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Int(3)));
    }

    #[test]
    fn test_division_floors_toward_negative() {
        let (engine, _) = run(vec![(-7).into(), 2.into(), OpCode::Div.into()]);
        assert_eq!(engine.stack.last(), Some(&Value::Int(-4)));
    }

    #[test]
    fn test_division_by_zero() {
        let (_, outcome) = run(vec![7.into(), 0.into(), OpCode::Div.into()]);
        assert!(!outcome.success);
        assert!(outcome.message.contains("division by zero"));
    }

    #[test]
    fn test_stack_underflow() {
        let (_, outcome) = run(vec![2.into(), OpCode::Add.into()]);
        assert!(!outcome.success);
        assert!(outcome.message.contains("stack underflow"));
    }

    #[test]
    fn test_dup_and_add() {
        let (engine, outcome) = run(vec![10.into(), OpCode::Dup.into(), OpCode::Add.into()]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Int(20)));
    }

    #[test]
    fn test_swap_and_sub() {
        // 3 10 SWAP SUB -> 10 - 3 = 7
        let (engine, outcome) = run(vec![
            3.into(),
            10.into(),
            OpCode::Swap.into(),
            OpCode::Sub.into(),
        ]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Int(7)));
    }

    #[test]
    fn test_comparisons() {
        let (engine, outcome) = run(vec![5.into(), 3.into(), OpCode::GreaterThan.into()]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Int(1)));

        let (engine, _) = run(vec![5.into(), 3.into(), OpCode::LessThan.into()]);
        assert_eq!(engine.stack.last(), Some(&Value::Int(0)));

        let (engine, _) = run(vec![3.into(), 3.into(), OpCode::GreaterThanOrEqual.into()]);
        assert_eq!(engine.stack.last(), Some(&Value::Int(1)));
    }

    #[test]
    fn test_min_max_select_operand() {
        let (engine, _) = run(vec![5.into(), 3.into(), OpCode::Min.into()]);
        assert_eq!(engine.stack.last(), Some(&Value::Int(3)));
        let (engine, _) = run(vec![5.into(), 3.into(), OpCode::Max.into()]);
        assert_eq!(engine.stack.last(), Some(&Value::Int(5)));
    }

    #[test]
    fn test_not_and() {
        let (engine, _) = run(vec![0.into(), OpCode::Not.into()]);
        assert_eq!(engine.stack.last(), Some(&Value::Int(1)));

        let (engine, outcome) = run(vec![1.into(), 1.into(), OpCode::And.into()]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Int(1)));

        let (_, outcome) = run(vec![1.into(), 0.into(), OpCode::And.into()]);
        assert!(!outcome.success);
    }

    #[test]
    fn test_sha256_pushes_hex_digest() {
        let (engine, outcome) = run(vec!["hello".into(), OpCode::Sha256.into()]);
        assert!(outcome.success);
        assert_eq!(
            engine.stack.last(),
            Some(&Value::Str(
                "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".into()
            ))
        );
    }

    #[test]
    fn test_checklocktimeverify() {
        let script: Vec<Instruction> =
            vec![50.into(), OpCode::CheckLockTimeVerify.into(), 1.into()];

        let mut engine = ScriptEngine::new();
        let context = ScriptContext {
            block_height: 100,
            ..Default::default()
        };
        let outcome = engine.execute(&script, &context);
        assert!(outcome.success);

        let context = ScriptContext {
            block_height: 40,
            ..Default::default()
        };
        let outcome = engine.execute(&script, &context);
        assert!(!outcome.success);
        assert!(outcome.message.contains("CHECKLOCKTIMEVERIFY"));
    }

    #[test]
    fn test_verify_failure() {
        let (_, outcome) = run(vec![0.into(), OpCode::Verify.into(), 1.into()]);
        assert!(!outcome.success);
        assert!(outcome.message.contains("verification failed"));
    }

    #[test]
    fn test_gas_exhaustion() {
        let mut engine = ScriptEngine::with_gas_limit(5);
        let script: Vec<Instruction> = (0..10).map(|i| Instruction::from(i as i64)).collect();
        let outcome = engine.execute(&script, &ScriptContext::default());
        assert!(!outcome.success);
        assert!(outcome.message.contains("gas limit exceeded"));
        assert_eq!(engine.gas_used, 5);
    }

    #[test]
    fn test_empty_stack_fails() {
        let (_, outcome) = run(vec![1.into(), OpCode::Drop.into()]);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Empty stack");
    }

    #[test]
    fn test_falsy_top_fails() {
        let (_, outcome) = run(vec![0.into()]);
        assert!(!outcome.success);
    }

    #[test]
    fn test_unimplemented_opcode() {
        let (_, outcome) = run(vec![1.into(), OpCode::If.into()]);
        assert!(!outcome.success);
        assert!(outcome.message.contains("opcode not implemented: IF"));
    }

    #[test]
    fn test_engine_resets_between_runs() {
        let mut engine = ScriptEngine::new();
        engine.execute(
            &[2.into(), 3.into(), OpCode::Add.into()],
            &ScriptContext::default(),
        );
        let outcome = engine.execute(&[1.into()], &ScriptContext::default());
        assert!(outcome.success);
        assert_eq!(engine.stack.len(), 1);
        assert_eq!(engine.gas_used, 1);
    }

    #[test]
    fn test_float_arithmetic() {
        let (engine, outcome) = run(vec![1.5.into(), 2.into(), OpCode::Mul.into()]);
        assert!(outcome.success);
        assert_eq!(engine.stack.last(), Some(&Value::Float(3.0)));
    }
}
