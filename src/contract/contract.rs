//! Smart contracts
//!
//! Four contract flavours share one lifecycle: a contract is created with a
//! script, waits until its conditions hold, then executes at most once. A
//! failed execution leaves the contract pending so it can be retried later;
//! a successful one freezes it with a full execution record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::script::{Instruction, OpCode, ScriptContext, ScriptEngine, Value};

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Contract not found: {0}")]
    NotFound(String),
    #[error("Contract {0} is not a multisig contract")]
    NotMultisig(String),
    #[error("Contract {0} is not an escrow contract")]
    NotEscrow(String),
    #[error("Only the arbiter can decide an escrow")]
    NotArbiter,
    #[error("Escrow decision already made")]
    DecisionAlreadyMade,
}

/// Arbiter verdict state of an escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Pending,
    Approved,
    Rejected,
}

/// Variant-specific contract state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContractKind {
    /// Funds locked until a block height is reached
    Timelock {
        unlock_block: u64,
        amount: f64,
        recipient: String,
    },
    /// Funds released once enough eligible signers have signed
    Multisig {
        required_sigs: usize,
        signers: Vec<String>,
        signatures: Vec<String>,
        amount: f64,
        recipient: String,
    },
    /// Funds held until an arbiter approves or rejects
    Escrow {
        buyer: String,
        seller: String,
        arbiter: String,
        amount: f64,
        status: EscrowStatus,
        decision: Option<bool>,
    },
    /// Arbitrary user-supplied script
    Conditional {
        amount: f64,
        recipient: String,
        description: String,
    },
}

/// What happened when a contract's script ran
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub success: bool,
    pub message: String,
    pub gas_used: u64,
    pub operations: Vec<String>,
    pub final_stack: Vec<Value>,
}

/// A deployed contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub creator: String,
    pub script: Vec<Instruction>,
    #[serde(flatten)]
    pub kind: ContractKind,
    pub created_at: i64,
    pub executed: bool,
    pub execution_result: Option<ExecutionRecord>,
    pub execution_block: Option<u64>,
}

impl Contract {
    fn base(id: String, creator: String, script: Vec<Instruction>, kind: ContractKind) -> Self {
        Self {
            id,
            creator,
            script,
            kind,
            created_at: Utc::now().timestamp(),
            executed: false,
            execution_result: None,
            execution_block: None,
        }
    }

    /// A contract releasing `amount` to `recipient` at `unlock_block`
    pub fn timelock(
        id: String,
        creator: String,
        unlock_block: u64,
        amount: f64,
        recipient: String,
    ) -> Self {
        let script: Vec<Instruction> = vec![
            (unlock_block as i64).into(),
            OpCode::CheckLockTimeVerify.into(),
            1.into(),
        ];
        Self::base(
            id,
            creator,
            script,
            ContractKind::Timelock {
                unlock_block,
                amount,
                recipient,
            },
        )
    }

    /// An m-of-n multisig contract. The script only sanity-checks that the
    /// threshold is satisfiable; signature counting happens off-script in
    /// [`execute`](Self::execute).
    pub fn multisig(
        id: String,
        creator: String,
        required_sigs: usize,
        signers: Vec<String>,
        amount: f64,
        recipient: String,
    ) -> Self {
        let script: Vec<Instruction> = vec![
            (required_sigs as i64).into(),
            (signers.len() as i64).into(),
            OpCode::LessThanOrEqual.into(),
            OpCode::Verify.into(),
            1.into(),
        ];
        Self::base(
            id,
            creator,
            script,
            ContractKind::Multisig {
                required_sigs,
                signers,
                signatures: Vec::new(),
                amount,
                recipient,
            },
        )
    }

    /// An escrow between buyer and seller, settled by an arbiter
    pub fn escrow(
        id: String,
        buyer: String,
        seller: String,
        arbiter: String,
        amount: f64,
    ) -> Self {
        let script: Vec<Instruction> = vec![1.into()];
        Self::base(
            id,
            buyer.clone(),
            script,
            ContractKind::Escrow {
                buyer,
                seller,
                arbiter,
                amount,
                status: EscrowStatus::Pending,
                decision: None,
            },
        )
    }

    /// A contract running a caller-supplied script
    pub fn conditional(
        id: String,
        creator: String,
        script: Vec<Instruction>,
        amount: f64,
        recipient: String,
        description: String,
    ) -> Self {
        Self::base(
            id,
            creator,
            script,
            ContractKind::Conditional {
                amount,
                recipient,
                description,
            },
        )
    }

    pub fn type_label(&self) -> &'static str {
        match self.kind {
            ContractKind::Timelock { .. } => "timelock",
            ContractKind::Multisig { .. } => "multisig",
            ContractKind::Escrow { .. } => "escrow",
            ContractKind::Conditional { .. } => "conditional",
        }
    }

    /// Whether the contract's conditions hold at `block_height`
    pub fn can_execute(&self, block_height: u64) -> bool {
        if self.executed {
            return false;
        }
        match &self.kind {
            ContractKind::Timelock { unlock_block, .. } => block_height >= *unlock_block,
            ContractKind::Multisig {
                required_sigs,
                signatures,
                ..
            } => signatures.len() >= *required_sigs,
            // Any verdict makes the escrow executable: approval releases to
            // the seller, rejection settles as a refund to the buyer. This is
            // deliberately wider than approved-only gating, so refunds go
            // through the same execute-once lifecycle as payouts.
            ContractKind::Escrow { status, .. } => *status != EscrowStatus::Pending,
            ContractKind::Conditional { .. } => true,
        }
    }

    /// Run the contract's script at the given block height.
    ///
    /// Succeeds at most once: a successful run marks the contract executed
    /// and later calls return failure without touching state. A failed run
    /// records the failure and leaves the contract pending.
    pub fn execute(&mut self, block_height: u64, timestamp: i64) -> (bool, String) {
        if self.executed {
            return (false, "Contract already executed".to_string());
        }

        // Off-script gating for the variants whose conditions are not
        // expressible in the script itself
        match &self.kind {
            ContractKind::Multisig {
                required_sigs,
                signatures,
                ..
            } if signatures.len() < *required_sigs => {
                return (
                    false,
                    format!(
                        "Insufficient signatures: {}/{}",
                        signatures.len(),
                        required_sigs
                    ),
                );
            }
            ContractKind::Escrow { status, .. } if *status == EscrowStatus::Pending => {
                return (false, "Escrow decision pending".to_string());
            }
            _ => {}
        }

        let context = ScriptContext {
            contract_id: self.id.clone(),
            creator: self.creator.clone(),
            block_height,
            timestamp,
        };
        let mut engine = ScriptEngine::new();
        let outcome = engine.execute(&self.script, &context);

        let message = if outcome.success {
            self.settlement_message().unwrap_or(outcome.message)
        } else {
            outcome.message
        };

        self.execution_result = Some(ExecutionRecord {
            success: outcome.success,
            message: message.clone(),
            gas_used: engine.gas_used,
            operations: engine.ops.clone(),
            final_stack: engine.stack.clone(),
        });

        if outcome.success {
            self.executed = true;
            self.execution_block = Some(block_height);
        }

        (outcome.success, message)
    }

    /// Payout description for variants with a settlement direction
    fn settlement_message(&self) -> Option<String> {
        match &self.kind {
            ContractKind::Timelock {
                amount, recipient, ..
            } => Some(format!("Released {} to {}", amount, recipient)),
            ContractKind::Multisig {
                amount, recipient, ..
            } => Some(format!("Released {} to {}", amount, recipient)),
            ContractKind::Escrow {
                buyer,
                seller,
                amount,
                decision,
                ..
            } => match decision {
                Some(true) => Some(format!("Escrow approved: {} released to {}", amount, seller)),
                Some(false) => Some(format!("Escrow rejected: {} returned to {}", amount, buyer)),
                None => None,
            },
            ContractKind::Conditional { .. } => None,
        }
    }

    /// Record a signature on a multisig contract. Returns whether the
    /// signature was accepted: the signer must be eligible and not have
    /// signed before.
    pub fn add_signature(&mut self, signer: &str) -> bool {
        match &mut self.kind {
            ContractKind::Multisig {
                signers,
                signatures,
                ..
            } => {
                if !signers.iter().any(|s| s == signer) {
                    return false;
                }
                if signatures.iter().any(|s| s == signer) {
                    return false;
                }
                signatures.push(signer.to_string());
                true
            }
            _ => false,
        }
    }

    /// Record the arbiter's verdict on an escrow. One-shot: a second
    /// decision is rejected.
    pub fn make_decision(&mut self, arbiter: &str, approve: bool) -> Result<String, ContractError> {
        match &mut self.kind {
            ContractKind::Escrow {
                arbiter: expected,
                status,
                decision,
                seller,
                buyer,
                amount,
            } => {
                if arbiter != expected {
                    return Err(ContractError::NotArbiter);
                }
                if *status != EscrowStatus::Pending {
                    return Err(ContractError::DecisionAlreadyMade);
                }
                *decision = Some(approve);
                if approve {
                    *status = EscrowStatus::Approved;
                    Ok(format!("Escrow approved: {} will go to {}", amount, seller))
                } else {
                    *status = EscrowStatus::Rejected;
                    Ok(format!("Escrow rejected: {} will return to {}", amount, buyer))
                }
            }
            _ => Err(ContractError::NotEscrow(self.id.clone())),
        }
    }

    /// Variant-specific summary of the contract's state
    pub fn info(&self) -> serde_json::Value {
        let mut value = json!({
            "id": self.id,
            "type": self.type_label(),
            "creator": self.creator,
            "created_at": self.created_at,
            "executed": self.executed,
            "execution_block": self.execution_block,
        });
        let extra = match &self.kind {
            ContractKind::Timelock {
                unlock_block,
                amount,
                recipient,
            } => json!({
                "unlock_block": unlock_block,
                "amount": amount,
                "recipient": recipient,
            }),
            ContractKind::Multisig {
                required_sigs,
                signers,
                signatures,
                amount,
                recipient,
            } => json!({
                "required_sigs": required_sigs,
                "signers": signers,
                "signatures_collected": signatures.len(),
                "amount": amount,
                "recipient": recipient,
            }),
            ContractKind::Escrow {
                buyer,
                seller,
                arbiter,
                amount,
                status,
                ..
            } => json!({
                "buyer": buyer,
                "seller": seller,
                "arbiter": arbiter,
                "amount": amount,
                "status": status,
            }),
            ContractKind::Conditional {
                amount,
                recipient,
                description,
            } => json!({
                "amount": amount,
                "recipient": recipient,
                "description": description,
            }),
        };
        if let (Some(obj), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timelock_respects_height() {
        let mut contract =
            Contract::timelock("TL-1".into(), "alice".into(), 10, 25.0, "bob".into());

        assert!(!contract.can_execute(7));
        let (ok, message) = contract.execute(7, 0);
        assert!(!ok);
        assert!(message.contains("CHECKLOCKTIMEVERIFY"));
        assert!(!contract.executed);

        assert!(contract.can_execute(10));
        let (ok, message) = contract.execute(10, 0);
        assert!(ok);
        assert!(message.contains("bob"));
        assert!(contract.executed);
        assert_eq!(contract.execution_block, Some(10));
    }

    #[test]
    fn test_contract_executes_at_most_once() {
        let mut contract =
            Contract::timelock("TL-1".into(), "alice".into(), 5, 25.0, "bob".into());
        assert!(contract.execute(10, 0).0);

        let before = contract.execution_result.clone().unwrap();
        let (ok, message) = contract.execute(20, 0);
        assert!(!ok);
        assert_eq!(message, "Contract already executed");
        // A rejected re-execution leaves the recorded result untouched
        assert_eq!(
            contract.execution_result.as_ref().unwrap().gas_used,
            before.gas_used
        );
        assert_eq!(contract.execution_block, Some(10));
    }

    #[test]
    fn test_multisig_threshold() {
        let signers = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut contract = Contract::multisig(
            "MS-1".into(),
            "a".into(),
            2,
            signers,
            100.0,
            "dest".into(),
        );

        let (ok, message) = contract.execute(1, 0);
        assert!(!ok);
        assert!(message.contains("0/2"));

        assert!(contract.add_signature("a"));
        assert!(!contract.can_execute(1));
        assert!(contract.add_signature("b"));
        assert!(contract.can_execute(1));

        let (ok, _) = contract.execute(1, 0);
        assert!(ok);
        assert!(contract.executed);
    }

    #[test]
    fn test_multisig_rejects_duplicate_and_outsider() {
        let signers = vec!["a".to_string(), "b".to_string()];
        let mut contract =
            Contract::multisig("MS-1".into(), "a".into(), 2, signers, 100.0, "dest".into());

        assert!(contract.add_signature("a"));
        assert!(!contract.add_signature("a"));
        assert!(!contract.add_signature("mallory"));
        assert!(!contract.can_execute(1));
    }

    #[test]
    fn test_escrow_approval_flow() {
        let mut contract = Contract::escrow(
            "ES-1".into(),
            "buyer".into(),
            "seller".into(),
            "arbiter".into(),
            75.0,
        );

        let (ok, message) = contract.execute(1, 0);
        assert!(!ok);
        assert!(message.contains("pending"));

        assert!(matches!(
            contract.make_decision("mallory", true),
            Err(ContractError::NotArbiter)
        ));

        contract.make_decision("arbiter", true).unwrap();
        assert!(matches!(
            contract.make_decision("arbiter", false),
            Err(ContractError::DecisionAlreadyMade)
        ));

        let (ok, message) = contract.execute(1, 0);
        assert!(ok);
        assert!(message.contains("seller"));
    }

    #[test]
    fn test_escrow_rejection_refunds_buyer() {
        let mut contract = Contract::escrow(
            "ES-1".into(),
            "buyer".into(),
            "seller".into(),
            "arbiter".into(),
            75.0,
        );
        contract.make_decision("arbiter", false).unwrap();
        let (ok, message) = contract.execute(1, 0);
        assert!(ok);
        assert!(message.contains("buyer"));
    }

    #[test]
    fn test_conditional_script_gates_execution() {
        // Succeeds only if 3 * 4 > 10
        let script: Vec<Instruction> = vec![
            3.into(),
            4.into(),
            OpCode::Mul.into(),
            10.into(),
            OpCode::GreaterThan.into(),
        ];
        let mut contract = Contract::conditional(
            "CD-1".into(),
            "alice".into(),
            script,
            5.0,
            "bob".into(),
            "pays if product exceeds ten".into(),
        );
        let (ok, _) = contract.execute(1, 0);
        assert!(ok);

        let failing: Vec<Instruction> = vec![
            1.into(),
            2.into(),
            OpCode::Mul.into(),
            10.into(),
            OpCode::GreaterThan.into(),
        ];
        let mut contract = Contract::conditional(
            "CD-2".into(),
            "alice".into(),
            failing,
            5.0,
            "bob".into(),
            String::new(),
        );
        let (ok, _) = contract.execute(1, 0);
        assert!(!ok);
        assert!(!contract.executed);
    }

    #[test]
    fn test_execution_record_captures_trace() {
        let mut contract =
            Contract::timelock("TL-1".into(), "alice".into(), 0, 25.0, "bob".into());
        contract.execute(5, 0);
        let record = contract.execution_result.as_ref().unwrap();
        assert!(record.success);
        assert_eq!(record.gas_used, 3);
        assert!(!record.operations.is_empty());
        assert_eq!(record.final_stack, vec![Value::Int(1)]);
    }

    #[test]
    fn test_contract_serde_roundtrip() {
        let contract = Contract::multisig(
            "MS-1".into(),
            "a".into(),
            2,
            vec!["a".into(), "b".into()],
            100.0,
            "dest".into(),
        );
        let json = serde_json::to_string(&contract).unwrap();
        assert!(json.contains("\"type\":\"multisig\""));
        let decoded: Contract = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, "MS-1");
        assert_eq!(decoded.type_label(), "multisig");
    }
}
