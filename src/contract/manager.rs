//! Contract lifecycle management
//!
//! The manager owns all deployed contracts, hands out type-prefixed ids from
//! a single monotonic counter, routes signatures and escrow decisions to the
//! right contract and persists the whole set after every mutation.

use log::warn;
use std::collections::BTreeMap;

use crate::contract::contract::{Contract, ContractError};
use crate::script::Instruction;
use crate::storage::persistence::{ContractStore, StorageError};

/// Filter for [`ContractManager::list_contracts`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Executed,
}

/// Registry of all deployed contracts
#[derive(Debug)]
pub struct ContractManager {
    contracts: BTreeMap<String, Contract>,
    next_id: u64,
    store: Option<ContractStore>,
}

impl ContractManager {
    pub fn new() -> Self {
        Self {
            contracts: BTreeMap::new(),
            next_id: 1,
            store: None,
        }
    }

    /// Create a manager backed by `store`, loading any previously persisted
    /// contracts. A missing file yields an empty manager.
    pub fn with_store(store: ContractStore) -> Result<Self, StorageError> {
        let (next_id, contracts) = match store.load()? {
            Some((next_id, contracts)) => (next_id, contracts),
            None => (1, BTreeMap::new()),
        };
        Ok(Self {
            contracts,
            next_id,
            store: Some(store),
        })
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// All contract ids share one counter, so ids are unique across types
    fn allocate_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(self.next_id, &self.contracts) {
                warn!("Failed to persist contracts: {}", e);
            }
        }
    }

    fn insert(&mut self, contract: Contract) -> Contract {
        self.contracts.insert(contract.id.clone(), contract.clone());
        self.persist();
        contract
    }

    pub fn create_timelock(
        &mut self,
        creator: &str,
        unlock_block: u64,
        amount: f64,
        recipient: &str,
    ) -> Contract {
        let id = self.allocate_id("TL");
        self.insert(Contract::timelock(
            id,
            creator.to_string(),
            unlock_block,
            amount,
            recipient.to_string(),
        ))
    }

    pub fn create_multisig(
        &mut self,
        creator: &str,
        required_sigs: usize,
        signers: Vec<String>,
        amount: f64,
        recipient: &str,
    ) -> Contract {
        let id = self.allocate_id("MS");
        self.insert(Contract::multisig(
            id,
            creator.to_string(),
            required_sigs,
            signers,
            amount,
            recipient.to_string(),
        ))
    }

    pub fn create_escrow(
        &mut self,
        buyer: &str,
        seller: &str,
        arbiter: &str,
        amount: f64,
    ) -> Contract {
        let id = self.allocate_id("ES");
        self.insert(Contract::escrow(
            id,
            buyer.to_string(),
            seller.to_string(),
            arbiter.to_string(),
            amount,
        ))
    }

    pub fn create_conditional(
        &mut self,
        creator: &str,
        script: Vec<Instruction>,
        amount: f64,
        recipient: &str,
        description: &str,
    ) -> Contract {
        let id = self.allocate_id("CD");
        self.insert(Contract::conditional(
            id,
            creator.to_string(),
            script,
            amount,
            recipient.to_string(),
            description.to_string(),
        ))
    }

    /// Execute a contract by id at the given block height
    pub fn execute_contract(
        &mut self,
        id: &str,
        block_height: u64,
        timestamp: i64,
    ) -> (bool, String) {
        let Some(contract) = self.contracts.get_mut(id) else {
            return (false, format!("Contract not found: {}", id));
        };
        let result = contract.execute(block_height, timestamp);
        self.persist();
        result
    }

    /// Record a signature on a multisig contract. `Ok(true)` means the
    /// signature was accepted, `Ok(false)` that the signer was ineligible
    /// or had already signed.
    pub fn add_signature(&mut self, id: &str, signer: &str) -> Result<bool, ContractError> {
        let contract = self
            .contracts
            .get_mut(id)
            .ok_or_else(|| ContractError::NotFound(id.to_string()))?;
        if contract.type_label() != "multisig" {
            return Err(ContractError::NotMultisig(id.to_string()));
        }
        let accepted = contract.add_signature(signer);
        self.persist();
        Ok(accepted)
    }

    /// Record the arbiter's verdict on an escrow contract
    pub fn make_decision(
        &mut self,
        id: &str,
        arbiter: &str,
        approve: bool,
    ) -> Result<String, ContractError> {
        let contract = self
            .contracts
            .get_mut(id)
            .ok_or_else(|| ContractError::NotFound(id.to_string()))?;
        let message = contract.make_decision(arbiter, approve)?;
        self.persist();
        Ok(message)
    }

    pub fn get_contract(&self, id: &str) -> Option<&Contract> {
        self.contracts.get(id)
    }

    /// Contracts in id order, optionally filtered by execution status
    pub fn list_contracts(&self, filter: Option<StatusFilter>) -> Vec<&Contract> {
        self.contracts
            .values()
            .filter(|c| match filter {
                None => true,
                Some(StatusFilter::Pending) => !c.executed,
                Some(StatusFilter::Executed) => c.executed,
            })
            .collect()
    }
}
