//! A bound contract with call and transact options pre-set.

use chainbind_core::{AbiValue, BindError, CallOpts, TransactOpts};

use crate::bound::BoundContract;
use crate::call::PendingTransaction;

/// Pairs a [`BoundContract`] with default options so callers need not pass
/// them on every invocation.
#[derive(Debug, Clone)]
pub struct ContractSession {
    contract: BoundContract,
    pub call_opts: CallOpts,
    pub transact_opts: TransactOpts,
}

impl ContractSession {
    pub fn new(contract: BoundContract, call_opts: CallOpts, transact_opts: TransactOpts) -> Self {
        Self {
            contract,
            call_opts,
            transact_opts,
        }
    }

    pub fn contract(&self) -> &BoundContract {
        &self.contract
    }

    pub async fn call(&self, method: &str, args: &[AbiValue]) -> Result<Vec<AbiValue>, BindError> {
        self.contract.call(&self.call_opts, method, args).await
    }

    pub async fn transact(
        &self,
        method: &str,
        args: &[AbiValue],
    ) -> Result<PendingTransaction, BindError> {
        self.contract.transact(&self.transact_opts, method, args).await
    }

    pub async fn transfer(&self) -> Result<PendingTransaction, BindError> {
        self.contract.transfer(&self.transact_opts).await
    }
}
