//! Read-only calls and state-changing transactions against a bound contract.

use chainbind_core::{AbiValue, Address, BindError, Bytes, CallOpts, TransactOpts, TransactionRequest, B256};
use tracing::{debug, info};

use crate::bound::BoundContract;

/// A transaction the node accepted into its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: B256,
    pub to: Address,
    /// Gas limit the transaction was submitted with.
    pub gas: u64,
}

impl BoundContract {
    /// Invoke a read-only `method` and decode its return values.
    pub async fn call(
        &self,
        opts: &CallOpts,
        method: &str,
        args: &[AbiValue],
    ) -> Result<Vec<AbiValue>, BindError> {
        let data = self.codec.encode_call(method, args)?;
        let tx = TransactionRequest {
            from: opts.from,
            to: Some(self.address),
            data,
            ..Default::default()
        };

        debug!(contract = %self.address, method, block = %opts.block.to_rpc_param(), "eth_call");
        let output = self.endpoint.call(&tx, opts.block).await?;
        self.codec.decode_output(method, &output)
    }

    /// Submit a transaction invoking `method`.
    ///
    /// When `opts.gas_limit` is unset the gas is estimated first; an
    /// estimation failure (typically a revert) aborts before submission.
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        method: &str,
        args: &[AbiValue],
    ) -> Result<PendingTransaction, BindError> {
        let data = self.codec.encode_call(method, args)?;
        self.submit(opts, data, method).await
    }

    /// Send plain value to the contract with empty calldata, reaching its
    /// receive/fallback function.
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<PendingTransaction, BindError> {
        self.submit(opts, Bytes::new(), "<transfer>").await
    }

    /// Estimate the gas `method` would use if sent with `opts`.
    pub async fn estimate_gas(
        &self,
        opts: &TransactOpts,
        method: &str,
        args: &[AbiValue],
    ) -> Result<u64, BindError> {
        let data = self.codec.encode_call(method, args)?;
        let tx = self.transaction(opts, data);
        Ok(self.endpoint.estimate_gas(&tx).await?)
    }

    fn transaction(&self, opts: &TransactOpts, data: Bytes) -> TransactionRequest {
        TransactionRequest {
            from: Some(opts.from),
            to: Some(self.address),
            data,
            value: (!opts.value.is_zero()).then_some(opts.value),
            gas: opts.gas_limit,
            gas_price: opts.gas_price,
            nonce: opts.nonce,
        }
    }

    async fn submit(
        &self,
        opts: &TransactOpts,
        data: Bytes,
        label: &str,
    ) -> Result<PendingTransaction, BindError> {
        let mut tx = self.transaction(opts, data);
        let gas = match tx.gas {
            Some(gas) => gas,
            None => {
                let estimated = self.endpoint.estimate_gas(&tx).await?;
                debug!(contract = %self.address, method = label, gas = estimated, "gas estimated");
                estimated
            }
        };
        tx.gas = Some(gas);

        let hash = self.endpoint.send_transaction(&tx).await?;
        info!(contract = %self.address, method = label, tx = %hash, gas, "transaction submitted");
        Ok(PendingTransaction {
            hash,
            to: self.address,
            gas,
        })
    }
}
