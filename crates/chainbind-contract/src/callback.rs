//! Callback-style watching on top of [`BoundContract::watch_logs`].

use std::ops::ControlFlow;

use chainbind_core::{AbiValue, BindError, DecodedEvent, FromEventFields, WatchOpts};
use tokio::sync::mpsc;

use crate::bound::BoundContract;

/// Buffer between the pump and the handler.
pub const WATCH_BUFFER: usize = 128;

impl BoundContract {
    /// Run `handler` for every new `event` until it returns
    /// `ControlFlow::Break` or the subscription fails.
    ///
    /// Returns `Ok(())` when the handler stopped the watch and the error
    /// that ended the subscription otherwise.
    pub async fn watch_with<T, F>(
        &self,
        opts: &WatchOpts,
        event: &str,
        indexed: &[Vec<AbiValue>],
        mut handler: F,
    ) -> Result<(), BindError>
    where
        T: FromEventFields,
        F: FnMut(DecodedEvent<T>) -> ControlFlow<()> + Send,
    {
        let (tx, mut rx) = mpsc::channel(WATCH_BUFFER);
        let mut sub = self.watch_logs(opts, event, indexed, tx).await?;

        while let Some(decoded) = rx.recv().await {
            if handler(decoded).is_break() {
                sub.close();
                break;
            }
        }

        match sub.err().await {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
