//! Pipeline coordinator.
//!
//! Two long-lived tasks: the head loop subscribes to new chain heads and
//! fetches each block by hash; the filter loop accepts transaction batches
//! and fans every transaction out into its own classification task. The
//! hand-off between them is a capacity-1 channel, so head consumption can
//! never run further ahead than one unaccepted batch. Classification tasks
//! are gated by a semaphore and are neither joined nor aborted at shutdown.

use std::sync::Arc;

use alloy_consensus::transaction::SignerRecoverable;
use alloy_consensus::{Transaction, TxEnvelope};
use alloy_rpc_types::Block;
use eyre::{Result, WrapErr};
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, ContractCall};
use crate::classifier::TokenClassifier;
use crate::config::Config;
use crate::create::CandidateContract;
use crate::error::{FatalError, FatalReporter};
use crate::telegram::{Notify, TelegramClient};
use crate::token;

// ============================================
// HEAD LOOP
// ============================================

pub struct Coordinator {
    client: Arc<ChainClient>,
    notifier: Arc<TelegramClient>,
    classifier: TokenClassifier,
    max_concurrent_classifications: usize,
    zero_total_supply_fallback: bool,
}

impl Coordinator {
    pub async fn new(config: &Config) -> Result<Self> {
        let client = ChainClient::connect(&config.rpc_address)
            .await
            .wrap_err("unable to resolve connection with Ethereum RPC")?;
        let notifier =
            TelegramClient::new(config.telegram_token.clone(), config.telegram_chat_id)?;

        Ok(Self {
            client: Arc::new(client),
            notifier: Arc::new(notifier),
            classifier: TokenClassifier::new(),
            max_concurrent_classifications: config.max_concurrent_classifications,
            zero_total_supply_fallback: config.zero_total_supply_fallback,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.client.chain_id()
    }

    /// Runs the pipeline until cancelled or until a fatal error is latched.
    ///
    /// Subscription setup failure aborts immediately. A block fetch failure
    /// drops that header and moves on to the next one.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let (batches, batch_rx) = mpsc::channel(1);
        let (fatal, mut fatal_rx) = FatalReporter::channel();

        let filter = TxFilter {
            caller: Arc::clone(&self.client),
            notifier: Arc::clone(&self.notifier),
            classifier: self.classifier,
            permits: Arc::new(Semaphore::new(self.max_concurrent_classifications)),
            fatal,
            zero_total_supply_fallback: self.zero_total_supply_fallback,
            cancel: cancel.clone(),
        };
        tokio::spawn(filter.run(batch_rx));

        let mut heads = self
            .client
            .subscribe_heads()
            .await
            .map_err(FatalError::Subscribe)?;
        info!("subscribed to new chain heads");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                err = fatal_rx.recv() => {
                    return match err {
                        Some(err) => Err(err.into()),
                        None => Ok(()),
                    };
                }
                head = heads.next() => {
                    let Some(header) = head else {
                        return Err(FatalError::SubscriptionClosed.into());
                    };
                    let block = match self.client.block_by_hash(header.hash).await {
                        Ok(Some(block)) => block,
                        Ok(None) => {
                            debug!(hash = %header.hash, "block not found by hash, dropping header");
                            continue;
                        }
                        Err(err) => {
                            debug!(hash = %header.hash, %err, "could not retrieve block by hash, dropping header");
                            continue;
                        }
                    };

                    info!(
                        number = block.header.number,
                        transactions = block.transactions.len(),
                        "processing block"
                    );
                    // Blocks until the filter stage has accepted the batch,
                    // not until it has finished classifying it.
                    if batches.send(batch_from_block(block)).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Extracts a block's transaction envelopes, preserving block order.
fn batch_from_block(block: Block) -> Vec<TxEnvelope> {
    block
        .transactions
        .into_transactions()
        .map(|tx| tx.inner.into_parts().0)
        .collect()
}

// ============================================
// FILTER STAGE
// ============================================

/// Accepts batches and spawns one classification task per transaction.
struct TxFilter<C, N> {
    caller: Arc<C>,
    notifier: Arc<N>,
    classifier: TokenClassifier,
    permits: Arc<Semaphore>,
    fatal: FatalReporter,
    zero_total_supply_fallback: bool,
    cancel: CancellationToken,
}

impl<C, N> TxFilter<C, N>
where
    C: ContractCall + 'static,
    N: Notify + 'static,
{
    async fn run(self, mut batches: mpsc::Receiver<Vec<TxEnvelope>>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                batch = batches.recv() => {
                    let Some(batch) = batch else { return };
                    for tx in batch {
                        self.spawn_classify(tx);
                    }
                }
            }
        }
    }

    fn spawn_classify(&self, tx: TxEnvelope) {
        let caller = Arc::clone(&self.caller);
        let notifier = Arc::clone(&self.notifier);
        let classifier = self.classifier;
        let permits = Arc::clone(&self.permits);
        let fatal = self.fatal.clone();
        let cancel = self.cancel.clone();
        let zero_total_supply_fallback = self.zero_total_supply_fallback;

        tokio::spawn(async move {
            // Held for the whole classification; the semaphore is the ceiling
            // on concurrent in-flight candidates.
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return,
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            classify_transaction(
                &*caller,
                &*notifier,
                classifier,
                &fatal,
                &cancel,
                zero_total_supply_fallback,
                tx,
            )
            .await;
        });
    }
}

/// One transaction's journey: sender recovery, creation check, address
/// derivation, token probing, metadata fetch, notification.
async fn classify_transaction<C, N>(
    caller: &C,
    notifier: &N,
    classifier: TokenClassifier,
    fatal: &FatalReporter,
    cancel: &CancellationToken,
    zero_total_supply_fallback: bool,
    tx: TxEnvelope,
) where
    C: ContractCall + ?Sized,
    N: Notify + ?Sized,
{
    let creator = match tx.recover_signer() {
        Ok(creator) => creator,
        Err(err) => {
            // A well-formed transaction whose sender cannot be recovered
            // means the feed is seeing corrupt data; stop the world rather
            // than skip it.
            fatal.report(FatalError::SenderRecovery(err));
            return;
        }
    };

    if tx.to().is_some() {
        // Not a creation transaction.
        return;
    }

    let candidate = CandidateContract::derive(creator, tx.nonce());

    if cancel.is_cancelled() {
        return;
    }
    if !classifier.is_token_like(caller, candidate.address).await {
        return;
    }
    debug!(
        address = %candidate.address,
        creator = %candidate.creator,
        creator_nonce = candidate.creator_nonce,
        "candidate answers token probes"
    );

    let record =
        match token::fetch_metadata(caller, candidate.address, zero_total_supply_fallback).await {
            Ok(record) => record,
            Err(err) => {
                debug!(address = %candidate.address, %err, "discarding token candidate");
                return;
            }
        };

    info!(
        address = %record.address,
        symbol = %record.symbol,
        supply = %record.total_supply,
        "new token deployed"
    );
    if let Err(err) = notifier.notify(&record.to_message()).await {
        warn!(address = %record.address, %err, "could not deliver token alert");
    }
}
