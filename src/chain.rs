//! Chain client: WebSocket provider plus the read-only call seam.
//!
//! The pipeline never retries RPC failures; every method surfaces alloy's
//! typed transport error and leaves the fatal/non-fatal decision to the
//! caller.

use alloy_eips::BlockId;
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy_rpc_types::{Block, Header, TransactionRequest};
use alloy_transport::TransportError;
use async_trait::async_trait;
use futures::Stream;
use tracing::info;

/// Read-only contract call issued against the pending execution context.
///
/// Pending matters: a contract created in the block currently being processed
/// has no code in the latest finalized state yet, but a pending call sees it.
#[async_trait]
pub trait ContractCall: Send + Sync {
    async fn call_contract(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError>;
}

/// Handle to the Ethereum RPC endpoint, shared read-only by every
/// classification task.
pub struct ChainClient {
    provider: DynProvider,
    chain_id: u64,
}

impl ChainClient {
    /// Dials the WebSocket endpoint and resolves the chain identity.
    /// Both steps are fatal on failure; there is no reconnect logic.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(url))
            .await?
            .erased();

        let chain_id = provider.get_chain_id().await?;
        info!(chain_id, "connected to Ethereum RPC");

        Ok(Self { provider, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Subscribes to new chain heads. The subscription is dropped (and the
    /// server-side filter released) when the returned stream is dropped.
    pub async fn subscribe_heads(
        &self,
    ) -> Result<impl Stream<Item = Header> + Unpin, TransportError> {
        Ok(self.provider.subscribe_blocks().await?.into_stream())
    }

    /// Fetches a block by hash with its full transaction bodies.
    pub async fn block_by_hash(&self, hash: B256) -> Result<Option<Block>, TransportError> {
        self.provider.get_block_by_hash(hash).full().await
    }
}

#[async_trait]
impl ContractCall for ChainClient {
    async fn call_contract(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        let req = TransactionRequest::default().to(to).input(data.into());
        self.provider.call(req).block(BlockId::pending()).await
    }
}
