//! Token metadata retrieval and alert formatting.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use alloy_transport::TransportError;
use thiserror::Error;
use tracing::debug;

use crate::chain::ContractCall;

// ============================================
// TOKEN INTERFACE
// ============================================

sol! {
    /// The read-only slice of the ERC-20 interface the feed cares about.
    interface IErc20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }
}

/// Why a token candidate's metadata could not be assembled. Terminal for the
/// candidate, never for the pipeline.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("could not retrieve token {field}: {source}")]
    Call {
        field: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("could not decode token {field}: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },
}

// ============================================
// TOKEN RECORD
// ============================================

/// A confirmed token deployment, ready to be formatted for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: U256,
}

impl TokenRecord {
    /// Renders the Telegram-HTML alert for this token. Pure formatting,
    /// independent of delivery.
    pub fn to_message(&self) -> String {
        let address = self.address.to_string();
        // Token metadata is attacker-controlled; escape it before it lands in
        // HTML. The address and supply are derived values and safe as-is.
        let name = escape(&self.name);
        let symbol = escape(&self.symbol);

        format!(
            "Address: {}\nName: {}\nSymbol: {}\nTotalSupply: {}\nTwitter: {} {}",
            link(
                &format!("https://etherscan.io/token/{address}"),
                &bold(&address)
            ),
            bold(&name),
            bold(&symbol),
            bold(&self.total_supply.to_string()),
            link(
                &format!("https://twitter.com/search?q=%24{symbol}&f=live"),
                &bold(&format!("${symbol}"))
            ),
            link(
                &format!("https://twitter.com/search?q={address}&f=live"),
                &bold("Address")
            ),
        )
    }
}

/// Reads name, symbol, total supply and decimals from the candidate.
///
/// Decimals only confirms the interface is complete; its value is discarded.
/// A failed read aborts the candidate, except that a failed total-supply read
/// degrades to zero when `zero_total_supply_fallback` is set.
pub async fn fetch_metadata<C>(
    caller: &C,
    address: Address,
    zero_total_supply_fallback: bool,
) -> Result<TokenRecord, MetadataError>
where
    C: ContractCall + ?Sized,
{
    let raw = caller
        .call_contract(address, IErc20::nameCall {}.abi_encode().into())
        .await
        .map_err(|source| MetadataError::Call { field: "name", source })?;
    let name = IErc20::nameCall::abi_decode_returns(&raw)
        .map_err(|source| MetadataError::Decode { field: "name", source })?;

    let raw = caller
        .call_contract(address, IErc20::symbolCall {}.abi_encode().into())
        .await
        .map_err(|source| MetadataError::Call { field: "symbol", source })?;
    let symbol = IErc20::symbolCall::abi_decode_returns(&raw)
        .map_err(|source| MetadataError::Decode { field: "symbol", source })?;

    let total_supply = match caller
        .call_contract(address, IErc20::totalSupplyCall {}.abi_encode().into())
        .await
    {
        Ok(raw) => IErc20::totalSupplyCall::abi_decode_returns(&raw).map_err(|source| {
            MetadataError::Decode { field: "totalSupply", source }
        })?,
        Err(source) if zero_total_supply_fallback => {
            debug!(%address, err = %source, "total supply unavailable, defaulting to zero");
            U256::ZERO
        }
        Err(source) => return Err(MetadataError::Call { field: "totalSupply", source }),
    };

    let raw = caller
        .call_contract(address, IErc20::decimalsCall {}.abi_encode().into())
        .await
        .map_err(|source| MetadataError::Call { field: "decimals", source })?;
    IErc20::decimalsCall::abi_decode_returns(&raw)
        .map_err(|source| MetadataError::Decode { field: "decimals", source })?;

    Ok(TokenRecord {
        address,
        name: printable_or_empty(name),
        symbol: printable_or_empty(symbol),
        total_supply,
    })
}

/// Token names and symbols are free-form bytes on chain. Anything that is not
/// clean printable text (control characters, or U+FFFD left behind by lossy
/// UTF-8 decoding) is replaced wholesale with the empty string.
fn printable_or_empty(text: String) -> String {
    let printable = !text
        .chars()
        .any(|c| c.is_control() || c == char::REPLACEMENT_CHARACTER);
    if printable {
        text
    } else {
        String::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn bold(text: &str) -> String {
    format!("<b>{text}</b>")
}

fn link(url: &str, text: &str) -> String {
    format!("<a href=\"{url}\">{text}</a>")
}
