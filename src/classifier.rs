//! Token-likeness classification.
//!
//! A freshly deployed contract is probed with a small set of read-only calls
//! that fungible tokens are overwhelmingly likely to answer. Only call
//! success is checked at this stage; the returned bytes are not interpreted.
//! Probe failures of any kind (revert, no code at the address, transport
//! error) mean "not a token" and are swallowed.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use tracing::trace;

use crate::chain::ContractCall;
use crate::token::IErc20;

/// A single zero-argument accessor probe.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub name: &'static str,
    pub selector: [u8; 4],
}

/// The default probe set: the two cheap accessors virtually every fungible
/// token implements. Extend the list to tighten the heuristic.
pub const TOKEN_PROBES: &[Probe] = &[
    Probe {
        name: "symbol()",
        selector: IErc20::symbolCall::SELECTOR,
    },
    Probe {
        name: "name()",
        selector: IErc20::nameCall::SELECTOR,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct TokenClassifier {
    probes: &'static [Probe],
}

impl TokenClassifier {
    pub fn new() -> Self {
        Self {
            probes: TOKEN_PROBES,
        }
    }

    /// Swap in a custom probe set, e.g. to add a third accessor check.
    #[allow(dead_code)]
    pub fn with_probes(probes: &'static [Probe]) -> Self {
        Self { probes }
    }

    /// Issues the probes sequentially against the candidate. Token-like iff
    /// every probe call returns without error.
    pub async fn is_token_like<C>(&self, caller: &C, address: Address) -> bool
    where
        C: ContractCall + ?Sized,
    {
        for probe in self.probes {
            if let Err(err) = caller
                .call_contract(address, Bytes::from_static(&probe.selector))
                .await
            {
                trace!(%address, probe = probe.name, %err, "probe failed");
                return false;
            }
        }
        true
    }
}

impl Default for TokenClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_transport::{TransportError, TransportErrorKind};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const CANDIDATE: Address = address!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d");

    struct StubCaller {
        failing: HashSet<[u8; 4]>,
        calls: Mutex<Vec<[u8; 4]>>,
    }

    impl StubCaller {
        fn failing_on(selectors: &[[u8; 4]]) -> Self {
            Self {
                failing: selectors.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContractCall for StubCaller {
        async fn call_contract(
            &self,
            _to: Address,
            data: Bytes,
        ) -> Result<Bytes, TransportError> {
            let selector: [u8; 4] = data[..4].try_into().unwrap();
            self.calls.lock().unwrap().push(selector);
            if self.failing.contains(&selector) {
                Err(TransportErrorKind::custom_str("execution reverted"))
            } else {
                // Arbitrary bytes: probe results are not interpreted.
                Ok(Bytes::from_static(b"\xde\xad\xbe\xef"))
            }
        }
    }

    const SYMBOL: [u8; 4] = IErc20::symbolCall::SELECTOR;
    const NAME: [u8; 4] = IErc20::nameCall::SELECTOR;

    #[tokio::test]
    async fn test_token_like_when_both_probes_succeed() {
        let caller = StubCaller::failing_on(&[]);
        assert!(TokenClassifier::new().is_token_like(&caller, CANDIDATE).await);
        assert_eq!(*caller.calls.lock().unwrap(), vec![SYMBOL, NAME]);
    }

    #[tokio::test]
    async fn test_not_token_like_when_name_fails() {
        let caller = StubCaller::failing_on(&[NAME]);
        assert!(!TokenClassifier::new().is_token_like(&caller, CANDIDATE).await);
    }

    #[tokio::test]
    async fn test_not_token_like_when_symbol_fails() {
        let caller = StubCaller::failing_on(&[SYMBOL]);
        assert!(!TokenClassifier::new().is_token_like(&caller, CANDIDATE).await);
        // The probe set is sequential and short-circuits on first failure.
        assert_eq!(*caller.calls.lock().unwrap(), vec![SYMBOL]);
    }

    #[tokio::test]
    async fn test_not_token_like_when_both_fail() {
        let caller = StubCaller::failing_on(&[SYMBOL, NAME]);
        assert!(!TokenClassifier::new().is_token_like(&caller, CANDIDATE).await);
    }

    #[tokio::test]
    async fn test_custom_probe_set() {
        const STRICT: &[Probe] = &[
            Probe {
                name: "symbol()",
                selector: IErc20::symbolCall::SELECTOR,
            },
            Probe {
                name: "name()",
                selector: IErc20::nameCall::SELECTOR,
            },
            Probe {
                name: "totalSupply()",
                selector: IErc20::totalSupplyCall::SELECTOR,
            },
        ];

        let caller = StubCaller::failing_on(&[IErc20::totalSupplyCall::SELECTOR]);
        let classifier = TokenClassifier::with_probes(STRICT);
        assert!(!classifier.is_token_like(&caller, CANDIDATE).await);

        let caller = StubCaller::failing_on(&[]);
        assert!(classifier.is_token_like(&caller, CANDIDATE).await);
    }
}
