//! L1 action signing.
//!
//! Hyperliquid signs an action by hashing its msgpack encoding together with
//! the nonce, then signing that hash as the `connectionId` of a "phantom
//! agent" EIP-712 struct. The agent `source` binds the signature to one
//! network, so a testnet signature is never valid on mainnet.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};

use super::wire::{Action, SignatureWire};
use super::ClientError;
use crate::credential::Credential;
use crate::network::NetworkContext;

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// keccak256(msgpack(action) ‖ nonce (big endian) ‖ 0x00 no-vault marker)
pub fn action_hash(action: &Action, nonce: u64) -> Result<B256, ClientError> {
    let mut bytes = rmp_serde::to_vec_named(action)
        .map_err(|e| ClientError::Signing(format!("failed to encode action: {}", e)))?;
    bytes.extend_from_slice(&nonce.to_be_bytes());
    bytes.push(0);
    Ok(keccak256(bytes))
}

fn l1_domain(network: &NetworkContext) -> Eip712Domain {
    eip712_domain! {
        name: "Exchange",
        version: "1",
        chain_id: network.signing_chain_id(),
        verifying_contract: Address::ZERO,
    }
}

pub fn sign_l1_action(
    credential: &Credential,
    network: &NetworkContext,
    action: &Action,
    nonce: u64,
) -> Result<SignatureWire, ClientError> {
    let agent = Agent {
        source: network.agent_source().to_string(),
        connectionId: action_hash(action, nonce)?,
    };
    let digest = agent.eip712_signing_hash(&l1_domain(network));

    let raw = credential
        .sign_hash(&digest)
        .map_err(|e| ClientError::Signing(e.to_string()))?;

    Ok(SignatureWire {
        r: format!("0x{:x}", U256::from_be_slice(&raw[..32])),
        s: format!("0x{:x}", U256::from_be_slice(&raw[32..64])),
        v: raw[64],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::tests::TEST_KEY;
    use crate::exchange::wire::{BulkCancel, CancelWire};
    use crate::network::Network;

    fn cancel_action() -> Action {
        Action::Cancel(BulkCancel {
            cancels: vec![CancelWire { a: 0, o: 12345 }],
        })
    }

    #[test]
    fn test_action_hash_depends_on_nonce() {
        let action = cancel_action();
        let first = action_hash(&action, 1_700_000_000_000).unwrap();
        let again = action_hash(&action, 1_700_000_000_000).unwrap();
        let other = action_hash(&action, 1_700_000_000_001).unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let credential = Credential::from_hex(TEST_KEY).unwrap();
        let network = NetworkContext::new(Network::Testnet);
        let a = sign_l1_action(&credential, &network, &cancel_action(), 42).unwrap();
        let b = sign_l1_action(&credential, &network, &cancel_action(), 42).unwrap();
        assert_eq!(a.r, b.r);
        assert_eq!(a.s, b.s);
        assert!(a.r.starts_with("0x"));
        assert!(a.v == 27 || a.v == 28);
    }

    #[test]
    fn test_signature_bound_to_network() {
        let credential = Credential::from_hex(TEST_KEY).unwrap();
        let testnet = sign_l1_action(
            &credential,
            &NetworkContext::new(Network::Testnet),
            &cancel_action(),
            42,
        )
        .unwrap();
        let mainnet = sign_l1_action(
            &credential,
            &NetworkContext::new(Network::Mainnet),
            &cancel_action(),
            42,
        )
        .unwrap();
        assert_ne!(testnet.r, mainnet.r);
    }
}
