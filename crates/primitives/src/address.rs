//! Deterministic contract address derivation (CREATE / CREATE2), independent of any particular
//! EVM implementation so the host can predict an address before the constructor has run (needed
//! to credit `init_value` ahead of execution).

use alloy_primitives::{keccak256, Address};
use alloy_rlp::Encodable;

/// `keccak256(rlp([deployer, nonce]))[12..]`
pub fn derive_create_address(deployer: Address, nonce: u64) -> Address {
    let mut out = Vec::with_capacity(64);
    let header = alloy_rlp::Header {
        list: true,
        payload_length: deployer.length() + nonce.length(),
    };
    header.encode(&mut out);
    deployer.encode(&mut out);
    nonce.encode(&mut out);
    Address::from_word(keccak256(&out))
}

/// `keccak256(0xff ++ deployer ++ salt ++ keccak256(init_code ++ ctor_args))[12..]`
pub fn derive_create2_address(deployer: Address, salt: [u8; 32], init_code: &[u8]) -> Address {
    let init_code_hash = keccak256(init_code);
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(deployer.as_slice());
    preimage.extend_from_slice(&salt);
    preimage.extend_from_slice(init_code_hash.as_slice());
    Address::from_word(keccak256(&preimage))
}
