use tinyevm_primitives::{hex_codec, Address, Result, TinyEvmError, U256};

/// Block environment fields the executor exposes to the host by string name. Distinct from
/// `tx_gas_limit`, which is a standalone per-call setting rather than part of the block context.
#[derive(Debug, Clone)]
pub struct BlockEnv {
    pub block_number: U256,
    pub timestamp: U256,
    pub coinbase: Address,
    pub gas_price: U256,
    pub origin: Address,
    pub chain_id: U256,
    pub basefee: U256,
}

impl Default for BlockEnv {
    fn default() -> Self {
        Self {
            block_number: U256::ZERO,
            timestamp: U256::ZERO,
            coinbase: Address::ZERO,
            gas_price: U256::ZERO,
            origin: Address::ZERO,
            chain_id: U256::from(1u64),
            basefee: U256::ZERO,
        }
    }
}

impl BlockEnv {
    pub fn get_field(&self, name: &str) -> Result<String> {
        Ok(match name {
            "block_number" => hex_codec::encode_u256(self.block_number),
            "timestamp" => hex_codec::encode_u256(self.timestamp),
            "coinbase" => format!("0x{:040x}", u256_from_address(self.coinbase)),
            "gas_price" => hex_codec::encode_u256(self.gas_price),
            "origin" => format!("0x{:040x}", u256_from_address(self.origin)),
            "chain_id" => hex_codec::encode_u256(self.chain_id),
            "basefee" => hex_codec::encode_u256(self.basefee),
            other => return Err(TinyEvmError::UnknownEnvField(other.to_string())),
        })
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "block_number" => self.block_number = hex_codec::decode_u256("block_number", value)?,
            "timestamp" => self.timestamp = hex_codec::decode_u256("timestamp", value)?,
            "coinbase" => self.coinbase = hex_codec::decode_address("coinbase", value)?,
            "gas_price" => self.gas_price = hex_codec::decode_u256("gas_price", value)?,
            "origin" => self.origin = hex_codec::decode_address("origin", value)?,
            "chain_id" => self.chain_id = hex_codec::decode_u256("chain_id", value)?,
            "basefee" => self.basefee = hex_codec::decode_u256("basefee", value)?,
            other => return Err(TinyEvmError::UnknownEnvField(other.to_string())),
        }
        Ok(())
    }
}

fn u256_from_address(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}
