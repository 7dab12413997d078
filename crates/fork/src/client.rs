//! Thin JSON-RPC HTTP client for Ethereum archive nodes, pinned to a single block height.

use serde_json::{json, Value};
use tinyevm_primitives::{Address, Bytes, TinyEvmError, U256};

pub struct EthRpcClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    block_tag: String,
}

impl EthRpcClient {
    pub fn new(endpoint: impl Into<String>, block_number: u64) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
            block_tag: format!("0x{block_number:x}"),
        }
    }

    pub fn eth_get_balance(&self, address: Address) -> Result<U256, TinyEvmError> {
        let result = self.call("eth_getBalance", json!([address.to_string(), &self.block_tag]))?;
        parse_u256(&self.endpoint, &result)
    }

    pub fn eth_get_transaction_count(&self, address: Address) -> Result<u64, TinyEvmError> {
        let result = self.call(
            "eth_getTransactionCount",
            json!([address.to_string(), &self.block_tag]),
        )?;
        parse_u64(&self.endpoint, &result)
    }

    pub fn eth_get_code(&self, address: Address) -> Result<Bytes, TinyEvmError> {
        let result = self.call("eth_getCode", json!([address.to_string(), &self.block_tag]))?;
        let hex_str = result.as_str().ok_or_else(|| TinyEvmError::ForkIo {
            endpoint: self.endpoint.clone(),
            message: "eth_getCode: expected a hex string result".into(),
        })?;
        let bytes = hex::decode(hex_str.trim_start_matches("0x")).map_err(|err| TinyEvmError::ForkIo {
            endpoint: self.endpoint.clone(),
            message: format!("eth_getCode: {err}"),
        })?;
        Ok(Bytes::from(bytes))
    }

    pub fn eth_get_storage_at(&self, address: Address, slot: U256) -> Result<U256, TinyEvmError> {
        let slot_hex = format!("0x{slot:x}");
        let result = self.call(
            "eth_getStorageAt",
            json!([address.to_string(), slot_hex, &self.block_tag]),
        )?;
        parse_u256(&self.endpoint, &result)
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, TinyEvmError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let to_io_err = |message: String| TinyEvmError::ForkIo {
            endpoint: self.endpoint.clone(),
            message,
        };
        let response: Value = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| to_io_err(format!("{method} request failed: {err}")))?
            .json()
            .map_err(|err| to_io_err(format!("{method} response parse failed: {err}")))?;

        if let Some(error) = response.get("error") {
            return Err(to_io_err(format!("{method} returned an RPC error: {error}")));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| to_io_err(format!("{method}: response missing `result` field")))
    }
}

fn parse_u64(endpoint: &str, value: &Value) -> Result<u64, TinyEvmError> {
    let s = value.as_str().ok_or_else(|| TinyEvmError::ForkIo {
        endpoint: endpoint.to_string(),
        message: "expected a hex string for u64".into(),
    })?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|err| TinyEvmError::ForkIo {
        endpoint: endpoint.to_string(),
        message: format!("u64 parse failed: {err}"),
    })
}

fn parse_u256(endpoint: &str, value: &Value) -> Result<U256, TinyEvmError> {
    let s = value.as_str().ok_or_else(|| TinyEvmError::ForkIo {
        endpoint: endpoint.to_string(),
        message: "expected a hex string for U256".into(),
    })?;
    let trimmed = s.trim_start_matches("0x");
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
    U256::from_str_radix(trimmed, 16).map_err(|err| TinyEvmError::ForkIo {
        endpoint: endpoint.to_string(),
        message: format!("U256 parse failed: {err}"),
    })
}
