//! Contract handle: typed calls and transactions against one deployed contract

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::abi::{self, Outputs, ParamType, Token};
use super::address::Address;
use super::rpc::{quantity_from_value, to_quantity, EthTransport};
use super::signer::{LegacyTransaction, LocalSigner};
use crate::error::{ClientError, Result};

/// How long `PendingTransaction::wait` keeps polling for a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptPolling {
    /// Delay between `eth_getTransactionReceipt` calls
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Number of polls before giving up
    pub max_polls: u32,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        // 750 one-second polls, the usual wallet default
        Self {
            interval: Duration::from_secs(1),
            max_polls: 750,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Per-transaction overrides; anything left `None` is filled in from the node
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    pub from: Option<Address>,
    pub gas: Option<u128>,
    pub gas_price: Option<u128>,
    /// Native token attached to the call, in wei
    pub value: Option<u128>,
}

impl TxOptions {
    pub fn with_value(value: u128) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

/// Mined transaction summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u128,
    pub success: bool,
}

impl TransactionReceipt {
    fn from_json(value: &serde_json::Value) -> Result<Self> {
        let field = |name: &str| {
            value
                .get(name)
                .ok_or_else(|| ClientError::Decode(format!("receipt missing '{name}'")))
        };
        let transaction_hash = field("transactionHash")?
            .as_str()
            .ok_or_else(|| ClientError::Decode("receipt transactionHash is not a string".into()))?
            .to_string();
        let block = quantity_from_value(field("blockNumber")?)?;
        let block_number = u64::try_from(block)
            .map_err(|_| ClientError::Decode(format!("receipt blockNumber {block} out of range")))?;
        let gas_used = quantity_from_value(field("gasUsed")?)?;
        // Pre-Byzantium receipts carry no status; treat them as successful
        let success = match value.get("status") {
            Some(status) if !status.is_null() => quantity_from_value(status)? == 1,
            _ => true,
        };
        Ok(Self {
            transaction_hash,
            block_number,
            gas_used,
            success,
        })
    }
}

/// A submitted transaction whose inclusion can be awaited
pub struct PendingTransaction {
    hash: String,
    transport: Arc<dyn EthTransport>,
    polling: ReceiptPolling,
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .finish()
    }
}

impl PendingTransaction {
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Poll until the transaction is mined.
    ///
    /// Returns `Reverted` if it was mined with a failed status and `Timeout` when
    /// the poll budget runs out.
    pub async fn wait(self) -> Result<TransactionReceipt> {
        for attempt in 0..self.polling.max_polls {
            let value = self
                .transport
                .request("eth_getTransactionReceipt", json!([self.hash]))
                .await?;

            if !value.is_null() {
                let receipt = TransactionReceipt::from_json(&value)?;
                if !receipt.success {
                    return Err(ClientError::Reverted {
                        tx_hash: receipt.transaction_hash,
                    });
                }
                info!(
                    tx = %receipt.transaction_hash,
                    block = receipt.block_number,
                    "Transaction mined"
                );
                return Ok(receipt);
            }

            debug!(tx = %self.hash, attempt, "Receipt not available yet");
            if attempt + 1 < self.polling.max_polls {
                tokio::time::sleep(self.polling.interval).await;
            }
        }

        Err(ClientError::Timeout(format!(
            "transaction {} not mined after {} polls",
            self.hash, self.polling.max_polls
        )))
    }
}

/// One deployed contract plus the cached default caller used for writes
pub struct Contract {
    transport: Arc<dyn EthTransport>,
    address: Address,
    default_account: RwLock<Option<Address>>,
    signer: Option<Arc<LocalSigner>>,
    polling: ReceiptPolling,
}

impl Contract {
    pub fn new(transport: Arc<dyn EthTransport>, address: Address) -> Self {
        Self {
            transport,
            address,
            default_account: RwLock::new(None),
            signer: None,
            polling: ReceiptPolling::default(),
        }
    }

    /// Sign writes locally and submit them raw; the key's address becomes the
    /// default account
    pub fn with_signer(mut self, signer: Arc<LocalSigner>) -> Self {
        *self.default_account.get_mut() = Some(signer.address());
        self.signer = Some(signer);
        self
    }

    pub fn with_polling(mut self, polling: ReceiptPolling) -> Self {
        self.polling = polling;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_default_account(&self, account: Option<Address>) {
        *self.default_account.write() = account;
    }

    pub fn default_account(&self) -> Option<Address> {
        *self.default_account.read()
    }

    /// Read-only call at the latest block
    pub async fn call(
        &self,
        signature: &str,
        args: &[Token],
        outputs: &[ParamType],
    ) -> Result<Outputs> {
        let data = abi::encode_call(signature, args);
        let mut tx = json!({
            "to": self.address.to_hex(),
            "data": format!("0x{}", hex::encode(&data)),
        });
        if let Some(from) = self.default_account() {
            tx["from"] = json!(from.to_hex());
        }

        debug!(contract = %self.address, signature, "eth_call");
        let result = self.transport.request("eth_call", json!([tx, "latest"])).await?;

        let hex_data = result
            .as_str()
            .ok_or_else(|| ClientError::Decode(format!("eth_call returned {result}")))?;
        let bytes = hex::decode(hex_data.trim_start_matches("0x"))
            .map_err(|e| ClientError::Decode(format!("eth_call returned invalid hex: {e}")))?;

        if bytes.is_empty() && !outputs.is_empty() {
            return Err(ClientError::Decode(format!(
                "empty return data from {signature} at {}",
                self.address
            )));
        }

        Ok(Outputs::new(abi::decode(outputs, &bytes)?))
    }

    /// Submit a state-changing call.
    ///
    /// The sender must be given in `options` or configured as the default
    /// account; otherwise this fails before touching the network. With a local
    /// signer the transaction is signed here and sent with
    /// `eth_sendRawTransaction`, else the node signs it via `eth_sendTransaction`.
    pub async fn send(
        &self,
        signature: &str,
        args: &[Token],
        options: TxOptions,
    ) -> Result<PendingTransaction> {
        let from = options
            .from
            .or_else(|| self.default_account())
            .ok_or_else(|| ClientError::Configuration("No from address specified".into()))?;
        if let Some(signer) = &self.signer {
            if signer.address() != from {
                return Err(ClientError::Configuration(format!(
                    "Cannot sign for {from}: the configured key belongs to {}",
                    signer.address()
                )));
            }
        }

        let call_data = abi::encode_call(signature, args);
        let data = format!("0x{}", hex::encode(&call_data));
        let value = options.value.unwrap_or(0);

        let gas = match options.gas {
            Some(gas) => gas,
            None => {
                let estimate = self
                    .transport
                    .request(
                        "eth_estimateGas",
                        json!([{
                            "from": from.to_hex(),
                            "to": self.address.to_hex(),
                            "data": data,
                            "value": to_quantity(value),
                        }]),
                    )
                    .await?;
                quantity_from_value(&estimate)?
            }
        };

        let gas_price = match options.gas_price {
            Some(price) => price,
            None => {
                let price = self.transport.request("eth_gasPrice", json!([])).await?;
                quantity_from_value(&price)?
            }
        };

        let (method, params) = match &self.signer {
            Some(signer) => {
                let count = self
                    .transport
                    .request("eth_getTransactionCount", json!([from.to_hex(), "pending"]))
                    .await?;
                let raw = signer.sign(&LegacyTransaction {
                    nonce: quantity_from_value(&count)?,
                    gas_price,
                    gas,
                    to: self.address,
                    value,
                    data: call_data,
                })?;
                ("eth_sendRawTransaction", json!([format!("0x{}", hex::encode(raw))]))
            }
            None => (
                "eth_sendTransaction",
                json!([{
                    "from": from.to_hex(),
                    "to": self.address.to_hex(),
                    "data": data,
                    "gas": to_quantity(gas),
                    "gasPrice": to_quantity(gas_price),
                    "value": to_quantity(value),
                }]),
            ),
        };

        let hash = self
            .transport
            .request(method, params)
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Decode(format!("{method} returned no hash")))?;

        info!(
            contract = %self.address,
            signature,
            from = %from,
            tx = %hash,
            gas,
            "Transaction submitted"
        );

        Ok(PendingTransaction {
            hash,
            transport: self.transport.clone(),
            polling: self.polling,
        })
    }
}
