use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 32-byte transaction hash, hex encoded on the wire and in JSON
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("Invalid tx hash '{}': {}", s, e))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("Tx hash must be 32 bytes, got {}", b.len()))?;
        Ok(TxHash(array))
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        TxHash(bytes)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TxHash::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Outpoint-style reference `(betBlockHeight, betTxHash, betTxOut)`.
///
/// Field order is the ordering used for deterministic bet iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxRef {
    #[serde(rename = "betBlockHeight")]
    pub block_height: u64,
    #[serde(rename = "betTxHash")]
    pub tx_hash: TxHash,
    #[serde(rename = "betTxOut")]
    pub tx_out: u32,
}

impl TxRef {
    pub fn new(block_height: u64, tx_hash: TxHash, tx_out: u32) -> Self {
        Self {
            block_height,
            tx_hash,
            tx_out,
        }
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.block_height, self.tx_hash, self.tx_out)
    }
}

/// Everything the ledger knows about the transaction carrying an opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub sender: String,
    pub height: u64,
    pub block_time: u64,
    pub tx_ref: TxRef,
    /// Value of the output carrying the payload; the stake for bet opcodes
    pub value: Decimal,
}

/// Undecoded opcode payload plus its transaction context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub context: TxContext,
    pub payload: Vec<u8>,
}

/// Transaction output as delivered by the host chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: Decimal,
    #[serde(default, with = "hex_payload", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
}

impl TxOutput {
    pub fn plain(value: Decimal) -> Self {
        Self {
            value,
            payload: None,
        }
    }

    pub fn with_payload(value: Decimal, payload: Vec<u8>) -> Self {
        Self {
            value,
            payload: Some(payload),
        }
    }
}

/// Accepted transaction; `sender` is the already-validated spending address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    pub sender: String,
    pub outputs: Vec<TxOutput>,
}

/// Confirmed block in chain order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Payload-bearing outputs in transaction order, then output order
    pub fn envelopes(&self) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        for tx in &self.transactions {
            for (index, output) in tx.outputs.iter().enumerate() {
                let Some(payload) = &output.payload else {
                    continue;
                };
                envelopes.push(Envelope {
                    context: TxContext {
                        sender: tx.sender.clone(),
                        height: self.height,
                        block_time: self.time,
                        tx_ref: TxRef::new(self.height, tx.hash, index as u32),
                        value: output.value,
                    },
                    payload: payload.clone(),
                });
            }
        }
        envelopes
    }
}

mod hex_payload {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        value
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
