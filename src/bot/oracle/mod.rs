use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::bot::constants::misc::MAX_VALUE;

pub use self::gemini::GeminiOracle;

mod gemini;

/* Typed oracle results.
 * Only these ever leave this module; raw model output is validated first.
 */

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextExtraction {
    pub is_transaction: bool,
    pub transactions: Vec<ExtractedTransaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTransaction {
    pub payer: String,
    pub consumer: String,
    pub amount: i64,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ReceiptScan {
    pub success: bool,
    pub store: Option<String>,
    pub total_amount: i64,
    pub items: Vec<ReceiptItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: u32,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemAllocation {
    pub consumer: String,
    pub item_name: String,
    pub price: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum OracleError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Malformed oracle output: {0}")]
    Malformed(String),
    #[error("Oracle returned no content")]
    Empty,
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> OracleError {
        OracleError::Malformed(err.to_string())
    }
}

/* Extraction oracle.
 * Turns free text and receipt photos into structured data. Implementations report
 * failures as errors; the free functions below degrade them to neutral defaults.
 */
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract_transactions(
        &self,
        text: &str,
        sender: &str,
    ) -> Result<TextExtraction, OracleError>;

    async fn extract_receipt(&self, image: &[u8]) -> Result<ReceiptScan, OracleError>;

    async fn allocate_items(
        &self,
        text: &str,
        items: &[ReceiptItem],
        sender: &str,
    ) -> Result<Vec<ItemAllocation>, OracleError>;

    async fn rephrase(&self, message: &str) -> Result<String, OracleError>;
}

// Detects transactions in free text. Never fails: oracle errors mean "no transaction".
pub async fn extract_transactions(
    oracle: &dyn ExtractionOracle,
    text: &str,
    sender: &str,
) -> TextExtraction {
    match oracle.extract_transactions(text, sender).await {
        Ok(extraction) => extraction,
        Err(err) => {
            log::warn!("Oracle degraded on text extraction: {}", err);
            TextExtraction::default()
        }
    }
}

// Reads a receipt photo. Oracle errors mean an unsuccessful scan.
pub async fn extract_receipt(oracle: &dyn ExtractionOracle, image: &[u8]) -> ReceiptScan {
    match oracle.extract_receipt(image).await {
        Ok(scan) => scan,
        Err(err) => {
            log::warn!("Oracle degraded on receipt scan: {}", err);
            ReceiptScan::default()
        }
    }
}

// Matches receipt items to consumers. Oracle errors mean no allocations.
pub async fn allocate_items(
    oracle: &dyn ExtractionOracle,
    text: &str,
    items: &[ReceiptItem],
    sender: &str,
) -> Vec<ItemAllocation> {
    match oracle.allocate_items(text, items, sender).await {
        Ok(allocations) => allocations,
        Err(err) => {
            log::warn!("Oracle degraded on item allocation: {}", err);
            vec![]
        }
    }
}

// Cosmetic only. Falls back to the message as given.
pub async fn rephrase(oracle: &dyn ExtractionOracle, message: &str) -> String {
    match oracle.rephrase(message).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => message.to_string(),
        Err(err) => {
            log::warn!("Oracle degraded on rephrase: {}", err);
            message.to_string()
        }
    }
}

/* Wire formats.
 * Loosely typed on purpose: models return floats, nulls and missing fields freely.
 */

#[derive(Deserialize, Debug)]
struct TextExtractionWire {
    is_transaction: bool,
    #[serde(default)]
    transactions: Vec<ExtractedTransactionWire>,
}

#[derive(Deserialize, Debug)]
struct ExtractedTransactionWire {
    payer: String,
    consumer: String,
    amount: f64,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ReceiptScanWire {
    success: bool,
    store: Option<String>,
    #[serde(default)]
    total_amount: f64,
    #[serde(default)]
    items: Vec<ReceiptItemWire>,
}

#[derive(Deserialize, Debug)]
struct ReceiptItemWire {
    name: String,
    #[serde(default = "default_quantity")]
    quantity: f64,
    price: f64,
}

fn default_quantity() -> f64 {
    1.0
}

#[derive(Deserialize, Debug)]
struct AllocationsWire {
    #[serde(default)]
    allocations: Vec<ItemAllocationWire>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ItemAllocationWire {
    consumer: String,
    item_name: String,
    price: f64,
}

// Strips Markdown code fences that models like to wrap JSON in.
fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn parse_wire<T: DeserializeOwned>(raw: &str) -> Result<T, OracleError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(OracleError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

// Converts a model-provided amount into whole currency units.
fn validate_amount(amount: f64, field: &str) -> Result<i64, OracleError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(OracleError::Malformed(format!("{field} is not a valid amount")));
    }
    let amount = amount.round() as i64;
    if amount > MAX_VALUE {
        return Err(OracleError::Malformed(format!("{field} is too large")));
    }
    Ok(amount)
}

fn validate_name(name: &str, field: &str) -> Result<String, OracleError> {
    let name = name.trim().trim_start_matches('@').trim();
    if name.is_empty() {
        Err(OracleError::Malformed(format!("{field} is empty")))
    } else {
        Ok(name.to_string())
    }
}

pub fn parse_text_extraction(raw: &str) -> Result<TextExtraction, OracleError> {
    let wire: TextExtractionWire = parse_wire(raw)?;
    if !wire.is_transaction {
        return Ok(TextExtraction::default());
    }

    let transactions = wire
        .transactions
        .into_iter()
        .map(|tx| {
            Ok(ExtractedTransaction {
                payer: validate_name(&tx.payer, "payer")?,
                consumer: validate_name(&tx.consumer, "consumer")?,
                amount: validate_amount(tx.amount, "amount")?,
                description: tx.description.trim().to_string(),
            })
        })
        .collect::<Result<Vec<ExtractedTransaction>, OracleError>>()?;

    Ok(TextExtraction {
        is_transaction: !transactions.is_empty(),
        transactions,
    })
}

pub fn parse_receipt_scan(raw: &str) -> Result<ReceiptScan, OracleError> {
    let wire: ReceiptScanWire = parse_wire(raw)?;
    if !wire.success {
        return Ok(ReceiptScan::default());
    }

    let items = wire
        .items
        .into_iter()
        .map(|item| {
            if !item.quantity.is_finite() || item.quantity < 0.0 {
                return Err(OracleError::Malformed("quantity is not valid".to_string()));
            }
            Ok(ReceiptItem {
                name: validate_name(&item.name, "item name")?,
                quantity: item.quantity.round() as u32,
                price: validate_amount(item.price, "price")?,
            })
        })
        .collect::<Result<Vec<ReceiptItem>, OracleError>>()?;

    Ok(ReceiptScan {
        success: true,
        store: wire
            .store
            .map(|store| store.trim().to_string())
            .filter(|store| !store.is_empty()),
        total_amount: validate_amount(wire.total_amount, "totalAmount")?,
        items,
    })
}

pub fn parse_allocations(raw: &str) -> Result<Vec<ItemAllocation>, OracleError> {
    let wire: AllocationsWire = parse_wire(raw)?;
    wire.allocations
        .into_iter()
        .map(|allocation| {
            Ok(ItemAllocation {
                consumer: validate_name(&allocation.consumer, "consumer")?,
                item_name: allocation.item_name.trim().to_string(),
                price: validate_amount(allocation.price, "price")?,
            })
        })
        .collect()
}
