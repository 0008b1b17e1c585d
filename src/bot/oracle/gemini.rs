use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header;
use serde::{Deserialize, Serialize};

use super::{
    parse_allocations, parse_receipt_scan, parse_text_extraction, ExtractionOracle,
    ItemAllocation, OracleError, ReceiptItem, ReceiptScan, TextExtraction,
};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

// Concatenated text of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String, OracleError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(OracleError::Empty)
    } else {
        Ok(text)
    }
}

/* Prompts */

fn text_prompt(text: &str, sender: &str) -> String {
    format!(
        "You are a meticulous accountant. Break the user's message into individual transactions.\n\
         1. Identify every person mentioned and what they CONSUMED.\n\
         2. If someone paid for an item consumed by someone else, record that.\n\
         3. If no payer is named, assume the sender ({sender}) paid.\n\
         4. \"gua\", \"gue\", \"aku\" and \"me\" refer to the sender.\n\
         5. Amounts are whole currency units: \"24k\" and \"24rb\" mean 24000.\n\
         6. Set \"is_transaction\" to true only if there is financial activity.\n\
         Required JSON: {{\"is_transaction\": boolean, \"transactions\": [{{\"payer\": string, \"consumer\": string, \"amount\": number, \"description\": string}}]}}\n\
         Example: \"I paid 150k for satay for Budi and Cindy\" -> {{\"is_transaction\": true, \"transactions\": [{{\"payer\": \"{sender}\", \"consumer\": \"Budi\", \"amount\": 75000, \"description\": \"satay\"}}, {{\"payer\": \"{sender}\", \"consumer\": \"Cindy\", \"amount\": 75000, \"description\": \"satay\"}}]}}\n\
         Example: \"thanks everyone\" -> {{\"is_transaction\": false, \"transactions\": []}}\n\
         Message: \"{text}\"\n\
         JSON:"
    )
}

const RECEIPT_PROMPT: &str = "You are a precise OCR engine. Read this shopping receipt.\n\
     1. Extract every purchased item with its quantity and price.\n\
     2. Find the FINAL TOTAL of the receipt.\n\
     3. Identify the store name if possible.\n\
     4. Ignore discounts, taxes and service charges; focus on the final total.\n\
     Required JSON: {\"success\": boolean, \"store\": string|null, \"totalAmount\": number, \"items\": [{\"name\": string, \"quantity\": number, \"price\": number}]}\n\
     If the image is not a receipt or is unreadable, set \"success\" to false.";

fn allocation_prompt(text: &str, items: &[ReceiptItem], sender: &str) -> Result<String, OracleError> {
    let items = serde_json::to_string(items)?;
    Ok(format!(
        "You match receipt items to the people who consumed them.\n\
         - \"gua\", \"gue\", \"aku\" and \"me\" refer to {sender}.\n\
         - If the message says the rest is shared, allocate every item not named explicitly to ALL people in the message, including the sender.\n\
         - The result is one object per item per person.\n\
         Sender: {sender}\n\
         Message: \"{text}\"\n\
         Receipt items (JSON): {items}\n\
         Required JSON: {{\"allocations\": [{{\"consumer\": string, \"itemName\": string, \"price\": number}}]}}"
    ))
}

fn rephrase_prompt(message: &str) -> String {
    format!(
        "You are the personality of a Telegram bot. Rewrite the system message below into one \
         natural, friendly and short reply. Do not offer options or explanations, answer with the \
         reply only.\n\
         System message: \"{message}\"\n\
         Reply:"
    )
}

/* Gemini oracle.
 * Calls the generateContent endpoint of a hosted Gemini model.
 */
pub struct GeminiOracle {
    client: reqwest::Client,
    model: String,
}

impl GeminiOracle {
    pub fn new(api_key: &str, model: &str) -> Result<GeminiOracle, OracleError> {
        let mut h = header::HeaderMap::new();
        h.insert(
            "Accept",
            header::HeaderValue::from_static("application/json"),
        );
        let mut key = header::HeaderValue::from_str(api_key)
            .map_err(|_| OracleError::Malformed("API key is not a valid header".to_string()))?;
        key.set_sensitive(true);
        h.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder().default_headers(h).build()?;
        Ok(GeminiOracle {
            client,
            model: model.to_string(),
        })
    }

    async fn generate(
        &self,
        parts: Vec<Part<'_>>,
        expect_json: bool,
    ) -> Result<String, OracleError> {
        let url = format!("{GEMINI_API_URL}/{}:generateContent", self.model);
        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: expect_json.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        let response: GenerateResponse = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response_text(response)
    }
}

#[async_trait]
impl ExtractionOracle for GeminiOracle {
    async fn extract_transactions(
        &self,
        text: &str,
        sender: &str,
    ) -> Result<TextExtraction, OracleError> {
        let prompt = text_prompt(text, sender);
        let raw = self.generate(vec![Part::Text { text: &prompt }], true).await?;
        parse_text_extraction(&raw)
    }

    async fn extract_receipt(&self, image: &[u8]) -> Result<ReceiptScan, OracleError> {
        let parts = vec![
            Part::Text {
                text: RECEIPT_PROMPT,
            },
            Part::Image {
                inline_data: InlineData {
                    mime_type: "image/jpeg",
                    data: STANDARD.encode(image),
                },
            },
        ];
        let raw = self.generate(parts, true).await?;
        parse_receipt_scan(&raw)
    }

    async fn allocate_items(
        &self,
        text: &str,
        items: &[ReceiptItem],
        sender: &str,
    ) -> Result<Vec<ItemAllocation>, OracleError> {
        let prompt = allocation_prompt(text, items, sender)?;
        let raw = self.generate(vec![Part::Text { text: &prompt }], true).await?;
        parse_allocations(&raw)
    }

    async fn rephrase(&self, message: &str) -> Result<String, OracleError> {
        let prompt = rephrase_prompt(message);
        let raw = self.generate(vec![Part::Text { text: &prompt }], false).await?;
        Ok(raw.trim().to_string())
    }
}
