use serde::Deserialize;
use serde_json::Value;

/// Standard Cloudflare v4 API response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
    pub errors: Option<Vec<CloudflareApiError>>,
}

impl<T> CloudflareResponse<T> {
    /// First reported error message, or a generic fallback.
    pub fn error_message(&self) -> String {
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map_or_else(|| "unknown error".to_string(), |e| e.message.clone())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareApiError {
    pub message: String,
}

/// One zone from the zone list, held until its record sweep runs.
#[derive(Debug, Clone)]
pub(crate) struct CloudflareZone {
    pub id: String,
    pub name: String,
    /// The provider's original JSON object.
    pub raw: Value,
}
