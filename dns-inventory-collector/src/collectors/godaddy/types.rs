use chrono::NaiveDate;
use serde_json::Value;

/// One domain from the registrar's domain list, held until the per-domain
/// record sweep runs.
#[derive(Debug, Clone)]
pub(crate) struct GodaddyDomain {
    pub name: String,
    pub expires: Option<NaiveDate>,
    /// The registrar's original JSON object.
    pub raw: Value,
}
