use serde::Deserialize;

/// Completion budget per request. Findings for one selection are small.
pub const MODEL_MAX_TOKENS: u32 = 8_192;

/// API usage information from the LLM provider.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    /// Cost in USD as reported by the provider (`total_cost` on the wire).
    #[serde(default, alias = "total_cost")]
    pub cost: Option<f64>,
}

impl Usage {
    /// Provider-reported cost, or 0.0 when absent. Never estimated.
    pub fn cost(&self) -> f64 {
        self.cost.unwrap_or(0.0)
    }
}
