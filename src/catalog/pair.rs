use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TradingPair {
    pub token_x: String,
    pub token_y: String,
    pub bin_step: u32,
}

impl TradingPair {
    /// Field-level checks serde cannot express. Returns the reason on failure.
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.token_x.is_empty() {
            return Err("empty token_x".to_string());
        }
        if self.token_y.is_empty() {
            return Err("empty token_y".to_string());
        }
        Ok(())
    }
}
