/// Outcome of a quota check against the usage ledger.
#[derive(Debug, Clone, Copy)]
pub struct UsageDecision {
    pub allowed: bool,
    /// Calls already recorded inside the trailing window
    pub used: u64,
    pub remaining: u64,
    pub limit: u64,
}
