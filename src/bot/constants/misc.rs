// Largest amount accepted from the extraction oracle, in whole currency units
pub const MAX_VALUE: i64 = 1_000_000_000_000;

// Transactions per page in the transaction list
pub const PAGE_SIZE: usize = 10;

// Settlement engine thresholds
pub const SETTLED_EPSILON: f64 = 1e-9;
pub const TRANSFER_THRESHOLD: f64 = 0.5;
pub const ADVANCE_THRESHOLD: f64 = 1.0;

// Unknown commands closer than this are suggested
pub const MAX_COMMAND_DISTANCE: usize = 3;

// Words that refer to the sender of a message
pub const SELF_REFERENCES: [&str; 4] = ["gua", "gue", "aku", "me"];

pub const CURRENCY_SYMBOL: &str = "Rp";
pub const UNKNOWN_MEMBER: &str = "Unknown";
