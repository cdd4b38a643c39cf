//! Vendor endpoint paths.

pub use vendor_auth::DEFAULT_TOKEN_PATH as TOKEN;

pub const LIST_KEYS: &str = "/nbfc/v1/upi/listKeys";
pub const TRANSACTION_HISTORY: &str = "/nbfc/v1/account/transactionHistory";
pub const BENEFICIARY_REGISTRATION: &str = "/nbfc/v1/upi/beneficiary/register";
pub const BENEFICIARY_STATUS: &str = "/nbfc/v1/upi/beneficiary/status";
pub const CARD_CONTROLS: &str = "/cardcontrol/v1/card/controls";

/// Sent and received in plaintext.
pub(crate) const UNENCRYPTED: [&str; 1] = [TOKEN];

/// Decrypted but never classified: these responses embed error fields in a
/// different shape.
pub(crate) const UNCLASSIFIED: [&str; 3] = [LIST_KEYS, TRANSACTION_HISTORY, BENEFICIARY_REGISTRATION];

pub(crate) fn is_unencrypted(path: &str) -> bool {
    UNENCRYPTED.contains(&path)
}

pub(crate) fn is_unclassified(path: &str) -> bool {
    UNCLASSIFIED.contains(&path)
}
