//! Vendor code lookups.

/// `ErrorCode` values that mean success on the fintech schema.
pub(crate) const FINTECH_SUCCESS_CODES: [&str; 3] = ["0", "00", "01"];

/// Nested UPI `ResponseCode` values that mean the request was accepted.
pub(crate) const UPI_SUCCESS_CODES: [&str; 4] = ["0", "2", "4", "5"];

/// Codes the vendor documents as transient, with the message shown to the
/// customer instead of the raw vendor text.
pub(crate) fn retry_override(code: &str) -> Option<&'static str> {
    let message = match code {
        "91" => "The bank is taking longer than usual to respond. Please try again.",
        "96" => "The bank's systems are temporarily unavailable. Please try again.",
        "U09" => "The payment network timed out. Please try again.",
        "U68" => "The payment network did not respond in time. Please try again.",
        "BT" => "Your bank is temporarily unreachable. Please try again in a moment.",
        "XY" => "The remitter bank is temporarily unavailable. Please try again.",
        "TIMEOUT" => "The request timed out. Please try again.",
        _ => return None,
    };
    Some(message)
}

/// Card-control codes that mean a particular card service is switched off on
/// the vendor side.
pub(crate) fn card_service_name(code: &str) -> Option<&'static str> {
    let service = match code {
        "CC101" => "Online transactions",
        "CC102" => "International usage",
        "CC103" => "Contactless payments",
        "CC104" => "ATM withdrawals",
        "CC105" => "Point-of-sale transactions",
        "CC110" => "Card limit update",
        _ => return None,
    };
    Some(service)
}
