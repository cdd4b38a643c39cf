//! Decides whether a decrypted vendor body is a success, a transient error
//! worth retrying, or a permanent error.
//!
//! Two schemas share one object: the fintech `{ErrorCode, ErrorMessage}` and
//! the UPI `{rc, desc, Response: {ResponseCode, ResponseMessage}}`. Either,
//! both, or neither may be present. Codes arrive as strings or numbers.

mod tables;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

use tables::{FINTECH_SUCCESS_CODES, UPI_SUCCESS_CODES, card_service_name, retry_override};

/// Nested UPI response block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpiResponse {
    #[serde(rename = "ResponseCode", default, deserialize_with = "lenient_text")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseMessage", default, deserialize_with = "lenient_text")]
    pub response_message: Option<String>,
}

/// Vendor error object in either or both legacy schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VendorErrorObject {
    #[serde(rename = "ErrorCode", default, deserialize_with = "lenient_text")]
    pub error_code: Option<String>,
    #[serde(rename = "ErrorMessage", default, deserialize_with = "lenient_text")]
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rc: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub desc: Option<String>,
    #[serde(rename = "Response", default, deserialize_with = "lenient_response")]
    pub response: Option<UpiResponse>,
}

/// Strings pass through, numbers are rendered, anything else reads as absent.
fn lenient_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_response<'de, D>(d: D) -> Result<Option<UpiResponse>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(d)?
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

impl VendorErrorObject {
    fn upi_code(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| non_empty(r.response_code.as_deref()))
    }

    fn upi_message(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| non_empty(r.response_message.as_deref()))
    }

    /// Every code field that is set, fintech first.
    fn codes(&self) -> impl Iterator<Item = &str> {
        [
            non_empty(self.error_code.as_deref()),
            non_empty(self.rc.as_deref()),
            self.upi_code(),
        ]
        .into_iter()
        .flatten()
    }

    fn messages(&self) -> impl Iterator<Item = &str> {
        [
            non_empty(self.error_message.as_deref()),
            non_empty(self.desc.as_deref()),
            self.upi_message(),
        ]
        .into_iter()
        .flatten()
    }

    /// True when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes().next().is_none() && self.messages().next().is_none()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.is_empty()
            || non_empty(self.error_code.as_deref())
                .is_some_and(|c| FINTECH_SUCCESS_CODES.contains(&c))
            || self.messages().any(|m| m.eq_ignore_ascii_case("success"))
            || self.upi_code().is_some_and(|c| UPI_SUCCESS_CODES.contains(&c))
    }

    /// First code present, fintech schema preferred.
    #[must_use]
    pub fn vendor_code(&self) -> Option<&str> {
        self.codes().next()
    }

    #[must_use]
    pub fn vendor_message(&self) -> Option<&str> {
        self.messages().next()
    }

    fn classified(
        &self,
        code: Option<&str>,
        override_message: Option<String>,
        retriable: bool,
    ) -> ClassifiedError {
        ClassifiedError {
            vendor_code: code.or_else(|| self.vendor_code()).unwrap_or_default().to_owned(),
            vendor_message: self.vendor_message().unwrap_or_default().to_owned(),
            override_message,
            retriable,
        }
    }

    fn retriable(&self) -> Option<ClassifiedError> {
        self.codes().find_map(|code| {
            retry_override(code).map(|msg| self.classified(Some(code), Some(msg.to_owned()), true))
        })
    }
}

/// A vendor-reported business error after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub vendor_code: String,
    pub vendor_message: String,
    /// Customer-facing text that replaces `vendor_message`.
    pub override_message: Option<String>,
    pub retriable: bool,
}

impl ClassifiedError {
    #[must_use]
    pub fn user_message(&self) -> &str {
        self.override_message.as_deref().unwrap_or(&self.vendor_message)
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.vendor_code, self.user_message())
    }
}

/// Outcome of inspecting a vendor body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    Retriable(ClassifiedError),
    Fatal(ClassifiedError),
}

impl Classification {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Classify one fintech/UPI error object.
#[must_use]
pub fn classify(error: &VendorErrorObject) -> Classification {
    if error.is_success() {
        return Classification::Success;
    }
    if let Some(retriable) = error.retriable() {
        return Classification::Retriable(retriable);
    }
    Classification::Fatal(error.classified(None, None, false))
}

/// Classify a card-control error list. The first element decides; an empty
/// list is a success.
#[must_use]
pub fn classify_card(errors: &[VendorErrorObject]) -> Classification {
    let Some(error) = errors.first() else {
        return Classification::Success;
    };
    if error.is_success() {
        return Classification::Success;
    }
    if let Some(retriable) = error.retriable() {
        return Classification::Retriable(retriable);
    }
    if let Some((code, service)) = error
        .codes()
        .find_map(|code| card_service_name(code).map(|s| (code, s)))
    {
        let message = format!("{service} is not available for this card right now.");
        return Classification::Fatal(error.classified(Some(code), Some(message), false));
    }
    Classification::Fatal(error.classified(None, None, false))
}

/// Parse a body as a fintech error object. `None` unless it is a JSON object.
#[must_use]
pub fn parse_error_object(body: &[u8]) -> Option<VendorErrorObject> {
    match serde_json::from_slice::<Value>(body).ok()? {
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    }
}

/// Parse a card-control body: a single object or an array of objects.
/// `None` if the body is neither.
#[must_use]
pub fn parse_card_errors(body: &[u8]) -> Option<Vec<VendorErrorObject>> {
    match serde_json::from_slice::<Value>(body).ok()? {
        obj @ Value::Object(_) => serde_json::from_value(obj).ok().map(|e| vec![e]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    }
}

/// Classify a decrypted fintech body. Bodies that are not an error object are
/// business payloads.
#[must_use]
pub fn classify_body(body: &[u8]) -> Classification {
    parse_error_object(body).map_or(Classification::Success, |e| classify(&e))
}

/// Classify a decrypted card-control body.
#[must_use]
pub fn classify_card_body(body: &[u8]) -> Classification {
    parse_card_errors(body).map_or(Classification::Success, |e| classify_card(&e))
}

/// Classify a raw (unencrypted) fintech body, or `None` if it is not an
/// error object at all.
#[must_use]
pub fn classify_raw_error(body: &[u8]) -> Option<Classification> {
    parse_error_object(body).map(|e| classify(&e))
}

/// Card-control counterpart of [`classify_raw_error`].
#[must_use]
pub fn classify_raw_card_error(body: &[u8]) -> Option<Classification> {
    parse_card_errors(body).map(|e| classify_card(&e))
}
