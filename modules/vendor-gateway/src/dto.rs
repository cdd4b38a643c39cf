//! Request and response bodies for the endpoints exposed by
//! [`VendorClient`](crate::VendorClient). Field names follow the vendor's JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKeysRequest {
    pub device_id: String,
    pub mobile_number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListKeysResponse {
    pub keys: Vec<UpiKey>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpiKey {
    pub code: String,
    pub ki: String,
    pub owner: String,
    pub key_value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistoryRequest {
    pub account_number: String,
    pub from_date: String,
    pub to_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionHistoryResponse {
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    pub transaction_id: String,
    pub amount: String,
    pub credit_debit: String,
    pub narration: String,
    pub value_date: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiaryRegistrationRequest {
    pub account_number: String,
    pub beneficiary_name: String,
    pub beneficiary_account: String,
    pub ifsc: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeneficiaryRegistrationResponse {
    pub reference_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiaryStatusRequest {
    pub reference_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeneficiaryStatusResponse {
    pub reference_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardControlRequest {
    pub card_id: String,
    pub ecom_enabled: bool,
    pub international_enabled: bool,
    pub contactless_enabled: bool,
    pub atm_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardControlResponse {
    pub card_id: String,
    pub status: String,
}
