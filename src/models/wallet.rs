use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    pub balance: f64,
    pub currency: String,
}

/// Bank account the user can transfer into to fund the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VirtualAccount {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CryptoWallet {
    pub currency: String,
    pub network: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WalletTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitiateDepositRequest {
    #[schema(example = 5000.0)]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitiateDepositResponse {
    /// 支付网关跳转地址
    pub redirect_url: String,
    pub tx_ref: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateDepositRequest {
    pub tx_ref: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateDepositResponse {
    pub success: bool,
    pub amount: Option<f64>,
    pub message: Option<String>,
}
