//! Wire records as the DSpice API returns them.
//!
//! The API is loose about types (ids as numbers or strings, amounts as strings, flags as 0/1) and
//! about field names, so decoding is lenient here and the rest of the crate only sees the clean
//! types in `crate::models`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::*;
use crate::utils::{TimeRef, extract_code};

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("title"))
            .and_then(value_to_string),
        _ => None,
    }
}

fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn value_to_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

pub(crate) fn de_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_string(&Value::deserialize(d)?).unwrap_or_default())
}

pub(crate) fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_string(&Value::deserialize(d)?))
}

pub(crate) fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(value_to_f64(&Value::deserialize(d)?).unwrap_or(0.0))
}

pub(crate) fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(value_to_f64(&Value::deserialize(d)?))
}

pub(crate) fn de_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(value_to_f64(&Value::deserialize(d)?).map(|f| f as i64))
}

pub(crate) fn de_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(value_to_bool(&Value::deserialize(d)?))
}

fn de_opt_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeRef>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Null => None,
        other => serde_json::from_value(other).ok(),
    })
}

/// List payloads come bare, wrapped in `data`, or wrapped in `items`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListData<T> {
    Plain(Vec<T>),
    Data {
        data: Vec<T>,
        #[serde(default, deserialize_with = "de_opt_i64")]
        total: Option<i64>,
    },
    Items {
        items: Vec<T>,
        #[serde(default, deserialize_with = "de_opt_i64")]
        total: Option<i64>,
    },
}

impl<T> ListData<T> {
    pub fn into_parts(self) -> (Vec<T>, Option<i64>) {
        match self {
            ListData::Plain(items) => (items, None),
            ListData::Data { data, total } => (data, total),
            ListData::Items { items, total } => (items, total),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.into_parts().0
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TokenField {
    Plain(String),
    Nested { token: String },
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: TokenField,
    #[serde(default)]
    pub user: Value,
}

impl LoginData {
    pub fn token(&self) -> &str {
        match &self.token {
            TokenField::Plain(t) => t,
            TokenField::Nested { token } => token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StageRecord {
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    discount: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    min_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    username: Option<String>,
    #[serde(default, deserialize_with = "de_string")]
    email: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "de_f64")]
    balance: f64,
    #[serde(default, deserialize_with = "de_opt_string")]
    referral_code: Option<String>,
    #[serde(default)]
    stage: Option<StageRecord>,
}

impl From<ProfileRecord> for UserProfile {
    fn from(r: ProfileRecord) -> Self {
        let default_stage = Stage::default();
        let stage = match r.stage {
            Some(s) => Stage {
                name: s.name.unwrap_or(default_stage.name),
                discount_percent: s.discount.unwrap_or(0.0).clamp(0.0, 100.0),
                min_order_quantity: s.min_order.unwrap_or(1).max(1) as u32,
            },
            None => default_stage,
        };
        Self {
            id: r.id,
            name: r.name.or(r.username).unwrap_or_default(),
            email: r.email,
            phone: r.phone,
            balance: r.balance,
            referral_code: r.referral_code,
            stage,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RentalRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    number: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    user_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_time")]
    date: Option<TimeRef>,
    #[serde(default, deserialize_with = "de_opt_time")]
    created_at: Option<TimeRef>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    expiration: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    duration: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_time")]
    expires_at: Option<TimeRef>,
    #[serde(default, deserialize_with = "de_opt_time")]
    expiry: Option<TimeRef>,
    #[serde(default)]
    status: Value,
    #[serde(default)]
    service: Value,
    #[serde(default)]
    country: Value,
    #[serde(default, deserialize_with = "de_opt_string")]
    network: Option<String>,
    #[serde(default, deserialize_with = "de_bool")]
    can_reactivate: bool,
    #[serde(default, deserialize_with = "de_bool")]
    reactivatable: bool,
}

impl RentalRecord {
    pub fn into_rental(self, kind: RentalKind) -> Rental {
        let status = match &self.status {
            Value::Null => RentalStatus::Active,
            Value::Bool(true) => RentalStatus::Active,
            Value::Bool(false) => RentalStatus::Expired,
            other => RentalStatus::from_wire(&value_to_string(other).unwrap_or_default()),
        };
        let contact = match kind {
            RentalKind::Number => self.number.or(self.phone).or(self.email),
            RentalKind::Email => self.email.or(self.number).or(self.phone),
        };

        Rental {
            id: self.id,
            kind,
            contact: contact.unwrap_or_default(),
            owner: self.user_id,
            started_at: self.date.or(self.created_at),
            duration_secs: self.expiration.or(self.duration),
            expires_at: self.expires_at.or(self.expiry),
            status,
            service: value_to_string(&self.service),
            country: value_to_string(&self.country),
            network: self.network,
            can_reactivate: self.can_reactivate || self.reactivatable,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageRecord {
    #[serde(default, deserialize_with = "de_opt_string")]
    sender: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    from: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    message: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    body: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_time")]
    received_at: Option<TimeRef>,
    #[serde(default, deserialize_with = "de_opt_time")]
    date: Option<TimeRef>,
}

impl MessageRecord {
    /// `None` when the record carries neither text nor a code.
    pub fn into_message(self) -> Option<VerificationMessage> {
        let text = self.text.or(self.message).or(self.body).unwrap_or_default();
        let code = self.code.or_else(|| extract_code(&text));
        if text.is_empty() && code.is_none() {
            return None;
        }
        Some(VerificationMessage {
            sender: self.sender.or(self.from),
            text,
            code,
            received_at: self.received_at.or(self.date),
        })
    }
}

/// Code endpoint payload: a list, `{messages: [...]}`, or a single message.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CodeData {
    List(Vec<MessageRecord>),
    Wrapped { messages: Vec<MessageRecord> },
    Single(MessageRecord),
    Empty(Option<()>),
}

impl CodeData {
    pub fn into_messages(self) -> Vec<VerificationMessage> {
        let records = match self {
            CodeData::List(list) | CodeData::Wrapped { messages: list } => list,
            CodeData::Single(record) => vec![record],
            CodeData::Empty(_) => Vec::new(),
        };
        records
            .into_iter()
            .filter_map(MessageRecord::into_message)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct NamedRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    code: Option<String>,
}

impl From<NamedRecord> for NumberType {
    fn from(r: NamedRecord) -> Self {
        Self {
            name: r.name.or(r.title).unwrap_or_else(|| r.id.clone()),
            id: r.id,
        }
    }
}

impl From<NamedRecord> for Country {
    fn from(r: NamedRecord) -> Self {
        Self {
            name: r.name.or(r.title).unwrap_or_else(|| r.id.clone()),
            id: r.id,
            code: r.code,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_f64")]
    price: f64,
    #[serde(default, deserialize_with = "de_opt_i64")]
    available: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    expiration: Option<i64>,
}

impl From<ServiceRecord> for ServiceOffer {
    fn from(r: ServiceRecord) -> Self {
        Self {
            name: r.name.unwrap_or_else(|| r.id.clone()),
            id: r.id,
            price: r.price,
            available: r.available.map(|n| n.max(0) as u32),
            duration_secs: r.expiration,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletRecord {
    #[serde(default, deserialize_with = "de_f64")]
    balance: f64,
    #[serde(default, deserialize_with = "de_opt_string")]
    currency: Option<String>,
}

impl From<WalletRecord> for Wallet {
    fn from(r: WalletRecord) -> Self {
        Self {
            balance: r.balance,
            currency: r.currency.unwrap_or_else(|| "NGN".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VirtualAccountRecord {
    #[serde(default, deserialize_with = "de_string")]
    bank_name: String,
    #[serde(default, deserialize_with = "de_string")]
    account_number: String,
    #[serde(default, deserialize_with = "de_string")]
    account_name: String,
}

impl From<VirtualAccountRecord> for VirtualAccount {
    fn from(r: VirtualAccountRecord) -> Self {
        Self {
            bank_name: r.bank_name,
            account_number: r.account_number,
            account_name: r.account_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CryptoWalletRecord {
    #[serde(default, deserialize_with = "de_string")]
    currency: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    network: Option<String>,
    #[serde(default, deserialize_with = "de_string")]
    address: String,
}

impl From<CryptoWalletRecord> for CryptoWallet {
    fn from(r: CryptoWalletRecord) -> Self {
        Self {
            currency: r.currency,
            network: r.network,
            address: r.address,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, rename = "type", deserialize_with = "de_opt_string")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "de_f64")]
    amount: f64,
    #[serde(default, deserialize_with = "de_opt_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    created_at: Option<String>,
}

impl From<TransactionRecord> for WalletTransaction {
    fn from(r: TransactionRecord) -> Self {
        let is_debit = r
            .kind
            .as_deref()
            .map(|k| matches!(k.to_ascii_lowercase().as_str(), "debit" | "withdrawal" | "purchase"))
            .unwrap_or(r.amount < 0.0);
        Self {
            id: r.id,
            kind: if is_debit {
                TransactionKind::Debit
            } else {
                TransactionKind::Credit
            },
            amount: r.amount.abs(),
            description: r.description,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
    #[serde(default)]
    platform: Value,
    #[serde(default)]
    category: Value,
    #[serde(default, deserialize_with = "de_f64")]
    price: f64,
    #[serde(default, deserialize_with = "de_opt_i64")]
    stock: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_string")]
    description: Option<String>,
}

impl From<ListingRecord> for AccountListing {
    fn from(r: ListingRecord) -> Self {
        Self {
            title: r.title.or(r.name).unwrap_or_else(|| r.id.clone()),
            id: r.id,
            platform: value_to_string(&r.platform),
            category: value_to_string(&r.category),
            price: r.price,
            stock: r.stock.unwrap_or(0).max(0) as u32,
            description: r.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    account_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    quantity: Option<i64>,
    #[serde(default, deserialize_with = "de_f64")]
    total: f64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    created_at: Option<String>,
    #[serde(default)]
    logins: Vec<LoginRecord>,
}

impl OrderRecord {
    pub fn into_detail(mut self) -> OrderDetail {
        let logins = std::mem::take(&mut self.logins)
            .into_iter()
            .map(Into::into)
            .collect();
        OrderDetail {
            order: self.into(),
            logins,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        let total = if r.total != 0.0 {
            r.total
        } else {
            r.amount.unwrap_or(0.0)
        };
        Self {
            id: r.id,
            account_id: r.account_id,
            title: r.title,
            quantity: r.quantity.unwrap_or(1).max(0) as u32,
            total,
            status: r.status.unwrap_or_else(|| "pending".to_string()),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRecord {
    #[serde(default, deserialize_with = "de_opt_string")]
    username: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    password: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    details: Option<String>,
}

impl From<LoginRecord> for OrderLogin {
    fn from(r: LoginRecord) -> Self {
        Self {
            username: r.username,
            password: r.password,
            email: r.email,
            extra: r.details,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReferralStatsRecord {
    #[serde(default, deserialize_with = "de_opt_i64")]
    total_referrals: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    active_referrals: Option<i64>,
    #[serde(default, deserialize_with = "de_f64")]
    total_earned: f64,
    #[serde(default, deserialize_with = "de_f64")]
    available: f64,
}

impl From<ReferralStatsRecord> for ReferralStats {
    fn from(r: ReferralStatsRecord) -> Self {
        Self {
            total_referrals: r.total_referrals.unwrap_or(0).max(0) as u32,
            active_referrals: r.active_referrals.unwrap_or(0).max(0) as u32,
            total_earned: r.total_earned,
            available: r.available,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReferralRecord {
    #[serde(deserialize_with = "de_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "de_f64")]
    earned: f64,
    #[serde(default, deserialize_with = "de_opt_string")]
    created_at: Option<String>,
}

impl From<ReferralRecord> for Referral {
    fn from(r: ReferralRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            earned: r.earned,
            joined_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReferralSettingsRecord {
    #[serde(default, deserialize_with = "de_string")]
    referral_code: String,
    #[serde(default, deserialize_with = "de_bool")]
    notify_on_signup: bool,
}

impl From<ReferralSettingsRecord> for ReferralSettings {
    fn from(r: ReferralSettingsRecord) -> Self {
        Self {
            referral_code: r.referral_code,
            notify_on_signup: r.notify_on_signup,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferRecord {
    #[serde(default, deserialize_with = "de_opt_f64")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    balance: Option<f64>,
}

impl TransferRecord {
    pub fn into_response(self, requested: f64) -> TransferResponse {
        TransferResponse {
            transferred: self.amount.unwrap_or(requested),
            new_balance: self.balance,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepositInitRecord {
    #[serde(default, deserialize_with = "de_opt_string")]
    link: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    redirect_url: Option<String>,
    #[serde(default, deserialize_with = "de_string")]
    tx_ref: String,
}

impl DepositInitRecord {
    pub fn redirect(&self) -> Option<&str> {
        self.redirect_url.as_deref().or(self.link.as_deref())
    }

    pub fn tx_ref(&self) -> &str {
        &self.tx_ref
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DepositValidateRecord {
    #[serde(default, deserialize_with = "de_opt_f64")]
    amount: Option<f64>,
    #[serde(default)]
    status: Value,
}

impl DepositValidateRecord {
    pub fn into_response(self, message: Option<String>) -> ValidateDepositResponse {
        let success = match &self.status {
            Value::Null => true,
            other => {
                value_to_bool(other)
                    || value_to_string(other)
                        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "successful" | "success" | "completed"))
                        .unwrap_or(false)
            }
        };
        ValidateDepositResponse {
            success,
            amount: self.amount,
            message,
        }
    }
}
