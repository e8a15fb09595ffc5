use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PHONE_COUNTRY_CODE: &str = "+55";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Customer code in the ERP.
    #[serde(default)]
    pub erp_code: Option<String>,
    #[serde(default = "default_country_code")]
    pub phone_country_code: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// CPF or CNPJ.
    #[serde(default)]
    pub tax_id: Option<String>,
}

fn default_country_code() -> String {
    DEFAULT_PHONE_COUNTRY_CODE.to_string()
}

/// Keeps only the digits of a phone number.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
