use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SalespersonId(pub String);

impl SalespersonId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salesperson {
    pub id: SalespersonId,
    pub name: String,
    /// Links the salesperson to a login account.
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub crm_owner_id: Option<String>,
}

impl Salesperson {
    /// Validates a new registration against the existing roster and normalizes its email.
    pub fn validate_new(mut self, existing: &[Salesperson]) -> Result<Self, DomainError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name".to_string());
        }
        if self.email.trim().is_empty() {
            missing.push("email".to_string());
        }
        if !missing.is_empty() {
            return Err(DomainError::MissingRequiredFields(missing));
        }

        self.email = self.email.trim().to_lowercase();
        if !self.email.contains('@') {
            return Err(DomainError::InvariantViolation(format!(
                "salesperson email `{}` is not a valid address",
                self.email
            )));
        }

        if let Some(duplicate) = existing
            .iter()
            .filter(|other| other.id != self.id)
            .find(|other| other.email.trim().eq_ignore_ascii_case(&self.email))
        {
            return Err(DomainError::InvariantViolation(format!(
                "a salesperson is already registered with email `{}`: {}",
                self.email, duplicate.name
            )));
        }

        Ok(self)
    }
}

/// Finds the salesperson profile tied to a login email, ignoring case.
pub fn find_by_user_email<'a>(
    salespeople: &'a [Salesperson],
    user_email: &str,
) -> Option<&'a Salesperson> {
    let user_email = user_email.trim();
    if user_email.is_empty() {
        return None;
    }
    salespeople.iter().find(|candidate| candidate.email.trim().eq_ignore_ascii_case(user_email))
}
