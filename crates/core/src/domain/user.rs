use serde::{Deserialize, Serialize};

/// Role of the logged-in account as reported by the auth provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    #[serde(alias = "user")]
    Seller,
}

/// Whether product cost and margin figures may be presented to the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVisibility {
    Visible,
    Hidden,
}

impl UserRole {
    pub fn cost_visibility(self) -> CostVisibility {
        match self {
            Self::Admin => CostVisibility::Visible,
            Self::Seller => CostVisibility::Hidden,
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "seller" | "user" => Ok(Self::Seller),
            other => Err(format!("unsupported role `{other}` (expected admin|seller)")),
        }
    }
}

impl CostVisibility {
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

#[cfg(test)]
mod tests {
    use super::{CostVisibility, UserRole};

    #[test]
    fn only_admins_see_costs() {
        assert_eq!(UserRole::Admin.cost_visibility(), CostVisibility::Visible);
        assert_eq!(UserRole::Seller.cost_visibility(), CostVisibility::Hidden);
    }

    #[test]
    fn auth_role_names_parse() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!("user".parse::<UserRole>(), Ok(UserRole::Seller));
        assert!("owner".parse::<UserRole>().is_err());
    }
}
