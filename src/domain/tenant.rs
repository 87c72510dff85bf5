use serde::{Deserialize, Serialize};

/// A tenant as seen by the payment-matching engine: a name to fuzzy-match
/// against and a phone number to match exactly.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Tenant {
    #[serde(default)]
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl Tenant {
    /// Full name in the "first last" form payer names are compared against.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
