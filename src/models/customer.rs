use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status partition a customer currently lives in.
///
/// Each variant maps to its own collection (`<status>_customers`), so the
/// status of a record is always derived from where it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Pending,
    Active,
    OneMonth,
    OneYear,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 4] = [
        CustomerStatus::Pending,
        CustomerStatus::Active,
        CustomerStatus::OneMonth,
        CustomerStatus::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Pending => "pending",
            CustomerStatus::Active => "active",
            CustomerStatus::OneMonth => "one_month",
            CustomerStatus::OneYear => "one_year",
        }
    }

    /// Name of the collection holding this partition
    pub fn collection_name(&self) -> String {
        format!("{}_customers", self.as_str())
    }

    pub fn label(&self) -> &'static str {
        match self {
            CustomerStatus::Pending => "Pending",
            CustomerStatus::Active => "Active",
            CustomerStatus::OneMonth => "One Month",
            CustomerStatus::OneYear => "One Year",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CustomerStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown status '{}'. Supported: pending, active, one_month, one_year",
                    s
                )
            })
    }
}

/// Customer record as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub status: CustomerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Display-only; nothing writes it yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Customer {
    /// Copy of this record relocated to `status`; every other field is kept.
    pub fn with_status(&self, status: CustomerStatus) -> Customer {
        Customer {
            status,
            ..self.clone()
        }
    }
}

/// Request to add a customer to the selected view
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewCustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl NewCustomerRequest {
    /// All fields are required and trimmed.
    pub fn validate(&self) -> Result<NewCustomerRequest, String> {
        let name = self.name.trim();
        let email = self.email.trim();
        let phone = self.phone.trim();

        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if email.is_empty() {
            return Err("Email is required".to_string());
        }
        if phone.is_empty() {
            return Err("Phone number is required".to_string());
        }

        Ok(NewCustomerRequest {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct SwitchStatusRequest {
    pub to: CustomerStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CustomerListResponse {
    pub success: bool,
    pub status: CustomerStatus,
    pub customers: Vec<Customer>,
    pub count: usize,
    pub empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CustomerResponse {
    pub success: bool,
    pub customer: Customer,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SwitchStatusResponse {
    pub success: bool,
    /// false when the target status equals the current one
    pub changed: bool,
    pub customer: Customer,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeleteCustomerResponse {
    pub success: bool,
    pub deleted: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusInfo {
    pub status: CustomerStatus,
    pub label: String,
    pub collection: String,
}
