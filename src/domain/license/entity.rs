//! License entity and related types

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::DomainError;

/// Opaque license identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(Uuid);

impl LicenseId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LicenseId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DomainError::validation(format!("Invalid license id '{}'", s)))
    }
}

/// Lifecycle state of a license
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Pending,
    Active,
    Inactive,
    Expired,
    Revoked,
}

impl LicenseStatus {
    pub const ALL: [LicenseStatus; 5] = [
        Self::Pending,
        Self::Active,
        Self::Inactive,
        Self::Expired,
        Self::Revoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("Invalid license status '{}'", s)))
    }
}

/// One issued license
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    id: LicenseId,
    license_key: String,
    status: LicenseStatus,
    #[serde(rename = "type")]
    license_type: String,
    product_name: String,
    customer_name: Option<String>,
    customer_email: Option<String>,
    metadata: Option<Value>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl License {
    /// Create a license in its initial state.
    ///
    /// `issued_at` is stamped only when the license starts out active.
    pub fn new(
        license_key: impl Into<String>,
        license_type: impl Into<String>,
        product_name: impl Into<String>,
        status: LicenseStatus,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: LicenseId::new(),
            license_key: license_key.into(),
            status,
            license_type: license_type.into(),
            product_name: product_name.into(),
            customer_name: None,
            customer_email: None,
            metadata: None,
            issued_at: (status == LicenseStatus::Active).then_some(now),
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a license from persisted columns
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: LicenseId,
        license_key: String,
        status: LicenseStatus,
        license_type: String,
        product_name: String,
        customer_name: Option<String>,
        customer_email: Option<String>,
        metadata: Option<Value>,
        issued_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            license_key,
            status,
            license_type,
            product_name,
            customer_name,
            customer_email,
            metadata,
            issued_at,
            expires_at,
            created_at,
            updated_at,
        }
    }

    pub fn with_customer(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.customer_name = name;
        self.customer_email = email;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    // Getters

    pub fn id(&self) -> &LicenseId {
        &self.id
    }

    pub fn license_key(&self) -> &str {
        &self.license_key
    }

    pub fn status(&self) -> LicenseStatus {
        self.status
    }

    pub fn license_type(&self) -> &str {
        &self.license_type
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_email.as_deref()
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Metadata as a JSON object, if it is one
    pub fn metadata_object(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref().and_then(Value::as_object)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether `expires_at` lies strictly before `now`. Perpetual licenses never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    // Mutators

    pub fn set_status(&mut self, status: LicenseStatus) {
        self.status = status;
        self.touch();
    }

    pub fn set_license_type(&mut self, license_type: impl Into<String>) {
        self.license_type = license_type.into();
        self.touch();
    }

    pub fn set_product_name(&mut self, product_name: impl Into<String>) {
        self.product_name = product_name.into();
        self.touch();
    }

    pub fn set_customer_name(&mut self, customer_name: Option<String>) {
        self.customer_name = customer_name;
        self.touch();
    }

    pub fn set_customer_email(&mut self, customer_email: Option<String>) {
        self.customer_email = customer_email;
        self.touch();
    }

    pub fn set_expires_at(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
        self.touch();
    }

    /// Replace the whole metadata blob
    pub fn set_metadata(&mut self, metadata: Option<Value>) {
        self.metadata = metadata;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_active_license_is_stamped_issued() {
        let license = License::new("K1", "subscription", "Foo", LicenseStatus::Active);

        assert_eq!(license.status(), LicenseStatus::Active);
        assert!(license.issued_at().is_some());
        assert!(license.expires_at().is_none());
    }

    #[test]
    fn test_pending_license_is_not_stamped_issued() {
        let license = License::new("K1", "trial", "Foo", LicenseStatus::Pending);

        assert!(license.issued_at().is_none());
    }

    #[test]
    fn test_later_activation_does_not_stamp_issued_at() {
        let mut license = License::new("K1", "trial", "Foo", LicenseStatus::Pending);
        license.set_status(LicenseStatus::Active);

        assert_eq!(license.status(), LicenseStatus::Active);
        assert!(license.issued_at().is_none());
    }

    #[test]
    fn test_is_expired_at() {
        let now = Utc::now();
        let perpetual = License::new("K1", "perpetual", "Foo", LicenseStatus::Active);
        let past = License::new("K2", "trial", "Foo", LicenseStatus::Active)
            .with_expires_at(now - Duration::days(1));
        let future = License::new("K3", "trial", "Foo", LicenseStatus::Active)
            .with_expires_at(now + Duration::days(1));

        assert!(!perpetual.is_expired_at(now));
        assert!(past.is_expired_at(now));
        assert!(!future.is_expired_at(now));
    }

    #[test]
    fn test_expiry_boundary_is_still_valid() {
        let now = Utc::now();
        let license =
            License::new("K1", "trial", "Foo", LicenseStatus::Active).with_expires_at(now);

        assert!(!license.is_expired_at(now));
    }

    #[test]
    fn test_metadata_object_ignores_non_objects() {
        let license = License::new("K1", "trial", "Foo", LicenseStatus::Active)
            .with_metadata(json!(["not", "an", "object"]));
        assert!(license.metadata_object().is_none());

        let license = License::new("K1", "trial", "Foo", LicenseStatus::Active)
            .with_metadata(json!({"device_id": "D1"}));
        assert_eq!(
            license.metadata_object().and_then(|m| m.get("device_id")),
            Some(&json!("D1"))
        );
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in LicenseStatus::ALL {
            assert_eq!(status.as_str().parse::<LicenseStatus>().unwrap(), status);
        }
        assert!("archived".parse::<LicenseStatus>().is_err());
    }

    #[test]
    fn test_license_id_parse() {
        let id = LicenseId::new();
        assert_eq!(id.to_string().parse::<LicenseId>().unwrap(), id);
        assert!("not-a-uuid".parse::<LicenseId>().is_err());
    }

    #[test]
    fn test_serializes_type_field() {
        let license = License::new("K1", "subscription", "Foo", LicenseStatus::Active);
        let value = serde_json::to_value(&license).unwrap();

        assert_eq!(value["type"], "subscription");
        assert_eq!(value["status"], "active");
    }
}
