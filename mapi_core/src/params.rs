//! Typed request bodies for the named resource methods.
//!
//! Every struct serializes to exactly the JSON object sent on the wire. Fields
//! that are path segments (`id`, `tid`) are `#[serde(skip)]`. Unset optional
//! fields are left out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted `expires_in`: 30 days.
pub const MAX_EXPIRES_IN: u32 = 2_592_000;
pub const MAX_CUSTOMER_LEN: usize = 100;
pub const CURRENCY_LEN: usize = 3;
pub const USER_SECRET_LEN: (usize, usize) = (8, 64);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("`{0}` is required")]
    Required(&'static str),

    #[error("`{field}` must be {min}..={max} characters long (got {actual})")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("`{field}` must be in {min}..={max} (got {actual})")]
    Range {
        field: &'static str,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("`{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Checked before any request is built.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn required(field: &'static str, v: &str) -> Result<(), ValidationError> {
    if v.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

fn length(field: &'static str, v: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let actual = v.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::Length {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

fn expires_in(v: u32) -> Result<(), ValidationError> {
    if v > MAX_EXPIRES_IN {
        return Err(ValidationError::Range {
            field: "expires_in",
            min: 0,
            max: MAX_EXPIRES_IN as i64,
            actual: v as i64,
        });
    }
    Ok(())
}

fn customer(v: &str) -> Result<(), ValidationError> {
    required("customer", v)?;
    length("customer", v, 1, MAX_CUSTOMER_LEN)
}

fn user_secret(secret: Option<&str>) -> Result<(), ValidationError> {
    if let Some(s) = secret {
        length("secret", s, USER_SECRET_LEN.0, USER_SECRET_LEN.1)?;
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Superuser,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreateUser {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    pub netmask: Option<String>,
    pub secret: Option<String>,
    pub pubkey: Option<String>,
    /// Creates the user under this merchant instead of the configured one.
    #[serde(skip)]
    pub merchant_id: Option<String>,
}

impl CreateUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationError> {
        required("id", &self.id)?;
        if let Some(m) = &self.merchant_id {
            required("merchant_id", m)?;
        }
        user_secret(self.secret.as_deref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateUser {
    #[serde(skip)]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    pub netmask: Option<String>,
    pub secret: Option<String>,
    pub pubkey: Option<String>,
}

impl UpdateUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> Result<(), ValidationError> {
        required("id", &self.id)?;
        user_secret(self.secret.as_deref())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Validate for Location {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::Invalid {
                field: "location.latitude",
                reason: "must be within -90..=90",
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::Invalid {
                field: "location.longitude",
                reason: "must be within -180..=180",
            });
        }
        if self.accuracy.is_some_and(|a| !a.is_finite() || a < 0.0) {
            return Err(ValidationError::Invalid {
                field: "location.accuracy",
                reason: "must be a non-negative number",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreatePos {
    /// Merchant-chosen id, unique per merchant.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pos_type: String,
    pub location: Option<Location>,
}

impl CreatePos {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pos_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pos_type: pos_type.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl Validate for CreatePos {
    fn validate(&self) -> Result<(), ValidationError> {
        required("id", &self.id)?;
        required("name", &self.name)?;
        required("type", &self.pos_type)?;
        self.location.as_ref().map_or(Ok(()), Validate::validate)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdatePos {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pos_type: String,
    pub location: Option<Location>,
}

impl UpdatePos {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pos_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pos_type: pos_type.into(),
            location: None,
        }
    }
}

impl Validate for UpdatePos {
    fn validate(&self) -> Result<(), ValidationError> {
        required("id", &self.id)?;
        required("name", &self.name)?;
        required("type", &self.pos_type)?;
        self.location.as_ref().map_or(Ok(()), Validate::validate)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentAction {
    Auth,
    Sale,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Reauth,
    Capture,
    Abort,
    Release,
    Refund,
}

/// Payment request state in which a [`Link`] is shown.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowOn {
    Pending,
    Fail,
    Ok,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub show_on: Vec<ShowOn>,
}

impl Validate for Link {
    fn validate(&self) -> Result<(), ValidationError> {
        required("links.uri", &self.uri)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tag {
    pub tag_id: String,
    pub label: String,
}

impl Validate for Tag {
    fn validate(&self) -> Result<(), ValidationError> {
        required("tags.tag_id", &self.tag_id)?;
        required("tags.label", &self.label)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metadata {
    pub key: String,
    pub value: String,
}

/// One product line. Amounts are decimal strings, e.g. `"2.50"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LineItem {
    pub product_id: String,
    pub total: String,
    pub item_cost: String,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<Metadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Validate for LineItem {
    fn validate(&self) -> Result<(), ValidationError> {
        required("line_items.product_id", &self.product_id)?;
        required("line_items.total", &self.total)?;
        required("line_items.item_cost", &self.item_cost)?;
        required("line_items.quantity", &self.quantity)?;
        self.tags.iter().try_for_each(Validate::validate)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreatePaymentRequest {
    pub customer: String,
    pub currency: String,
    pub amount: String,
    pub allow_credit: bool,
    pub pos_id: String,
    pub pos_tid: String,
    pub action: PaymentAction,
    pub expires_in: u32,
    pub display_message_uri: Option<String>,
    pub callback_uri: Option<String>,
    pub additional_amount: Option<String>,
    pub additional_edit: Option<bool>,
    pub text: Option<String>,
    pub required_scope: Option<String>,
    pub required_scope_text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

impl CreatePaymentRequest {
    /// `pos_id` + `pos_tid` is the natural key: posting the same pair twice
    /// creates one payment request.
    pub fn new(
        customer: impl Into<String>,
        currency: impl Into<String>,
        amount: impl Into<String>,
        pos_id: impl Into<String>,
        pos_tid: impl Into<String>,
        action: PaymentAction,
        expires_in: u32,
    ) -> Self {
        Self {
            customer: customer.into(),
            currency: currency.into(),
            amount: amount.into(),
            allow_credit: false,
            pos_id: pos_id.into(),
            pos_tid: pos_tid.into(),
            action,
            expires_in,
            display_message_uri: None,
            callback_uri: None,
            additional_amount: None,
            additional_edit: None,
            text: None,
            required_scope: None,
            required_scope_text: None,
            links: Vec::new(),
            line_items: Vec::new(),
        }
    }
}

impl Validate for CreatePaymentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        customer(&self.customer)?;
        length("currency", &self.currency, CURRENCY_LEN, CURRENCY_LEN)?;
        required("amount", &self.amount)?;
        required("pos_id", &self.pos_id)?;
        required("pos_tid", &self.pos_tid)?;
        expires_in(self.expires_in)?;
        self.links.iter().try_for_each(Validate::validate)?;
        self.line_items.iter().try_for_each(Validate::validate)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdatePaymentRequest {
    #[serde(skip)]
    pub tid: String,
    pub action: Option<UpdateAction>,
    pub currency: Option<String>,
    pub amount: Option<String>,
    pub additional_amount: Option<String>,
    /// Required together with `amount` when capturing, absent otherwise.
    pub capture_id: Option<String>,
    /// Needed for partial refunds.
    pub refund_id: Option<String>,
    pub text: Option<String>,
    pub display_message_uri: Option<String>,
    pub callback_uri: Option<String>,
    pub required_scope: Option<String>,
    pub required_scope_text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

impl UpdatePaymentRequest {
    pub fn new(tid: impl Into<String>, action: UpdateAction) -> Self {
        Self {
            tid: tid.into(),
            action: Some(action),
            ..Default::default()
        }
    }

    /// Capture of `amount` under the merchant's `capture_id`.
    pub fn capture(
        tid: impl Into<String>,
        currency: impl Into<String>,
        amount: impl Into<String>,
        capture_id: impl Into<String>,
    ) -> Self {
        Self {
            currency: Some(currency.into()),
            amount: Some(amount.into()),
            capture_id: Some(capture_id.into()),
            ..Self::new(tid, UpdateAction::Capture)
        }
    }
}

impl Validate for UpdatePaymentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required("tid", &self.tid)?;
        if let Some(c) = &self.currency {
            length("currency", c, CURRENCY_LEN, CURRENCY_LEN)?;
        }
        if self.action == Some(UpdateAction::Capture)
            && self.amount.is_some() != self.capture_id.is_some()
        {
            return Err(ValidationError::Invalid {
                field: "capture_id",
                reason: "must be set exactly when amount is set",
            });
        }
        self.line_items.iter().try_for_each(Validate::validate)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreatePermissionRequest {
    pub customer: String,
    pub pos_id: String,
    pub pos_tid: String,
    pub scope: String,
    pub text: Option<String>,
    pub callback_uri: Option<String>,
    pub expires_in: Option<u32>,
}

impl CreatePermissionRequest {
    pub fn new(
        customer: impl Into<String>,
        pos_id: impl Into<String>,
        pos_tid: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            customer: customer.into(),
            pos_id: pos_id.into(),
            pos_tid: pos_tid.into(),
            scope: scope.into(),
            text: None,
            callback_uri: None,
            expires_in: None,
        }
    }
}

impl Validate for CreatePermissionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        customer(&self.customer)?;
        required("pos_id", &self.pos_id)?;
        required("pos_tid", &self.pos_tid)?;
        required("scope", &self.scope)?;
        self.expires_in.map_or(Ok(()), expires_in)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreateShortlink {
    pub callback_uri: Option<String>,
    /// Only for registering printed stickers.
    pub serial_number: Option<String>,
}

impl Validate for CreateShortlink {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateShortlink {
    #[serde(skip)]
    pub id: String,
    pub callback_uri: Option<String>,
}

impl Validate for UpdateShortlink {
    fn validate(&self) -> Result<(), ValidationError> {
        required("id", &self.id)
    }
}

// Merchant onboarding

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreateMerchantSspUser {
    pub email: String,
}

impl CreateMerchantSspUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

impl Validate for CreateMerchantSspUser {
    fn validate(&self) -> Result<(), ValidationError> {
        required("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: "not an e-mail address",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreateLegalEntity {
    /// Person signing the agreement on behalf of the entity.
    pub signee: String,
}

impl Validate for CreateLegalEntity {
    fn validate(&self) -> Result<(), ValidationError> {
        required("signee", &self.signee)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateLegalEntity {
    #[serde(skip)]
    pub id: String,
    pub organization_id: Option<String>,
    pub business_name: Option<String>,
    pub ownership_structure: Option<String>,
    pub beneficial_owners: Option<Vec<serde_json::Value>>,
    pub vat_registered: Option<bool>,
}

impl UpdateLegalEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Validate for UpdateLegalEntity {
    fn validate(&self) -> Result<(), ValidationError> {
        required("legal_entity_id", &self.id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreateMerchant {
    /// Id of a previously created legal entity.
    pub legal_entity: String,
    pub integration_type: String,
    pub business_name: String,
}

impl CreateMerchant {
    pub fn new(
        legal_entity: impl Into<String>,
        integration_type: impl Into<String>,
        business_name: impl Into<String>,
    ) -> Self {
        Self {
            legal_entity: legal_entity.into(),
            integration_type: integration_type.into(),
            business_name: business_name.into(),
        }
    }
}

impl Validate for CreateMerchant {
    fn validate(&self) -> Result<(), ValidationError> {
        required("legal_entity", &self.legal_entity)?;
        required("integration_type", &self.integration_type)?;
        required("business_name", &self.business_name)
    }
}
