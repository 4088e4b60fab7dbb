//! Named per-resource calls. Each validates its parameters, then maps onto
//! [`MapiClient::create`], [`get`](MapiClient::get),
//! [`update`](MapiClient::update) or [`delete`](MapiClient::delete).

use http::header::LOCATION;
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::client::{CallOptions, MapiClient};
use crate::codec;
use crate::config::MERCHANT_HEADER;
use crate::error::MapiError;
use crate::pagination::Pages;
use crate::params::*;
use crate::response::MapiResponse;
use crate::transport::Transport;

pub const USER: &str = "user";
pub const POS: &str = "pos";
pub const PAYMENT_REQUEST: &str = "payment_request";
pub const PERMISSION_REQUEST: &str = "permission_request";
pub const SHORTLINK: &str = "shortlink";
pub const SETTLEMENT: &str = "settlement";
pub const LAST_SETTLEMENT: &str = "last_settlement";
pub const STATUS_CODE: &str = "status_code";
pub const MERCHANT: &str = "merchant";
pub const MERCHANT_LOOKUP: &str = "merchant_lookup";
pub const MERCHANT_SSP_USER: &str = "merchant_ssp_user";
pub const LEGAL_ENTITY: &str = "legal_entity";

fn require(field: &'static str, id: &str) -> Result<(), MapiError> {
    if id.is_empty() {
        return Err(ValidationError::Required(field).into());
    }
    Ok(())
}

impl<T: Transport> MapiClient<T> {
    async fn get_item(
        &self,
        endpoint: &str,
        field: &'static str,
        id: &str,
    ) -> Result<Value, MapiError> {
        require(field, id)?;
        self.get(endpoint, Some(id)).await
    }

    async fn get_sub(&self, endpoint: &str, id: &str, sub: &str) -> Result<Value, MapiError> {
        require("id", id)?;
        self.get_url(&self.sub_url(endpoint, id, sub)).await
    }

    // Users

    pub async fn create_user(&self, p: &CreateUser) -> Result<Value, MapiError> {
        p.validate()?;
        let mut opts = CallOptions::default();
        if let Some(merchant) = &p.merchant_id {
            opts = opts.with_header(MERCHANT_HEADER, merchant.as_str());
        }
        let url = self.collection_url(USER);
        let resp = self
            .do_req(Method::POST, &url, Some(codec::to_fields(p)?), opts)
            .await?;
        Ok(resp.json_opt()?.unwrap_or(Value::Null))
    }

    pub async fn update_user(&self, p: &UpdateUser) -> Result<MapiResponse, MapiError> {
        p.validate()?;
        self.update(USER, &p.id, p).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Value, MapiError> {
        self.get_item(USER, "user_id", user_id).await
    }

    // Points of sale

    pub async fn create_pos(&self, p: &CreatePos) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(POS, p).await
    }

    pub async fn get_pos(&self, pos_id: &str) -> Result<Value, MapiError> {
        self.get_item(POS, "pos_id", pos_id).await
    }

    pub async fn get_all_pos(&self) -> Result<Vec<Value>, MapiError> {
        self.depaginate(&self.collection_url(POS)).await
    }

    pub async fn update_pos(&self, p: &UpdatePos) -> Result<MapiResponse, MapiError> {
        p.validate()?;
        self.update(POS, &p.id, p).await
    }

    pub async fn delete_pos(&self, pos_id: &str) -> Result<MapiResponse, MapiError> {
        require("pos_id", pos_id)?;
        self.delete(POS, pos_id).await
    }

    // Payment requests

    /// Idempotent on (`pos_id`, `pos_tid`): a repeat is answered with `409`.
    pub async fn create_payment_request(
        &self,
        p: &CreatePaymentRequest,
    ) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(PAYMENT_REQUEST, p).await
    }

    pub async fn update_payment_request(
        &self,
        p: &UpdatePaymentRequest,
    ) -> Result<MapiResponse, MapiError> {
        p.validate()?;
        self.update(PAYMENT_REQUEST, &p.tid, p).await
    }

    pub async fn get_payment_request(&self, tid: &str) -> Result<Value, MapiError> {
        self.get_item(PAYMENT_REQUEST, "tid", tid).await
    }

    pub async fn get_payment_request_outcome(&self, tid: &str) -> Result<Value, MapiError> {
        self.get_sub(PAYMENT_REQUEST, tid, "outcome").await
    }

    /// Replaces the whole ticket list of a payment request.
    pub async fn update_ticket(
        &self,
        tid: &str,
        tickets: &[Value],
    ) -> Result<MapiResponse, MapiError> {
        require("tid", tid)?;
        let url = self.sub_url(PAYMENT_REQUEST, tid, "ticket");
        let body = json!({ "tickets": tickets });
        self.do_req(Method::PUT, &url, Some(body), CallOptions::default())
            .await
    }

    // Permission requests

    pub async fn create_permission_request(
        &self,
        p: &CreatePermissionRequest,
    ) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(PERMISSION_REQUEST, p).await
    }

    pub async fn get_permission_request(&self, rid: &str) -> Result<Value, MapiError> {
        self.get_item(PERMISSION_REQUEST, "rid", rid).await
    }

    pub async fn get_permission_request_outcome(&self, rid: &str) -> Result<Value, MapiError> {
        self.get_sub(PERMISSION_REQUEST, rid, "outcome").await
    }

    // Shortlinks

    pub async fn create_shortlink(&self, p: &CreateShortlink) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(SHORTLINK, p).await
    }

    /// Accepts a shortlink id or the absolute URL handed out by the service.
    pub async fn get_shortlink(&self, id_or_url: &str) -> Result<Value, MapiError> {
        require("shortlink_id", id_or_url)?;
        if id_or_url.contains("://") {
            self.get_url(id_or_url).await
        } else {
            self.get(SHORTLINK, Some(id_or_url)).await
        }
    }

    pub fn shortlink_pages(&self) -> Pages<'_, T> {
        self.pages(self.collection_url(SHORTLINK))
    }

    pub async fn get_all_shortlinks(&self) -> Result<Vec<Value>, MapiError> {
        self.shortlink_pages().collect_items().await
    }

    pub async fn update_shortlink(&self, p: &UpdateShortlink) -> Result<MapiResponse, MapiError> {
        p.validate()?;
        self.update(SHORTLINK, &p.id, p).await
    }

    pub async fn delete_shortlink(&self, shortlink_id: &str) -> Result<MapiResponse, MapiError> {
        require("shortlink_id", shortlink_id)?;
        self.delete(SHORTLINK, shortlink_id).await
    }

    // Settlements

    /// The service answers with a `302` to the latest settlement; the
    /// `Location` is fetched with a second signed request.
    pub async fn get_last_settlement(&self) -> Result<Value, MapiError> {
        let url = self.collection_url(LAST_SETTLEMENT);
        let resp = self
            .do_req(
                Method::GET,
                &url,
                None,
                CallOptions::default().expect_status(StatusCode::FOUND),
            )
            .await?;
        let location = resp
            .header(LOCATION.as_str())
            .ok_or_else(|| MapiError::protocol("last settlement redirect without Location"))?;
        let target = url::Url::parse(&url)
            .and_then(|base| base.join(location))
            .map_err(|e| MapiError::protocol(format!("bad Location {location:?}: {e}")))?;
        self.get_url(target.as_str()).await
    }

    pub async fn get_settlement(&self, settlement_id: &str) -> Result<Value, MapiError> {
        self.get_item(SETTLEMENT, "settlement_id", settlement_id).await
    }

    pub async fn get_all_settlements(&self) -> Result<Vec<Value>, MapiError> {
        self.depaginate(&self.collection_url(SETTLEMENT)).await
    }

    // Status codes

    pub async fn get_status_code(&self, value: &str) -> Result<Value, MapiError> {
        self.get_item(STATUS_CODE, "value", value).await
    }

    pub async fn get_all_status_codes(&self) -> Result<Vec<Value>, MapiError> {
        self.depaginate(&self.collection_url(STATUS_CODE)).await
    }

    // Merchants

    pub async fn get_merchant(&self, merchant_id: &str) -> Result<Value, MapiError> {
        self.get_item(MERCHANT, "merchant_id", merchant_id).await
    }

    pub async fn get_merchant_lookup(&self, lookup_id: &str) -> Result<Value, MapiError> {
        self.get_item(MERCHANT_LOOKUP, "lookup_id", lookup_id).await
    }

    // Merchant onboarding

    /// Registers a self-service portal user for the merchant.
    pub async fn create_merchant_ssp_user(
        &self,
        p: &CreateMerchantSspUser,
    ) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(MERCHANT_SSP_USER, p).await
    }

    pub async fn get_merchant_ssp_user(&self, ssp_user_id: &str) -> Result<Value, MapiError> {
        self.get_item(MERCHANT_SSP_USER, "merchant_ssp_user_id", ssp_user_id)
            .await
    }

    pub async fn create_legal_entity(&self, p: &CreateLegalEntity) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(LEGAL_ENTITY, p).await
    }

    pub async fn update_legal_entity(
        &self,
        p: &UpdateLegalEntity,
    ) -> Result<MapiResponse, MapiError> {
        p.validate()?;
        self.update(LEGAL_ENTITY, &p.id, p).await
    }

    pub async fn get_legal_entity(&self, legal_entity_id: &str) -> Result<Value, MapiError> {
        self.get_item(LEGAL_ENTITY, "legal_entity_id", legal_entity_id)
            .await
    }

    pub async fn create_merchant(&self, p: &CreateMerchant) -> Result<Value, MapiError> {
        p.validate()?;
        self.create(MERCHANT, p).await
    }

    /// Partial update; `fields` is sent as given, minus top-level nulls.
    pub async fn update_merchant<B>(
        &self,
        merchant_id: &str,
        fields: &B,
    ) -> Result<MapiResponse, MapiError>
    where
        B: Serialize + ?Sized,
    {
        require("merchant_id", merchant_id)?;
        self.update(MERCHANT, merchant_id, fields).await
    }
}
