use mapi_core::prelude::*;
use serde_json::Value;

pub const HOST: &str = "https://api.example.com";
pub const MERCHANT: &str = "m1";
pub const USER: &str = "u1";
pub const SECRET: &str = "s3cr3t-s3cr3t";

/// Absolute URL under the API root, e.g. `api("pos/")`.
pub fn api(path: &str) -> String {
    format!("{HOST}/merchant/v1/{path}")
}

pub fn config() -> ClientConfig {
    ClientConfig::new(HOST, MERCHANT).acting_user(USER)
}

pub fn test_key() -> RsaSha256Key {
    RsaSha256Key::from_pem(mapi_test_support::TEST_RSA_KEY).expect("test key")
}

pub fn secret_client<T: Transport>(transport: T) -> MapiClient<T> {
    MapiClient::with_transport(config(), Credential::secret(SECRET), transport).expect("client")
}

pub fn rsa_client<T: Transport>(transport: T) -> MapiClient<T> {
    MapiClient::with_transport(config(), Credential::RsaSha256(test_key()), transport)
        .expect("client")
}

/// Settings for [`live_demo`], read from the environment (or `.env`).
pub struct LiveSettings {
    pub base_url: String,
    pub merchant: String,
    pub user: String,
    pub credential: Credential,
}

impl LiveSettings {
    pub fn from_env() -> Result<Self, MapiError> {
        dotenvy::dotenv().ok();
        let var = |name: &'static str| {
            dotenvy::var(name).map_err(|_| MapiError::Config(format!("{name} missing").into()))
        };
        let credential = match (dotenvy::var("MAPI_KEY_FILE"), dotenvy::var("MAPI_SECRET")) {
            (Ok(path), _) => Credential::rsa_from_pem_file(path)?,
            (_, Ok(secret)) => Credential::secret(secret),
            _ => return Err(MapiError::Config("set MAPI_KEY_FILE or MAPI_SECRET".into())),
        };
        Ok(Self {
            base_url: var("MAPI_BASE_URL")?,
            merchant: var("MAPI_MERCHANT")?,
            user: var("MAPI_USER")?,
            credential,
        })
    }
}

/// Lists the merchant's points of sale and status codes against a real
/// deployment.
pub async fn live_demo(settings: LiveSettings) -> Result<(), MapiError> {
    let cfg = ClientConfig::new(settings.base_url, settings.merchant)
        .acting_user(settings.user)
        .with_debug_level(DebugLevel::V);
    let client = MapiClient::new(cfg, settings.credential)?;

    let pos: Vec<Value> = client.get_all_pos().await?;
    tracing::info!(count = pos.len(), "points of sale");
    for uri in &pos {
        println!("pos: {uri}");
    }

    let mut pages = client.shortlink_pages();
    while let Some(page) = pages.next_page().await {
        let page = page?;
        println!("shortlinks page {}: {} item(s)", pages.page_index(), page.items.len());
    }

    match client.get_last_settlement().await {
        Ok(s) => println!("last settlement: {s}"),
        Err(e) if e.status() == Some(http::StatusCode::NOT_FOUND) => println!("no settlement yet"),
        Err(e) => return Err(e),
    }
    Ok(())
}
