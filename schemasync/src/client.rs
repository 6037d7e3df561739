//! Access to the CMS schema endpoints.
//!
//! The applier and generator only see [`SchemaApi`]; [`DirectusClient`] is the
//! REST implementation. Credentials are handed to the client when it is built
//! and never change afterwards.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};

use crate::errors::{Result, SyncError};
use crate::types::{Record, SchemaCollection, str_prop};

/// Schema operations the tool needs from the CMS.
#[async_trait]
pub trait SchemaApi: Send + Sync {
    /// Read every record of a schema collection.
    async fn list(&self, collection: SchemaCollection) -> Result<Vec<Record>>;

    /// Create a record. `record` carries no `pk`.
    async fn create(&self, collection: SchemaCollection, record: &Record) -> Result<()>;

    /// Patch the record identified by `pk`.
    async fn update(&self, collection: SchemaCollection, pk: &str, record: &Record) -> Result<()>;

    /// Delete the record identified by `pk`.
    async fn delete(&self, collection: SchemaCollection, pk: &str) -> Result<()>;
}

/// Path a new record is posted to.
///
/// Fields are created under their owning collection.
pub fn create_endpoint(collection: SchemaCollection, record: &Record) -> Result<String> {
    match collection {
        SchemaCollection::Fields => {
            let owner = str_prop(record, "collection").ok_or(SyncError::MissingKey {
                collection,
                property: "collection",
            })?;
            Ok(format!("/fields/{owner}"))
        }
        SchemaCollection::Collections
        | SchemaCollection::Roles
        | SchemaCollection::Permissions
        | SchemaCollection::Relations => Ok(format!("/{collection}")),
    }
}

/// Path of an existing record.
pub fn item_endpoint(collection: SchemaCollection, pk: &str) -> String {
    format!("/{collection}/{pk}")
}

/// How the client authenticates against the CMS.
#[derive(Clone)]
pub enum Credentials {
    /// Static access token
    Token(String),
    /// Admin login exchanged for an access token at connect time
    Password { email: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// REST client for a Directus instance.
pub struct DirectusClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl DirectusClient {
    /// Authenticate and return a ready client.
    ///
    /// A rejected login or token is reported as [`SyncError::Authentication`].
    pub async fn connect(base_url: &str, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let access_token = match credentials {
            Credentials::Token(token) => {
                let response = http
                    .get(format!("{base_url}/users/me"))
                    .bearer_auth(&token)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(SyncError::Authentication {
                        message: format!("token rejected ({status}): {body}"),
                    });
                }
                token
            }
            Credentials::Password { email, password } => {
                let response = http
                    .post(format!("{base_url}/auth/login"))
                    .json(&json!({ "email": email, "password": password }))
                    .send()
                    .await?;
                let status = response.status();
                let body = response.text().await?;
                if !status.is_success() {
                    return Err(SyncError::Authentication {
                        message: format!("login rejected ({status}): {body}"),
                    });
                }
                let parsed: Value =
                    serde_json::from_str(&body).map_err(|err| SyncError::Authentication {
                        message: format!("login response is not JSON: {err}"),
                    })?;
                parsed
                    .pointer("/data/access_token")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| SyncError::Authentication {
                        message: "login response has no access token".to_string(),
                    })?
            }
        };

        log::info!("authenticated against {base_url}");
        Ok(Self {
            http,
            base_url,
            access_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        log::debug!("{method} {}{path}", self.base_url);
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(SyncError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl SchemaApi for DirectusClient {
    async fn list(&self, collection: SchemaCollection) -> Result<Vec<Record>> {
        let path = format!("/{collection}");
        let body = self
            .send(self.request(Method::GET, &path).query(&[("limit", "-1")]))
            .await?;
        parse_list(collection, &body)
    }

    async fn create(&self, collection: SchemaCollection, record: &Record) -> Result<()> {
        let path = create_endpoint(collection, record)?;
        self.send(self.request(Method::POST, &path).json(record)).await?;
        Ok(())
    }

    async fn update(&self, collection: SchemaCollection, pk: &str, record: &Record) -> Result<()> {
        let path = item_endpoint(collection, pk);
        self.send(self.request(Method::PATCH, &path).json(record)).await?;
        Ok(())
    }

    async fn delete(&self, collection: SchemaCollection, pk: &str) -> Result<()> {
        let path = item_endpoint(collection, pk);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

/// Unwrap the `{ "data": [...] }` envelope of a list response.
fn parse_list(collection: SchemaCollection, body: &str) -> Result<Vec<Record>> {
    let unexpected = |message: String| SyncError::UnexpectedResponse { message };

    let parsed: Value = serde_json::from_str(body)
        .map_err(|err| unexpected(format!("{collection} list is not JSON: {err}")))?;
    let Some(Value::Array(items)) = parsed.get("data") else {
        return Err(unexpected(format!("{collection} list has no data array")));
    };

    items
        .iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record.clone()),
            other => Err(unexpected(format!("{collection} item is not an object: {other}"))),
        })
        .collect()
}
