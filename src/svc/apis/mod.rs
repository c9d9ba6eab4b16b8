//! # Api module
//!
//! This module provide the zoned api client, the request signer and the
//! typed endpoints of the database-as-a-service api

use std::{
    fmt::Debug,
    sync::Arc,
    time::{SystemTime, SystemTimeError},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_ENGINE, Engine};
use hmac::{Hmac, Mac};
use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use tracing::{debug, trace};

use crate::svc::cfg::{Api, Configuration};

pub mod dbaas;
pub mod operation;
#[cfg(test)]
pub mod testing;

// -----------------------------------------------------------------------------
// Types

type HmacSha256 = Hmac<Sha256>;

// -----------------------------------------------------------------------------
// Constants

pub const SIGNATURE_ALGORITHM: &str = "EXO2-HMAC-SHA256";
pub const SIGNATURE_VALIDITY: u64 = 600;

// -----------------------------------------------------------------------------
// Response structure

/// typed body returned by the api along with the http status
#[derive(Clone, Debug)]
pub struct Response<T> {
    pub status: StatusCode,
    pub body: T,
}

impl<T> Response<T> {
    /// returns the body if the status is exactly `200 OK`, any other
    /// successful status is reported as unexpected
    pub fn ok(self) -> Result<T, Error> {
        if self.status != StatusCode::OK {
            return Err(Error::UnexpectedStatus(self.status.to_string()));
        }

        Ok(self.body)
    }
}

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to execute request, {0}")]
    Request(reqwest::Error),
    #[error("failed to find resource at '{0}'")]
    NotFound(String),
    #[error("failed to execute request, got status code {0}, {1}")]
    StatusCode(StatusCode, String),
    #[error("failed to execute request, got unexpected status '{0}'")]
    UnexpectedStatus(String),
    #[error("failed to serialize body, {0}")]
    Serialize(serde_json::Error),
    #[error("failed to deserialize body, {0}")]
    Deserialize(serde_json::Error),
    #[error("failed to sign request, {0}")]
    Signer(SignerError),
    #[error("failed to build endpoint for zone '{0}', {1}")]
    Endpoint(String, String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// -----------------------------------------------------------------------------
// RestClient trait

/// zoned rest client, every typed endpoint goes through this trait
#[async_trait]
pub trait RestClient: Clone + Debug + Send + Sync {
    /// returns the zone the client is bound to
    fn zone(&self) -> &str;

    /// returns a copy of the client bound to the given zone, credentials are
    /// kept as is
    fn with_zone(&self, zone: &str) -> Self;

    /// execute the request on the path, relative to the zoned endpoint
    async fn request<T, U>(
        &self,
        method: &Method,
        path: &str,
        payload: Option<&T>,
    ) -> Result<Response<U>, Error>
    where
        T: Serialize + Send + Sync,
        U: DeserializeOwned + Send;

    async fn get<T>(&self, path: &str) -> Result<Response<T>, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.request::<(), T>(&Method::GET, path, None).await
    }

    async fn post<T, U>(&self, path: &str, payload: &T) -> Result<Response<U>, Error>
    where
        T: Serialize + Send + Sync,
        U: DeserializeOwned + Send,
    {
        self.request(&Method::POST, path, Some(payload)).await
    }

    async fn put<T, U>(&self, path: &str, payload: &T) -> Result<Response<U>, Error>
    where
        T: Serialize + Send + Sync,
        U: DeserializeOwned + Send,
    {
        self.request(&Method::PUT, path, Some(payload)).await
    }

    async fn delete<T>(&self, path: &str) -> Result<Response<T>, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.request::<(), T>(&Method::DELETE, path, None).await
    }
}

// -----------------------------------------------------------------------------
// ClientCredentials structure

#[derive(PartialEq, Eq, Clone)]
pub struct ClientCredentials {
    pub key: String,
    pub secret: String,
}

impl Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl ClientCredentials {
    pub fn from_api(api: &Api) -> Option<Self> {
        match (&api.key, &api.secret) {
            (Some(key), Some(secret)) => Some(Self {
                key: key.to_owned(),
                secret: secret.to_owned(),
            }),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// SignerError enum

#[derive(thiserror::Error, Debug)]
pub enum SignerError {
    #[error("failed to compute digest, invalid key length")]
    Digest,
    #[error("failed to compute time since unix epoch, {0}")]
    UnixEpochTime(SystemTimeError),
}

// -----------------------------------------------------------------------------
// Signer structure

/// computes the `Authorization` header of a request, the signed message is
/// built from the method, path, body and expiration timestamp
pub struct Signer {
    pub expires: u64,
    pub credentials: ClientCredentials,
}

impl Signer {
    pub fn new(credentials: ClientCredentials) -> Result<Self, SignerError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(SignerError::UnixEpochTime)?
            .as_secs();

        Ok(Self {
            expires: now + SIGNATURE_VALIDITY,
            credentials,
        })
    }

    /// returns the message which is signed, the query string is not part of
    /// the signed path as the api does not take any on these endpoints
    pub fn message(&self, method: &str, path: &str, body: &[u8]) -> String {
        format!(
            "{} {}\n{}\n\n\n{}",
            method,
            path,
            String::from_utf8_lossy(body),
            self.expires
        )
    }

    pub fn signature(&self, method: &str, path: &str, body: &[u8]) -> Result<String, SignerError> {
        let mut hasher = HmacSha256::new_from_slice(self.credentials.secret.as_bytes())
            .map_err(|_| SignerError::Digest)?;

        hasher.update(self.message(method, path, body).as_bytes());

        let digest = hasher.finalize().into_bytes();
        Ok(BASE64_ENGINE.encode(digest.as_slice()))
    }

    pub fn sign(&self, method: &str, path: &str, body: &[u8]) -> Result<String, SignerError> {
        Ok(format!(
            "{} credential={},expires={},signature={}",
            SIGNATURE_ALGORITHM,
            self.credentials.key,
            self.expires,
            self.signature(method, path, body)?
        ))
    }
}

// -----------------------------------------------------------------------------
// Client structure

#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
    credentials: Option<ClientCredentials>,
    environment: String,
    template: String,
    zone: String,
}

impl Client {
    pub fn new(configuration: Arc<Configuration>, zone: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            credentials: ClientCredentials::from_api(&configuration.api),
            environment: configuration.api.environment.to_owned(),
            template: configuration.api.endpoint.to_owned(),
            zone: zone.to_string(),
        }
    }

    pub fn set_credentials(&mut self, credentials: Option<ClientCredentials>) {
        self.credentials = credentials;
    }

    /// returns the endpoint of the zone the client is bound to
    pub fn endpoint(&self) -> Result<reqwest::Url, Error> {
        let endpoint = self
            .template
            .replace("{environment}", &self.environment)
            .replace("{zone}", &self.zone);

        reqwest::Url::parse(&endpoint).map_err(|err| Error::Endpoint(self.zone.to_owned(), err.to_string()))
    }
}

#[async_trait]
impl RestClient for Client {
    fn zone(&self) -> &str {
        &self.zone
    }

    fn with_zone(&self, zone: &str) -> Self {
        let mut client = self.to_owned();
        client.zone = zone.to_string();
        client
    }

    async fn request<T, U>(
        &self,
        method: &Method,
        path: &str,
        payload: Option<&T>,
    ) -> Result<Response<U>, Error>
    where
        T: Serialize + Send + Sync,
        U: DeserializeOwned + Send,
    {
        let endpoint = self.endpoint()?;
        let url = format!("{}{}", endpoint.as_str().trim_end_matches('/'), path);
        let buf = match payload {
            Some(payload) => serde_json::to_vec(payload).map_err(Error::Serialize)?,
            None => vec![],
        };

        let mut builder = self
            .inner
            .request(method.to_owned(), &url)
            .header(header::ACCEPT, "application/json");

        if let Some(credentials) = &self.credentials {
            let signer = Signer::new(credentials.to_owned()).map_err(Error::Signer)?;
            let signed_path = format!("{}{}", endpoint.path().trim_end_matches('/'), path);

            builder = builder.header(
                header::AUTHORIZATION,
                signer
                    .sign(method.as_str(), &signed_path, &buf)
                    .map_err(Error::Signer)?,
            );
        }

        if payload.is_some() {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(buf.to_owned());
        }

        trace!(
            endpoint = &url,
            method = method.as_str(),
            body = String::from_utf8_lossy(&buf).to_string(),
            "Execute request"
        );

        let res = builder.send().await.map_err(Error::Request)?;
        let status = res.status();
        let buf = res.bytes().await.map_err(Error::Request)?;

        debug!(
            endpoint = &url,
            method = method.as_str(),
            status = status.as_u16(),
            "Got response"
        );

        if StatusCode::NOT_FOUND == status {
            return Err(Error::NotFound(path.to_string()));
        }

        if !status.is_success() {
            return Err(Error::StatusCode(
                status,
                String::from_utf8_lossy(&buf).to_string(),
            ));
        }

        let body = if buf.is_empty() {
            serde_json::from_slice(b"null")
        } else {
            serde_json::from_slice(&buf)
        }
        .map_err(Error::Deserialize)?;

        Ok(Response { status, body })
    }
}
