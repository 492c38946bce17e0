//! Shared-secret credentials and the call metadata that carries them
//!
//! The same two keys (`login`, `password`) travel as gRPC metadata on the
//! RPC leg and as HTTP headers on the gateway leg. Nothing outside this
//! allow-list is ever copied across the boundary.

use crate::error::{AppError, Result};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::fmt;
use tonic::metadata::{AsciiMetadataValue, MetadataMap};

/// One of the metadata keys allowed to carry credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CredentialField {
    Login,
    Password,
}

impl CredentialField {
    /// The complete allow-list, in wire order
    pub const ALL: [CredentialField; 2] = [CredentialField::Login, CredentialField::Password];

    /// Lowercase metadata key used on the gRPC leg
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialField::Login => "login",
            CredentialField::Password => "password",
        }
    }

    /// Match an HTTP header or metadata name against the allow-list.
    ///
    /// Matching is ASCII case-insensitive, so `Login`, `login` and `LOGIN`
    /// all select [`CredentialField::Login`].
    pub fn from_header_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| name.eq_ignore_ascii_case(field.as_str()))
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visible ASCII and space only; `to_str()` on the receiving side rejects
/// anything else, so such a value would arrive as absent.
fn is_metadata_safe(value: &str) -> bool {
    value.bytes().all(|b| (0x20..0x7f).contains(&b))
}

/// A login/password pair
///
/// Immutable once built. Both values are guaranteed to be representable as
/// ASCII call metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let login = login.into();
        let password = password.into();

        for (field, value) in [
            (CredentialField::Login, &login),
            (CredentialField::Password, &password),
        ] {
            if !is_metadata_safe(value) {
                return Err(AppError::Config(format!(
                    "{field} must be printable ASCII to travel as call metadata"
                )));
            }
        }

        Ok(Self { login, password })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Credential metadata attached to, or recovered from, a single call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMetadata {
    entries: BTreeMap<CredentialField, String>,
}

impl CallMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying both halves of a credential pair
    pub fn from_credentials(credentials: &Credentials) -> Self {
        let mut metadata = Self::new();
        metadata.insert(CredentialField::Login, credentials.login());
        metadata.insert(CredentialField::Password, credentials.password());
        metadata
    }

    /// Recover the allow-listed entries from inbound gRPC metadata.
    ///
    /// Keys that are not ASCII-valued are treated as absent.
    pub fn from_grpc(metadata: &MetadataMap) -> Self {
        let mut result = Self::new();
        for field in CredentialField::ALL {
            if let Some(value) = metadata.get(field.as_str()).and_then(|v| v.to_str().ok()) {
                result.insert(field, value);
            }
        }
        result
    }

    /// Recover the allow-listed entries from inbound HTTP headers.
    ///
    /// Returns [`AppError::Translation`] when an allow-listed header holds a
    /// value that cannot be forwarded as gRPC metadata.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let mut result = Self::new();
        for (name, value) in headers {
            let Some(field) = CredentialField::from_header_name(name.as_str()) else {
                continue;
            };
            if result.get(field).is_some() {
                continue;
            }
            let value = value.to_str().map_err(|_| {
                AppError::Translation(format!("header '{field}' is not valid ASCII"))
            })?;
            if AsciiMetadataValue::try_from(value).is_err() {
                return Err(AppError::Translation(format!(
                    "header '{field}' cannot be forwarded as call metadata"
                )));
            }
            result.insert(field, value);
        }
        Ok(result)
    }

    pub fn insert(&mut self, field: CredentialField, value: impl Into<String>) {
        self.entries.insert(field, value.into());
    }

    pub fn get(&self, field: CredentialField) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in allow-list order
    pub fn iter(&self) -> impl Iterator<Item = (CredentialField, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Write the entries into outbound gRPC metadata, replacing any previous
    /// value for the same key.
    pub fn write_grpc(&self, metadata: &mut MetadataMap) -> Result<()> {
        for (field, value) in self.iter() {
            let cannot_send =
                || AppError::Translation(format!("'{field}' cannot be sent as call metadata"));
            if !is_metadata_safe(value) {
                return Err(cannot_send());
            }
            let value = AsciiMetadataValue::try_from(value).map_err(|_| cannot_send())?;
            metadata.insert(field.as_str(), value);
        }
        Ok(())
    }

    /// Write the entries into HTTP headers, replacing any previous value.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        for (field, value) in self.iter() {
            let value = HeaderValue::from_str(value).map_err(|_| {
                AppError::Translation(format!("'{field}' cannot be sent as an HTTP header"))
            })?;
            headers.insert(HeaderName::from_static(field.as_str()), value);
        }
        Ok(())
    }
}

/// Compare two secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
