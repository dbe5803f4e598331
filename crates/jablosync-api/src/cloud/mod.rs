// Jablotron cloud HTTP client
//
// Wraps `reqwest::Client` with session-cookie login, service discovery,
// and `{ http-code, data }` envelope unwrapping. Endpoint families live
// in `fetch` (read paths) and `control` (commands) as inherent methods.

mod control;
mod fetch;

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{Ack, RemoteClient, SectionControl};
use crate::error::Error;
use crate::models::{Envelope, RawGate, RawSection, RawSensor, Service, ServiceList};
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.jablonet.net/api/2.2/";

/// Service types the cloud lists but which expose no sections or gates.
pub const UNSUPPORTED_SERVICES: &[&str] = &["FUTURA2", "AMBIENTA", "VOLTA", "LOGBOOK"];

/// Account credentials for the cloud login.
#[derive(Debug, Clone)]
pub struct CloudCredentials {
    pub username: String,
    pub password: SecretString,
}

/// A decoded response: HTTP status plus the parsed envelope.
pub(crate) struct Reply<T> {
    pub status: StatusCode,
    pub envelope: Envelope<T>,
}

impl<T> Reply<T> {
    /// Unwrap `data`, treating any non-success status as an API error.
    fn into_data(self) -> Result<T, Error> {
        if !self.status.is_success() {
            return Err(Error::Api {
                status: self.status.as_u16(),
                message: self.envelope.failure_reason(),
            });
        }
        let status = self.status.as_u16();
        match self.envelope.data {
            Some(data) => Ok(data),
            None => Err(Error::Api {
                status,
                message: self.envelope.failure_reason(),
            }),
        }
    }
}

/// HTTP client for the Jablotron cloud.
///
/// Logs in lazily on first use and again, once, whenever the cloud
/// reports the session as expired. Discovered services are cached for
/// the lifetime of the session.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: CloudCredentials,
    /// `None` until logged in; reset when the session expires.
    services: Mutex<Option<Arc<Vec<Service>>>>,
}

impl CloudClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// A cookie jar is added if the config lacks one; the session lives
    /// in a cookie.
    pub fn new(
        base_url: Url,
        credentials: CloudCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// The client must keep cookies, or every request after login will
    /// come back as an expired session.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: CloudCredentials) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            credentials,
            services: Mutex::new(None),
        }
    }

    /// The API root every endpoint path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Authenticate and store the session cookie.
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.base_url.join("userAuthorize.json")?;
        debug!("logging in at {}", url);

        let body = json!({
            "login": self.credentials.username,
            "password": self.credentials.password.expose_secret(),
            "system": "Android",
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<Envelope<Value>>(&body)
                .map_or(body, |envelope| envelope.failure_reason());
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {reason}"),
            });
        }

        info!(user = %self.credentials.username, "cloud login successful");
        Ok(())
    }

    /// Services reachable from the account, excluding unsupported types.
    ///
    /// Logs in first if there is no live session.
    pub async fn services(&self) -> Result<Arc<Vec<Service>>, Error> {
        let mut guard = self.services.lock().await;
        if let Some(ref services) = *guard {
            return Ok(Arc::clone(services));
        }

        self.login().await?;
        let body = json!({ "list-type": "EXTENDED", "visibility": "DEFAULT" });
        let list: ServiceList = self.send("serviceListGet.json", &body).await?.into_data()?;

        let (supported, skipped): (Vec<_>, Vec<_>) = list
            .services
            .into_iter()
            .partition(|s| !UNSUPPORTED_SERVICES.contains(&s.service_type.as_str()));
        for service in &skipped {
            debug!(
                service_id = service.service_id,
                service_type = %service.service_type,
                "skipping unsupported service"
            );
        }

        let services = Arc::new(supported);
        *guard = Some(Arc::clone(&services));
        Ok(services)
    }

    async fn invalidate_session(&self) {
        *self.services.lock().await = None;
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST a JSON body and decode the envelope.
    ///
    /// A 401 maps to `SessionExpired`; every other status is returned to
    /// the caller alongside the envelope.
    async fn send<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<Reply<T>, Error> {
        let url = self.base_url.join(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }

        let text = resp.text().await.map_err(Error::Transport)?;
        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => Ok(Reply { status, envelope }),
            Err(_) if !status.is_success() => Err(Error::Api {
                status: status.as_u16(),
                message: text,
            }),
            Err(e) => Err(Error::Deserialization {
                message: e.to_string(),
                body: text,
            }),
        }
    }

    /// `send` within a session, re-authenticating once on expiry.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<Reply<T>, Error> {
        self.services().await?;
        match self.send(path, body).await {
            Err(Error::SessionExpired) => {
                warn!("cloud session expired, logging in again");
                self.invalidate_session().await;
                self.services().await?;
                self.send(path, body).await
            }
            other => other,
        }
    }

    /// Resolve a namespaced component id to its service and bare id.
    pub(crate) async fn locate<'a>(&self, id: &'a str) -> Result<(Service, &'a str), Error> {
        let (service_id, component) = split_component_id(id)?;
        let services = self.services().await?;
        services
            .iter()
            .find(|s| s.service_id == service_id)
            .cloned()
            .map(|s| (s, component))
            .ok_or_else(|| Error::UnknownComponent(id.to_owned()))
    }
}

impl RemoteClient for CloudClient {
    async fn fetch_sections(&self) -> Result<Vec<RawSection>, Error> {
        self.sections().await
    }

    async fn fetch_gates(&self) -> Result<Vec<RawGate>, Error> {
        self.gates().await
    }

    async fn fetch_sensors(&self) -> Result<Vec<RawSensor>, Error> {
        self.thermo_sensors().await
    }

    async fn send_arm(
        &self,
        section_id: &str,
        control: SectionControl,
        pin: &SecretString,
        bypass: bool,
    ) -> Result<Ack, Error> {
        self.control_section(section_id, control, pin, bypass).await
    }

    async fn send_gate(
        &self,
        gate_id: &str,
        on: bool,
        pin: Option<&SecretString>,
    ) -> Result<Ack, Error> {
        self.control_gate(gate_id, on, pin).await
    }
}

// ── Component ids ────────────────────────────────────────────────────

/// Namespace a component id with its service: `{service_id}:{component}`.
pub(crate) fn component_id(service: &Service, component: &str) -> String {
    format!("{}:{component}", service.service_id)
}

/// Split `{service_id}:{component}` back into its parts.
pub(crate) fn split_component_id(id: &str) -> Result<(u64, &str), Error> {
    let (service, component) = id
        .split_once(':')
        .ok_or_else(|| Error::UnknownComponent(id.to_owned()))?;
    let service_id = service
        .parse()
        .map_err(|_| Error::UnknownComponent(id.to_owned()))?;
    if component.is_empty() {
        return Err(Error::UnknownComponent(id.to_owned()));
    }
    Ok((service_id, component))
}

/// `Url::join` drops the last path segment unless it ends with `/`.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn component_ids_round_trip_through_split() {
        let service = Service {
            service_id: 4711,
            service_type: "JA100".into(),
            name: "Home".into(),
        };
        let id = component_id(&service, "SEC-1");
        assert_eq!(id, "4711:SEC-1");
        assert_eq!(split_component_id(&id).unwrap(), (4711, "SEC-1"));
    }

    #[test]
    fn malformed_component_ids_are_rejected() {
        for bad in ["SEC-1", "abc:SEC-1", "4711:", ""] {
            assert!(
                matches!(split_component_id(bad), Err(Error::UnknownComponent(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = Url::parse("https://api.example.net/api/2.2").unwrap();
        let url = normalize_base(url);
        assert_eq!(url.as_str(), "https://api.example.net/api/2.2/");
        assert_eq!(
            url.join("serviceListGet.json").unwrap().as_str(),
            "https://api.example.net/api/2.2/serviceListGet.json"
        );
    }
}
