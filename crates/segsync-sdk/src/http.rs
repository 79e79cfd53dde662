//! REST collaborators for the marketing platform's JSON:API endpoints.
//!
//! - [`HttpMembershipSource`] walks `GET /api/segments/{id}/profiles`
//! - [`HttpNotifier`] posts lifecycle events to `POST /api/events`

use crate::config::SyncConfig;
use crate::error::{SourceError, SyncError};
use crate::source::{MembershipSource, Page, PageCursor};
use async_trait::async_trait;
use reqwest::StatusCode;
use segsync_core::{EventKind, Identity, MetricNames, NotificationContext, Notifier, NotifyError};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const JSON_API: &str = "application/vnd.api+json";

/// Authenticated HTTP client shared by the source and the notifier.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    revision: String,
}

impl ApiClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SyncError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            revision: config.api_revision.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Klaviyo-API-Key {}", self.api_key))
            .header("accept", JSON_API)
            .header("revision", &self.revision)
    }
}

#[derive(Debug, Deserialize)]
struct ProfilesResponse {
    #[serde(default)]
    data: Vec<ProfileResource>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct ProfileResource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: ProfileAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileAttributes {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

/// Reads segment membership, keyed by profile email.
pub struct HttpMembershipSource {
    api: ApiClient,
    segment_id: String,
}

impl HttpMembershipSource {
    pub fn new(api: ApiClient, segment_id: impl Into<String>) -> Self {
        Self {
            api,
            segment_id: segment_id.into(),
        }
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/api/segments/{}/profiles",
            self.api.base_url, self.segment_id
        )
    }
}

#[async_trait]
impl MembershipSource for HttpMembershipSource {
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page, SourceError> {
        // The `next` link is absolute and already carries the page size.
        let request = match cursor {
            Some(next) => self.api.request(reqwest::Method::GET, next.as_str()),
            None => self
                .api
                .request(reqwest::Method::GET, &self.first_page_url())
                .query(&[("page[size]", page_size)]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ProfilesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let mut members = Vec::with_capacity(body.data.len());
        for profile in body.data {
            match profile.attributes.email {
                Some(email) if !email.is_empty() => members.push(Identity::new(email)),
                _ => tracing::debug!(profile_id = ?profile.id, "Skipping profile without email"),
            }
        }

        let next = body
            .links
            .and_then(|l| l.next)
            .filter(|n| !n.is_empty())
            .map(PageCursor::new);

        Ok(Page { members, next })
    }
}

/// Posts one metric event per membership transition.
pub struct HttpNotifier {
    api: ApiClient,
    metrics: MetricNames,
}

impl HttpNotifier {
    pub fn new(api: ApiClient, metrics: MetricNames) -> Self {
        Self { api, metrics }
    }

    fn payload(
        &self,
        identity: &Identity,
        kind: EventKind,
        ctx: &NotificationContext,
    ) -> serde_json::Value {
        json!({
            "data": {
                "type": "event",
                "attributes": {
                    "properties": {
                        "segment_id": ctx.segment_id,
                        "segment_name": ctx.segment_name,
                        "timestamp": ctx.timestamp.to_rfc3339(),
                    },
                    "metric": {
                        "data": {
                            "type": "metric",
                            "attributes": {
                                "name": self.metrics.name_for(kind),
                            }
                        }
                    },
                    "profile": {
                        "data": {
                            "type": "profile",
                            "attributes": {
                                "email": identity.as_str(),
                            }
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(
        &self,
        identity: &Identity,
        kind: EventKind,
        ctx: &NotificationContext,
    ) -> Result<(), NotifyError> {
        let url = format!("{}/api/events", self.api.base_url);
        let body = serde_json::to_vec(&self.payload(identity, kind, ctx))
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let response = self
            .api
            .request(reqwest::Method::POST, &url)
            .header("Content-Type", JSON_API)
            .body(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            tracing::info!(
                %identity,
                metric = self.metrics.name_for(kind),
                "Event successfully sent"
            );
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
