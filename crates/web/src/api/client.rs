//! Moorline REST API client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP and `moka` for read-response caching
//! (30-second TTL). Every request carries the signed-in user's bearer token;
//! org-scoped requests additionally carry an `X-Org-Id` header.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moorline_core::{InviteId, MembershipId, OrgId, OrgRequestId, PlanId, RequestStatus};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::ApiError;
use super::cache::{CacheKey, CacheValue, token_fingerprint};
use super::types::{
    AdminOrg, AdminUser, BillingStatus, CreateOrgRequestBody, CurrentUserProfile, ImportReport,
    Invite, InviteBody, Member, Membership, OrgRequest, OrgStatusBody, OverrideUpdateBody,
    ProviderSession, ReviewBody, UpdateMemberBody,
};

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Moorline REST API.
///
/// Read responses are cached for 30 seconds; mutations invalidate the
/// dependent cache keys on success.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client for the given backend base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(30))
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                http: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Run a cached read. Identical concurrent misses on one key coalesce
    /// onto a single fetch; every waiter observes the same result. Failed
    /// fetches are never cached.
    async fn cached_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<CacheValue, ApiError>
    where
        F: Future<Output = Result<CacheValue, ApiError>>,
    {
        self.inner
            .cache
            .try_get_with(key, fetch)
            .await
            .map_err(|error| Arc::try_unwrap(error).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Send a request and map the response status.
    ///
    /// The body is read as text first so parse failures can be reported with
    /// the offending payload, and so error statuses can surface the backend's
    /// `detail` message.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let detail = extract_detail(&body);

        match status {
            reqwest::StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            reqwest::StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            reqwest::StatusCode::CONFLICT => Err(ApiError::Conflict(detail)),
            _ => {
                tracing::error!(
                    status = %status,
                    path = %path,
                    body = %body.chars().take(500).collect::<String>(),
                    "Moorline API returned non-success status"
                );
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message: detail,
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        org: Option<OrgId>,
    ) -> Result<T, ApiError> {
        let mut request = self.inner.http.get(self.url(path)).bearer_auth(token);
        if let Some(org) = org {
            request = request.header("X-Org-Id", org.as_i32());
        }

        let body = self.send(request).await?;
        parse_body(&body)
    }

    // =========================================================================
    // Current user
    // =========================================================================

    /// Get the signed-in user's profile and memberships.
    ///
    /// The backend creates the user row on first call after sign-in, so this
    /// retries once on a transport failure rather than bouncing a fresh
    /// sign-in to an error page.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails twice.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<CurrentUserProfile, ApiError> {
        let cache_key = CacheKey::Me {
            token: token_fingerprint(token),
        };

        let value = self
            .cached_fetch(cache_key, async {
                let profile = match self
                    .get_json::<CurrentUserProfile>(token, "/api/me", None)
                    .await
                {
                    Ok(profile) => profile,
                    Err(ApiError::Http(error)) => {
                        debug!(error = %error, "Retrying current-user fetch after transport failure");
                        self.get_json(token, "/api/me", None).await?
                    }
                    Err(error) => return Err(error),
                };
                Ok(CacheValue::Me(Box::new(profile)))
            })
            .await?;

        match value {
            CacheValue::Me(profile) => Ok(*profile),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Drop the cached billing status for an org, forcing a refetch.
    pub async fn invalidate_billing(&self, org: OrgId) {
        self.inner.cache.invalidate(&CacheKey::Billing { org }).await;
    }

    /// Drop the cached profile for this token, forcing a refetch.
    pub async fn invalidate_current_user(&self, token: &str) {
        self.inner
            .cache
            .invalidate(&CacheKey::Me {
                token: token_fingerprint(token),
            })
            .await;
    }

    // =========================================================================
    // Billing
    // =========================================================================

    /// Get billing status for an organization (org admins only).
    ///
    /// # Errors
    ///
    /// Returns an error if the caller is not an admin of `org` or the
    /// request fails.
    #[instrument(skip(self, token), fields(org = %org))]
    pub async fn billing_status(&self, token: &str, org: OrgId) -> Result<BillingStatus, ApiError> {
        let value = self
            .cached_fetch(CacheKey::Billing { org }, async {
                let status: BillingStatus = self
                    .get_json(token, "/api/billing/status", Some(org))
                    .await?;
                Ok(CacheValue::Billing(Box::new(status)))
            })
            .await?;

        match value {
            CacheValue::Billing(status) => Ok(*status),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Create a payment-provider checkout session for a plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan is unknown to the backend or the
    /// request fails.
    #[instrument(skip(self, token), fields(org = %org, plan = %plan))]
    pub async fn checkout_session(
        &self,
        token: &str,
        org: OrgId,
        plan: PlanId,
    ) -> Result<ProviderSession, ApiError> {
        let request = self
            .inner
            .http
            .post(self.url("/api/billing/checkout-session"))
            .query(&[("plan", plan.as_str())])
            .bearer_auth(token)
            .header("X-Org-Id", org.as_i32());

        let body = self.send(request).await?;
        parse_body(&body)
    }

    /// Create a payment-provider portal session for subscription management.
    ///
    /// # Errors
    ///
    /// Returns an error if the org has no provider customer yet or the
    /// request fails.
    #[instrument(skip(self, token), fields(org = %org))]
    pub async fn portal_session(&self, token: &str, org: OrgId) -> Result<ProviderSession, ApiError> {
        let request = self
            .inner
            .http
            .post(self.url("/api/billing/portal"))
            .bearer_auth(token)
            .header("X-Org-Id", org.as_i32());

        let body = self.send(request).await?;
        parse_body(&body)
    }

    // =========================================================================
    // Organization administration
    // =========================================================================

    /// List the members of an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(org = %org))]
    pub async fn list_members(&self, token: &str, org: OrgId) -> Result<Vec<Member>, ApiError> {
        let value = self
            .cached_fetch(CacheKey::Members { org }, async {
                let members: Vec<Member> = self
                    .get_json(token, &format!("/api/orgs/{org}/members"), None)
                    .await?;
                Ok(CacheValue::Members(members))
            })
            .await?;

        match value {
            CacheValue::Members(members) => Ok(members),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Update a member's role or status.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change (for example
    /// demoting the last admin) or the request fails.
    #[instrument(skip(self, token, body), fields(org = %org, member = %member))]
    pub async fn update_member(
        &self,
        token: &str,
        org: OrgId,
        member: MembershipId,
        body: &UpdateMemberBody,
    ) -> Result<Member, ApiError> {
        let request = self
            .inner
            .http
            .patch(self.url(&format!("/api/orgs/{org}/members/{member}")))
            .bearer_auth(token)
            .json(body);

        let response = self.send(request).await?;
        let updated: Member = parse_body(&response)?;

        self.inner.cache.invalidate(&CacheKey::Members { org }).await;

        Ok(updated)
    }

    /// List an organization's invites, settled ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(org = %org))]
    pub async fn list_invites(&self, token: &str, org: OrgId) -> Result<Vec<Invite>, ApiError> {
        let value = self
            .cached_fetch(CacheKey::Invites { org }, async {
                let invites: Vec<Invite> = self
                    .get_json(token, &format!("/api/orgs/{org}/invites"), None)
                    .await?;
                Ok(CacheValue::Invites(invites))
            })
            .await?;

        match value {
            CacheValue::Invites(invites) => Ok(invites),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Invite an email address into an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if an open invite already exists for the address or
    /// the request fails.
    #[instrument(skip(self, token, body), fields(org = %org))]
    pub async fn invite_member(
        &self,
        token: &str,
        org: OrgId,
        body: &InviteBody,
    ) -> Result<Invite, ApiError> {
        let request = self
            .inner
            .http
            .post(self.url(&format!("/api/orgs/{org}/invites")))
            .bearer_auth(token)
            .json(body);

        let response = self.send(request).await?;
        let invite: Invite = parse_body(&response)?;

        self.inner.cache.invalidate(&CacheKey::Invites { org }).await;

        Ok(invite)
    }

    /// Revoke an open invite.
    ///
    /// # Errors
    ///
    /// Returns an error if the invite was already settled or the request
    /// fails.
    #[instrument(skip(self, token), fields(org = %org, invite = %invite))]
    pub async fn revoke_invite(
        &self,
        token: &str,
        org: OrgId,
        invite: InviteId,
    ) -> Result<Invite, ApiError> {
        let request = self
            .inner
            .http
            .post(self.url(&format!("/api/orgs/{org}/invites/{invite}/revoke")))
            .bearer_auth(token);

        let response = self.send(request).await?;
        let revoked: Invite = parse_body(&response)?;

        self.inner.cache.invalidate(&CacheKey::Invites { org }).await;

        Ok(revoked)
    }

    /// Accept an invite by its emailed token, joining the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is unknown, expired, revoked, already
    /// accepted, or addressed to a different email.
    #[instrument(skip(self, token, invite_token))]
    pub async fn accept_invite(
        &self,
        token: &str,
        invite_token: &str,
    ) -> Result<Membership, ApiError> {
        let request = self
            .inner
            .http
            .post(self.url("/api/invites/accept"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "token": invite_token }));

        let response = self.send(request).await?;
        let membership: Membership = parse_body(&response)?;

        // Memberships changed, so the cached profile is stale.
        self.invalidate_current_user(token).await;

        Ok(membership)
    }

    // =========================================================================
    // Organization requests
    // =========================================================================

    /// Submit a request to create an organization.
    ///
    /// A 409 surfaces as [`ApiError::Conflict`] when an organization of the
    /// same name exists; retrying with `force: true` submits it anyway.
    ///
    /// # Errors
    ///
    /// Returns an error on a name conflict (unless forced) or if the
    /// request fails.
    #[instrument(skip(self, token, body))]
    pub async fn create_org_request(
        &self,
        token: &str,
        body: &CreateOrgRequestBody,
    ) -> Result<OrgRequest, ApiError> {
        let request = self
            .inner
            .http
            .post(self.url("/api/organization-requests"))
            .bearer_auth(token)
            .json(body);

        let response = self.send(request).await?;
        let created: OrgRequest = parse_body(&response)?;

        self.inner.cache.invalidate(&CacheKey::OrgRequests).await;

        Ok(created)
    }

    /// List organization requests visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn list_org_requests(&self, token: &str) -> Result<Vec<OrgRequest>, ApiError> {
        let value = self
            .cached_fetch(CacheKey::OrgRequests, async {
                let requests: Vec<OrgRequest> = self
                    .get_json(token, "/api/organization-requests", None)
                    .await?;
                Ok(CacheValue::OrgRequests(requests))
            })
            .await?;

        match value {
            CacheValue::OrgRequests(requests) => Ok(requests),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Approve or reject an organization request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request was already reviewed or the call
    /// fails.
    #[instrument(skip(self, token, notes), fields(request = %request, status = %status))]
    pub async fn review_org_request(
        &self,
        token: &str,
        request: OrgRequestId,
        status: RequestStatus,
        notes: Option<String>,
    ) -> Result<OrgRequest, ApiError> {
        let body = ReviewBody { status, notes };
        let http_request = self
            .inner
            .http
            .post(self.url(&format!("/api/organization-requests/{request}/review")))
            .bearer_auth(token)
            .json(&body);

        let response = self.send(http_request).await?;
        let reviewed: OrgRequest = parse_body(&response)?;

        // An approval creates an org and a membership for the requester.
        self.inner.cache.invalidate(&CacheKey::OrgRequests).await;
        self.invalidate_current_user(token).await;

        Ok(reviewed)
    }

    // =========================================================================
    // Super-admin console
    // =========================================================================

    /// List all organizations, optionally filtered by a name search.
    ///
    /// Only unfiltered listings are cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller is not a super admin or the request
    /// fails.
    #[instrument(skip(self, token))]
    pub async fn admin_list_orgs(
        &self,
        token: &str,
        search: Option<&str>,
    ) -> Result<Vec<AdminOrg>, ApiError> {
        // Searches bypass the cache entirely.
        if let Some(search) = search {
            let request = self
                .inner
                .http
                .get(self.url("/api/admin/organizations"))
                .query(&[("search", search)])
                .bearer_auth(token);
            let body = self.send(request).await?;
            return parse_body(&body);
        }

        let value = self
            .cached_fetch(CacheKey::AdminOrgs, async {
                let orgs: Vec<AdminOrg> =
                    self.get_json(token, "/api/admin/organizations", None).await?;
                Ok(CacheValue::AdminOrgs(orgs))
            })
            .await?;

        match value {
            CacheValue::AdminOrgs(orgs) => Ok(orgs),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Get one organization with its raw billing and override fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the org does not exist or the request fails.
    #[instrument(skip(self, token), fields(org = %org))]
    pub async fn admin_get_org(&self, token: &str, org: OrgId) -> Result<AdminOrg, ApiError> {
        let value = self
            .cached_fetch(CacheKey::AdminOrg { org }, async {
                let found: AdminOrg = self
                    .get_json(token, &format!("/api/admin/organizations/{org}"), None)
                    .await?;
                Ok(CacheValue::AdminOrg(Box::new(found)))
            })
            .await?;

        match value {
            CacheValue::AdminOrg(found) => Ok(*found),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    /// Update an organization's billing override.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token, body), fields(org = %org))]
    pub async fn admin_update_override(
        &self,
        token: &str,
        org: OrgId,
        body: &OverrideUpdateBody,
    ) -> Result<AdminOrg, ApiError> {
        let request = self
            .inner
            .http
            .patch(self.url(&format!(
                "/api/admin/organizations/{org}/billing-override"
            )))
            .bearer_auth(token)
            .json(body);

        let response = self.send(request).await?;
        let updated: AdminOrg = parse_body(&response)?;

        self.invalidate_admin_org(org).await;
        // Entitlement may have changed under the org's own billing page.
        self.inner.cache.invalidate(&CacheKey::Billing { org }).await;

        Ok(updated)
    }

    /// Enable or disable an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(org = %org, active = active))]
    pub async fn admin_set_org_active(
        &self,
        token: &str,
        org: OrgId,
        active: bool,
    ) -> Result<AdminOrg, ApiError> {
        let body = OrgStatusBody { is_active: active };
        let request = self
            .inner
            .http
            .post(self.url(&format!("/api/admin/organizations/{org}/status")))
            .bearer_auth(token)
            .json(&body);

        let response = self.send(request).await?;
        let updated: AdminOrg = parse_body(&response)?;

        self.invalidate_admin_org(org).await;

        Ok(updated)
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller is not a super admin or the request
    /// fails.
    #[instrument(skip(self, token))]
    pub async fn admin_list_users(&self, token: &str) -> Result<Vec<AdminUser>, ApiError> {
        let value = self
            .cached_fetch(CacheKey::AdminUsers, async {
                let users: Vec<AdminUser> =
                    self.get_json(token, "/api/admin/users", None).await?;
                Ok(CacheValue::AdminUsers(users))
            })
            .await?;

        match value {
            CacheValue::AdminUsers(users) => Ok(users),
            _ => unreachable!("cache key and value variants always match"),
        }
    }

    async fn invalidate_admin_org(&self, org: OrgId) {
        self.inner.cache.invalidate(&CacheKey::AdminOrgs).await;
        self.inner.cache.invalidate(&CacheKey::AdminOrg { org }).await;
    }

    // =========================================================================
    // Bulk import
    // =========================================================================

    /// Upload a vessel spreadsheet for row-by-row import.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload itself fails; per-row failures come
    /// back inside the report.
    #[instrument(skip(self, token, bytes), fields(org = %org, filename = %filename))]
    pub async fn import_vessels(
        &self,
        token: &str,
        org: OrgId,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<ImportReport, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .inner
            .http
            .post(self.url("/api/import/vessels"))
            .bearer_auth(token)
            .header("X-Org-Id", org.as_i32())
            .multipart(form);

        let response = self.send(request).await?;
        let report: ImportReport = parse_body(&response)?;

        // Vessel usage counts moved.
        self.inner.cache.invalidate(&CacheKey::Billing { org }).await;

        Ok(report)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|error| {
        tracing::error!(
            error = %error,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse Moorline API response"
        );
        ApiError::from(error)
    })
}

/// Pull the human-readable message out of a backend error body.
///
/// Error responses carry `{"detail": "..."}`; anything else yields an
/// empty string so callers fall back to a generic message.
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "Organization already exists"}"#),
            "Organization already exists"
        );
        assert_eq!(extract_detail("not json"), "");
        assert_eq!(extract_detail(r#"{"error": "other shape"}"#), "");
    }

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/api/me"), "http://localhost:8000/api/me");
    }

    #[tokio::test]
    async fn test_identical_concurrent_reads_share_one_fetch() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let client = ApiClient::new("http://localhost:8000");
        let fetches = Arc::new(AtomicUsize::new(0));

        let slow_fetch = |fetches: Arc<AtomicUsize>| async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(CacheValue::AdminUsers(Vec::new()))
        };

        let (first, second) = tokio::join!(
            client.cached_fetch(CacheKey::AdminUsers, slow_fetch(fetches.clone())),
            client.cached_fetch(CacheKey::AdminUsers, slow_fetch(fetches.clone())),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let client = ApiClient::new("http://localhost:8000");

        let failed: Result<CacheValue, ApiError> = client
            .cached_fetch(CacheKey::AdminUsers, async {
                Err(ApiError::Status {
                    status: 503,
                    message: "down".to_string(),
                })
            })
            .await;
        assert!(failed.is_err());

        // The next read on the same key fetches again.
        let recovered = client
            .cached_fetch(CacheKey::AdminUsers, async {
                Ok(CacheValue::AdminUsers(Vec::new()))
            })
            .await;
        assert!(recovered.is_ok());
    }
}
