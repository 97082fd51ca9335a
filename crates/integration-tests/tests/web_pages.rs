//! Integration tests for the public surface of the web app.
//!
//! These tests require:
//! - The web app running (cargo run -p moorline-web)
//!
//! Unauthenticated requests to gated pages must bounce to sign-in with a
//! `return_to` parameter rather than erroring.

use reqwest::{Client, StatusCode, redirect::Policy};

/// Base URL for the web app (configurable via environment).
fn web_base_url() -> String {
    std::env::var("WEB_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client that does not follow redirects, so they can be asserted on.
fn no_redirect_client() -> Client {
    Client::builder()
        .redirect(Policy::none())
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running web app"]
async fn test_health_endpoint() {
    let client = Client::new();
    let resp = client
        .get(format!("{}/health", web_base_url()))
        .send()
        .await
        .expect("Failed to reach health endpoint");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "OK");
}

#[tokio::test]
#[ignore = "Requires running web app"]
async fn test_gated_pages_redirect_to_sign_in() {
    let client = no_redirect_client();
    let base_url = web_base_url();

    for path in [
        "/",
        "/settings/billing",
        "/settings/organization",
        "/settings/vessels/import",
        "/onboarding",
        "/admin",
    ] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to request gated page");

        assert!(
            resp.status().is_redirection(),
            "{path} should redirect when signed out, got {}",
            resp.status()
        );
        let location = resp
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(
            location.starts_with("/auth/sign-in"),
            "{path} should bounce to sign-in, got {location}"
        );
        assert!(
            location.contains("return_to="),
            "{path} redirect should carry return_to, got {location}"
        );
    }
}

#[tokio::test]
#[ignore = "Requires running web app"]
async fn test_sign_in_page_renders() {
    let client = Client::new();
    let resp = client
        .get(format!("{}/auth/sign-in", web_base_url()))
        .send()
        .await
        .expect("Failed to get sign-in page");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Sign in"));
}

#[tokio::test]
#[ignore = "Requires running web app"]
async fn test_legacy_billing_path_redirects() {
    let client = no_redirect_client();
    let resp = client
        .get(format!("{}/billing", web_base_url()))
        .send()
        .await
        .expect("Failed to request legacy billing path");

    assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(location, "/settings/billing");
}
