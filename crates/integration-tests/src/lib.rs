//! Integration tests for Dar.
//!
//! These tests drive a running server over HTTP and are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p dar-cli -- migrate
//!
//! # Start the server
//! cargo run -p dar-web
//!
//! # Run integration tests
//! cargo test -p dar-integration-tests -- --ignored
//! ```
//!
//! `DAR_TEST_BASE_URL` points the tests at another server
//! (default `http://localhost:3000`).

use reqwest::{Client, Response, StatusCode, header, multipart, redirect};

/// Smallest byte sequence the server accepts as a PNG.
pub const PNG_BYTES: [u8; 16] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

/// Password used for every test account.
pub const PASSWORD: &str = "s3cure-enough";

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("DAR_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps cookies and does not follow redirects, so tests can
/// assert on `Location`.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh address so runs never collide.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// The redirect target of a response, or an empty string.
#[must_use]
pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Register a new account and return its email. The client ends up signed in.
///
/// # Panics
///
/// Panics if sign-up does not redirect home.
pub async fn sign_up(client: &Client, name: &str) -> String {
    let email = unique_email();
    let resp = client
        .post(format!("{}/sign-up", base_url()))
        .form(&[("name", name), ("email", &email), ("password", PASSWORD)])
        .send()
        .await
        .expect("Failed to sign up");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    email
}

/// Multipart body for a valid rent listing, without images.
#[must_use]
pub fn listing_fields(name: &str, regular_price: &str) -> multipart::Form {
    multipart::Form::new()
        .text("type", "rent")
        .text("name", name.to_string())
        .text("property_type", "apartment")
        .text("bedrooms", "2")
        .text("bathrooms", "1")
        .text("size", "85")
        .text("address", "12 Rue de la Liberte")
        .text("region", "Marrakech-Safi")
        .text("city", "Marrakech")
        .text("location", "Gueliz")
        .text("description", "Bright flat close to the tram.")
        .text("regular_price", regular_price.to_string())
        .text("discounted_price", "")
        .text("amenities", "dishwasher")
        .text("latitude", "31.634")
        .text("longitude", "-8.01")
}

/// Multipart body for a valid rent listing with one image.
///
/// # Panics
///
/// Panics if the image part cannot be built.
#[must_use]
pub fn listing_form(name: &str, regular_price: &str) -> multipart::Form {
    let image = multipart::Part::bytes(PNG_BYTES.to_vec())
        .file_name("front.png")
        .mime_str("image/png")
        .expect("valid mime");

    listing_fields(name, regular_price).part("images", image)
}

/// First local image URL found in a page.
#[must_use]
pub fn first_upload_url(html: &str) -> Option<&str> {
    let start = html.find("/uploads/")?;
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end)
}

/// Create a listing and return its detail path.
///
/// # Panics
///
/// Panics if the server does not redirect to the new listing.
pub async fn create_listing(client: &Client, name: &str) -> String {
    let resp = client
        .post(format!("{}/create-listing", base_url()))
        .multipart(listing_form(name, "6500"))
        .send()
        .await
        .expect("Failed to create listing");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let path = location(&resp);
    assert!(path.starts_with("/category/rent/"), "{path}");
    path
}

/// Listing ID from a detail path such as `/category/rent/42`.
#[must_use]
pub fn listing_id(detail_path: &str) -> &str {
    detail_path.rsplit('/').next().unwrap_or_default()
}
