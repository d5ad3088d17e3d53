//! Integration tests for listing management and browsing.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running with the local image store (cargo run -p dar-web)
//!
//! Run with: cargo test -p dar-integration-tests -- --ignored

use dar_integration_tests::{
    base_url, client, create_listing, first_upload_url, listing_fields, listing_form, listing_id,
    location, sign_up,
};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_create_listing_shows_detail_page() {
    let client = client();
    sign_up(&client, "Amina Idrissi").await;
    let path = create_listing(&client, "Sunny flat in Gueliz").await;

    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to load listing");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Sunny flat in Gueliz"));
    assert!(body.contains("/edit-listing/"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_discount_not_lower_rerenders_form() {
    let client = client();
    sign_up(&client, "Karim Tazi").await;

    let form = listing_form("Flat with a fake deal", "5000")
        .text("offer", "on")
        .text("discounted_price", "5000");
    let resp = client
        .post(format!("{}/create-listing", base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to submit listing");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Flat with a fake deal"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_other_users_cannot_edit_or_delete() {
    let owner = client();
    sign_up(&owner, "Listing Owner").await;
    let path = create_listing(&owner, "Owner only listing").await;
    let id = listing_id(&path);

    let intruder = client();
    sign_up(&intruder, "Someone Else").await;

    let resp = intruder
        .get(format!("{}/edit-listing/{id}", base_url()))
        .send()
        .await
        .expect("Failed to load edit page");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = intruder
        .post(format!("{}/listings/{id}/delete", base_url()))
        .send()
        .await
        .expect("Failed to delete");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = owner
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to load listing");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_edit_without_new_images_keeps_them() {
    let client = client();
    sign_up(&client, "Careful Editor").await;
    let path = create_listing(&client, "Flat before the edit").await;
    let id = listing_id(&path);

    let before = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to load listing")
        .text()
        .await
        .expect("Failed to read response");
    let cover = first_upload_url(&before).expect("listing has an image").to_string();

    let resp = client
        .post(format!("{}/edit-listing/{id}", base_url()))
        .multipart(listing_fields("Flat after the edit", "7000"))
        .send()
        .await
        .expect("Failed to edit listing");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let after = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to load listing")
        .text()
        .await
        .expect("Failed to read response");
    assert!(after.contains("Flat after the edit"));
    assert_eq!(first_upload_url(&after), Some(cover.as_str()));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_delete_listing() {
    let client = client();
    sign_up(&client, "Short Lived").await;
    let path = create_listing(&client, "Gone tomorrow flat").await;
    let id = listing_id(&path);

    let resp = client
        .post(format!("{}/listings/{id}/delete", base_url()))
        .send()
        .await
        .expect("Failed to delete");
    assert_eq!(location(&resp), "/profile?success=listing_deleted");

    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to load listing");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_category_filters_by_city() {
    let client = client();
    sign_up(&client, "City Filter").await;
    create_listing(&client, "Marrakech filter flat").await;

    let resp = client
        .get(format!(
            "{}/category/rent?region=Marrakech-Safi&city=Marrakech&amenities=dishwasher",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to browse");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Marrakech filter flat"));

    let resp = client
        .get(format!("{}/category/rent?city=Agadir", base_url()))
        .send()
        .await
        .expect("Failed to browse");
    let body = resp.text().await.expect("Failed to read response");
    assert!(!body.contains("Marrakech filter flat"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_anonymous_contact_requires_message() {
    let owner = client();
    sign_up(&owner, "Contact Owner").await;
    let path = create_listing(&owner, "Contactable listing").await;
    let id = listing_id(&path);

    let resp = client()
        .post(format!("{}/listings/{id}/contact", base_url()))
        .form(&[("message", "  ")])
        .send()
        .await
        .expect("Failed to contact");
    assert_eq!(
        location(&resp),
        format!("/listings/{id}/contact?error=empty_message")
    );

    let resp = client()
        .post(format!("{}/listings/{id}/contact", base_url()))
        .form(&[("message", "Is it still available?")])
        .send()
        .await
        .expect("Failed to contact");
    assert!(location(&resp).starts_with("mailto:"));
}
