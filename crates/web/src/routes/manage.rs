//! Listing create, edit and delete route handlers.
//!
//! All of these require a signed-in user; ownership is checked by
//! [`ListingService`].

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use dar_core::{Amenity, ListingId, ListingType, PropertyType, cities_in, regions};

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Listing};
use crate::routes::SelectOption;
use crate::routes::listings::AmenityOption;
use crate::services::images::{ImageUpload, MAX_IMAGES};
use crate::services::{ListingError, ListingForm, ListingService};
use crate::state::AppState;

/// Multipart field carrying image files.
const IMAGE_FIELD: &str = "images";

// =============================================================================
// Templates
// =============================================================================

/// Create or edit form.
#[derive(Template, WebTemplate)]
#[template(path = "listing_form.html")]
pub struct ListingFormTemplate {
    pub current_user: Option<CurrentUser>,
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub action: String,
    pub form: ListingForm,
    pub error: Option<String>,
    pub types: Vec<SelectOption>,
    pub property_types: Vec<SelectOption>,
    pub regions: Vec<SelectOption>,
    pub cities: Vec<SelectOption>,
    pub amenities: Vec<AmenityOption>,
    /// Images kept when no new files are chosen.
    pub existing_images: Vec<String>,
    pub max_images: usize,
    /// Whether the address can be geocoded instead of typing coordinates.
    pub can_geocode: bool,
}

/// Delete confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "delete_listing.html")]
pub struct DeleteListingTemplate {
    pub current_user: Option<CurrentUser>,
    pub listing: Listing,
}

/// Which form is being shown.
enum FormMode {
    Create,
    Edit { id: ListingId, images: Vec<String> },
}

impl ListingFormTemplate {
    fn new(
        state: &AppState,
        user: CurrentUser,
        mode: FormMode,
        form: ListingForm,
        error: Option<String>,
    ) -> Self {
        let (heading, submit_label, action, existing_images) = match mode {
            FormMode::Create => (
                "Create a Listing",
                "Create listing",
                "/create-listing".to_string(),
                Vec::new(),
            ),
            FormMode::Edit { id, images } => (
                "Edit Listing",
                "Update listing",
                format!("/edit-listing/{id}"),
                images,
            ),
        };

        let mut region_options = vec![("", "Select a region")];
        region_options.extend(regions().iter().map(|r| (r.name, r.name)));

        let mut city_options = vec![("", "Select a city")];
        if form.region.trim().is_empty() {
            city_options.extend(
                regions()
                    .iter()
                    .flat_map(|r| r.cities.iter())
                    .map(|c| (*c, *c)),
            );
        } else {
            city_options.extend(cities_in(&form.region).iter().map(|c| (*c, *c)));
        }
        let mut seen = HashSet::new();
        city_options.retain(|(value, _)| seen.insert(*value));

        let amenities = Amenity::ALL
            .iter()
            .map(|a| AmenityOption {
                slug: a.slug(),
                label: a.label(),
                checked: form.has_amenity(a),
            })
            .collect();

        Self {
            current_user: Some(user),
            heading,
            submit_label,
            action,
            types: SelectOption::list(
                ListingType::ALL.iter().map(|t| (t.slug(), t.label())),
                &form.listing_type,
            ),
            property_types: SelectOption::list(
                PropertyType::ALL.iter().map(|p| (p.slug(), p.label())),
                &form.property_type,
            ),
            regions: SelectOption::list(region_options, form.region.trim()),
            cities: SelectOption::list(city_options, form.city.trim()),
            amenities,
            form,
            error,
            existing_images,
            max_images: MAX_IMAGES,
            can_geocode: state.geocoder().is_some(),
        }
    }
}

// =============================================================================
// Multipart
// =============================================================================

fn bad_multipart(e: &MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid form submission: {}", e.body_text()))
}

/// Split a multipart submission into form fields and image files.
///
/// An empty file part (no file chosen) is skipped.
async fn read_listing_form(
    mut multipart: Multipart,
) -> Result<(ListingForm, Vec<ImageUpload>), AppError> {
    let mut form = ListingForm::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_multipart(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        if name == IMAGE_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| bad_multipart(&e))?;
            if filename.is_empty() && bytes.is_empty() {
                continue;
            }
            images.push(ImageUpload {
                filename,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|e| bad_multipart(&e))?;
            form.set_field(&name, value);
        }
    }

    Ok((form, images))
}

fn listing_service(state: &AppState) -> ListingService<'_> {
    ListingService::new(
        state.pool(),
        state.images(),
        state.geocoder(),
        state.home_cache(),
    )
}

/// Re-render the form for errors the user can fix; propagate the rest.
fn form_error(
    state: &AppState,
    user: CurrentUser,
    mode: FormMode,
    form: ListingForm,
    err: ListingError,
) -> Result<Response, AppError> {
    match err.form_message() {
        Some(message) => {
            tracing::debug!(error = %err, "Listing form rejected");
            let page = ListingFormTemplate::new(state, user, mode, form, Some(message));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        None => Err(err.into()),
    }
}

// =============================================================================
// Create
// =============================================================================

/// Display the new listing form.
pub async fn create_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    ListingFormTemplate::new(&state, user, FormMode::Create, ListingForm::blank(), None)
}

/// Create a listing from the submitted form and images.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (form, images) = read_listing_form(multipart).await?;

    let service = listing_service(&state);

    match service.create_listing(user.id, &form, images).await {
        Ok(listing) => {
            add_breadcrumb("listing", "Listing created", None);
            Ok(Redirect::to(&listing.detail_path()).into_response())
        }
        Err(e) => form_error(&state, user, FormMode::Create, form, e),
    }
}

// =============================================================================
// Edit
// =============================================================================

/// Display the edit form for a listing the user owns.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let service = listing_service(&state);
    let listing = service.get_owned(user.id, ListingId::new(id)).await?;

    let form = ListingForm::from_listing(&listing);
    let mode = FormMode::Edit {
        id: listing.id,
        images: listing.img_urls,
    };
    Ok(ListingFormTemplate::new(&state, user, mode, form, None))
}

/// Update a listing the user owns.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let id = ListingId::new(id);
    let (form, images) = read_listing_form(multipart).await?;

    let service = listing_service(&state);

    match service.update_listing(user.id, id, &form, images).await {
        Ok(listing) => {
            add_breadcrumb("listing", "Listing updated", None);
            Ok(Redirect::to(&listing.detail_path()).into_response())
        }
        Err(e) => {
            let existing = if e.form_message().is_some() {
                service.get_owned(user.id, id).await?.img_urls
            } else {
                Vec::new()
            };
            let mode = FormMode::Edit {
                id,
                images: existing,
            };
            form_error(&state, user, mode, form, e)
        }
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Ask for confirmation before deleting.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let service = listing_service(&state);
    let listing = service.get_owned(user.id, ListingId::new(id)).await?;

    Ok(DeleteListingTemplate {
        current_user: Some(user),
        listing,
    })
}

/// Delete a listing the user owns.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let service = listing_service(&state);
    service.delete_listing(user.id, ListingId::new(id)).await?;

    add_breadcrumb("listing", "Listing deleted", None);
    Ok(Redirect::to("/profile?success=listing_deleted"))
}
