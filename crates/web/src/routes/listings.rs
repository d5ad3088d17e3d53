//! Listing browse and detail route handlers.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use dar_core::{Amenity, ListingId, ListingType, PropertyType, cities_in, regions};

use crate::db::ListingRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, Listing};
use crate::routes::SelectOption;
use crate::services::browse::{BrowseParams, ListingQuery, SortOrder, browse};
use crate::state::AppState;

// =============================================================================
// Search Bar
// =============================================================================

/// An amenity checkbox.
#[derive(Debug, Clone)]
pub struct AmenityOption {
    pub slug: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

/// Search bar state, prefilled from the current query.
#[derive(Debug, Clone)]
pub struct SearchBar {
    /// Path the form submits to.
    pub action: String,
    /// Offer a type selector; category pages fix the type by path.
    pub show_type: bool,
    pub types: Vec<SelectOption>,
    pub keyword: String,
    pub location: String,
    pub regions: Vec<SelectOption>,
    pub cities: Vec<SelectOption>,
    pub property_types: Vec<SelectOption>,
    pub min_price: String,
    pub max_price: String,
    pub min_size: String,
    pub max_size: String,
    pub rooms: Vec<SelectOption>,
    pub baths: Vec<SelectOption>,
    pub amenities: Vec<AmenityOption>,
    pub sorts: Vec<SelectOption>,
}

const COUNT_CHOICES: [&str; 4] = ["1", "2", "3", "4+"];

impl SearchBar {
    fn new(action: &str, show_type: bool, query: &ListingQuery) -> Self {
        let region = query.region.clone().unwrap_or_default();
        let city = query.city.clone().unwrap_or_default();

        let mut region_options = vec![("", "All Regions")];
        region_options.extend(regions().iter().map(|r| (r.name, r.name)));

        let mut city_options = vec![("", "All Cities")];
        if region.is_empty() {
            city_options.extend(
                regions()
                    .iter()
                    .flat_map(|r| r.cities.iter())
                    .map(|c| (*c, *c)),
            );
        } else {
            city_options.extend(cities_in(&region).iter().map(|c| (*c, *c)));
        }
        let mut seen = HashSet::new();
        city_options.retain(|(value, _)| seen.insert(*value));

        let mut types = vec![("", "All")];
        types.extend(ListingType::ALL.iter().map(|t| (t.slug(), t.label())));

        let mut property_types = vec![("", "All")];
        property_types.extend(PropertyType::ALL.iter().map(|p| (p.slug(), p.label())));

        let rooms_param = query.rooms.map(|r| r.as_param()).unwrap_or_default();
        let mut rooms = vec![("", "Rooms")];
        rooms.extend(COUNT_CHOICES.iter().map(|c| (*c, *c)));

        let baths_param = query.baths.map(|b| b.as_param()).unwrap_or_default();
        let mut baths = vec![("", "Baths: Any")];
        baths.extend(COUNT_CHOICES.iter().map(|c| (*c, *c)));

        Self {
            action: action.to_string(),
            show_type,
            types: SelectOption::list(
                types,
                query.listing_type.map(ListingType::slug).unwrap_or_default(),
            ),
            keyword: query.keyword.clone().unwrap_or_default(),
            location: query.location.clone().unwrap_or_default(),
            regions: SelectOption::list(region_options, &region),
            cities: SelectOption::list(city_options, &city),
            property_types: SelectOption::list(
                property_types,
                query
                    .property_type
                    .map(PropertyType::slug)
                    .unwrap_or_default(),
            ),
            min_price: query.min_price.map(|p| p.to_string()).unwrap_or_default(),
            max_price: query.max_price.map(|p| p.to_string()).unwrap_or_default(),
            min_size: query.min_size.map(|s| s.to_string()).unwrap_or_default(),
            max_size: query.max_size.map(|s| s.to_string()).unwrap_or_default(),
            rooms: SelectOption::list(rooms, &rooms_param),
            baths: SelectOption::list(baths, &baths_param),
            amenities: Amenity::ALL
                .iter()
                .map(|a| AmenityOption {
                    slug: a.slug(),
                    label: a.label(),
                    checked: query.requires_amenity(a),
                })
                .collect(),
            sorts: SelectOption::list(
                SortOrder::ALL.iter().map(|s| (s.slug(), s.label())),
                query.sort.slug(),
            ),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Search results page, shared by listings, offers and categories.
#[derive(Template, WebTemplate)]
#[template(path = "listings.html")]
pub struct ListingsTemplate {
    pub current_user: Option<CurrentUser>,
    pub heading: String,
    pub search: SearchBar,
    pub listings: Vec<Listing>,
    /// Link to the next page, when the store has more rows.
    pub load_more: Option<String>,
}

/// Listing detail page.
#[derive(Template, WebTemplate)]
#[template(path = "listing.html")]
pub struct ListingTemplate {
    pub current_user: Option<CurrentUser>,
    pub listing: Listing,
    pub is_owner: bool,
    pub map_url: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Which results page is being rendered.
struct Page<'a> {
    heading: String,
    action: &'a str,
    /// Whether the type comes from the query string rather than the path.
    type_in_query: bool,
}

async fn render_results(
    state: &AppState,
    current_user: Option<CurrentUser>,
    query: &ListingQuery,
    page: Page<'_>,
) -> Result<ListingsTemplate, AppError> {
    let results = browse(state.pool(), query).await?;

    let load_more = results.next_cursor.map(|cursor| {
        format!(
            "{}?{}",
            page.action,
            query.to_query_string(Some(&cursor), page.type_in_query)
        )
    });

    Ok(ListingsTemplate {
        current_user,
        heading: page.heading,
        search: SearchBar::new(page.action, page.type_in_query, query),
        listings: results.listings,
        load_more,
    })
}

/// All listings matching the search bar.
#[instrument(skip(state, current_user, raw))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let query = ListingQuery::from_params(&BrowseParams::from_query(
        raw.as_deref().unwrap_or_default(),
    ));

    render_results(
        &state,
        current_user,
        &query,
        Page {
            heading: "Listings".to_string(),
            action: "/listings",
            type_in_query: true,
        },
    )
    .await
}

/// Listings currently on offer.
#[instrument(skip(state, current_user, raw))]
pub async fn offers(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let mut query = ListingQuery::from_params(&BrowseParams::from_query(
        raw.as_deref().unwrap_or_default(),
    ));
    query.offer_only = true;

    render_results(
        &state,
        current_user,
        &query,
        Page {
            heading: "Offers".to_string(),
            action: "/offers",
            type_in_query: true,
        },
    )
    .await
}

/// Listings for rent or for sale.
#[instrument(skip(state, current_user, raw))]
pub async fn category(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Path(kind): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let listing_type: ListingType = kind
        .parse()
        .map_err(|_| AppError::NotFound("Category".to_string()))?;

    let mut query = ListingQuery::from_params(&BrowseParams::from_query(
        raw.as_deref().unwrap_or_default(),
    ));
    query.listing_type = Some(listing_type);

    let action = format!("/category/{}", listing_type.slug());
    render_results(
        &state,
        current_user,
        &query,
        Page {
            heading: format!("Places for {}", listing_type.slug()),
            action: &action,
            type_in_query: false,
        },
    )
    .await
}

/// A single listing.
///
/// A type segment that disagrees with the listing redirects to the
/// canonical path.
#[instrument(skip(state, current_user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<Response, AppError> {
    let listing = ListingRepository::new(state.pool())
        .get(ListingId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;

    if kind != listing.listing_type.slug() {
        return Ok(Redirect::permanent(&listing.detail_path()).into_response());
    }

    let is_owner = current_user
        .as_ref()
        .is_some_and(|user| listing.is_owned_by(user.id));
    let map_url = map_url(listing.geolocation.lat, listing.geolocation.lng);

    Ok(ListingTemplate {
        current_user,
        listing,
        is_owner,
        map_url,
    }
    .into_response())
}

/// `OpenStreetMap` link centred on the listing.
fn map_url(lat: f64, lng: f64) -> String {
    format!("https://www.openstreetmap.org/?mlat={lat}&mlon={lng}#map=16/{lat}/{lng}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn search_bar(raw: &str) -> SearchBar {
        let query = ListingQuery::from_params(&BrowseParams::from_query(raw));
        SearchBar::new("/listings", true, &query)
    }

    fn selected(options: &[SelectOption]) -> Vec<&str> {
        options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect()
    }

    #[test]
    fn test_search_bar_prefills_query() {
        let bar = search_bar("type=sale&region=Souss-Massa&rooms=4%2B&amenities=iron&sort=price_asc");

        assert_eq!(selected(&bar.types), vec!["sale"]);
        assert_eq!(selected(&bar.regions), vec!["Souss-Massa"]);
        assert_eq!(selected(&bar.rooms), vec!["4+"]);
        assert_eq!(selected(&bar.baths), vec![""]);
        assert_eq!(selected(&bar.sorts), vec!["price_asc"]);
        assert!(bar.amenities.iter().any(|a| a.slug == "iron" && a.checked));
        assert_eq!(bar.amenities.iter().filter(|a| a.checked).count(), 1);
    }

    #[test]
    fn test_cities_follow_region() {
        let bar = search_bar("region=Dakhla-Oued%20Ed-Dahab");
        let cities: Vec<&str> = bar.cities.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(cities, vec!["", "Dakhla", "Aousserd"]);

        let bar = search_bar("");
        assert!(bar.cities.iter().any(|c| c.value == "Casablanca"));
        assert!(bar.cities.iter().any(|c| c.value == "Dakhla"));
    }

    #[test]
    fn test_map_url() {
        assert_eq!(
            map_url(31.63, -8.0),
            "https://www.openstreetmap.org/?mlat=31.63&mlon=-8#map=16/31.63/-8"
        );
    }
}
