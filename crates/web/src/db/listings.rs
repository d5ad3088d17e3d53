//! Listing repository for database operations.
//!
//! Search uses keyset pagination on `(created_at, id)` so that "load more"
//! stays stable while new listings are being added.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use dar_core::{Amenity, GeoPoint, ListingId, ListingType, PropertyType, UserId};

use super::RepositoryError;
use crate::models::{Listing, NewListing};

const LISTING_COLUMNS: &str = "id, user_id, name, listing_type, property_type, bedrooms, \
     bathrooms, size, address, region, city, location, description, regular_price, \
     discounted_price, offer, parking, furnished, amenities, img_urls, lat, lng, \
     created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` listing queries.
#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: i32,
    user_id: i32,
    name: String,
    listing_type: ListingType,
    property_type: PropertyType,
    bedrooms: i32,
    bathrooms: i32,
    size: i32,
    address: String,
    region: String,
    city: String,
    location: String,
    description: String,
    regular_price: Decimal,
    discounted_price: Option<Decimal>,
    offer: bool,
    parking: bool,
    furnished: bool,
    amenities: Vec<String>,
    img_urls: Vec<String>,
    lat: f64,
    lng: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let amenities = row
            .amenities
            .iter()
            .map(|slug| slug.parse::<Amenity>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| RepositoryError::DataCorruption(format!("listing {}: {e}", row.id)))?;

        let geolocation = GeoPoint::new(row.lat, row.lng)
            .map_err(|e| RepositoryError::DataCorruption(format!("listing {}: {e}", row.id)))?;

        Ok(Self {
            id: ListingId::new(row.id),
            owner_id: UserId::new(row.user_id),
            name: row.name,
            listing_type: row.listing_type,
            property_type: row.property_type,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            size: row.size,
            address: row.address,
            region: row.region,
            city: row.city,
            location: row.location,
            description: row.description,
            regular_price: row.regular_price,
            discounted_price: row.discounted_price,
            offer: row.offer,
            parking: row.parking,
            furnished: row.furnished,
            amenities,
            img_urls: row.img_urls,
            geolocation,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn amenity_slugs(amenities: &BTreeSet<Amenity>) -> Vec<String> {
    amenities.iter().map(|a| a.slug().to_string()).collect()
}

// =============================================================================
// Query Types
// =============================================================================

/// Constraints evaluated by the database.
///
/// Everything else a search form offers is applied in memory afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    pub listing_type: Option<ListingType>,
    pub offer_only: bool,
    pub region: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub owner: Option<UserId>,
}

/// One page of search results in store order.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    /// Whether at least one more row follows the last one returned.
    pub has_more: bool,
}

impl ListingPage {
    /// Keyset position of the last row on this page.
    #[must_use]
    pub fn last_key(&self) -> Option<(DateTime<Utc>, ListingId)> {
        self.listings.last().map(|l| (l.created_at, l.id))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for listing database operations.
pub struct ListingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ListingRepository<'a> {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a listing by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM dar.listing WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Listing::try_from).transpose()
    }

    /// Search listings newest first.
    ///
    /// `after` is the `(created_at, id)` of the last row already shown;
    /// rows strictly after it in store order are returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn search(
        &self,
        filter: &StoreFilter,
        after: Option<(DateTime<Utc>, ListingId)>,
        limit: u32,
    ) -> Result<ListingPage, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {LISTING_COLUMNS} FROM dar.listing WHERE TRUE"));

        if let Some(listing_type) = filter.listing_type {
            qb.push(" AND listing_type = ").push_bind(listing_type);
        }
        if filter.offer_only {
            qb.push(" AND offer");
        }
        if let Some(region) = &filter.region {
            qb.push(" AND lower(region) = lower(")
                .push_bind(region.clone())
                .push(")");
        }
        if let Some(city) = &filter.city {
            qb.push(" AND lower(city) = lower(")
                .push_bind(city.clone())
                .push(")");
        }
        if let Some(property_type) = filter.property_type {
            qb.push(" AND property_type = ").push_bind(property_type);
        }
        if let Some(owner) = filter.owner {
            qb.push(" AND user_id = ").push_bind(owner);
        }
        if let Some((created_at, id)) = after {
            qb.push(" AND (created_at, id) < (")
                .push_bind(created_at)
                .push(", ")
                .push_bind(id)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit) + 1);

        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(self.pool)
            .await?;

        let mut listings = rows
            .into_iter()
            .map(Listing::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let has_more = listings.len() > limit;
        listings.truncate(limit);

        Ok(ListingPage { listings, has_more })
    }

    /// All listings owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM dar.listing \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    /// Insert a new listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewListing) -> Result<Listing, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r"
            INSERT INTO dar.listing (
                user_id, name, listing_type, property_type, bedrooms, bathrooms, size,
                address, region, city, location, description, regular_price,
                discounted_price, offer, parking, furnished, amenities, img_urls, lat, lng
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING {LISTING_COLUMNS}
            "
        ))
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(new.listing_type)
        .bind(new.property_type)
        .bind(new.bedrooms)
        .bind(new.bathrooms)
        .bind(new.size)
        .bind(&new.address)
        .bind(&new.region)
        .bind(&new.city)
        .bind(&new.location)
        .bind(&new.description)
        .bind(new.regular_price)
        .bind(new.discounted_price)
        .bind(new.offer)
        .bind(new.parking)
        .bind(new.furnished)
        .bind(amenity_slugs(&new.amenities))
        .bind(&new.img_urls)
        .bind(new.geolocation.lat)
        .bind(new.geolocation.lng)
        .fetch_one(self.pool)
        .await?;

        Listing::try_from(row)
    }

    /// Overwrite a listing owned by `new.owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no listing with this ID belongs
    /// to the owner.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ListingId,
        new: &NewListing,
    ) -> Result<Listing, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r"
            UPDATE dar.listing SET
                name = $3, listing_type = $4, property_type = $5, bedrooms = $6,
                bathrooms = $7, size = $8, address = $9, region = $10, city = $11,
                location = $12, description = $13, regular_price = $14,
                discounted_price = $15, offer = $16, parking = $17, furnished = $18,
                amenities = $19, img_urls = $20, lat = $21, lng = $22
            WHERE id = $1 AND user_id = $2
            RETURNING {LISTING_COLUMNS}
            "
        ))
        .bind(id)
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(new.listing_type)
        .bind(new.property_type)
        .bind(new.bedrooms)
        .bind(new.bathrooms)
        .bind(new.size)
        .bind(&new.address)
        .bind(&new.region)
        .bind(&new.city)
        .bind(&new.location)
        .bind(&new.description)
        .bind(new.regular_price)
        .bind(new.discounted_price)
        .bind(new.offer)
        .bind(new.parking)
        .bind(new.furnished)
        .bind(amenity_slugs(&new.amenities))
        .bind(&new.img_urls)
        .bind(new.geolocation.lat)
        .bind(new.geolocation.lng)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Listing::try_from(row)
    }

    /// Delete a listing owned by `owner`, returning its image URLs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no listing with this ID belongs
    /// to the owner.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(
        &self,
        id: ListingId,
        owner: UserId,
    ) -> Result<Vec<String>, RepositoryError> {
        let img_urls: Option<Vec<String>> = sqlx::query_scalar(
            r"
            DELETE FROM dar.listing
            WHERE id = $1 AND user_id = $2
            RETURNING img_urls
            ",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        img_urls.ok_or(RepositoryError::NotFound)
    }
}
