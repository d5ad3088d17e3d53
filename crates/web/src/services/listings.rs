//! Listing creation, editing and deletion.
//!
//! Form input arrives as raw strings, is validated into a [`ListingDraft`],
//! then combined with a resolved location and uploaded image URLs into a
//! [`NewListing`] row. Only the owner may change or remove a listing.

use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use dar_core::{
    Amenity, GeoError, GeoPoint, ListingId, ListingType, ParseVocabularyError, PropertyType,
    UserId, find_region,
};

use super::browse::HomeCache;
use super::geocode::{GeocodeError, Geocoder};
use super::images::{ImageError, ImageStore, ImageUpload, MAX_IMAGES};
use crate::db::{ListingRepository, RepositoryError};
use crate::models::{Listing, NewListing};

const NAME_MIN_CHARS: usize = 10;
const NAME_MAX_CHARS: usize = 32;
const ROOMS_MIN: i32 = 1;
const ROOMS_MAX: i32 = 50;
const PRICE_MIN: i64 = 50;
const PRICE_MAX: i64 = 400_000_000;

// =============================================================================
// Errors
// =============================================================================

/// A form rule that failed, with the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name must be between 10 and 32 characters")]
    NameLength,

    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a number")]
    NotANumber(&'static str),

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    #[error("Discounted price needs to be less than regular price")]
    DiscountNotLower,

    #[error("Please select at least one image")]
    NoImages,

    #[error("You can only upload up to 6 images.")]
    TooManyImages,

    #[error("please enter a correct address")]
    BadAddress,

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("{city} is not a city in {region}")]
    CityNotInRegion { city: String, region: String },

    #[error("{0}")]
    Choice(#[from] ParseVocabularyError),

    #[error("Coordinates are out of range")]
    Coordinates,
}

/// Errors from listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("listing not found")]
    NotFound,

    #[error("listing belongs to another user")]
    Forbidden,

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("geocoding error: {0}")]
    Geocode(GeocodeError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<GeocodeError> for ListingError {
    fn from(e: GeocodeError) -> Self {
        match e {
            GeocodeError::NoResults | GeocodeError::Coordinates(_) => {
                Self::Validation(ValidationError::BadAddress)
            }
            other => Self::Geocode(other),
        }
    }
}

impl ListingError {
    /// Message to show next to the form, for errors the user can fix.
    #[must_use]
    pub fn form_message(&self) -> Option<String> {
        match self {
            Self::Validation(e) => Some(e.to_string()),
            Self::Image(
                e @ (ImageError::UnsupportedType(_)
                | ImageError::TooLarge(_)
                | ImageError::UploadRejected(_)),
            ) => Some(e.to_string()),
            _ => None,
        }
    }
}

// =============================================================================
// Form
// =============================================================================

/// Listing form fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingForm {
    pub listing_type: String,
    pub name: String,
    pub property_type: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub size: String,
    pub address: String,
    pub region: String,
    pub city: String,
    pub location: String,
    pub description: String,
    pub regular_price: String,
    pub discounted_price: String,
    pub offer: bool,
    pub parking: bool,
    pub furnished: bool,
    /// Amenity slugs or labels, one per checked box.
    pub amenities: Vec<String>,
    /// Resolve coordinates from the address instead of the fields below.
    pub geocode: bool,
    pub latitude: String,
    pub longitude: String,
}

/// A validated form, ready to be stored once location and images are known.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub name: String,
    pub listing_type: ListingType,
    pub property_type: PropertyType,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub size: i32,
    pub address: String,
    pub region: String,
    pub city: String,
    pub location: String,
    pub description: String,
    pub regular_price: Decimal,
    pub discounted_price: Option<Decimal>,
    pub offer: bool,
    pub parking: bool,
    pub furnished: bool,
    pub amenities: BTreeSet<Amenity>,
    pub position: Position,
}

/// How the listing's coordinates are obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Geocode,
    Manual(GeoPoint),
}

impl ListingForm {
    /// A blank create form with the same defaults as a fresh listing.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            listing_type: ListingType::Rent.slug().to_string(),
            property_type: PropertyType::House.slug().to_string(),
            bedrooms: "1".to_string(),
            bathrooms: "1".to_string(),
            latitude: "0".to_string(),
            longitude: "0".to_string(),
            ..Self::default()
        }
    }

    /// Prefill the edit form from a stored listing.
    #[must_use]
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            listing_type: listing.listing_type.slug().to_string(),
            name: listing.name.clone(),
            property_type: listing.property_type.slug().to_string(),
            bedrooms: listing.bedrooms.to_string(),
            bathrooms: listing.bathrooms.to_string(),
            size: listing.size.to_string(),
            address: listing.address.clone(),
            region: listing.region.clone(),
            city: listing.city.clone(),
            location: listing.location.clone(),
            description: listing.description.clone(),
            regular_price: listing.regular_price.normalize().to_string(),
            discounted_price: listing
                .discounted_price
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
            offer: listing.offer,
            parking: listing.parking,
            furnished: listing.furnished,
            amenities: listing
                .amenities
                .iter()
                .map(|a| a.slug().to_string())
                .collect(),
            geocode: false,
            latitude: listing.geolocation.lat.to_string(),
            longitude: listing.geolocation.lng.to_string(),
        }
    }

    /// Record one submitted text field. Unknown fields are ignored.
    pub fn set_field(&mut self, field: &str, value: String) {
        match field {
            "type" => self.listing_type = value,
            "name" => self.name = value,
            "property_type" => self.property_type = value,
            "bedrooms" => self.bedrooms = value,
            "bathrooms" => self.bathrooms = value,
            "size" => self.size = value,
            "address" => self.address = value,
            "region" => self.region = value,
            "city" => self.city = value,
            "location" => self.location = value,
            "description" => self.description = value,
            "regular_price" => self.regular_price = value,
            "discounted_price" => self.discounted_price = value,
            "offer" => self.offer = parse_flag(&value),
            "parking" => self.parking = parse_flag(&value),
            "furnished" => self.furnished = parse_flag(&value),
            "amenities" => self.amenities.push(value),
            "geocode" => self.geocode = parse_flag(&value),
            "latitude" => self.latitude = value,
            "longitude" => self.longitude = value,
            _ => {}
        }
    }

    /// Whether an amenity box should render checked.
    #[must_use]
    pub fn has_amenity(&self, amenity: &Amenity) -> bool {
        self.amenities
            .iter()
            .any(|a| a.parse::<Amenity>().is_ok_and(|parsed| parsed == *amenity))
    }

    /// Check every field and the number of new images.
    ///
    /// `has_existing_images` is true when editing a listing that already has
    /// images, in which case submitting no new images keeps them.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails.
    pub fn validate(
        &self,
        new_images: usize,
        has_existing_images: bool,
    ) -> Result<ListingDraft, ValidationError> {
        let name = self.name.trim();
        let name_chars = name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_chars) {
            return Err(ValidationError::NameLength);
        }

        let listing_type = ListingType::from_str(self.listing_type.trim())?;
        let property_type = PropertyType::from_str(self.property_type.trim())?;

        let bedrooms = parse_count(&self.bedrooms, "Bedrooms", ROOMS_MIN, i64::from(ROOMS_MAX))?;
        let bathrooms = parse_count(&self.bathrooms, "Bathrooms", ROOMS_MIN, i64::from(ROOMS_MAX))?;
        let size = parse_count(&self.size, "Size", 1, i64::from(i32::MAX))?;

        let address = required(&self.address, "Address")?;
        let description = required(&self.description, "Description")?;

        let region_name = required(&self.region, "Region")?;
        let region = find_region(&region_name)
            .ok_or_else(|| ValidationError::UnknownRegion(region_name.clone()))?;
        let city_name = required(&self.city, "City")?;
        let city = region
            .cities
            .iter()
            .find(|c| c.to_lowercase() == city_name.to_lowercase())
            .ok_or_else(|| ValidationError::CityNotInRegion {
                city: city_name.clone(),
                region: region.name.to_string(),
            })?;

        let regular_price = parse_price(&self.regular_price, "Regular price")?;
        let discounted_price = if self.offer {
            let discounted = parse_price(&self.discounted_price, "Discounted price")?;
            if discounted >= regular_price {
                return Err(ValidationError::DiscountNotLower);
            }
            Some(discounted)
        } else {
            None
        };

        let amenities = self
            .amenities
            .iter()
            .filter(|a| !a.trim().is_empty())
            .map(|a| a.parse::<Amenity>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        if new_images == 0 && !has_existing_images {
            return Err(ValidationError::NoImages);
        }
        if new_images > MAX_IMAGES {
            return Err(ValidationError::TooManyImages);
        }

        let position = if self.geocode {
            Position::Geocode
        } else {
            let lat = parse_coordinate(&self.latitude, "Latitude")?;
            let lng = parse_coordinate(&self.longitude, "Longitude")?;
            Position::Manual(
                GeoPoint::new(lat, lng).map_err(|_: GeoError| ValidationError::Coordinates)?,
            )
        };

        Ok(ListingDraft {
            name: name.to_string(),
            listing_type,
            property_type,
            bedrooms,
            bathrooms,
            size,
            address,
            region: region.name.to_string(),
            city: (*city).to_string(),
            location: self.location.trim().to_string(),
            description,
            regular_price,
            discounted_price,
            offer: self.offer,
            parking: self.parking,
            furnished: self.furnished,
            amenities,
            position,
        })
    }
}

impl ListingDraft {
    /// Row to store once coordinates and image URLs are known.
    #[must_use]
    pub fn into_new_listing(
        self,
        owner_id: UserId,
        geolocation: GeoPoint,
        img_urls: Vec<String>,
    ) -> NewListing {
        NewListing {
            owner_id,
            name: self.name,
            listing_type: self.listing_type,
            property_type: self.property_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            size: self.size,
            address: self.address,
            region: self.region,
            city: self.city,
            location: self.location,
            description: self.description,
            regular_price: self.regular_price,
            discounted_price: self.discounted_price,
            offer: self.offer,
            parking: self.parking,
            furnished: self.furnished,
            amenities: self.amenities,
            img_urls,
            geolocation,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes" | "1"
    )
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value.to_string())
}

fn parse_count(
    value: &str,
    field: &'static str,
    min: i32,
    max: i64,
) -> Result<i32, ValidationError> {
    let value = required(value, field)?;
    let n: i64 = value
        .parse()
        .map_err(|_| ValidationError::NotANumber(field))?;
    if n < i64::from(min) || n > max {
        return Err(ValidationError::OutOfRange {
            field,
            min: i64::from(min),
            max,
        });
    }
    i32::try_from(n).map_err(|_| ValidationError::NotANumber(field))
}

fn parse_price(value: &str, field: &'static str) -> Result<Decimal, ValidationError> {
    let value = required(value, field)?;
    let price = Decimal::from_str(&value).map_err(|_| ValidationError::NotANumber(field))?;
    if price < Decimal::from(PRICE_MIN) || price > Decimal::from(PRICE_MAX) {
        return Err(ValidationError::OutOfRange {
            field,
            min: PRICE_MIN,
            max: PRICE_MAX,
        });
    }
    Ok(price.round_dp(2))
}

fn parse_coordinate(value: &str, field: &'static str) -> Result<f64, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0.0);
    }
    value
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber(field))
}

/// Which image URLs an edit stores, and which stored files it orphans.
///
/// Without new uploads the existing set is kept untouched; new uploads
/// replace the whole set.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageSwap {
    stored: Vec<String>,
    replaced: Vec<String>,
    fresh: bool,
}

impl ImageSwap {
    fn new(existing: &[String], uploaded: Option<Vec<String>>) -> Self {
        match uploaded {
            Some(stored) => Self {
                stored,
                replaced: existing.to_vec(),
                fresh: true,
            },
            None => Self {
                stored: existing.to_vec(),
                replaced: Vec::new(),
                fresh: false,
            },
        }
    }

    /// Files to remove when the row could not be written.
    fn on_failure(&self) -> &[String] {
        if self.fresh { &self.stored } else { &[] }
    }

    /// Files to remove once the row points at the new set.
    fn on_success(&self) -> &[String] {
        &self.replaced
    }
}

// =============================================================================
// Service
// =============================================================================

/// Owner-side listing operations.
pub struct ListingService<'a> {
    listings: ListingRepository<'a>,
    images: &'a ImageStore,
    geocoder: Option<&'a Geocoder>,
    home_cache: &'a HomeCache,
}

impl<'a> ListingService<'a> {
    /// Create a new listing service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        images: &'a ImageStore,
        geocoder: Option<&'a Geocoder>,
        home_cache: &'a HomeCache,
    ) -> Self {
        Self {
            listings: ListingRepository::new(pool),
            images,
            geocoder,
            home_cache,
        }
    }

    /// Load a listing the user is allowed to change.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound` or `ListingError::Forbidden`.
    pub async fn get_owned(&self, owner: UserId, id: ListingId) -> Result<Listing, ListingError> {
        let listing = self.listings.get(id).await?.ok_or(ListingError::NotFound)?;
        if !listing.is_owned_by(owner) {
            return Err(ListingError::Forbidden);
        }
        Ok(listing)
    }

    /// Validate, upload images, and store a new listing.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::Validation` for bad input, or the image,
    /// geocoding or repository failure that stopped the operation.
    #[instrument(skip(self, form, images), fields(user_id = %owner, images = images.len()))]
    pub async fn create_listing(
        &self,
        owner: UserId,
        form: &ListingForm,
        images: Vec<ImageUpload>,
    ) -> Result<Listing, ListingError> {
        let draft = form.validate(images.len(), false)?;
        let geolocation = self.resolve_position(&draft).await?;
        let img_urls = self.images.upload_all(owner, images).await?;

        let new = draft.into_new_listing(owner, geolocation, img_urls);
        let listing = match self.listings.create(&new).await {
            Ok(listing) => listing,
            Err(e) => {
                self.images.delete_all(&new.img_urls).await;
                return Err(e.into());
            }
        };

        self.home_cache.invalidate_all();
        tracing::info!(listing_id = %listing.id, "Listing created");
        Ok(listing)
    }

    /// Validate and overwrite a listing the user owns.
    ///
    /// New images replace the existing set; with none, the existing images
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound`, `ListingError::Forbidden`,
    /// `ListingError::Validation`, or the failure that stopped the operation.
    #[instrument(skip(self, form, images), fields(user_id = %owner, listing_id = %id, images = images.len()))]
    pub async fn update_listing(
        &self,
        owner: UserId,
        id: ListingId,
        form: &ListingForm,
        images: Vec<ImageUpload>,
    ) -> Result<Listing, ListingError> {
        let existing = self.get_owned(owner, id).await?;
        let draft = form.validate(images.len(), !existing.img_urls.is_empty())?;
        let geolocation = self.resolve_position(&draft).await?;

        let uploaded = if images.is_empty() {
            None
        } else {
            Some(self.images.upload_all(owner, images).await?)
        };
        let swap = ImageSwap::new(&existing.img_urls, uploaded);

        let new = draft.into_new_listing(owner, geolocation, swap.stored.clone());
        let listing = match self.listings.update(id, &new).await {
            Ok(listing) => listing,
            Err(e) => {
                self.images.delete_all(swap.on_failure()).await;
                return Err(match e {
                    RepositoryError::NotFound => ListingError::NotFound,
                    other => other.into(),
                });
            }
        };

        self.images.delete_all(swap.on_success()).await;

        self.home_cache.invalidate_all();
        tracing::info!(listing_id = %listing.id, "Listing updated");
        Ok(listing)
    }

    /// Delete a listing the user owns and remove its images.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound` or `ListingError::Forbidden`.
    #[instrument(skip(self), fields(user_id = %owner, listing_id = %id))]
    pub async fn delete_listing(&self, owner: UserId, id: ListingId) -> Result<(), ListingError> {
        self.get_owned(owner, id).await?;

        let img_urls = self.listings.delete(id, owner).await.map_err(|e| match e {
            RepositoryError::NotFound => ListingError::NotFound,
            other => other.into(),
        })?;
        self.images.delete_all(&img_urls).await;

        self.home_cache.invalidate_all();
        tracing::info!("Listing deleted");
        Ok(())
    }

    async fn resolve_position(&self, draft: &ListingDraft) -> Result<GeoPoint, ListingError> {
        match (draft.position, self.geocoder) {
            (Position::Manual(point), _) => Ok(point),
            (Position::Geocode, Some(geocoder)) => Ok(geocoder.geocode(&draft.address).await?),
            (Position::Geocode, None) => {
                tracing::debug!("Geocoding requested but not configured");
                Ok(GeoPoint::default())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::listing::fixtures;

    fn valid_form() -> ListingForm {
        ListingForm {
            listing_type: "rent".to_string(),
            name: "Sunny flat in Gueliz".to_string(),
            property_type: "apartment".to_string(),
            bedrooms: "2".to_string(),
            bathrooms: "1".to_string(),
            size: "85".to_string(),
            address: "14 Rue de la Liberté".to_string(),
            region: "Marrakech-Safi".to_string(),
            city: "marrakech".to_string(),
            location: " Gueliz ".to_string(),
            description: "Bright two-bedroom flat".to_string(),
            regular_price: "6500".to_string(),
            discounted_price: String::new(),
            offer: false,
            parking: true,
            furnished: false,
            amenities: vec!["dishwasher".to_string(), "Smoke alarm".to_string()],
            geocode: false,
            latitude: "31.63".to_string(),
            longitude: "-8.01".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let draft = valid_form().validate(2, false).unwrap();
        assert_eq!(draft.listing_type, ListingType::Rent);
        assert_eq!(draft.property_type, PropertyType::Apartment);
        assert_eq!(draft.city, "Marrakech");
        assert_eq!(draft.location, "Gueliz");
        assert_eq!(draft.discounted_price, None);
        assert!(draft.amenities.contains(&Amenity::Dishwasher));
        assert!(draft.amenities.contains(&Amenity::SmokeAlarm));
        assert!(matches!(draft.position, Position::Manual(_)));
    }

    #[test]
    fn test_discount_must_be_lower() {
        let mut form = valid_form();
        form.offer = true;
        form.discounted_price = "6500".to_string();
        assert_eq!(
            form.validate(1, false).unwrap_err(),
            ValidationError::DiscountNotLower
        );

        form.discounted_price = "7000".to_string();
        assert_eq!(
            form.validate(1, false).unwrap_err().to_string(),
            "Discounted price needs to be less than regular price"
        );

        form.discounted_price = "6000".to_string();
        let draft = form.validate(1, false).unwrap();
        assert_eq!(draft.discounted_price, Some(Decimal::from(6000)));
    }

    #[test]
    fn test_discount_ignored_without_offer() {
        let mut form = valid_form();
        form.discounted_price = "999999".to_string();
        assert_eq!(form.validate(1, false).unwrap().discounted_price, None);
    }

    #[test]
    fn test_image_count_bounds() {
        let form = valid_form();
        assert_eq!(form.validate(0, false).unwrap_err(), ValidationError::NoImages);
        assert_eq!(
            form.validate(7, false).unwrap_err().to_string(),
            "You can only upload up to 6 images."
        );
        assert!(form.validate(6, false).is_ok());
        assert!(form.validate(0, true).is_ok());
    }

    #[test]
    fn test_name_length() {
        let mut form = valid_form();
        form.name = "Too short".to_string();
        assert_eq!(form.validate(1, false).unwrap_err(), ValidationError::NameLength);
        form.name = "x".repeat(33);
        assert_eq!(form.validate(1, false).unwrap_err(), ValidationError::NameLength);
        form.name = "x".repeat(32);
        assert!(form.validate(1, false).is_ok());
    }

    #[test]
    fn test_room_and_price_ranges() {
        let mut form = valid_form();
        form.bedrooms = "0".to_string();
        assert!(matches!(
            form.validate(1, false),
            Err(ValidationError::OutOfRange { field: "Bedrooms", .. })
        ));

        let mut form = valid_form();
        form.bathrooms = "two".to_string();
        assert_eq!(
            form.validate(1, false).unwrap_err(),
            ValidationError::NotANumber("Bathrooms")
        );

        let mut form = valid_form();
        form.regular_price = "49".to_string();
        assert!(matches!(
            form.validate(1, false),
            Err(ValidationError::OutOfRange { field: "Regular price", .. })
        ));
    }

    #[test]
    fn test_region_and_city() {
        let mut form = valid_form();
        form.region = "Atlantis".to_string();
        assert!(matches!(
            form.validate(1, false),
            Err(ValidationError::UnknownRegion(_))
        ));

        let mut form = valid_form();
        form.city = "Tanger".to_string();
        assert!(matches!(
            form.validate(1, false),
            Err(ValidationError::CityNotInRegion { .. })
        ));
    }

    #[test]
    fn test_bad_vocabulary() {
        let mut form = valid_form();
        form.listing_type = "lease".to_string();
        assert!(matches!(form.validate(1, false), Err(ValidationError::Choice(_))));

        let mut form = valid_form();
        form.amenities.push("jacuzzi".to_string());
        assert!(matches!(form.validate(1, false), Err(ValidationError::Choice(_))));
    }

    #[test]
    fn test_coordinates() {
        let mut form = valid_form();
        form.latitude = "91".to_string();
        assert_eq!(form.validate(1, false).unwrap_err(), ValidationError::Coordinates);

        form.geocode = true;
        assert_eq!(form.validate(1, false).unwrap().position, Position::Geocode);
    }

    #[test]
    fn test_set_field() {
        let mut form = ListingForm::blank();
        form.set_field("type", "sale".to_string());
        form.set_field("offer", "true".to_string());
        form.set_field("parking", "false".to_string());
        form.set_field("amenities", "iron".to_string());
        form.set_field("amenities", "hangers".to_string());
        form.set_field("unknown", "x".to_string());

        assert_eq!(form.listing_type, "sale");
        assert!(form.offer);
        assert!(!form.parking);
        assert_eq!(form.amenities, vec!["iron", "hangers"]);
        assert!(form.has_amenity(&Amenity::Iron));
        assert!(!form.has_amenity(&Amenity::Microwave));
    }

    #[test]
    fn test_from_listing_roundtrips_through_validate() {
        let mut listing = fixtures::listing(3);
        listing.offer = true;
        listing.discounted_price = Some(Decimal::from(4500));
        listing.amenities.insert(Amenity::CoffeeMaker);

        let form = ListingForm::from_listing(&listing);
        assert_eq!(form.regular_price, "5000");
        assert_eq!(form.discounted_price, "4500");

        let draft = form.validate(0, true).unwrap();
        assert_eq!(draft.name, listing.name);
        assert_eq!(draft.discounted_price, Some(Decimal::from(4500)));
        assert!(draft.amenities.contains(&Amenity::CoffeeMaker));
    }

    #[test]
    fn test_geocode_no_results_is_bad_address() {
        let err = ListingError::from(GeocodeError::NoResults);
        assert_eq!(
            err.form_message().as_deref(),
            Some("please enter a correct address")
        );
    }

    #[test]
    fn test_form_message_hides_internal_errors() {
        assert!(ListingError::NotFound.form_message().is_none());
        assert!(
            ListingError::Repository(RepositoryError::NotFound)
                .form_message()
                .is_none()
        );
        assert!(
            ListingError::Image(ImageError::TooLarge("a.png".to_string()))
                .form_message()
                .is_some()
        );
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("/uploads/{n}")).collect()
    }

    #[test]
    fn test_edit_without_uploads_keeps_images() {
        let existing = urls(&["1-a.png", "1-b.png"]);
        let swap = ImageSwap::new(&existing, None);

        assert_eq!(swap.stored, existing);
        assert!(swap.on_failure().is_empty());
        assert!(swap.on_success().is_empty());
    }

    #[test]
    fn test_edit_with_uploads_replaces_images() {
        let existing = urls(&["1-a.png", "1-b.png"]);
        let fresh = urls(&["1-c.png"]);
        let swap = ImageSwap::new(&existing, Some(fresh.clone()));

        assert_eq!(swap.stored, fresh);
        // a failed write must not leave the new files behind
        assert_eq!(swap.on_failure(), fresh.as_slice());
        // a saved row orphans the old files
        assert_eq!(swap.on_success(), existing.as_slice());
    }
}
