//! Seed the database with listings from a YAML file.
//!
//! Each entry names its owner by email (the user must already exist) and
//! points at images that are already hosted. Entries go through the same
//! validation as the listing form.
//!
//! ```yaml
//! - owner: amina@example.com
//!   type: rent
//!   name: Sunny flat in Gueliz
//!   property_type: apartment
//!   bedrooms: 2
//!   bathrooms: 1
//!   size: 85
//!   address: 12 Rue de la Liberte
//!   region: Marrakech-Safi
//!   city: Marrakech
//!   description: Bright two bedroom flat close to the tram.
//!   regular_price: 6500
//!   amenities: [dishwasher, coffee-maker]
//!   latitude: 31.6340
//!   longitude: -8.0100
//!   images:
//!     - https://images.example.com/gueliz-1.jpg
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use dar_core::Email;
use dar_web::db::{ListingRepository, UserRepository};
use dar_web::services::{ListingForm, Position};

/// One listing entry of the seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedListing {
    pub owner: String,
    #[serde(rename = "type")]
    pub listing_type: String,
    pub name: String,
    pub property_type: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub size: i32,
    pub address: String,
    pub region: String,
    pub city: String,
    #[serde(default)]
    pub location: String,
    pub description: String,
    pub regular_price: u64,
    #[serde(default)]
    pub discounted_price: Option<u64>,
    #[serde(default)]
    pub offer: bool,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub images: Vec<String>,
}

impl SeedListing {
    /// The entry as if it had been typed into the listing form.
    fn to_form(&self) -> ListingForm {
        ListingForm {
            listing_type: self.listing_type.clone(),
            name: self.name.clone(),
            property_type: self.property_type.clone(),
            bedrooms: self.bedrooms.to_string(),
            bathrooms: self.bathrooms.to_string(),
            size: self.size.to_string(),
            address: self.address.clone(),
            region: self.region.clone(),
            city: self.city.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            regular_price: self.regular_price.to_string(),
            discounted_price: self
                .discounted_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            offer: self.offer,
            parking: self.parking,
            furnished: self.furnished,
            amenities: self.amenities.clone(),
            geocode: false,
            latitude: self.latitude.to_string(),
            longitude: self.longitude.to_string(),
        }
    }
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns the YAML error if the document is not a list of listings.
pub fn parse(content: &str) -> Result<Vec<SeedListing>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Insert every valid listing of the file. Invalid entries are reported
/// and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the database
/// is unreachable.
pub async fn listings(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading listings from file");

    // Parse before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let entries = parse(&content)?;
    info!(listings = entries.len(), "Parsed seed file");

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);
    let repo = ListingRepository::new(&pool);

    let mut inserted = 0_usize;
    let mut errors = Vec::new();

    for entry in &entries {
        let owner = match Email::parse(&entry.owner) {
            Ok(email) => users.get_by_email(&email).await?,
            Err(e) => {
                errors.push((entry.name.clone(), e.to_string()));
                continue;
            }
        };
        let Some(owner) = owner else {
            errors.push((entry.name.clone(), format!("no user {}", entry.owner)));
            continue;
        };

        let draft = match entry.to_form().validate(entry.images.len(), false) {
            Ok(draft) => draft,
            Err(e) => {
                errors.push((entry.name.clone(), e.to_string()));
                continue;
            }
        };
        let Position::Manual(point) = draft.position else {
            errors.push((entry.name.clone(), "coordinates are required".to_string()));
            continue;
        };

        let listing = repo
            .create(&draft.into_new_listing(owner.id, point, entry.images.clone()))
            .await?;
        info!(listing_id = %listing.id, name = %listing.name, "Listing inserted");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Listings inserted: {inserted}");

    if !errors.is_empty() {
        error!("  Skipped: {}", errors.len());
        for (name, err) in &errors {
            error!("    - {name}: {err}");
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dar_web::services::ValidationError;

    const SAMPLE: &str = r"
- owner: amina@example.com
  type: sale
  name: Riad near the medina
  property_type: house
  bedrooms: 4
  bathrooms: 3
  size: 240
  address: 5 Derb Sidi Bouloukat
  region: Marrakech-Safi
  city: Marrakech
  description: Restored riad with a patio.
  regular_price: 3200000
  discounted_price: 2900000
  offer: true
  amenities: [dishwasher]
  latitude: 31.6258
  longitude: -7.9891
  images: [https://images.example.com/riad.jpg]
";

    #[test]
    fn test_parse_sample() {
        let entries = parse(SAMPLE).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = entries.first().unwrap();
        assert_eq!(entry.listing_type, "sale");
        assert_eq!(entry.discounted_price, Some(2_900_000));
        assert!(!entry.parking);
        assert!(entry.location.is_empty());
    }

    #[test]
    fn test_form_carries_every_field() {
        let entries = parse(SAMPLE).unwrap();
        let form = entries.first().unwrap().to_form();
        assert_eq!(form.bedrooms, "4");
        assert_eq!(form.regular_price, "3200000");
        assert_eq!(form.discounted_price, "2900000");
        assert_eq!(form.amenities, vec!["dishwasher".to_string()]);
        assert!(!form.geocode);
    }

    #[test]
    fn test_sample_passes_form_validation() {
        let entries = parse(SAMPLE).unwrap();
        let entry = entries.first().unwrap();
        let draft = entry.to_form().validate(entry.images.len(), false).unwrap();
        assert!(matches!(draft.position, Position::Manual(_)));
    }

    #[test]
    fn test_image_count_is_bounded() {
        let none = SAMPLE.replace(
            "images: [https://images.example.com/riad.jpg]",
            "images: []",
        );
        let entry = parse(&none).unwrap().pop().unwrap();
        assert_eq!(
            entry.to_form().validate(entry.images.len(), false),
            Err(ValidationError::NoImages)
        );

        let urls: Vec<String> = (1..=7)
            .map(|n| format!("https://images.example.com/riad-{n}.jpg"))
            .collect();
        let seven = SAMPLE.replace(
            "images: [https://images.example.com/riad.jpg]",
            &format!("images: [{}]", urls.join(", ")),
        );
        let entry = parse(&seven).unwrap().pop().unwrap();
        assert_eq!(entry.images.len(), 7);
        assert_eq!(
            entry.to_form().validate(entry.images.len(), false),
            Err(ValidationError::TooManyImages)
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = SAMPLE.replace("offer: true", "offer: true\n  pool_size: 12");
        assert!(parse(&yaml).is_err());
    }
}
