//! Listing vocabularies: listing type, property type and amenities.
//!
//! Each value has a stable slug used in URLs, forms and the database, and a
//! human label used in templates.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a slug does not name a known value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseVocabularyError {
    /// Which vocabulary was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseVocabularyError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// =============================================================================
// Listing type
// =============================================================================

/// Whether a property is offered for rent or for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "dar.listing_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    #[default]
    Rent,
    Sale,
}

impl ListingType {
    /// All listing types in display order.
    pub const ALL: [Self; 2] = [Self::Rent, Self::Sale];

    /// URL/database slug.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Sale => "sale",
        }
    }

    /// Label used on badges ("For Rent").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rent => "Rent",
            Self::Sale => "Sale",
        }
    }

    /// Suffix shown after a price, rent is quoted monthly.
    #[must_use]
    pub const fn price_suffix(self) -> &'static str {
        match self {
            Self::Rent => " / month",
            Self::Sale => "",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ListingType {
    type Err = ParseVocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rent" => Ok(Self::Rent),
            "sale" | "sell" => Ok(Self::Sale),
            _ => Err(ParseVocabularyError::new("listing type", s)),
        }
    }
}

// =============================================================================
// Property type
// =============================================================================

/// Kind of building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "dar.property_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    House,
    Apartment,
    Condo,
}

impl PropertyType {
    /// All property types in display order.
    pub const ALL: [Self; 3] = [Self::House, Self::Apartment, Self::Condo];

    /// URL/database slug.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Apartment => "apartment",
            Self::Condo => "condo",
        }
    }

    /// Human label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::House => "House",
            Self::Apartment => "Apartment",
            Self::Condo => "Condo",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PropertyType {
    type Err = ParseVocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "house" => Ok(Self::House),
            "apartment" => Ok(Self::Apartment),
            "condo" => Ok(Self::Condo),
            _ => Err(ParseVocabularyError::new("property type", s)),
        }
    }
}

// =============================================================================
// Amenities
// =============================================================================

/// An amenity a listing can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Amenity {
    BedLinens,
    CarbonAlarm,
    CheckInLockbox,
    CoffeeMaker,
    Dishwasher,
    ExtraPillows,
    FirstAidKit,
    Hangers,
    Iron,
    Microwave,
    Refrigerator,
    SecurityCameras,
    SmokeAlarm,
    TvStandardCable,
}

impl Amenity {
    /// All amenities in the order the search form lists them.
    pub const ALL: [Self; 14] = [
        Self::BedLinens,
        Self::CarbonAlarm,
        Self::CheckInLockbox,
        Self::CoffeeMaker,
        Self::Dishwasher,
        Self::ExtraPillows,
        Self::FirstAidKit,
        Self::Hangers,
        Self::Iron,
        Self::Microwave,
        Self::Refrigerator,
        Self::SecurityCameras,
        Self::SmokeAlarm,
        Self::TvStandardCable,
    ];

    /// URL/database slug.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::BedLinens => "bed-linens",
            Self::CarbonAlarm => "carbon-alarm",
            Self::CheckInLockbox => "check-in-lockbox",
            Self::CoffeeMaker => "coffee-maker",
            Self::Dishwasher => "dishwasher",
            Self::ExtraPillows => "extra-pillows",
            Self::FirstAidKit => "first-aid-kit",
            Self::Hangers => "hangers",
            Self::Iron => "iron",
            Self::Microwave => "microwave",
            Self::Refrigerator => "refrigerator",
            Self::SecurityCameras => "security-cameras",
            Self::SmokeAlarm => "smoke-alarm",
            Self::TvStandardCable => "tv-standard-cable",
        }
    }

    /// Human label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BedLinens => "Bed Linens",
            Self::CarbonAlarm => "Carbon Alarm",
            Self::CheckInLockbox => "Check-in Lockbox",
            Self::CoffeeMaker => "Coffee Maker",
            Self::Dishwasher => "Dishwasher",
            Self::ExtraPillows => "Extra Pillows",
            Self::FirstAidKit => "First Aid Kit",
            Self::Hangers => "Hangers",
            Self::Iron => "Iron",
            Self::Microwave => "Microwave",
            Self::Refrigerator => "Refrigerator",
            Self::SecurityCameras => "Security Cameras",
            Self::SmokeAlarm => "Smoke alarm",
            Self::TvStandardCable => "TV Standard Cable",
        }
    }
}

impl fmt::Display for Amenity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Amenity {
    type Err = ParseVocabularyError;

    /// Accepts either the slug or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.slug().eq_ignore_ascii_case(needle) || a.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseVocabularyError::new("amenity", s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_type_parse() {
        assert_eq!("rent".parse::<ListingType>().unwrap(), ListingType::Rent);
        assert_eq!("SALE".parse::<ListingType>().unwrap(), ListingType::Sale);
        assert_eq!("sell".parse::<ListingType>().unwrap(), ListingType::Sale);
        assert!("lease".parse::<ListingType>().is_err());
    }

    #[test]
    fn test_price_suffix() {
        assert_eq!(ListingType::Rent.price_suffix(), " / month");
        assert_eq!(ListingType::Sale.price_suffix(), "");
    }

    #[test]
    fn test_property_type_parse_label() {
        assert_eq!(
            "Apartment".parse::<PropertyType>().unwrap(),
            PropertyType::Apartment
        );
        assert!("All".parse::<PropertyType>().is_err());
    }

    #[test]
    fn test_amenity_parse_slug_and_label() {
        assert_eq!(
            "check-in-lockbox".parse::<Amenity>().unwrap(),
            Amenity::CheckInLockbox
        );
        assert_eq!(
            "TV Standard Cable".parse::<Amenity>().unwrap(),
            Amenity::TvStandardCable
        );
        assert_eq!("smoke alarm".parse::<Amenity>().unwrap(), Amenity::SmokeAlarm);
        assert!("Jacuzzi".parse::<Amenity>().is_err());
    }

    #[test]
    fn test_amenity_slugs_unique() {
        let mut slugs: Vec<_> = Amenity::ALL.iter().map(|a| a.slug()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), Amenity::ALL.len());
    }
}
