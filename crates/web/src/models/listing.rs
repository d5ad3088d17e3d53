//! Listing domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dar_core::{Amenity, GeoPoint, ListingId, ListingType, Price, PropertyType, UserId};

/// A property listed for rent or sale.
#[derive(Debug, Clone)]
pub struct Listing {
    pub id: ListingId,
    /// The user who created the listing; the only one allowed to change it.
    pub owner_id: UserId,
    pub name: String,
    pub listing_type: ListingType,
    pub property_type: PropertyType,
    pub bedrooms: i32,
    pub bathrooms: i32,
    /// Floor area in square metres.
    pub size: i32,
    pub address: String,
    pub region: String,
    pub city: String,
    /// Free-text neighbourhood.
    pub location: String,
    pub description: String,
    pub regular_price: Decimal,
    /// Present only when `offer` is set.
    pub discounted_price: Option<Decimal>,
    pub offer: bool,
    pub parking: bool,
    pub furnished: bool,
    pub amenities: BTreeSet<Amenity>,
    /// Image URLs in display order; the first is the cover.
    pub img_urls: Vec<String>,
    pub geolocation: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Discounted price for offers, regular price otherwise.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match (self.offer, self.discounted_price) {
            (true, Some(discounted)) => discounted,
            _ => self.regular_price,
        }
    }

    /// Effective price formatted for display, with the rent suffix.
    #[must_use]
    pub fn price_label(&self) -> String {
        format!(
            "{}{}",
            Price::mad(self.effective_price()),
            self.listing_type.price_suffix()
        )
    }

    /// Regular price formatted for display, used as the struck-through price
    /// on offers.
    #[must_use]
    pub fn regular_price_label(&self) -> String {
        Price::mad(self.regular_price).display()
    }

    /// How much the offer takes off the regular price.
    #[must_use]
    pub fn discount_label(&self) -> Option<String> {
        if !self.offer {
            return None;
        }
        self.discounted_price
            .map(|d| Price::mad(self.regular_price - d).display())
    }

    /// First image, shown on cards.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.img_urls.first().map(String::as_str)
    }

    /// Canonical detail page path.
    #[must_use]
    pub fn detail_path(&self) -> String {
        format!("/category/{}/{}", self.listing_type.slug(), self.id)
    }

    /// Whether `user` may edit or delete this listing.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    #[must_use]
    pub fn beds_label(&self) -> String {
        count_label(self.bedrooms, "Bed")
    }

    #[must_use]
    pub fn baths_label(&self) -> String {
        count_label(self.bathrooms, "Bath")
    }

    /// How long ago the listing was created, e.g. "3 days ago".
    #[must_use]
    pub fn listed_ago(&self) -> String {
        time_ago(self.created_at, Utc::now())
    }
}

fn count_label(n: i32, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Coarse relative time between `then` and `now`.
#[must_use]
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let (n, unit) = match secs {
        0..60 => return "just now".to_string(),
        60..3_600 => (secs / 60, "minute"),
        3_600..86_400 => (secs / 3_600, "hour"),
        86_400..2_592_000 => (secs / 86_400, "day"),
        2_592_000..31_536_000 => (secs / 2_592_000, "month"),
        _ => (secs / 31_536_000, "year"),
    };
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Fields written when creating or updating a listing.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub owner_id: UserId,
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
    pub img_urls: Vec<String>,
    pub geolocation: GeoPoint,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A rent listing with sensible defaults for tests.
    pub fn listing(id: i32) -> Listing {
        let created_at = DateTime::from_timestamp(1_700_000_000 + i64::from(id), 0)
            .unwrap_or_default();
        Listing {
            id: ListingId::new(id),
            owner_id: UserId::new(1),
            name: format!("Riad number {id:02}"),
            listing_type: ListingType::Rent,
            property_type: PropertyType::House,
            bedrooms: 2,
            bathrooms: 1,
            size: 80,
            address: "12 Derb Sidi Ahmed".to_string(),
            region: "Marrakech-Safi".to_string(),
            city: "Marrakech".to_string(),
            location: "Medina".to_string(),
            description: "Quiet riad near the square".to_string(),
            regular_price: Decimal::from(5000),
            discounted_price: None,
            offer: false,
            parking: false,
            furnished: true,
            amenities: BTreeSet::new(),
            img_urls: vec!["/uploads/1-a.jpg".to_string()],
            geolocation: GeoPoint::default(),
            created_at,
            updated_at: created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::listing;
    use super::*;

    #[test]
    fn test_effective_price_uses_discount_only_on_offer() {
        let mut l = listing(1);
        l.discounted_price = Some(Decimal::from(4000));
        assert_eq!(l.effective_price(), Decimal::from(5000));

        l.offer = true;
        assert_eq!(l.effective_price(), Decimal::from(4000));
    }

    #[test]
    fn test_price_label_rent_suffix() {
        let l = listing(1);
        assert_eq!(l.price_label(), "5,000 MAD / month");

        let mut sale = listing(2);
        sale.listing_type = ListingType::Sale;
        sale.regular_price = Decimal::from(1_250_000);
        assert_eq!(sale.price_label(), "1,250,000 MAD");
    }

    #[test]
    fn test_discount_label() {
        let mut l = listing(1);
        assert_eq!(l.discount_label(), None);

        l.offer = true;
        l.discounted_price = Some(Decimal::from(4500));
        assert_eq!(l.discount_label().as_deref(), Some("500 MAD"));
    }

    #[test]
    fn test_detail_path() {
        assert_eq!(listing(7).detail_path(), "/category/rent/7");
    }

    #[test]
    fn test_count_labels() {
        let mut l = listing(1);
        assert_eq!(l.beds_label(), "2 Beds");
        assert_eq!(l.baths_label(), "1 Bath");
        l.bedrooms = 1;
        assert_eq!(l.beds_label(), "1 Bed");
    }

    #[test]
    fn test_time_ago() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let ago = |secs: i64| time_ago(now - chrono::Duration::seconds(secs), now);
        assert_eq!(ago(5), "just now");
        assert_eq!(ago(-30), "just now");
        assert_eq!(ago(60), "1 minute ago");
        assert_eq!(ago(7_200), "2 hours ago");
        assert_eq!(ago(3 * 86_400), "3 days ago");
        assert_eq!(ago(400 * 86_400), "1 year ago");
    }
}
