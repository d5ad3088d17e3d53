//! Listing search and the home page sections.
//!
//! Search runs in two stages. The database evaluates what it can index
//! (type, offer, region, city, property type) and returns one keyset page;
//! [`ListingQuery::refine`] then applies the remaining criteria to that
//! page in memory and sorts it. The "load more" cursor always points at the
//! last row the database returned, so refinement never skips rows.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use dar_core::{Amenity, ListingId, ListingType, PropertyType};

use crate::db::{ListingRepository, RepositoryError, StoreFilter};
use crate::models::Listing;

/// Listings per page.
pub const PAGE_SIZE: u32 = 6;

/// Listings per home page section.
pub const HOME_SECTION_SIZE: u32 = 4;

const HOME_CACHE_TTL: Duration = Duration::from_secs(60);
const HOME_CACHE_KEY: &str = "home";

// =============================================================================
// Query Parameters
// =============================================================================

/// Search parameters exactly as they appear in the query string.
#[derive(Debug, Clone, Default)]
pub struct BrowseParams {
    pub listing_type: Option<String>,
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub rooms: Option<String>,
    pub baths: Option<String>,
    /// Comma separated amenity labels or slugs.
    pub amenities: Option<String>,
    pub sort: Option<String>,
    pub cursor: Option<String>,
}

impl BrowseParams {
    /// Read parameters from a raw query string.
    ///
    /// Repeated `amenities` keys (one per checked box) are joined with
    /// commas; for every other key the last value wins. Unknown keys are
    /// ignored.
    #[must_use]
    pub fn from_query(raw: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = value.into_owned();
            let slot = match key.as_ref() {
                "type" => &mut params.listing_type,
                "keyword" => &mut params.keyword,
                "location" => &mut params.location,
                "region" => &mut params.region,
                "city" => &mut params.city,
                "propertyType" => &mut params.property_type,
                "minPrice" => &mut params.min_price,
                "maxPrice" => &mut params.max_price,
                "minSize" => &mut params.min_size,
                "maxSize" => &mut params.max_size,
                "rooms" => &mut params.rooms,
                "baths" => &mut params.baths,
                "sort" => &mut params.sort,
                "cursor" => &mut params.cursor,
                "amenities" => {
                    match &mut params.amenities {
                        Some(joined) if !value.is_empty() => {
                            joined.push(',');
                            joined.push_str(&value);
                        }
                        Some(_) => {}
                        None => params.amenities = Some(value),
                    }
                    continue;
                }
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }
}

/// Bedroom or bathroom constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountFilter {
    Exactly(i32),
    AtLeast(i32),
}

impl CountFilter {
    /// Parse `1`, `2`, `3` or `4+`; sentinels and garbage mean "any".
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(n) = raw.strip_suffix('+') {
            return n.trim().parse().ok().map(Self::AtLeast);
        }
        raw.parse().ok().map(Self::Exactly)
    }

    const fn matches(self, n: i32) -> bool {
        match self {
            Self::Exactly(want) => n == want,
            Self::AtLeast(min) => n >= min,
        }
    }

    /// Query string form.
    #[must_use]
    pub fn as_param(self) -> String {
        match self {
            Self::Exactly(n) => n.to_string(),
            Self::AtLeast(n) => format!("{n}+"),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Store order: newest first.
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortOrder {
    /// All orders, as offered by the sort dropdown.
    pub const ALL: [Self; 4] = [Self::Default, Self::PriceAsc, Self::PriceDesc, Self::Newest];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Newest => "newest",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Default => "Sort by (Default)",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::Newest => "Newest First",
        }
    }

    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.slug() == raw || s.label().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

/// Parsed search criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub listing_type: Option<ListingType>,
    pub offer_only: bool,
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_size: Option<i32>,
    pub max_size: Option<i32>,
    pub rooms: Option<CountFilter>,
    pub baths: Option<CountFilter>,
    /// Every one must be present.
    pub amenities: BTreeSet<Amenity>,
    pub sort: SortOrder,
    pub cursor: Option<Cursor>,
}

/// Trimmed value, or `None` for blanks and "any" sentinels.
fn meaningful(raw: Option<&String>) -> Option<String> {
    let value = raw?.trim();
    let is_sentinel = value.is_empty()
        || ["all", "all regions", "all cities", "any", "rooms", "baths: any"]
            .iter()
            .any(|s| value.eq_ignore_ascii_case(s));
    (!is_sentinel).then(|| value.to_string())
}

impl ListingQuery {
    /// Interpret query string parameters. Unparseable values are ignored.
    #[must_use]
    pub fn from_params(params: &BrowseParams) -> Self {
        let amenities = params
            .amenities
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<Amenity>() {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring amenity filter");
                    None
                }
            })
            .collect();

        Self {
            listing_type: meaningful(params.listing_type.as_ref())
                .and_then(|t| ListingType::from_str(&t).ok()),
            offer_only: false,
            keyword: meaningful(params.keyword.as_ref()),
            location: meaningful(params.location.as_ref()),
            region: meaningful(params.region.as_ref()),
            city: meaningful(params.city.as_ref()),
            property_type: meaningful(params.property_type.as_ref())
                .and_then(|t| PropertyType::from_str(&t).ok()),
            min_price: meaningful(params.min_price.as_ref())
                .and_then(|p| Decimal::from_str(&p).ok()),
            max_price: meaningful(params.max_price.as_ref())
                .and_then(|p| Decimal::from_str(&p).ok()),
            min_size: meaningful(params.min_size.as_ref()).and_then(|s| s.parse().ok()),
            max_size: meaningful(params.max_size.as_ref()).and_then(|s| s.parse().ok()),
            rooms: meaningful(params.rooms.as_ref()).and_then(|r| CountFilter::parse(&r)),
            baths: meaningful(params.baths.as_ref()).and_then(|b| CountFilter::parse(&b)),
            amenities,
            sort: params
                .sort
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
            cursor: params.cursor.as_deref().and_then(Cursor::decode),
        }
    }

    /// The part of the query the database evaluates.
    #[must_use]
    pub fn store_filter(&self) -> StoreFilter {
        StoreFilter {
            listing_type: self.listing_type,
            offer_only: self.offer_only,
            region: self.region.clone(),
            city: self.city.clone(),
            property_type: self.property_type,
            owner: None,
        }
    }

    /// Whether a listing satisfies the criteria evaluated in memory.
    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        let price = listing.effective_price();
        if self.min_price.is_some_and(|min| price < min)
            || self.max_price.is_some_and(|max| price > max)
        {
            return false;
        }
        if self.min_size.is_some_and(|min| listing.size < min)
            || self.max_size.is_some_and(|max| listing.size > max)
        {
            return false;
        }
        if self.rooms.is_some_and(|r| !r.matches(listing.bedrooms))
            || self.baths.is_some_and(|b| !b.matches(listing.bathrooms))
        {
            return false;
        }
        if !self.amenities.is_subset(&listing.amenities) {
            return false;
        }
        if let Some(keyword) = &self.keyword
            && !contains_any(
                keyword,
                &[&listing.name, &listing.description, &listing.address],
            )
        {
            return false;
        }
        if let Some(location) = &self.location
            && !contains_any(
                location,
                &[
                    &listing.address,
                    &listing.location,
                    &listing.city,
                    &listing.region,
                ],
            )
        {
            return false;
        }
        true
    }

    /// Filter a fetched page in memory, then sort it.
    #[must_use]
    pub fn refine(&self, listings: Vec<Listing>) -> Vec<Listing> {
        let mut kept: Vec<Listing> = listings.into_iter().filter(|l| self.matches(l)).collect();

        match self.sort {
            SortOrder::Default => {}
            SortOrder::PriceAsc => kept.sort_by_key(Listing::effective_price),
            SortOrder::PriceDesc => {
                kept.sort_by(|a, b| b.effective_price().cmp(&a.effective_price()));
            }
            SortOrder::Newest => {
                kept.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            }
        }

        kept
    }

    /// Query string reproducing these criteria with a different cursor.
    ///
    /// The listing type and offer flag are left out; they come from the
    /// path on category and offer pages.
    #[must_use]
    pub fn to_query_string(&self, cursor: Option<&Cursor>, include_type: bool) -> String {
        let mut qs = url::form_urlencoded::Serializer::new(String::new());
        if include_type && let Some(t) = self.listing_type {
            qs.append_pair("type", t.slug());
        }
        let text = [
            ("keyword", &self.keyword),
            ("location", &self.location),
            ("region", &self.region),
            ("city", &self.city),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                qs.append_pair(key, value);
            }
        }
        if let Some(p) = self.property_type {
            qs.append_pair("propertyType", p.slug());
        }
        for (key, value) in [("minPrice", self.min_price), ("maxPrice", self.max_price)] {
            if let Some(value) = value {
                qs.append_pair(key, &value.to_string());
            }
        }
        for (key, value) in [("minSize", self.min_size), ("maxSize", self.max_size)] {
            if let Some(value) = value {
                qs.append_pair(key, &value.to_string());
            }
        }
        if let Some(r) = self.rooms {
            qs.append_pair("rooms", &r.as_param());
        }
        if let Some(b) = self.baths {
            qs.append_pair("baths", &b.as_param());
        }
        if !self.amenities.is_empty() {
            let slugs: Vec<&str> = self.amenities.iter().map(|a| a.slug()).collect();
            qs.append_pair("amenities", &slugs.join(","));
        }
        if self.sort != SortOrder::Default {
            qs.append_pair("sort", self.sort.slug());
        }
        if let Some(cursor) = cursor {
            qs.append_pair("cursor", &cursor.encode());
        }
        qs.finish()
    }

    /// Whether an amenity is required; used to pre-check search boxes.
    #[must_use]
    pub fn requires_amenity(&self, amenity: &Amenity) -> bool {
        self.amenities.contains(amenity)
    }
}

fn contains_any(needle: &str, haystacks: &[&String]) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

// =============================================================================
// Cursor
// =============================================================================

/// Opaque "load more" position: the last row of the previous page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: ListingId,
}

impl Cursor {
    /// URL-safe token.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.created_at.timestamp_micros(), self.id))
    }

    /// Decode a token; anything malformed yields `None`.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        let (micros, id) = text.split_once(':')?;
        Some(Self {
            created_at: DateTime::from_timestamp_micros(micros.parse().ok()?)?,
            id: id.parse().ok()?,
        })
    }

    const fn key(self) -> (DateTime<Utc>, ListingId) {
        (self.created_at, self.id)
    }
}

impl From<(DateTime<Utc>, ListingId)> for Cursor {
    fn from((created_at, id): (DateTime<Utc>, ListingId)) -> Self {
        Self { created_at, id }
    }
}

// =============================================================================
// Operations
// =============================================================================

/// One page of refined search results.
#[derive(Debug, Clone, Default)]
pub struct BrowsePage {
    pub listings: Vec<Listing>,
    /// Present when more rows follow in store order.
    pub next_cursor: Option<Cursor>,
}

/// Run a search: one store page, refined in memory.
///
/// # Errors
///
/// Returns `RepositoryError` if the store query fails.
#[instrument(skip(pool, query), fields(sort = query.sort.slug()))]
pub async fn browse(pool: &PgPool, query: &ListingQuery) -> Result<BrowsePage, RepositoryError> {
    let page = ListingRepository::new(pool)
        .search(&query.store_filter(), query.cursor.map(Cursor::key), PAGE_SIZE)
        .await?;

    let next_cursor = if page.has_more {
        page.last_key().map(Cursor::from)
    } else {
        None
    };
    let fetched = page.listings.len();
    let listings = query.refine(page.listings);

    tracing::debug!(fetched, kept = listings.len(), "Listing page refined");
    Ok(BrowsePage {
        listings,
        next_cursor,
    })
}

/// The three home page sections.
#[derive(Debug, Clone, Default)]
pub struct HomeSections {
    pub offers: Vec<Listing>,
    pub rent: Vec<Listing>,
    pub sale: Vec<Listing>,
}

/// Cached home page sections, dropped whenever a listing changes.
///
/// A generation counter is bumped on every invalidation so that sections
/// read before a mutation are never stored after it.
pub struct HomeCache {
    sections: Cache<&'static str, Arc<HomeSections>>,
    generation: AtomicU64,
}

impl Default for HomeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeCache {
    /// Build an empty home cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sections: Cache::builder()
                .max_capacity(1)
                .time_to_live(HOME_CACHE_TTL)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    /// Drop the cached sections after a listing mutation.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.sections.invalidate_all();
    }

    /// Current generation, taken before reading the store.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn get(&self) -> Option<Arc<HomeSections>> {
        self.sections.get(HOME_CACHE_KEY).await
    }

    /// Store sections read at `generation`, unless a listing changed since.
    ///
    /// Returns whether the sections stayed cached.
    pub async fn insert_if_current(&self, generation: u64, sections: Arc<HomeSections>) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.sections.insert(HOME_CACHE_KEY, sections).await;

        // an invalidation may have landed while inserting
        if self.generation() != generation {
            self.sections.invalidate(HOME_CACHE_KEY).await;
            return false;
        }
        true
    }
}

/// Newest offers, rentals and sales, served from cache when fresh.
///
/// # Errors
///
/// Returns `RepositoryError` if a store query fails.
pub async fn home_sections(
    pool: &PgPool,
    cache: &HomeCache,
) -> Result<Arc<HomeSections>, RepositoryError> {
    if let Some(cached) = cache.get().await {
        return Ok(cached);
    }
    let generation = cache.generation();

    let repo = ListingRepository::new(pool);
    let section = |filter: StoreFilter| {
        let repo = &repo;
        async move {
            repo.search(&filter, None, HOME_SECTION_SIZE)
                .await
                .map(|page| page.listings)
        }
    };

    let sections = Arc::new(HomeSections {
        offers: section(StoreFilter {
            offer_only: true,
            ..StoreFilter::default()
        })
        .await?,
        rent: section(StoreFilter {
            listing_type: Some(ListingType::Rent),
            ..StoreFilter::default()
        })
        .await?,
        sale: section(StoreFilter {
            listing_type: Some(ListingType::Sale),
            ..StoreFilter::default()
        })
        .await?,
    });

    if !cache.insert_if_current(generation, Arc::clone(&sections)).await {
        tracing::debug!("Listings changed while loading home sections, not caching");
    }
    Ok(sections)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::listing::fixtures::listing;

    fn params(pairs: &[(&str, &str)]) -> BrowseParams {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        BrowseParams::from_query(&qs)
    }

    #[test]
    fn test_repeated_amenities_are_joined() {
        let p = BrowseParams::from_query(
            "amenities=iron&amenities=&amenities=tv-standard-cable&sort=newest&bogus=1",
        );
        assert_eq!(p.amenities.as_deref(), Some("iron,tv-standard-cable"));
        assert_eq!(p.sort.as_deref(), Some("newest"));
        assert_eq!(p.keyword, None);
    }

    #[test]
    fn test_sentinels_mean_no_constraint() {
        let q = ListingQuery::from_params(&params(&[
            ("type", "rent"),
            ("region", "All Regions"),
            ("propertyType", "All"),
            ("rooms", "Rooms"),
            ("baths", "Baths: Any"),
            ("keyword", "  "),
        ]));
        assert_eq!(q.listing_type, Some(ListingType::Rent));
        assert_eq!(q.region, None);
        assert_eq!(q.property_type, None);
        assert_eq!(q.rooms, None);
        assert_eq!(q.baths, None);
        assert_eq!(q.keyword, None);
    }

    #[test]
    fn test_parse_full_query() {
        let q = ListingQuery::from_params(&params(&[
            ("type", "sale"),
            ("propertyType", "Apartment"),
            ("minPrice", "1000"),
            ("maxPrice", "30000"),
            ("minSize", "50"),
            ("rooms", "4+"),
            ("baths", "2"),
            ("amenities", "Smoke alarm,Iron,jacuzzi"),
            ("sort", "Price: High to Low"),
        ]));
        assert_eq!(q.listing_type, Some(ListingType::Sale));
        assert_eq!(q.property_type, Some(PropertyType::Apartment));
        assert_eq!(q.min_price, Some(Decimal::from(1000)));
        assert_eq!(q.max_price, Some(Decimal::from(30000)));
        assert_eq!(q.min_size, Some(50));
        assert_eq!(q.max_size, None);
        assert_eq!(q.rooms, Some(CountFilter::AtLeast(4)));
        assert_eq!(q.baths, Some(CountFilter::Exactly(2)));
        assert_eq!(
            q.amenities,
            BTreeSet::from([Amenity::SmokeAlarm, Amenity::Iron])
        );
        assert_eq!(q.sort, SortOrder::PriceDesc);
    }

    #[test]
    fn test_refine_keeps_only_full_matches() {
        let mut cheap = listing(1);
        cheap.regular_price = Decimal::from(3000);
        cheap.bedrooms = 4;
        cheap.amenities.insert(Amenity::Iron);

        let mut pricey = listing(2);
        pricey.regular_price = Decimal::from(9000);
        pricey.bedrooms = 5;
        pricey.amenities.insert(Amenity::Iron);

        let mut no_iron = listing(3);
        no_iron.regular_price = Decimal::from(3500);
        no_iron.bedrooms = 4;

        let q = ListingQuery {
            max_price: Some(Decimal::from(5000)),
            rooms: Some(CountFilter::AtLeast(4)),
            amenities: BTreeSet::from([Amenity::Iron]),
            ..ListingQuery::default()
        };

        let kept = q.refine(vec![cheap, pricey, no_iron]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, ListingId::new(1));
    }

    #[test]
    fn test_refine_price_uses_effective_price() {
        let mut offer = listing(1);
        offer.regular_price = Decimal::from(8000);
        offer.offer = true;
        offer.discounted_price = Some(Decimal::from(4000));

        let q = ListingQuery {
            max_price: Some(Decimal::from(5000)),
            ..ListingQuery::default()
        };
        assert_eq!(q.refine(vec![offer]).len(), 1);
    }

    #[test]
    fn test_keyword_and_location_are_case_insensitive() {
        let l = listing(1);
        let q = ListingQuery {
            keyword: Some("RIAD".to_string()),
            location: Some("marrakech".to_string()),
            ..ListingQuery::default()
        };
        assert!(q.matches(&l));

        let q = ListingQuery {
            location: Some("Agadir".to_string()),
            ..ListingQuery::default()
        };
        assert!(!q.matches(&l));
    }

    #[test]
    fn test_price_sort_is_stable() {
        let mut a = listing(1);
        a.regular_price = Decimal::from(5000);
        let mut b = listing(2);
        b.regular_price = Decimal::from(3000);
        let mut c = listing(3);
        c.regular_price = Decimal::from(5000);

        let asc = ListingQuery {
            sort: SortOrder::PriceAsc,
            ..ListingQuery::default()
        }
        .refine(vec![a.clone(), b.clone(), c.clone()]);
        let ids: Vec<i32> = asc.iter().map(|l| l.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        let desc = ListingQuery {
            sort: SortOrder::PriceDesc,
            ..ListingQuery::default()
        }
        .refine(vec![a, b, c]);
        let ids: Vec<i32> = desc.iter().map(|l| l.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_newest_sort() {
        let kept = ListingQuery {
            sort: SortOrder::Newest,
            ..ListingQuery::default()
        }
        .refine(vec![listing(1), listing(3), listing(2)]);
        let ids: Vec<i32> = kept.iter().map(|l| l.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_cursor_roundtrip() {
        let l = listing(7);
        let cursor = Cursor::from((l.created_at, l.id));
        let token = cursor.encode();
        assert!(!token.contains('='));
        assert_eq!(Cursor::decode(&token), Some(cursor));
    }

    #[test]
    fn test_malformed_cursor_is_first_page() {
        assert_eq!(Cursor::decode(""), None);
        assert_eq!(Cursor::decode("!!!"), None);
        assert_eq!(Cursor::decode(&URL_SAFE_NO_PAD.encode("nope")), None);
        assert_eq!(Cursor::decode(&URL_SAFE_NO_PAD.encode("12:abc")), None);

        let q = ListingQuery::from_params(&params(&[("cursor", "garbage")]));
        assert_eq!(q.cursor, None);
    }

    #[test]
    fn test_query_string_preserves_filters() {
        let q = ListingQuery::from_params(&params(&[
            ("type", "rent"),
            ("city", "Fès"),
            ("rooms", "4+"),
            ("amenities", "Iron"),
            ("sort", "newest"),
        ]));
        let l = listing(1);
        let cursor = Cursor::from((l.created_at, l.id));

        let qs = q.to_query_string(Some(&cursor), true);
        let reparsed = ListingQuery::from_params(&BrowseParams::from_query(&qs));
        assert_eq!(reparsed.listing_type, Some(ListingType::Rent));
        assert_eq!(reparsed.city.as_deref(), Some("Fès"));
        assert_eq!(reparsed.rooms, Some(CountFilter::AtLeast(4)));
        assert_eq!(reparsed.sort, SortOrder::Newest);
        assert_eq!(reparsed.cursor, Some(cursor));

        assert!(!q.to_query_string(None, false).contains("type="));
    }

    fn sections_with(id: i32) -> Arc<HomeSections> {
        Arc::new(HomeSections {
            offers: vec![listing(id)],
            ..HomeSections::default()
        })
    }

    #[tokio::test]
    async fn test_home_cache_serves_current_generation() {
        let cache = HomeCache::new();
        let generation = cache.generation();

        assert!(cache.insert_if_current(generation, sections_with(1)).await);
        let cached = cache.get().await.unwrap();
        assert_eq!(cached.offers.len(), 1);

        cache.invalidate_all();
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_home_cache_drops_sections_read_before_a_mutation() {
        let cache = HomeCache::new();
        let before = cache.generation();

        // a listing is saved while the home page is still loading
        cache.invalidate_all();

        assert!(!cache.insert_if_current(before, sections_with(1)).await);
        assert!(cache.get().await.is_none());

        assert!(cache.insert_if_current(cache.generation(), sections_with(2)).await);
        assert!(cache.get().await.is_some());
    }
}
