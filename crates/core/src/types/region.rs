//! Region and city catalog offered by the search form.
//!
//! Several cities appear under more than one region, so a city is always
//! looked up within its region.

/// A region with the cities the marketplace lists under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Region name as displayed.
    pub name: &'static str,
    /// Cities within the region.
    pub cities: &'static [&'static str],
}

const REGIONS: &[Region] = &[
    Region {
        name: "Tanger-Tétouan-Al Hoceïma",
        cities: &["Tanger", "Tétouan", "Al Hoceïma", "Chefchaouen", "Larache"],
    },
    Region {
        name: "L'Oriental",
        cities: &["Oujda", "Nador", "Berkane", "Taourirt", "Jerada"],
    },
    Region {
        name: "Fès-Meknès",
        cities: &["Fès", "Meknès", "Taza", "Ifrane", "Sefrou"],
    },
    Region {
        name: "Rabat-Salé-Kénitra",
        cities: &["Rabat", "Salé", "Kénitra", "Témara", "Skhirate"],
    },
    Region {
        name: "Béni Mellal-Khénifra",
        cities: &["Béni Mellal", "Khouribga", "Khénifra", "Azilal"],
    },
    Region {
        name: "Casablanca-Settat",
        cities: &["Casablanca", "Settat", "Mohammedia", "El Jadida", "Berrechid"],
    },
    Region {
        name: "Marrakech-Safi",
        cities: &["Marrakech", "Safi", "Essaouira", "El Kelaa des Sraghna", "Youssoufia"],
    },
    Region {
        name: "Drâa-Tafilalet",
        cities: &["Errachidia", "Ouarzazate", "Tinghir", "Zagora", "Midelt"],
    },
    Region {
        name: "Souss-Massa",
        cities: &["Agadir", "Taroudant", "Tiznit", "Inezgane", "Chtouka Aït Baha"],
    },
    Region {
        name: "Guelmim-Oued Noun",
        cities: &["Guelmim", "Tan-Tan", "Sidi Ifni", "Assa"],
    },
    Region {
        name: "Laâyoune-Sakia El Hamra",
        cities: &["Laâyoune", "Boujdour", "Tarfaya", "Es-Semara"],
    },
    Region {
        name: "Dakhla-Oued Ed-Dahab",
        cities: &["Dakhla", "Aousserd"],
    },
];

/// All regions in display order.
#[must_use]
pub const fn regions() -> &'static [Region] {
    REGIONS
}

/// Find a region by name (case-insensitive).
#[must_use]
pub fn find_region(name: &str) -> Option<&'static Region> {
    let needle = name.trim();
    REGIONS
        .iter()
        .find(|r| r.name.to_lowercase() == needle.to_lowercase())
}

/// Cities listed under a region, empty for unknown regions.
#[must_use]
pub fn cities_in(region: &str) -> &'static [&'static str] {
    find_region(region).map_or(&[], |r| r.cities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_count() {
        assert_eq!(regions().len(), 12);
    }

    #[test]
    fn test_find_region_case_insensitive() {
        let region = find_region("casablanca-settat");
        assert_eq!(region.map(|r| r.name), Some("Casablanca-Settat"));
    }

    #[test]
    fn test_cities_in_unknown_region() {
        assert!(cities_in("Atlantis").is_empty());
    }
}
