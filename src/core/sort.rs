use crate::models::{Listing, SortKey};
use std::cmp::Ordering;

/// Sort a copy of the filtered listings by the selected key
///
/// The sort is stable, so equal keys keep their prior relative order.
/// Listings with unknown distance sort after every known distance.
pub fn sort_listings(listings: &[Listing], key: SortKey) -> Vec<Listing> {
    let mut sorted = listings.to_vec();
    sorted.sort_by(|a, b| compare(a, b, key));
    sorted
}

fn compare(a: &Listing, b: &Listing, key: SortKey) -> Ordering {
    match key {
        SortKey::Distance => a
            .distance_km
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY)),
        SortKey::PriceAsc => a.price.total_cmp(&b.price),
        SortKey::PriceDesc => b.price.total_cmp(&a.price),
        SortKey::Name => a.title.cmp(&b.title),
    }
}
