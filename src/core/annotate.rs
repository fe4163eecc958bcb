use crate::core::distance::distance_between;
use crate::models::{Listing, UserPosition};

/// Attach the distance from the user to every listing
///
/// Without a user position the listings are returned untouched. With one,
/// listings that have a position get `distance_km` recomputed and listings
/// without one get `None`. Running it twice gives the same output.
pub fn annotate_distances(user: Option<&UserPosition>, listings: Vec<Listing>) -> Vec<Listing> {
    let Some(user) = user else {
        return listings;
    };

    listings
        .into_iter()
        .map(|mut listing| {
            listing.distance_km = listing
                .position
                .as_ref()
                .map(|position| distance_between(&user.point, position));
            listing
        })
        .collect()
}
