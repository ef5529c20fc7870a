// src/ingest/filter.rs
use crate::ingest::types::Listing;

/// Keep listings whose name mentions a tracked brand. Input order is preserved.
pub fn filter_by_brand<S: AsRef<str>>(listings: Vec<Listing>, brands: &[S]) -> Vec<Listing> {
    let folded: Vec<String> = brands
        .iter()
        .map(|b| b.as_ref().trim().to_lowercase())
        .filter(|b| !b.is_empty())
        .collect();

    listings
        .into_iter()
        .filter(|l| {
            let name = l.name.to_lowercase();
            folded.iter().any(|b| name.contains(b.as_str()))
        })
        .collect()
}
