// src/ingest/extract.rs
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::ingest::fetch::FetchError;
use crate::ingest::normalize_text;
use crate::ingest::types::{Listing, SourceSpec, PRICE_NOT_LISTED};

/// Compiled selectors for one source.
pub struct SourceSelectors {
    item: Selector,
    name: Selector,
    price: Selector,
    link: Selector,
}

impl SourceSelectors {
    pub fn compile(spec: &SourceSpec) -> Result<Self, String> {
        let parse = |field: &str, raw: &str| {
            Selector::parse(raw).map_err(|e| format!("{field} selector {raw:?}: {e}"))
        };
        Ok(Self {
            item: parse("item", &spec.item)?,
            name: parse("name", &spec.name)?,
            price: parse("price", &spec.price)?,
            link: parse("link", &spec.link)?,
        })
    }
}

/// Resolve `href` against `base`; relative, absolute and protocol-relative forms.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<String>())
}

fn first_match<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    el.select(sel).next()
}

fn listing_from_card(
    card: ElementRef<'_>,
    sel: &SourceSelectors,
    base: &Url,
    source: &str,
) -> Option<Listing> {
    let name = first_match(card, &sel.name).map(text_of)?;
    if name.is_empty() {
        return None;
    }

    let link_el = first_match(card, &sel.link)?;
    let href = link_el
        .value()
        .attr("href")
        .filter(|h| !h.trim().is_empty())
        .or_else(|| link_el.value().attr("data-href"))?;
    let link = resolve_link(base, href)?;

    let price = first_match(card, &sel.price)
        .map(text_of)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| PRICE_NOT_LISTED.to_string());

    Some(Listing {
        name,
        price,
        link,
        source: source.to_string(),
    })
}

/// Parse `html` and pull one `Listing` per product card; cards missing a name or link are skipped.
pub fn extract(html: &str, spec: &SourceSpec) -> Result<Vec<Listing>, FetchError> {
    let sel = SourceSelectors::compile(spec).map_err(FetchError::Extract)?;
    let base = Url::parse(&spec.url)
        .map_err(|e| FetchError::Extract(format!("base url {:?}: {e}", spec.url)))?;

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for card in doc.select(&sel.item) {
        match listing_from_card(card, &sel, &base, &spec.url) {
            Some(l) => out.push(l),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(target: "ingest", source = %spec.url, skipped, "cards without name or link");
    }
    Ok(out)
}
