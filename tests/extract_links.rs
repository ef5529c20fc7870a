// tests/extract_links.rs
use listing_watch::ingest::extract::extract;
use listing_watch::{SourceSpec, PRICE_NOT_LISTED};

fn shop() -> SourceSpec {
    SourceSpec::new("https://x.com/shop/", ".card", ".title", ".price", "a")
}

#[test]
fn links_resolve_against_base_url() {
    let html = r#"
        <div class="card"><span class="title">Selmer A</span><span class="price">$1</span><a href="/a/b">a</a></div>
        <div class="card"><span class="title">Selmer B</span><span class="price">$2</span><a href="c?d=1">b</a></div>
        <div class="card"><span class="title">Selmer C</span><a href="//cdn.x.com/z">c</a></div>
    "#;
    let out = extract(html, &shop()).unwrap();
    let links: Vec<_> = out.iter().map(|l| l.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://x.com/a/b",
            "https://x.com/shop/c?d=1",
            "https://cdn.x.com/z"
        ]
    );
}

#[test]
fn never_emits_empty_name_or_link() {
    let html = r#"
        <div class="card"><span class="title"></span><a href="/1">1</a></div>
        <div class="card"><span class="title">Named</span><a>no href</a></div>
        <div class="card"><span class="title">Kept</span><a href="/3">3</a></div>
    "#;
    let out = extract(html, &shop()).unwrap();
    assert_eq!(out.len(), 1);
    assert!(out.iter().all(|l| !l.name.is_empty() && !l.link.is_empty()));
    assert_eq!(out[0].price, PRICE_NOT_LISTED);
}

#[test]
fn page_without_cards_is_empty_not_error() {
    let out = extract("<html><body><p>maintenance</p></body></html>", &shop()).unwrap();
    assert!(out.is_empty());
}

#[test]
fn source_is_the_spec_url() {
    let html = r#"<div class="card"><i class="title">Beechler</i><a href="/b">b</a></div>"#;
    let out = extract(html, &shop()).unwrap();
    assert_eq!(out[0].source, "https://x.com/shop/");
}
