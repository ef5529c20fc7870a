//! Demo that pushes two sample listings through the configured channels (log only when none are set).

use listing_watch::{Listing, NotifierMux};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();
    let mux = NotifierMux::from_env();

    let items = vec![
        Listing {
            name: "Selmer Mark VI Tenor".into(),
            price: "$9,800".into(),
            link: "https://example.com/p/selmer-mark-vi".into(),
            source: "https://example.com/".into(),
        },
        Listing {
            name: "Otto Link Tone Edge 7*".into(),
            price: listing_watch::PRICE_NOT_LISTED.into(),
            link: "https://example.com/p/otto-link-7".into(),
            source: "https://example.com/".into(),
        },
    ];

    let ok = mux.notify(&items).await;
    println!("notify-demo done (channels={:?}, ok={ok})", mux.channel_names());
}
