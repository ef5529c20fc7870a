use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Notifier;
use crate::ingest::types::Listing;

const DEFAULT_SMTP_SERVER: &str = "smtp.zoho.com";
const DEFAULT_SMTP_PORT: u16 = 587;

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Blank → default; garbage → default with a warning.
pub fn parse_smtp_port(raw: Option<&str>) -> u16 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_SMTP_PORT,
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(target: "notify", value = s, "invalid SMTP_PORT, defaulting to 587");
            DEFAULT_SMTP_PORT
        }),
    }
}

/// HTML table of linked name / price / source rows.
pub fn render_html(items: &[Listing]) -> String {
    use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

    let rows: String = items
        .iter()
        .map(|i| {
            format!(
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
                attr(&i.link),
                text(&i.name),
                text(&i.price),
                text(&i.source)
            )
        })
        .collect();
    format!("<h3>New Listings</h3><table border=\"1\">{rows}</table>")
}

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// `Ok(None)` when EMAIL_USER / EMAIL_PASS are not set.
    pub fn from_env() -> Result<Option<Self>> {
        let (Some(user), Some(pass)) = (env_nonempty("EMAIL_USER"), env_nonempty("EMAIL_PASS"))
        else {
            return Ok(None);
        };
        let host = env_nonempty("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string());
        let port = parse_smtp_port(std::env::var("SMTP_PORT").ok().as_deref());
        let to_addr = env_nonempty("RECIPIENT_EMAIL").unwrap_or_else(|| user.clone());

        let from: Mailbox = format!("Listing Watch <{user}>")
            .parse()
            .context("invalid EMAIL_USER")?;
        let to: Mailbox = to_addr.parse().context("invalid RECIPIENT_EMAIL")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .with_context(|| format!("invalid SMTP_SERVER {host}"))?
            .port(port)
            .credentials(Credentials::new(user, pass))
            .build();

        Ok(Some(Self { mailer, from, to }))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, new_items: &[Listing]) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("New listings ({})", new_items.len()))
            .header(header::ContentType::TEXT_HTML)
            .body(render_html(new_items))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_port_falls_back_to_587() {
        assert_eq!(parse_smtp_port(None), 587);
        assert_eq!(parse_smtp_port(Some("  ")), 587);
        assert_eq!(parse_smtp_port(Some("abc")), 587);
        assert_eq!(parse_smtp_port(Some(" 465 ")), 465);
    }

    #[test]
    fn html_body_escapes_values() {
        let items = vec![Listing {
            name: "Selmer <Mk6> & case".into(),
            price: "$1".into(),
            link: "https://s/b?x=1&y=\"2\"".into(),
            source: "https://s/".into(),
        }];
        let html = render_html(&items);
        assert!(html.contains("Selmer &lt;Mk6&gt; &amp; case"));
        assert!(html.contains("href=\"https://s/b?x=1&amp;y=&quot;2&quot;\""));
        assert!(html.contains("<td>$1</td>"));
    }
}
