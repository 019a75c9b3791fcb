use anyhow::{anyhow, Context, Result};
use clap::Parser;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Breadth-first crawl of one site into a raw HTML corpus")]
struct Cli {
    /// Seed URL; the crawl never leaves its registrable domain
    seed: String,
    /// Maximum number of pages to save
    #[arg(long, default_value_t = 50)]
    max_pages: usize,
    /// Delay between requests, in seconds
    #[arg(long, default_value_t = 1.0)]
    delay_secs: f64,
    /// Directory for the fetched pages
    #[arg(long, default_value = "./corpus_html")]
    out_dir: PathBuf,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// User-Agent string
    #[arg(long, default_value = "quarry-crawler/0.1 (+https://example.com/bot)")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create {}", args.out_dir.display()))?;

    let seed = Url::parse(&args.seed).with_context(|| format!("invalid seed url {}", args.seed))?;
    let root = seed
        .host_str()
        .map(registrable_root)
        .ok_or_else(|| anyhow!("seed url has no host"))?
        .to_string();

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let sel_a = Selector::parse("a[href]").expect("valid selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<Url> = VecDeque::new();
    seen.insert(norm(&seed));
    frontier.push_back(seed);

    let mut saved = 0usize;
    while let Some(url) = frontier.pop_front() {
        if saved >= args.max_pages {
            break;
        }

        let body = match fetch_html(&client, &url).await {
            Some(body) => body,
            None => continue,
        };

        saved += 1;
        let file = args.out_dir.join(format!("page_{saved}.html"));
        if let Err(err) = fs::write(&file, &body) {
            tracing::warn!(path = %file.display(), %err, "could not save page");
            saved -= 1;
            continue;
        }
        tracing::info!(%url, page = saved, frontier = frontier.len(), "saved");

        for link in extract_links(&body, &url, &sel_a) {
            if !in_domain(link.host_str().unwrap_or(""), &root) {
                continue;
            }
            if seen.insert(norm(&link)) {
                frontier.push_back(link);
            }
        }

        sleep(Duration::from_secs_f64(args.delay_secs)).await;
    }

    tracing::info!(saved, out_dir = %args.out_dir.display(), "crawl complete");
    Ok(())
}

/// Fetch one page; any network error or non-success status skips the URL
/// without aborting the traversal.
async fn fetch_html(client: &Client, url: &Url) -> Option<String> {
    let resp = match client.get(url.clone()).send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::debug!(%url, %err, "fetch failed");
            return None;
        }
    };
    if !resp.status().is_success() {
        tracing::debug!(%url, status = %resp.status(), "skipping non-success response");
        return None;
    }
    if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
        if let Ok(v) = ct.to_str() {
            if !v.starts_with("text/html") {
                return None;
            }
        }
    }
    let bytes = resp.bytes().await.ok()?;
    if bytes.len() > 2 * 1024 * 1024 {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).to_string())
}

fn extract_links(body: &str, base: &Url, sel_a: &Selector) -> Vec<Url> {
    let doc = Html::parse_document(body);
    let mut links = Vec::new();
    for a in doc.select(sel_a) {
        if let Some(href) = a.value().attr("href") {
            if let Ok(mut u) = Url::parse(href).or_else(|_| base.join(href)) {
                u.set_fragment(None);
                if u.scheme().starts_with("http") {
                    links.push(u);
                }
            }
        }
    }
    links
}

/// Address identity for deduplication: the URL with its fragment stripped.
fn norm(u: &Url) -> String {
    let mut s = u.clone();
    s.set_fragment(None);
    s.to_string()
}

/// "www.example.com" -> "example.com"; a host that is already two labels
/// stays itself.
fn registrable_root(host: &str) -> &str {
    match host.split_once('.') {
        Some((_, rest)) if rest.contains('.') => rest,
        _ => host,
    }
}

/// Label-aligned suffix match, so "badexample.com" is not inside
/// "example.com".
fn in_domain(host: &str, root: &str) -> bool {
    host == root || host.strip_suffix(root).is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_strips_leading_label() {
        assert_eq!(registrable_root("www.example.com"), "example.com");
        assert_eq!(registrable_root("news.bbc.co.uk"), "bbc.co.uk");
        assert_eq!(registrable_root("example.com"), "example.com");
    }

    #[test]
    fn domain_match_is_label_aligned() {
        assert!(in_domain("example.com", "example.com"));
        assert!(in_domain("api.example.com", "example.com"));
        assert!(!in_domain("badexample.com", "example.com"));
        assert!(!in_domain("example.org", "example.com"));
    }

    #[test]
    fn norm_strips_fragments() {
        let a = Url::parse("https://example.com/page#section").unwrap();
        let b = Url::parse("https://example.com/page").unwrap();
        assert_eq!(norm(&a), norm(&b));
    }
}
