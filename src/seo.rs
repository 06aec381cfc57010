// ABOUTME: Sitemap XML builders for the marketing site and the Google News feed
// ABOUTME: Produces escaped urlset documents without any persistence or templating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! SEO sitemap generation
//!
//! Two builders are provided. [`SitemapBuilder`] emits a standard `urlset`
//! document for the site pages and blog. [`NewsSitemapBuilder`] emits the
//! Google News variant, which only admits articles published within the
//! last two days and caps the document at 1000 entries.

use chrono::{DateTime, Duration, Utc};

/// Google News only indexes articles from the last two days.
const NEWS_WINDOW_DAYS: i64 = 2;

/// Maximum entries per Google News sitemap document.
const NEWS_ENTRY_CAP: usize = 1000;

/// How often a page is expected to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// One page in a standard sitemap
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    /// Absolute page URL
    pub loc: String,
    /// Last modification time, when known
    pub lastmod: Option<DateTime<Utc>>,
    /// Expected change cadence
    pub changefreq: ChangeFrequency,
    /// Crawl priority between 0.0 and 1.0
    pub priority: f32,
}

impl SitemapEntry {
    #[must_use]
    pub fn new(loc: impl Into<String>, changefreq: ChangeFrequency, priority: f32) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq,
            priority,
        }
    }

    #[must_use]
    pub fn with_lastmod(mut self, lastmod: DateTime<Utc>) -> Self {
        self.lastmod = Some(lastmod);
        self
    }
}

/// One article in a Google News sitemap
#[derive(Debug, Clone)]
pub struct NewsEntry {
    /// Absolute article URL
    pub loc: String,
    /// Article headline
    pub title: String,
    /// When the article went live
    pub published_at: DateTime<Utc>,
    /// Comma-separated news keywords, possibly empty
    pub keywords: String,
}

/// Incremental builder for a standard `urlset` document
#[derive(Debug, Default)]
pub struct SitemapBuilder {
    entries: Vec<SitemapEntry>,
}

impl SitemapBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: SitemapEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the sitemap as an XML document
    #[must_use]
    pub fn build(&self) -> String {
        let mut xml = String::with_capacity(256 + self.entries.len() * 160);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

        for entry in &self.entries {
            xml.push_str("  <url>\n");
            xml.push_str("    <loc>");
            xml.push_str(&escape_xml(&entry.loc));
            xml.push_str("</loc>\n");
            if let Some(lastmod) = entry.lastmod {
                xml.push_str("    <lastmod>");
                xml.push_str(&lastmod.format("%Y-%m-%d").to_string());
                xml.push_str("</lastmod>\n");
            }
            xml.push_str("    <changefreq>");
            xml.push_str(entry.changefreq.as_str());
            xml.push_str("</changefreq>\n");
            xml.push_str(&format!("    <priority>{:.1}</priority>\n", entry.priority));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Builder for the Google News `urlset` variant
#[derive(Debug)]
pub struct NewsSitemapBuilder {
    publication_name: String,
    publication_language: String,
    entries: Vec<NewsEntry>,
}

impl NewsSitemapBuilder {
    #[must_use]
    pub fn new(publication_name: impl Into<String>, publication_language: impl Into<String>) -> Self {
        Self {
            publication_name: publication_name.into(),
            publication_language: publication_language.into(),
            entries: Vec::new(),
        }
    }

    /// Add an article if it is still within the News indexing window.
    ///
    /// Returns whether the entry was admitted. Articles older than two days
    /// and entries past the document cap are silently rejected.
    pub fn add(&mut self, entry: NewsEntry, now: DateTime<Utc>) -> bool {
        if self.entries.len() >= NEWS_ENTRY_CAP {
            return false;
        }
        let cutoff = now - Duration::days(NEWS_WINDOW_DAYS);
        if entry.published_at < cutoff {
            return false;
        }
        self.entries.push(entry);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the news sitemap as an XML document
    #[must_use]
    pub fn build(&self) -> String {
        let mut xml = String::with_capacity(256 + self.entries.len() * 320);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(
            "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" \
             xmlns:news=\"http://www.google.com/schemas/sitemap-news/0.9\">\n",
        );

        for entry in &self.entries {
            xml.push_str("  <url>\n");
            xml.push_str("    <loc>");
            xml.push_str(&escape_xml(&entry.loc));
            xml.push_str("</loc>\n");
            xml.push_str("    <news:news>\n");
            xml.push_str("      <news:publication>\n");
            xml.push_str("        <news:name>");
            xml.push_str(&escape_xml(&self.publication_name));
            xml.push_str("</news:name>\n");
            xml.push_str("        <news:language>");
            xml.push_str(&escape_xml(&self.publication_language));
            xml.push_str("</news:language>\n");
            xml.push_str("      </news:publication>\n");
            xml.push_str("      <news:publication_date>");
            xml.push_str(&entry.published_at.to_rfc3339());
            xml.push_str("</news:publication_date>\n");
            xml.push_str("      <news:title>");
            xml.push_str(&escape_xml(&entry.title));
            xml.push_str("</news:title>\n");
            if !entry.keywords.is_empty() {
                xml.push_str("      <news:keywords>");
                xml.push_str(&escape_xml(&entry.keywords));
                xml.push_str("</news:keywords>\n");
            }
            xml.push_str("    </news:news>\n");
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Escape the five XML-reserved characters
fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sitemap_contains_entries_in_order() {
        let mut builder = SitemapBuilder::new();
        builder.add(
            SitemapEntry::new("https://aplyfly.com/", ChangeFrequency::Daily, 1.0)
                .with_lastmod(ts(2026, 8, 1)),
        );
        builder.add(SitemapEntry::new(
            "https://aplyfly.com/servicios/",
            ChangeFrequency::Weekly,
            0.9,
        ));

        let xml = builder.build();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<loc>https://aplyfly.com/</loc>"));
        assert!(xml.contains("<lastmod>2026-08-01</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.9</priority>"));
        let first = xml.find("https://aplyfly.com/</loc>").unwrap();
        let second = xml.find("https://aplyfly.com/servicios/").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_sitemap_escapes_reserved_characters() {
        let mut builder = SitemapBuilder::new();
        builder.add(SitemapEntry::new(
            "https://aplyfly.com/blog?tag=ia&lang=es",
            ChangeFrequency::Weekly,
            0.7,
        ));

        let xml = builder.build();
        assert!(xml.contains("tag=ia&amp;lang=es"));
        assert!(!xml.contains("tag=ia&lang"));
    }

    #[test]
    fn test_news_sitemap_rejects_stale_articles() {
        let now = ts(2026, 8, 28);
        let mut builder = NewsSitemapBuilder::new("Aplyfly Tech News", "es");

        let fresh = NewsEntry {
            loc: "https://aplyfly.com/blog/ia-para-pymes/".into(),
            title: "IA para pymes".into(),
            published_at: ts(2026, 8, 27),
            keywords: "ia, automatización".into(),
        };
        let stale = NewsEntry {
            loc: "https://aplyfly.com/blog/viejo/".into(),
            title: "Artículo viejo".into(),
            published_at: ts(2026, 8, 20),
            keywords: String::new(),
        };

        assert!(builder.add(fresh, now));
        assert!(!builder.add(stale, now));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_news_sitemap_enforces_entry_cap() {
        let now = ts(2026, 8, 28);
        let mut builder = NewsSitemapBuilder::new("Aplyfly Tech News", "es");

        for i in 0..NEWS_ENTRY_CAP {
            let admitted = builder.add(
                NewsEntry {
                    loc: format!("https://aplyfly.com/blog/nota-{i}/"),
                    title: format!("Nota {i}"),
                    published_at: ts(2026, 8, 27),
                    keywords: String::new(),
                },
                now,
            );
            assert!(admitted);
        }

        let overflow = NewsEntry {
            loc: "https://aplyfly.com/blog/una-mas/".into(),
            title: "Una más".into(),
            published_at: ts(2026, 8, 27),
            keywords: String::new(),
        };
        assert!(!builder.add(overflow, now));
        assert_eq!(builder.len(), NEWS_ENTRY_CAP);
    }

    #[test]
    fn test_news_sitemap_carries_publication_metadata() {
        let now = ts(2026, 8, 28);
        let mut builder = NewsSitemapBuilder::new("Aplyfly Tech News", "es");
        builder.add(
            NewsEntry {
                loc: "https://aplyfly.com/blog/chatbots/".into(),
                title: "Chatbots & negocios".into(),
                published_at: ts(2026, 8, 27),
                keywords: "chatbots, ia".into(),
            },
            now,
        );

        let xml = builder.build();
        assert!(xml.contains("xmlns:news=\"http://www.google.com/schemas/sitemap-news/0.9\""));
        assert!(xml.contains("<news:name>Aplyfly Tech News</news:name>"));
        assert!(xml.contains("<news:language>es</news:language>"));
        assert!(xml.contains("<news:title>Chatbots &amp; negocios</news:title>"));
        assert!(xml.contains("<news:keywords>chatbots, ia</news:keywords>"));
    }
}
