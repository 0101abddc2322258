//! Page and feed rendering.
//!
//! [`Renderer`] is the seam for swapping in a template engine; [`PlainRenderer`] is the built-in
//! implementation emitting small self-contained HTML pages and an Atom 1.0 document.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	content::{Article, Post},
	server::BlogSettings,
};

/// Turns content records into response bodies.
pub trait Renderer
where
	Self: Send + Sync,
{
	/// Index page listing `posts` (already sorted).
	fn index(&self, blog: &BlogSettings, posts: &[Post]) -> String;

	/// Single post page.
	fn post(&self, blog: &BlogSettings, article: &Article) -> String;

	/// Atom feed; `site` is the absolute base URL and `feed_url` the feed's own address.
	fn feed(&self, blog: &BlogSettings, posts: &[Post], site: &Url, feed_url: &Url) -> String;

	/// Page shown for unknown slugs.
	fn not_found(&self, blog: &BlogSettings) -> String;

	/// Generic failure page. Must not leak internal details.
	fn failure(&self, blog: &BlogSettings) -> String;
}

/// Dependency-free HTML and Atom output.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainRenderer;
impl PlainRenderer {
	fn page(blog: &BlogSettings, page_title: Option<&str>, main: &str) -> String {
		let head_title = match page_title {
			Some(title) => format!("{} | {}", escape(title), escape(&blog.title)),
			None => escape(&blog.title),
		};

		format!(
			"<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{head_title}</title>\n\
			 <link rel=\"alternate\" type=\"application/atom+xml\" href=\"{feed}\">\n</head>\n<body>\n\
			 <header><a href=\"/\">{blog_title}</a></header>\n<main>\n{main}</main>\n</body>\n</html>\n",
			feed = escape(&blog.feed_path()),
			blog_title = escape(&blog.title),
		)
	}
}
impl Renderer for PlainRenderer {
	fn index(&self, blog: &BlogSettings, posts: &[Post]) -> String {
		let mut main = String::from("<ul class=\"posts\">\n");

		for post in posts {
			main.push_str(&format!(
				"<li><a href=\"{href}\">{title}</a> <time datetime=\"{stamp}\">{day}</time></li>\n",
				href = escape(&post.path),
				title = escape(&post.title),
				stamp = rfc3339(post.published_at),
				day = post.published_at.date(),
			));
		}

		main.push_str("</ul>\n");

		Self::page(blog, None, &main)
	}

	fn post(&self, blog: &BlogSettings, article: &Article) -> String {
		let title = article.title.as_deref().unwrap_or_else(|| article.slug.trim_start_matches('/'));
		let date = article
			.date
			.as_deref()
			.map(|date| format!("<p class=\"date\">{}</p>\n", escape(date)))
			.unwrap_or_default();
		let main = format!(
			"<article>\n<h1>{}</h1>\n{date}{}</article>\n",
			escape(title),
			article.html
		);

		Self::page(blog, Some(title), &main)
	}

	fn feed(&self, blog: &BlogSettings, posts: &[Post], site: &Url, feed_url: &Url) -> String {
		let updated = posts
			.iter()
			.map(|post| post.published_at)
			.max()
			.unwrap_or_else(OffsetDateTime::now_utc);
		let author = format!("<author><name>{}</name></author>", escape(&blog.feed_author));
		let mut out = format!(
			"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n\
			 <title>{title}</title>\n<id>{feed}</id>\n<updated>{updated}</updated>\n\
			 <link href=\"{site}\"/>\n<link href=\"{feed}\" rel=\"self\"/>\n{author}\n",
			title = escape(&blog.title),
			feed = escape(feed_url.as_str()),
			updated = rfc3339(updated),
			site = escape(site.as_str()),
		);

		for post in posts {
			let url = site.join(post.path.trim_start_matches('/')).unwrap_or_else(|_| site.clone());

			out.push_str(&format!(
				"<entry>\n<title type=\"text\">{title}</title>\n<id>{url}</id>\n\
				 <updated>{updated}</updated>\n<link href=\"{url}\"/>\n{author}\n\
				 <content type=\"html\">{content}</content>\n</entry>\n",
				title = escape(&post.title),
				url = escape(url.as_str()),
				updated = rfc3339(post.published_at),
				content = escape(&post.html),
			));
		}

		out.push_str("</feed>\n");

		out
	}

	fn not_found(&self, blog: &BlogSettings) -> String {
		Self::page(blog, Some("Page not found"), "<h1>Page not found</h1>\n")
	}

	fn failure(&self, blog: &BlogSettings) -> String {
		Self::page(
			blog,
			Some("Something went wrong"),
			"<h1>Something went wrong</h1>\n<p>The content store could not be reached. Try again later.</p>\n",
		)
	}
}

/// Escapes text for HTML and XML bodies and attribute values.
pub fn escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for c in raw.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}

	out
}

fn rfc3339(at: OffsetDateTime) -> String {
	at.format(&Rfc3339).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn site() -> Url {
		Url::parse("http://blog.example.com/").expect("Site fixture should parse.")
	}

	fn sample_post() -> Post {
		Post {
			path: "/2012/hello".into(),
			title: "Fish & <Chips>".into(),
			published_at: datetime!(2012-01-05 10:30 UTC),
			html: "<p>Body</p>\n".into(),
		}
	}

	#[test]
	fn escape_covers_markup_characters() {
		assert_eq!(escape("a & <b> \"c\" 'd'"), "a &amp; &lt;b&gt; &quot;c&quot; &#39;d&#39;");
	}

	#[test]
	fn index_links_every_post() {
		let html = PlainRenderer.index(&BlogSettings::default(), &[sample_post()]);

		assert!(html.contains("<a href=\"/2012/hello\">Fish &amp; &lt;Chips&gt;</a>"));
		assert!(html.contains("datetime=\"2012-01-05T10:30:00Z\""));
		assert!(html.contains("<title>Your New Markbox Blog</title>"));
	}

	#[test]
	fn post_page_falls_back_to_slug_title() {
		let article = Article {
			slug: "/untitled".into(),
			title: None,
			date: None,
			html: "<p>Raw</p>\n".into(),
		};
		let html = PlainRenderer.post(&BlogSettings::default(), &article);

		assert!(html.contains("<h1>untitled</h1>"));
		assert!(html.contains("<p>Raw</p>"));
		assert!(!html.contains("class=\"date\""));
	}

	#[test]
	fn feed_lists_entries_with_absolute_links() {
		let site = site();
		let feed_url = site.join("articles.xml").expect("Feed URL should join.");
		let xml = PlainRenderer.feed(&BlogSettings::default(), &[sample_post()], &site, &feed_url);

		assert!(xml.starts_with("<?xml"));
		assert!(xml.contains("<link href=\"http://blog.example.com/articles.xml\" rel=\"self\"/>"));
		assert!(xml.contains("<id>http://blog.example.com/2012/hello</id>"));
		assert!(xml.contains("<updated>2012-01-05T10:30:00Z</updated>"));
		assert!(xml.contains("<content type=\"html\">&lt;p&gt;Body&lt;/p&gt;\n</content>"));
		assert!(xml.contains("<name>Anonymous</name>"));
	}

	#[test]
	fn empty_feed_has_no_entries() {
		let site = site();
		let xml = PlainRenderer.feed(&BlogSettings::default(), &[], &site, &site);

		assert!(xml.contains("<feed"));
		assert!(!xml.contains("<entry>"));
	}
}
