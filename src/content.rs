//! Remote content listing: turns the Markdown files of the connected folder into posts.
//!
//! A file becomes a [`Post`] only when its front matter carries both a `title` and a parseable
//! `date`; anything else is logged and left out of the listing. Single-post reads are more
//! forgiving and render whatever they find.

pub mod date;
pub mod meta;

pub use date::{parse_date, parse_date_at};
pub use meta::FrontMatter;

// crates.io
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	remote::RemoteEntry,
	session::AuthSession,
};

/// Extension identifying publishable files.
pub const MARKDOWN_SUFFIX: &str = ".md";
/// Folder searched for posts.
pub const CONTENT_ROOT: &str = "/";

/// Render-ready post record built fresh on every listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
	/// Public slug: the remote path without its extension, leading `/` kept.
	pub path: String,
	/// `title` front-matter field.
	pub title: String,
	/// Parsed `date` front-matter field.
	pub published_at: OffsetDateTime,
	/// Rendered body.
	pub html: String,
}
impl Post {
	/// Builds a post from the raw source of the file at `remote_path`.
	pub fn from_source(remote_path: &str, source: &str) -> Result<Self, MetadataError> {
		let document = Document::render(source);
		let title = document.meta.first("title").ok_or(MetadataError::MissingTitle)?.to_owned();
		let raw_date = document.meta.first("date").ok_or(MetadataError::MissingDate)?;
		let published_at = parse_date(raw_date)
			.ok_or_else(|| MetadataError::UnparseableDate { value: raw_date.to_owned() })?;

		Ok(Self { path: slugify(remote_path).to_owned(), title, published_at, html: document.html })
	}
}

/// Front matter plus rendered HTML of one Markdown source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
	/// Header fields.
	pub meta: FrontMatter,
	/// Body rendered to HTML.
	pub html: String,
}
impl Document {
	/// Splits the header off `source` and renders the remaining Markdown.
	pub fn render(source: &str) -> Self {
		let meta = FrontMatter::parse(source);
		let html = render_markdown(&meta.body);

		Self { meta, html }
	}
}

/// A single post page. Unlike [`Post`], metadata is optional here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Article {
	/// Slug the article was requested under.
	pub slug: String,
	/// `title` field, if present.
	pub title: Option<String>,
	/// Raw `date` field, if present.
	pub date: Option<String>,
	/// Rendered body.
	pub html: String,
}

/// Reasons a file is left out of the listing.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum MetadataError {
	/// No `title` field.
	#[error("Front matter has no title.")]
	MissingTitle,
	/// No `date` field.
	#[error("Front matter has no date.")]
	MissingDate,
	/// The `date` field could not be understood.
	#[error("Front matter date `{value}` is not a recognizable date.")]
	UnparseableDate {
		/// Raw field value.
		value: String,
	},
}

/// Strips the Markdown extension, keeping the leading separator (`/2012/hello.md` → `/2012/hello`).
pub fn slugify(path: &str) -> &str {
	path.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(path)
}

/// Enumerates, fetches, and parses every publishable file, most recent first.
///
/// Directories and non-Markdown entries are ignored; files missing metadata are logged and
/// skipped. Any remote failure aborts the whole listing.
pub async fn listing(session: &AuthSession) -> Result<Vec<Post>> {
	const STAGE: &str = "listing";

	let span = FlowSpan::new(FlowKind::Content, STAGE);

	obs::record_flow_outcome(FlowKind::Content, FlowOutcome::Attempt);

	let result: Result<Vec<Post>> = span
		.instrument(async {
			let entries = session.search(CONTENT_ROOT, MARKDOWN_SUFFIX).await?;
			let mut posts = Vec::with_capacity(entries.len());

			for entry in entries.iter().filter(|entry| is_publishable(entry)) {
				let bytes = session.get_file(&entry.path).await?;
				let source = String::from_utf8_lossy(&bytes);

				match Post::from_source(&entry.path, &source) {
					Ok(post) => posts.push(post),
					Err(e) => tracing::warn!(path = %entry.path, error = %e, "Skipping post."),
				}
			}

			sort_newest_first(&mut posts);

			tracing::debug!(count = posts.len(), "Listed posts.");

			Ok(posts)
		})
		.await;

	obs::record_flow_outcome(FlowKind::Content, FlowOutcome::of(&result));

	result
}

/// Fetches and renders the post published under `slug`.
///
/// A missing remote file surfaces as [`Error::NotFound`].
pub async fn read_post(session: &AuthSession, slug: &str) -> Result<Article> {
	const STAGE: &str = "read_post";

	let span = FlowSpan::new(FlowKind::Content, STAGE);
	let slug = format!("/{}", slug.trim_start_matches('/'));
	let result: Result<Article> = span
		.instrument(async {
			let path = format!("{slug}{MARKDOWN_SUFFIX}");
			let bytes = session.get_file(&path).await?;
			let document = Document::render(&String::from_utf8_lossy(&bytes));

			Ok(Article {
				title: document.meta.first("title").map(str::to_owned),
				date: document.meta.first("date").map(str::to_owned),
				html: document.html,
				slug: slug.clone(),
			})
		})
		.await;

	obs::record_flow_outcome(FlowKind::Content, FlowOutcome::of(&result));

	result
}

/// Renders Markdown with tables, footnotes, strikethrough, and smart punctuation.
///
/// Heading levels are shifted down by one so body headings nest under the page title.
pub fn render_markdown(source: &str) -> String {
	let options = Options::ENABLE_TABLES
		| Options::ENABLE_FOOTNOTES
		| Options::ENABLE_STRIKETHROUGH
		| Options::ENABLE_SMART_PUNCTUATION;
	let events = Parser::new_ext(source, options).map(|event| match event {
		Event::Start(Tag::Heading { level, id, classes, attrs }) =>
			Event::Start(Tag::Heading { level: demote(level), id, classes, attrs }),
		Event::End(TagEnd::Heading(level)) => Event::End(TagEnd::Heading(demote(level))),
		other => other,
	});
	let mut out = String::with_capacity(source.len() * 3 / 2);

	html::push_html(&mut out, events);

	out
}

fn demote(level: HeadingLevel) -> HeadingLevel {
	HeadingLevel::try_from(level as usize + 1).unwrap_or(HeadingLevel::H6)
}

fn is_publishable(entry: &RemoteEntry) -> bool {
	!entry.is_dir && entry.path.ends_with(MARKDOWN_SUFFIX)
}

fn sort_newest_first(posts: &mut [Post]) {
	// `sort_by` is stable, so equal dates keep enumeration order.
	posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
