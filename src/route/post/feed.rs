//! The searchable, filterable and sortable feed of published posts.
//!
//! A single predicate builder is shared by the page query and the count
//! query, so the total always describes the same row set as the page.

use std::time::Instant;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::Database;

use super::model::{FeedPage, PostRow, PostView};

#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn six() -> i64 {
	6
}

/// Query parameters of the feed.
#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of posts per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "six")]
	pub limit: i64,
	/// Case-insensitive text matched against the title, content and tags.
	pub search: Option<String>,
	/// One of `publishedAt`, `title`, `likes` or `comments`.
	pub sort_by: Option<String>,
	/// Either `asc` or `desc`.
	pub sort_order: Option<String>,
	/// One of `today`, `week`, `month` or `year`.
	pub date_filter: Option<String>,
	/// Case-insensitive text matched against each tag.
	pub tag_filter: Option<String>,
	/// Case-insensitive text matched against author usernames.
	pub author_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
	PublishedAt,
	Title,
	Likes,
	Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
	Asc,
	Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
	pub key: SortKey,
	pub order: SortOrder,
}

impl Default for Sort {
	fn default() -> Self {
		Self {
			key: SortKey::PublishedAt,
			order: SortOrder::Desc,
		}
	}
}

impl Sort {
	/// Resolves the raw sort parameters.
	///
	/// An unknown sort key falls back to newest first, ignoring the order.
	pub fn resolve(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
		let order = match sort_order.map(str::trim) {
			Some(order) if order.eq_ignore_ascii_case("asc") => SortOrder::Asc,
			_ => SortOrder::Desc,
		};

		let key = match sort_by.map(str::trim) {
			None | Some("" | "publishedAt") => SortKey::PublishedAt,
			Some("title") => SortKey::Title,
			Some("likes") => SortKey::Likes,
			Some("comments") => SortKey::Comments,
			Some(..) => return Self::default(),
		};

		Self { key, order }
	}

	/// The `ORDER BY` clause, with ties broken by recency and then id.
	fn order_by(self) -> String {
		let direction = match self.order {
			SortOrder::Asc => "ASC",
			SortOrder::Desc => "DESC",
		};

		match self.key {
			SortKey::PublishedAt => format!("published_at {direction}, id DESC"),
			SortKey::Title => format!("title {direction}, published_at DESC, id DESC"),
			SortKey::Likes => format!("likes {direction}, published_at DESC, id DESC"),
			SortKey::Comments => format!("comments {direction}, published_at DESC, id DESC"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateFilter {
	Today,
	Week,
	Month,
	Year,
}

impl DateFilter {
	pub fn parse(value: &str) -> Option<Self> {
		match value.trim() {
			"today" => Some(Self::Today),
			"week" => Some(Self::Week),
			"month" => Some(Self::Month),
			"year" => Some(Self::Year),
			_ => None,
		}
	}

	/// The earliest publication time included by the filter, relative to `now`
	/// in its own time zone.
	pub fn start<Tz: TimeZone>(self, now: &DateTime<Tz>) -> DateTime<Utc> {
		let today = now.date_naive();

		let first_day = match self {
			Self::Today => today,
			Self::Week => return (now.clone() - Duration::days(7)).with_timezone(&Utc),
			Self::Month => today.with_day(1).unwrap_or(today),
			Self::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
		};

		let midnight = first_day.and_time(chrono::NaiveTime::MIN);

		// Midnight can be skipped by a daylight saving transition.
		now.timezone()
			.from_local_datetime(&midnight)
			.earliest()
			.map_or_else(|| midnight.and_utc(), |start| start.with_timezone(&Utc))
	}
}

/// The resolved row filter of a feed query.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedFilter {
	pub search: Option<String>,
	pub tag: Option<String>,
	pub author: Option<Uuid>,
	pub published_since: Option<DateTime<Utc>>,
}

/// The filters that were applied to a feed page, after normalization.
#[derive(Debug, Default, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
	pub search: Option<String>,
	pub sort_by: Option<SortKey>,
	pub sort_order: Option<SortOrder>,
	pub date_filter: Option<DateFilter>,
	pub tag_filter: Option<String>,
	pub author_filter: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
	pub current_page: i64,
	pub total_pages: i64,
	pub total_posts: i64,
	pub has_next_page: bool,
	pub limit: i64,
}

impl Pagination {
	pub fn new(page: i64, limit: i64, total: i64) -> Self {
		let total_pages = (total + limit - 1) / limit;

		Self {
			current_page: page,
			total_pages,
			total_posts: total,
			has_next_page: page < total_pages,
			limit,
		}
	}
}

/// Trims a text parameter, treating blank values as absent.
fn non_empty(value: Option<&str>) -> Option<String> {
	value
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}

/// Escapes `LIKE` wildcards so user text only ever matches literally.
pub fn escape_like(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for c in value.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}

		escaped.push(c);
	}

	escaped
}

/// A case-insensitive substring pattern for `ILIKE`.
fn contains(value: &str) -> String {
	format!("%{}%", escape_like(value))
}

/// Pushes the projection shared by every listing of posts: the post, its
/// author, and like and comment counts joined from grouped aggregates.
pub fn push_select(builder: &mut QueryBuilder<'_, Postgres>) {
	builder.push(
		r#"
			SELECT
				post.id, post.title, post.content, post.images, post.tags, post.published_at,
				"user".id AS author_id, "user".username AS author_username,
				COALESCE(like_counts.count, 0) AS likes,
				COALESCE(comment_counts.count, 0) AS comments
			FROM post
			INNER JOIN "user" ON "user".id = post.user_id
			LEFT JOIN (
				SELECT post_id, COUNT(*) AS count FROM post_like GROUP BY post_id
			) AS like_counts ON like_counts.post_id = post.id
			LEFT JOIN (
				SELECT post_id, COUNT(*) AS count FROM comment GROUP BY post_id
			) AS comment_counts ON comment_counts.post_id = post.id
		"#,
	);
}

/// Pushes the `WHERE` clause for `filter`. Only published posts match.
pub fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, filter: &FeedFilter) {
	builder.push(" WHERE post.is_published");

	if let Some(search) = &filter.search {
		let pattern = contains(search);

		builder
			.push(" AND (post.title ILIKE ")
			.push_bind(pattern.clone())
			.push(" OR post.content ILIKE ")
			.push_bind(pattern.clone())
			.push(" OR EXISTS (SELECT 1 FROM unnest(post.tags) AS tag WHERE tag ILIKE ")
			.push_bind(pattern)
			.push("))");
	}

	if let Some(tag) = &filter.tag {
		builder
			.push(" AND EXISTS (SELECT 1 FROM unnest(post.tags) AS tag WHERE tag ILIKE ")
			.push_bind(contains(tag))
			.push(")");
	}

	if let Some(author) = filter.author {
		builder.push(" AND post.user_id = ").push_bind(author);
	}

	if let Some(since) = filter.published_since {
		builder.push(" AND post.published_at >= ").push_bind(since);
	}
}

/// Resolves an author filter to a single author, preferring an exact
/// (case-insensitive) username match and then the alphabetically first.
async fn resolve_author(database: &Database, filter: &str) -> Result<Option<Uuid>, sqlx::Error> {
	sqlx::query_scalar::<_, Uuid>(
		r#"
			SELECT id FROM "user"
			WHERE username ILIKE $1
			ORDER BY lower(username) = lower($2) DESC, username
			LIMIT 1
		"#,
	)
	.bind(contains(filter))
	.bind(filter)
	.fetch_optional(database)
	.await
}

/// Runs a feed query, returning one page of posts and the pagination summary.
pub async fn fetch_feed(database: &Database, query: &FeedQuery) -> Result<FeedPage, sqlx::Error> {
	let started = Instant::now();

	let sort = Sort::resolve(query.sort_by.as_deref(), query.sort_order.as_deref());
	let date_filter = query.date_filter.as_deref().and_then(DateFilter::parse);
	let author_filter = non_empty(query.author_filter.as_deref());

	let applied_filters = AppliedFilters {
		search: non_empty(query.search.as_deref()),
		sort_by: Some(sort.key),
		sort_order: Some(sort.order),
		date_filter,
		tag_filter: non_empty(query.tag_filter.as_deref()),
		author_filter: author_filter.clone(),
	};

	let author = match &author_filter {
		Some(name) => match resolve_author(database, name).await? {
			Some(id) => Some(id),
			None => {
				return Ok(FeedPage {
					posts: Vec::new(),
					pagination: Pagination::new(query.page, query.limit, 0),
					applied_filters,
				})
			}
		},
		None => None,
	};

	let filter = FeedFilter {
		search: applied_filters.search.clone(),
		tag: applied_filters.tag_filter.clone(),
		author,
		published_since: date_filter.map(|filter| filter.start(&Local::now())),
	};

	let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM post");
	push_predicate(&mut builder, &filter);

	let total = builder
		.build_query_scalar::<i64>()
		.fetch_one(database)
		.await?;

	let mut builder = QueryBuilder::new("");
	push_select(&mut builder);
	push_predicate(&mut builder, &filter);

	builder
		.push(" ORDER BY ")
		.push(sort.order_by())
		.push(" LIMIT ")
		.push_bind(query.limit)
		.push(" OFFSET ")
		.push_bind((query.page - 1).saturating_mul(query.limit));

	let posts = builder
		.build_query_as::<PostRow>()
		.fetch_all(database)
		.await?
		.into_iter()
		.map(PostView::from)
		.collect::<Vec<_>>();

	tracing::info!(
		histogram.feed_query_ms = started.elapsed().as_secs_f64() * 1000.0,
		total,
		returned = posts.len(),
		"feed query served"
	);

	Ok(FeedPage {
		posts,
		pagination: Pagination::new(query.page, query.limit, total),
		applied_filters,
	})
}

#[cfg(test)]
mod test {
	use chrono::FixedOffset;

	use super::*;

	fn sql(filter: &FeedFilter) -> String {
		let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM post");
		push_predicate(&mut builder, filter);
		builder.sql().to_string()
	}

	#[test]
	fn test_pagination_of_seven_posts() {
		let first = Pagination::new(1, 6, 7);

		assert_eq!(first.total_pages, 2);
		assert!(first.has_next_page);

		let second = Pagination::new(2, 6, 7);

		assert!(!second.has_next_page);

		// the last page holds whatever is left
		assert_eq!(7 - (second.current_page - 1) * second.limit, 1);

		let past_end = Pagination::new(3, 6, 7);

		assert_eq!(past_end.total_pages, 2);
		assert!(!past_end.has_next_page);
	}

	#[test]
	fn test_pagination_of_nothing() {
		assert_eq!(
			Pagination::new(1, 6, 0),
			Pagination {
				current_page: 1,
				total_pages: 0,
				total_posts: 0,
				has_next_page: false,
				limit: 6,
			}
		);
	}

	#[test]
	fn test_sort_resolution() {
		assert_eq!(Sort::resolve(None, None), Sort::default());
		assert_eq!(
			Sort::resolve(Some("likes"), Some("asc")),
			Sort {
				key: SortKey::Likes,
				order: SortOrder::Asc
			}
		);
		assert_eq!(
			Sort::resolve(Some("title"), Some("sideways")),
			Sort {
				key: SortKey::Title,
				order: SortOrder::Desc
			}
		);

		// unknown keys ignore the requested order
		assert_eq!(Sort::resolve(Some("views"), Some("asc")), Sort::default());
	}

	#[test]
	fn test_order_by_breaks_ties() {
		let sort = Sort::resolve(Some("comments"), Some("asc"));

		assert_eq!(sort.order_by(), "comments ASC, published_at DESC, id DESC");
		assert_eq!(Sort::default().order_by(), "published_at DESC, id DESC");
	}

	#[test]
	fn test_escape_like() {
		assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
		assert_eq!(contains("rust"), "%rust%");
	}

	#[test]
	fn test_empty_filter_only_selects_published() {
		assert_eq!(
			sql(&FeedFilter::default()),
			"SELECT COUNT(*) FROM post WHERE post.is_published"
		);
	}

	#[test]
	fn test_predicate_binds_every_filter() {
		let sql = sql(&FeedFilter {
			search: Some("rust".into()),
			tag: Some("web".into()),
			author: Some(Uuid::nil()),
			published_since: Some(Utc::now()),
		});

		assert!(sql.contains("post.title ILIKE $1"));
		assert!(sql.contains("post.content ILIKE $2"));
		assert!(sql.contains("tag ILIKE $3"));
		assert!(sql.contains("tag ILIKE $4"));
		assert!(sql.contains("post.user_id = $5"));
		assert!(sql.contains("post.published_at >= $6"));
	}

	#[test]
	fn test_blank_parameters_are_absent() {
		assert_eq!(non_empty(Some("   ")), None);
		assert_eq!(non_empty(Some(" rust ")), Some("rust".into()));
		assert_eq!(non_empty(None), None);
	}

	#[test]
	fn test_date_filter_windows() {
		let offset = FixedOffset::east_opt(2 * 3600).unwrap();
		let now = offset.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();

		let utc = |y, m, d, h, min| Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap();

		assert_eq!(DateFilter::Today.start(&now), utc(2024, 3, 14, 22, 0));
		assert_eq!(DateFilter::Week.start(&now), utc(2024, 3, 8, 8, 30));
		assert_eq!(DateFilter::Month.start(&now), utc(2024, 2, 29, 22, 0));
		assert_eq!(DateFilter::Year.start(&now), utc(2023, 12, 31, 22, 0));
	}

	#[test]
	fn test_date_filter_parse() {
		assert_eq!(DateFilter::parse("week"), Some(DateFilter::Week));
		assert_eq!(DateFilter::parse("decade"), None);
	}
}
