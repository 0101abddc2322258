//! Lenient publication-date parsing.
//!
//! Accepted shapes, all interpreted in UTC:
//! - RFC 3339 and RFC 2822 timestamps;
//! - ISO dates with an optional `HH:MM[:SS]` time (`2012-01-05`, `2012-01-05 14:30`);
//! - slash dates (`2012/01/05`, US-ordered `1/5/2012`);
//! - month-name dates (`January 5, 2012`, `5 Jan 2012`, `Thursday, Jan 5th 2012 2:30pm`);
//! - relative words (`now`, `today`, `yesterday`, `tomorrow`, `3 days ago`, `2 weeks ago`).

// crates.io
use time::{
	Date, Month, PrimitiveDateTime, Time,
	format_description::{
		BorrowedFormatItem,
		well_known::{Rfc2822, Rfc3339},
	},
	macros::format_description,
};
// self
use crate::_prelude::*;

const WEEKDAYS: [&str; 7] =
	["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

/// Parses `input` relative to the current instant.
pub fn parse_date(input: &str) -> Option<OffsetDateTime> {
	parse_date_at(input, OffsetDateTime::now_utc())
}

/// Parses `input`, resolving relative words and missing years against `now`.
pub fn parse_date_at(input: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let input = input.trim();

	if input.is_empty() {
		return None;
	}

	parse_exact(input).or_else(|| parse_relative(input, now)).or_else(|| parse_loose(input, now))
}

fn parse_exact(input: &str) -> Option<OffsetDateTime> {
	if let Ok(parsed) = OffsetDateTime::parse(input, &Rfc3339) {
		return Some(parsed);
	}
	if let Ok(parsed) = OffsetDateTime::parse(input, &Rfc2822) {
		return Some(parsed);
	}

	let iso_formats: [&[BorrowedFormatItem<'_>]; 4] = [
		format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
		format_description!("[year]-[month]-[day] [hour]:[minute]"),
		format_description!("[year]-[month]-[day]T[hour]:[minute]"),
	];

	for format in iso_formats {
		if let Ok(parsed) = PrimitiveDateTime::parse(input, format) {
			return Some(parsed.assume_utc());
		}
	}

	Date::parse(input, format_description!("[year]-[month]-[day]"))
		.ok()
		.map(|date| date.midnight().assume_utc())
}

fn parse_relative(input: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let lowered = input.to_ascii_lowercase();
	let today = now.date().midnight().assume_utc();

	match lowered.as_str() {
		"now" => return Some(now),
		"today" => return Some(today),
		"yesterday" => return Some(today - Duration::days(1)),
		"tomorrow" => return Some(today + Duration::days(1)),
		_ => {},
	}

	let words: Vec<&str> = lowered.split_whitespace().collect();
	let [count, unit, "ago"] = words.as_slice() else {
		return None;
	};
	let count: i64 = count.parse().ok()?;
	let unit_seconds: i64 = match unit.trim_end_matches('s') {
		"minute" => 60,
		"hour" => 3_600,
		"day" => 86_400,
		"week" => 604_800,
		_ => return None,
	};
	let span = Duration::seconds(count.checked_mul(unit_seconds)?);

	now.checked_sub(span)
}

fn parse_loose(input: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let cleaned = input.replace(',', " ");
	let mut month = None;
	let mut numbers = Vec::new();
	let mut time = None;
	let mut pm = None;

	for token in cleaned.split_whitespace() {
		let lowered = token.trim_end_matches('.').to_ascii_lowercase();

		if is_weekday(&lowered) {
			continue;
		}
		if let Some(found) = month_from_name(&lowered) {
			month = Some(found);

			continue;
		}
		if let Some((clock, meridiem)) = parse_clock(&lowered) {
			time = Some(clock);
			pm = meridiem.or(pm);

			continue;
		}

		match lowered.as_str() {
			"am" | "a.m" => pm = Some(false),
			"pm" | "p.m" => pm = Some(true),
			"at" | "of" | "utc" | "gmt" | "z" => {},
			_ if lowered.contains('/') => {
				let parts: Vec<u32> =
					lowered.split('/').map(str::parse).collect::<Result<_, _>>().ok()?;

				return slash_date(&parts).map(|date| finish(date, time, pm));
			},
			_ => numbers.push(strip_ordinal(&lowered)?.parse::<u32>().ok()?),
		}
	}

	let month = month?;
	let (day, year) = match numbers.as_slice() {
		[day] => (*day, now.year()),
		[a, b] if *a > 31 => (*b, i32::try_from(*a).ok()?),
		[day, year] => (*day, expand_year(*year)?),
		_ => return None,
	};
	let date = Date::from_calendar_date(year, month, u8::try_from(day).ok()?).ok()?;

	Some(finish(date, time, pm))
}

fn finish(date: Date, time: Option<Time>, pm: Option<bool>) -> OffsetDateTime {
	let time = match (time, pm) {
		(Some(clock), Some(true)) if clock.hour() < 12 =>
			clock.replace_hour(clock.hour() + 12).unwrap_or(clock),
		(Some(clock), Some(false)) if clock.hour() == 12 => clock.replace_hour(0).unwrap_or(clock),
		(Some(clock), _) => clock,
		(None, _) => Time::MIDNIGHT,
	};

	PrimitiveDateTime::new(date, time).assume_utc()
}

fn slash_date(parts: &[u32]) -> Option<Date> {
	let (year, month, day) = match parts {
		[year, month, day] if *year > 31 => (i32::try_from(*year).ok()?, *month, *day),
		[month, day, year] => (expand_year(*year)?, *month, *day),
		_ => return None,
	};
	let month = Month::try_from(u8::try_from(month).ok()?).ok()?;

	Date::from_calendar_date(year, month, u8::try_from(day).ok()?).ok()
}

fn expand_year(year: u32) -> Option<i32> {
	let year = i32::try_from(year).ok()?;

	Some(if year < 100 { 2000 + year } else { year })
}

fn parse_clock(token: &str) -> Option<(Time, Option<bool>)> {
	let (clock, meridiem) = if let Some(clock) = token.strip_suffix("pm") {
		(clock, Some(true))
	} else if let Some(clock) = token.strip_suffix("am") {
		(clock, Some(false))
	} else {
		(token, None)
	};

	if !clock.contains(':') {
		// `2pm` style.
		let hour = meridiem.and(clock.parse::<u8>().ok())?;

		return Time::from_hms(hour, 0, 0).ok().map(|time| (time, meridiem));
	}

	let mut parts = clock.split(':').map(str::parse::<u8>);
	let hour = parts.next()?.ok()?;
	let minute = parts.next()?.ok()?;
	let second = parts.next().transpose().ok()?.unwrap_or(0);

	if parts.next().is_some() {
		return None;
	}

	Time::from_hms(hour, minute, second).ok().map(|time| (time, meridiem))
}

fn strip_ordinal(token: &str) -> Option<&str> {
	let digits = token
		.strip_suffix("st")
		.or_else(|| token.strip_suffix("nd"))
		.or_else(|| token.strip_suffix("rd"))
		.or_else(|| token.strip_suffix("th"))
		.unwrap_or(token);

	(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

fn is_weekday(token: &str) -> bool {
	token.len() >= 3 && WEEKDAYS.iter().any(|day| day.starts_with(token))
}

fn month_from_name(token: &str) -> Option<Month> {
	if token.len() < 3 {
		return None;
	}

	let mut month = Month::January;

	for _ in 0..12 {
		let name = month.to_string().to_ascii_lowercase();

		if name.starts_with(token) {
			return Some(month);
		}

		month = month.next();
	}

	None
}
