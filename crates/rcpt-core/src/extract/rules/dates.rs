//! Date normalization for receipt text.
//!
//! Receipts print dates in many shapes and OCR adds its own noise (a
//! letter `O` where a zero should be). [`DateNormalizer`] tries a fixed,
//! ordered list of formats and turns the first match into a calendar
//! date; [`DateExtractor`] finds date-like substrings in a whole document.

use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

use super::patterns::date_patterns;
use super::{ExtractionMatch, FieldExtractor};
use crate::error::DateError;

const FULL_MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";
const SHORT_MONTHS: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

/// Two-digit years at or below this value land in the 2000s, above it in the 1900s.
pub const TWO_DIGIT_YEAR_PIVOT: i32 = 68;

/// One accepted date layout.
struct DateFormat {
    name: &'static str,
    regex: Regex,
    /// Month names present: match against the raw token, not the O-to-0 cleaned one.
    named_month: bool,
}

impl DateFormat {
    fn numeric(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            named_month: false,
        }
    }

    fn named(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            named_month: true,
        }
    }
}

lazy_static! {
    /// Most specific first. The first format that yields a valid date wins.
    static ref DATE_FORMATS: Vec<DateFormat> = vec![
        DateFormat::numeric(
            "month/day/year hour:minute",
            r"^(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<y>\d{4})\s+(?P<H>\d{1,2}):(?P<M>\d{1,2})$",
        ),
        DateFormat::numeric(
            "month/day/yy hour:minute",
            r"^(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<yy>\d{2})\s+(?P<H>\d{1,2}):(?P<M>\d{1,2})$",
        ),
        DateFormat::numeric(
            "month/day/year hour:minute:second am/pm",
            r"^(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<y>\d{4})\s+(?P<I>\d{1,2}):(?P<M>\d{1,2}):(?P<S>\d{1,2})\s+(?P<p>[AaPp][Mm])$",
        ),
        DateFormat::numeric(
            "month/day/year",
            r"^(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<y>\d{4})$",
        ),
        DateFormat::numeric(
            "month/day/yy",
            r"^(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<yy>\d{2})$",
        ),
        DateFormat::numeric(
            "day-month-year",
            r"^(?P<d>\d{1,2})-(?P<m>\d{1,2})-(?P<y>\d{4})$",
        ),
        DateFormat::numeric(
            "year-month-day",
            r"^(?P<y>\d{4})-(?P<m>\d{1,2})-(?P<d>\d{1,2})$",
        ),
        DateFormat::named(
            "day month-name year",
            &format!(r"(?i)^(?P<d>[\dOo]{{1,2}})\s+(?P<mon>{FULL_MONTHS})\s+(?P<y>[\dOo]{{4}})$"),
        ),
        DateFormat::named(
            "day month-abbr year",
            &format!(r"(?i)^(?P<d>[\dOo]{{1,2}})\s+(?P<mon>{SHORT_MONTHS})\s+(?P<y>[\dOo]{{4}})$"),
        ),
        DateFormat::named(
            "month-name day, year",
            &format!(r"(?i)^(?P<mon>{FULL_MONTHS})\s+(?P<d>[\dOo]{{1,2}}),?\s+(?P<y>[\dOo]{{4}})$"),
        ),
        DateFormat::named(
            "month-abbr day, year",
            &format!(r"(?i)^(?P<mon>{SHORT_MONTHS})\s+(?P<d>[\dOo]{{1,2}}),?\s+(?P<y>[\dOo]{{4}})$"),
        ),
        DateFormat::numeric(
            "year/month/day",
            r"^(?P<y>\d{4})/(?P<m>\d{1,2})/(?P<d>\d{1,2})$",
        ),
    ];
}

/// Turns a single raw date token into a calendar date.
pub struct DateNormalizer;

impl DateNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw token, reporting why it failed.
    pub fn parse(&self, raw: &str) -> Result<NaiveDate, DateError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DateError::Empty);
        }

        let cleaned = replace_ocr_zeros(raw);

        for format in DATE_FORMATS.iter() {
            let candidate = if format.named_month { raw } else { cleaned.as_str() };
            let Some(caps) = format.regex.captures(candidate) else {
                continue;
            };
            match date_from_captures(&caps) {
                Some(date) => {
                    trace!("{raw:?} matched {}", format.name);
                    return Ok(date);
                }
                None => trace!("{raw:?} has the shape of {} but is not a valid date", format.name),
            }
        }

        Err(DateError::NoMatchingFormat(raw.to_string()))
    }

    /// Normalize to `YYYY-MM-DD`, or `None` when no format applies.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        self.parse(raw).ok().map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a free-form date token to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    DateNormalizer::new().normalize(raw)
}

/// Finds and normalizes every date-like substring of a document.
pub struct DateExtractor {
    normalizer: DateNormalizer,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self {
            normalizer: DateNormalizer::new(),
        }
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    /// Every pattern runs over the whole text; matches that do not
    /// normalize are dropped. The same date may be reported more than once.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for pattern in date_patterns() {
            for m in pattern.find_iter(text) {
                match self.normalizer.parse(m.as_str()) {
                    Ok(date) => results.push(
                        ExtractionMatch::new(date, m.as_str()).with_position(m.start(), m.end()),
                    ),
                    Err(e) => trace!("dropping date candidate: {e}"),
                }
            }
        }

        results
    }
}

fn replace_ocr_zeros(s: &str) -> String {
    s.replace(['O', 'o'], "0")
}

fn date_from_captures(caps: &Captures<'_>) -> Option<NaiveDate> {
    let year = if let Some(y) = caps.name("y") {
        number::<i32>(y.as_str())?
    } else {
        expand_two_digit_year(number(caps.name("yy")?.as_str())?)
    };

    let month = match caps.name("mon") {
        Some(name) => month_from_name(name.as_str())?,
        None => number(caps.name("m")?.as_str())?,
    };
    let day = number(caps.name("d")?.as_str())?;

    if !valid_time(caps) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Any time component must be a real clock time, even though it is dropped.
fn valid_time(caps: &Captures<'_>) -> bool {
    let minute = caps.name("M").and_then(|m| number::<u32>(m.as_str()));
    let second = match caps.name("S") {
        Some(s) => number::<u32>(s.as_str()),
        None => Some(0),
    };

    if let Some(h) = caps.name("H") {
        let (Some(hour), Some(minute), Some(second)) = (number::<u32>(h.as_str()), minute, second)
        else {
            return false;
        };
        return NaiveTime::from_hms_opt(hour, minute, second).is_some();
    }

    if let Some(i) = caps.name("I") {
        let (Some(hour), Some(minute), Some(second)) = (number::<u32>(i.as_str()), minute, second)
        else {
            return false;
        };
        return (1..=12).contains(&hour) && NaiveTime::from_hms_opt(hour, minute, second).is_some();
    }

    true
}

/// Map a two-digit year onto 1969–2068.
pub fn expand_two_digit_year(yy: i32) -> i32 {
    if yy <= TWO_DIGIT_YEAR_PIVOT {
        2000 + yy
    } else {
        1900 + yy
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn number<T: std::str::FromStr>(digits: &str) -> Option<T> {
    replace_ocr_zeros(digits).parse().ok()
}
