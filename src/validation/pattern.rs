use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_{|}~-]{1,64}@[a-zA-Z0-9-]{1,63}(?:\.[a-zA-Z0-9-]{1,63})*\.[a-zA-Z]{1,63}$")
        .expect("email regex")
});
static PASSWORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{10,18}$").expect("password regex"));
static NICKNAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S{1,20}$").expect("nickname regex"));
static TITLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.{1,30}$").expect("title regex"));
static CONTENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^.{1,300}$").expect("content regex"));
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}(-?)[0-9]{2}(-?)[0-9]{2}$").expect("date regex"));
static ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9][0-9]*$").expect("id regex"));
static QUERY_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:-1|[1-9][0-9]*)$").expect("query id regex"));
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_]{1,20}$").expect("tag regex"));
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Named matching rule. Doubles as the coercion class of the fields it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    Email,
    Password,
    Nickname,
    Title,
    Content,
    Date,
    /// Positive integer, e.g. a primary key in the path
    Id,
    /// Positive integer or `-1` meaning "not supplied"
    QueryId,
    Tag,
}

/// How a matched value is rewritten before it reaches handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternClass {
    Integer,
    FreeText,
    Plain,
}

impl Pattern {
    pub fn name(&self) -> &'static str {
        match self {
            Pattern::Email => "email",
            Pattern::Password => "password",
            Pattern::Nickname => "nickname",
            Pattern::Title => "title",
            Pattern::Content => "content",
            Pattern::Date => "date",
            Pattern::Id => "id",
            Pattern::QueryId => "query_id",
            Pattern::Tag => "tag",
        }
    }

    pub fn class(&self) -> PatternClass {
        match self {
            Pattern::Id | Pattern::QueryId => PatternClass::Integer,
            Pattern::Title | Pattern::Content => PatternClass::FreeText,
            _ => PatternClass::Plain,
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            Pattern::Email => &EMAIL_REGEX,
            Pattern::Password => &PASSWORD_REGEX,
            Pattern::Nickname => &NICKNAME_REGEX,
            Pattern::Title => &TITLE_REGEX,
            Pattern::Content => &CONTENT_REGEX,
            Pattern::Date => &DATE_REGEX,
            Pattern::Id => &ID_REGEX,
            Pattern::QueryId => &QUERY_ID_REGEX,
            Pattern::Tag => &TAG_REGEX,
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex().is_match(value) && self.extra_checks(value)
    }

    /// Constraints the regex engine cannot express (no look-around support)
    fn extra_checks(&self, value: &str) -> bool {
        match self {
            Pattern::Email => email_shape_ok(value),
            Pattern::Password => {
                value.chars().any(|c| c.is_ascii_alphabetic()) && value.chars().any(|c| c.is_ascii_digit())
            }
            Pattern::Date => is_calendar_date(value),
            _ => true,
        }
    }

    /// Rewrite a matched value per the pattern class. `None` when an integer
    /// does not fit into i64.
    pub fn normalize(&self, value: &str) -> Option<Value> {
        match self.class() {
            PatternClass::Integer => value.parse::<i64>().ok().map(Value::from),
            PatternClass::FreeText => Some(Value::String(collapse_whitespace(value))),
            PatternClass::Plain => Some(Value::String(value.to_string())),
        }
    }
}

pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_REGEX.replace_all(value, " ").into_owned()
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD` into a date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let caps = DATE_REGEX.captures(value)?;
    // Separators must be both present or both absent
    if caps[1] != caps[2] {
        return None;
    }
    let format = if caps[1].is_empty() { "%Y%m%d" } else { "%Y-%m-%d" };
    NaiveDate::parse_from_str(value, format).ok()
}

fn is_calendar_date(value: &str) -> bool {
    parse_date(value).is_some()
}

fn email_shape_ok(value: &str) -> bool {
    let len = value.chars().count();
    if !(5..=320).contains(&len) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.starts_with('.') || local.ends_with('.') || value.contains("..") {
        return false;
    }
    if !(3..=255).contains(&domain.len()) || domain.starts_with('-') || domain.contains("--") {
        return false;
    }
    // Label before the TLD may not end with a hyphen
    match domain.rsplit_once('.') {
        Some((head, _tld)) => !head.ends_with('-'),
        None => false,
    }
}
