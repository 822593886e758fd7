use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const MONTH_KEY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]");
pub const MONTH_LABEL_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [year]");

const ISO_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const SHORT_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:short], [year]");

/// A post entry read from the server-rendered list.
///
/// Derived data only; the host page remains the source of truth. `id` is the
/// position of the entry in that list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: usize,
    pub title: String,
    pub href: Option<String>,
    pub date_text: String,
    pub published_at: OffsetDateTime,
    /// Set when the date could not be parsed and "now" was used instead.
    pub date_fallback: bool,
    pub year: i32,
    pub month_key: String,
    pub month_label: String,
    search_text: String,
}

impl PostRecord {
    pub fn new(
        id: usize,
        title: impl Into<String>,
        href: Option<String>,
        date_text: impl Into<String>,
        machine_date: Option<&str>,
        now: OffsetDateTime,
    ) -> Self {
        let title = title.into();
        let date_text = date_text.into();

        let parsed = machine_date
            .and_then(parse_published)
            .or_else(|| parse_published(&date_text));
        let (published_at, date_fallback) = match parsed {
            Some(value) => (value, false),
            None => (now, true),
        };

        let date = published_at.date();
        let visible_date = if date_text.trim().is_empty() {
            format_human_date(date)
        } else {
            date_text.trim().to_string()
        };
        let search_text = format!("{} {}", title.trim(), visible_date).to_lowercase();

        Self {
            id,
            title,
            href,
            date_text: visible_date,
            published_at,
            date_fallback,
            year: date.year(),
            month_key: month_key_for(date),
            month_label: month_label_for(date),
            search_text,
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }
}

/// Parse the date forms blog lists carry: RFC 3339 timestamps, bare ISO dates,
/// and the two common human renderings.
pub fn parse_published(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(value);
    }

    [ISO_DATE_FORMAT, HUMAN_DATE_FORMAT, SHORT_DATE_FORMAT]
        .into_iter()
        .find_map(|format| Date::parse(trimmed, format).ok())
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

pub fn month_key_for(date: Date) -> String {
    date.format(MONTH_KEY_FORMAT)
        .unwrap_or_else(|_| format!("{}-{:02}", date.year(), u8::from(date.month())))
}

pub fn month_label_for(date: Date) -> String {
    date.format(MONTH_LABEL_FORMAT)
        .unwrap_or_else(|_| format!("{} {}", date.month(), date.year()))
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| format!("{} {}, {}", date.month(), date.day(), date.year()))
}
