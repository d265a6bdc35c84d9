use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// The partition calendar runs at this fixed offset from UTC.
const PARTITION_OFFSET_HOURS: i32 = 7;

/// Calendar day before `now`, with `now` evaluated at the fixed UTC+7 offset.
pub fn previous_day_at(now: DateTime<Utc>) -> NaiveDate {
    let offset = FixedOffset::east_opt(PARTITION_OFFSET_HOURS * 3600).unwrap();
    now.with_timezone(&offset).date_naive() - Duration::days(1)
}

/// The partition date for this invocation. This is the only place the date is
/// decided; callers cannot override it.
pub fn previous_day() -> NaiveDate {
    previous_day_at(Utc::now())
}

/// One day's worth of data for one bucket. Immutable once computed; the URIs
/// it derives define the entire blast radius of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    bucket: String,
    date: NaiveDate,
}

impl Partition {
    pub fn new(bucket: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            bucket: bucket.into(),
            date,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Raw partition object. Year stays 4-digit, month unpadded.
    pub fn input_uri(&self) -> String {
        format!(
            "gs://{}/merchant_transactions/raw/{}/{}/transactions_{}.parquet",
            self.bucket,
            self.date.year(),
            self.date.month(),
            self.date.format("%Y-%m-%d"),
        )
    }

    /// Destination for the staged aggregate, same formatting rules.
    pub fn output_uri(&self) -> String {
        format!(
            "gs://{}/merchant_transactions/processed/{}/{}/transactions_agg_{}.parquet",
            self.bucket,
            self.date.year(),
            self.date.month(),
            self.date.format("%Y-%m-%d"),
        )
    }
}

/// Components recovered from a partition URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub bucket: String,
    pub year: i32,
    pub month: u32,
    pub date: NaiveDate,
}

static URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^gs://([^/]+)/merchant_transactions/(?:raw|processed)/(\d{4})/(\d{1,2})/transactions_(?:agg_)?(\d{4}-\d{2}-\d{2})\.parquet$",
    )
    .unwrap()
});

/// Parse a raw or processed partition URI back into its components.
pub fn parse_uri(uri: &str) -> Option<ParsedUri> {
    let caps = URI_RE.captures(uri)?;
    Some(ParsedUri {
        bucket: caps[1].to_string(),
        year: caps[2].parse().ok()?,
        month: caps[3].parse().ok()?,
        date: caps[4].parse().ok()?,
    })
}
