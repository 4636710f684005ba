use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Accepted calendar formats, tried in order.
const CALENDAR_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Platforms refuse scheduled posts closer than this to "now".
const MIN_LEAD_MINUTES: i64 = 10;

/// One scheduled instant in the encodings each platform expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub instant: DateTime<Utc>,
    /// Unix seconds, for the Graph API's `scheduled_publish_time`.
    pub epoch_seconds: i64,
    /// ISO-8601 UTC with a `Z` suffix, for YouTube's `publishAt`.
    pub iso_utc: String,
}

impl Schedule {
    fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            epoch_seconds: instant.timestamp(),
            iso_utc: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Turns calendar cells (local wall-clock strings) into schedules.
#[derive(Debug, Clone)]
pub struct ScheduleCalculator {
    timezone: Tz,
    min_lead: Duration,
}

impl ScheduleCalculator {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            min_lead: Duration::minutes(MIN_LEAD_MINUTES),
        }
    }

    /// Parses a calendar string into an absolute instant. Wall-clock times that
    /// do not exist in the zone (DST gaps) yield `None`; ambiguous ones take the
    /// earlier reading.
    pub fn parse_local(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let naive = CALENDAR_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())?;
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    /// Schedule for `text` relative to `now`. `None` means "publish immediately":
    /// the text is empty, unparseable, or not strictly later than now + lead time.
    pub fn schedule_at(&self, text: &str, now: DateTime<Utc>) -> Option<Schedule> {
        let instant = self.parse_local(text)?;
        if instant <= now + self.min_lead {
            tracing::debug!(calendar = text, "Calendar time too close or in the past, not scheduling");
            return None;
        }
        Some(Schedule::from_instant(instant))
    }

    pub fn schedule(&self, text: &str) -> Option<Schedule> {
        self.schedule_at(text, Utc::now())
    }

    /// `YYYY-MM-DD HH:MM:SS` in the configured zone.
    pub fn format_local(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

impl Default for ScheduleCalculator {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}
