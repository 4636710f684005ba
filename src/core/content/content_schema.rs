//! Positional row layouts for every table in the spreadsheet.
//!
//! Column order is part of the wire contract: every reader of the sheet
//! depends on it, so the lists below must only ever grow at the end.
//! The codecs here are pure functions between cell arrays and typed rows.

use super::content_models::{
    ChannelTarget, ContentRow, ContentTarget, FacebookConfig, HistoryEntry, HistoryStatus,
    PageTarget, Platform, YoutubeConfig,
};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Row does not belong to table {0}")]
    RowMismatch(&'static str),
}

pub const FACEBOOK_CONTENT_COLUMNS: &[&str] = &[
    "stt",
    "media_drive_id",
    "video_name",
    "video_url",
    "content_type",
    "hook",
    "body",
    "cta",
    "contact",
    "product_hashtags",
    "brand_hashtags",
    "thumbnail_url",
    "page_name",
    "page_id",
    "access_token",
    "post_type",
    "calendar",
    "completion_time",
    "post_link",
    "post_id",
    "status",
    "script_action",
];

pub const YOUTUBE_CONTENT_COLUMNS: &[&str] = &[
    "stt",
    "media_drive_id",
    "video_name",
    "video_url",
    "content_type",
    "hook",
    "body",
    "cta",
    "product_hashtags",
    "brand_hashtags",
    "contact",
    "channel_name",
    "channel_id",
    "gmail_channel",
    "post_type",
    "calendar",
    "completion_time",
    "post_link",
    "post_id",
    "status",
    "script_action",
];

pub const HISTORY_COLUMNS: &[&str] = &[
    "media_drive_id",
    "name",
    "content_type",
    "page_name",
    "page_id",
    "access_token",
    "facebook_post_id",
    "channel_name",
    "channel_id",
    "gmail_channel",
    "youtube_post_id",
    "thumbnail",
    "permalink",
    "status",
];

pub const FACEBOOK_CONFIG_COLUMNS: &[&str] = &["page_name", "page_id", "access_token"];

pub const YOUTUBE_CONFIG_COLUMNS: &[&str] =
    &["channel_name", "channel_id", "gmail_channel", "account_id"];

/// Every table the publisher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    FacebookContent,
    YoutubeContent,
    History,
    FacebookConfig,
    YoutubeConfig,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::FacebookContent,
        Table::YoutubeContent,
        Table::History,
        Table::FacebookConfig,
        Table::YoutubeConfig,
    ];

    /// Sheet (tab) name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::FacebookContent => "Facebook_db",
            Table::YoutubeContent => "Youtube_db",
            Table::History => "Published_History",
            Table::FacebookConfig => "Facebook_Config",
            Table::YoutubeConfig => "Youtube_Config",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SchemaError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// The platform whose posts live in this table, if any.
    pub fn platform(&self) -> Option<Platform> {
        match self {
            Table::FacebookContent => Some(Platform::Facebook),
            Table::YoutubeContent => Some(Platform::Youtube),
            _ => None,
        }
    }

    pub fn is_content(&self) -> bool {
        self.platform().is_some()
    }

    pub fn schema(&self) -> Schema {
        let columns = match self {
            Table::FacebookContent => FACEBOOK_CONTENT_COLUMNS,
            Table::YoutubeContent => YOUTUBE_CONTENT_COLUMNS,
            Table::History => HISTORY_COLUMNS,
            Table::FacebookConfig => FACEBOOK_CONFIG_COLUMNS,
            Table::YoutubeConfig => YOUTUBE_CONFIG_COLUMNS,
        };
        Schema {
            table: *self,
            columns,
        }
    }
}

/// Resolves a sheet name to its schema.
pub fn schema_for(table_name: &str) -> Result<Schema, SchemaError> {
    Table::from_name(table_name).map(|table| table.schema())
}

/// A typed row from any table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Content(ContentRow),
    History(HistoryEntry),
    FacebookConfig(FacebookConfig),
    YoutubeConfig(YoutubeConfig),
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub table: Table,
    pub columns: &'static [&'static str],
}

/// Reads cells by column name, treating missing trailing cells as empty.
struct Cells<'a> {
    columns: &'static [&'static str],
    cells: &'a [String],
}

impl Cells<'_> {
    fn get(&self, column: &str) -> String {
        self.columns
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.cells.get(i))
            .cloned()
            .unwrap_or_default()
    }
}

impl Schema {
    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Decodes one data row. Short rows are right-padded with empty cells.
    pub fn decode(&self, cells: &[String]) -> TableRow {
        let c = Cells {
            columns: self.columns,
            cells,
        };
        match self.table {
            Table::FacebookContent | Table::YoutubeContent => {
                let target = if self.table == Table::FacebookContent {
                    ContentTarget::Page(PageTarget {
                        name: c.get("page_name"),
                        id: c.get("page_id"),
                        access_token: c.get("access_token"),
                    })
                } else {
                    ContentTarget::Channel(ChannelTarget {
                        name: c.get("channel_name"),
                        id: c.get("channel_id"),
                        gmail: c.get("gmail_channel"),
                    })
                };
                TableRow::Content(ContentRow {
                    stt: c.get("stt"),
                    media_drive_id: c.get("media_drive_id"),
                    video_name: c.get("video_name"),
                    video_url: c.get("video_url"),
                    content_type: c.get("content_type"),
                    hook: c.get("hook"),
                    body: c.get("body"),
                    cta: c.get("cta"),
                    contact: c.get("contact"),
                    product_hashtags: c.get("product_hashtags"),
                    brand_hashtags: c.get("brand_hashtags"),
                    thumbnail_url: c.get("thumbnail_url"),
                    target,
                    post_type: c.get("post_type"),
                    calendar: c.get("calendar"),
                    completion_time: c.get("completion_time"),
                    post_link: c.get("post_link"),
                    post_id: c.get("post_id"),
                    status: c.get("status"),
                    script_action: c.get("script_action"),
                })
            }
            Table::History => TableRow::History(HistoryEntry {
                media_drive_id: c.get("media_drive_id"),
                name: c.get("name"),
                content_type: c.get("content_type"),
                page_name: c.get("page_name"),
                page_id: c.get("page_id"),
                access_token: c.get("access_token"),
                facebook_post_id: c.get("facebook_post_id"),
                channel_name: c.get("channel_name"),
                channel_id: c.get("channel_id"),
                gmail_channel: c.get("gmail_channel"),
                youtube_post_id: c.get("youtube_post_id"),
                thumbnail: c.get("thumbnail"),
                permalink: c.get("permalink"),
                status: HistoryStatus::from(c.get("status")),
            }),
            Table::FacebookConfig => TableRow::FacebookConfig(FacebookConfig {
                page_name: c.get("page_name"),
                page_id: c.get("page_id"),
                access_token: c.get("access_token"),
            }),
            Table::YoutubeConfig => TableRow::YoutubeConfig(YoutubeConfig {
                channel_name: c.get("channel_name"),
                channel_id: c.get("channel_id"),
                gmail_channel: c.get("gmail_channel"),
                account_id: c.get("account_id"),
            }),
        }
    }

    /// Encodes a typed row into exactly `width()` cells.
    pub fn encode(&self, row: &TableRow) -> Result<Vec<String>, SchemaError> {
        let pairs: Vec<(&str, &str)> = match (self.table, row) {
            (Table::FacebookContent, TableRow::Content(r)) => {
                let ContentTarget::Page(page) = &r.target else {
                    return Err(SchemaError::RowMismatch(self.table.name()));
                };
                let mut pairs = content_common(r);
                pairs.extend([
                    ("page_name", page.name.as_str()),
                    ("page_id", page.id.as_str()),
                    ("access_token", page.access_token.as_str()),
                ]);
                pairs
            }
            (Table::YoutubeContent, TableRow::Content(r)) => {
                let ContentTarget::Channel(channel) = &r.target else {
                    return Err(SchemaError::RowMismatch(self.table.name()));
                };
                let mut pairs = content_common(r);
                pairs.extend([
                    ("channel_name", channel.name.as_str()),
                    ("channel_id", channel.id.as_str()),
                    ("gmail_channel", channel.gmail.as_str()),
                ]);
                pairs
            }
            (Table::History, TableRow::History(h)) => vec![
                ("media_drive_id", h.media_drive_id.as_str()),
                ("name", h.name.as_str()),
                ("content_type", h.content_type.as_str()),
                ("page_name", h.page_name.as_str()),
                ("page_id", h.page_id.as_str()),
                ("access_token", h.access_token.as_str()),
                ("facebook_post_id", h.facebook_post_id.as_str()),
                ("channel_name", h.channel_name.as_str()),
                ("channel_id", h.channel_id.as_str()),
                ("gmail_channel", h.gmail_channel.as_str()),
                ("youtube_post_id", h.youtube_post_id.as_str()),
                ("thumbnail", h.thumbnail.as_str()),
                ("permalink", h.permalink.as_str()),
                ("status", h.status.as_str()),
            ],
            (Table::FacebookConfig, TableRow::FacebookConfig(f)) => vec![
                ("page_name", f.page_name.as_str()),
                ("page_id", f.page_id.as_str()),
                ("access_token", f.access_token.as_str()),
            ],
            (Table::YoutubeConfig, TableRow::YoutubeConfig(y)) => vec![
                ("channel_name", y.channel_name.as_str()),
                ("channel_id", y.channel_id.as_str()),
                ("gmail_channel", y.gmail_channel.as_str()),
                ("account_id", y.account_id.as_str()),
            ],
            _ => return Err(SchemaError::RowMismatch(self.table.name())),
        };

        Ok(self
            .columns
            .iter()
            .map(|column| {
                pairs
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Column-keyed JSON object for a row, the shape the front door speaks.
    pub fn to_object(&self, row: &TableRow) -> Result<Map<String, Value>, SchemaError> {
        let cells = self.encode(row)?;
        Ok(self
            .columns
            .iter()
            .zip(cells)
            .map(|(column, cell)| (column.to_string(), Value::String(cell)))
            .collect())
    }

    /// Builds a row from a column-keyed JSON object. Unknown keys are ignored,
    /// missing ones become empty cells and non-string scalars are stringified.
    pub fn from_object(&self, object: &Map<String, Value>) -> TableRow {
        let cells: Vec<String> = self
            .columns
            .iter()
            .map(|column| match object.get(*column) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        self.decode(&cells)
    }
}

fn content_common(r: &ContentRow) -> Vec<(&'static str, &str)> {
    vec![
        ("stt", r.stt.as_str()),
        ("media_drive_id", r.media_drive_id.as_str()),
        ("video_name", r.video_name.as_str()),
        ("video_url", r.video_url.as_str()),
        ("content_type", r.content_type.as_str()),
        ("hook", r.hook.as_str()),
        ("body", r.body.as_str()),
        ("cta", r.cta.as_str()),
        ("contact", r.contact.as_str()),
        ("product_hashtags", r.product_hashtags.as_str()),
        ("brand_hashtags", r.brand_hashtags.as_str()),
        ("thumbnail_url", r.thumbnail_url.as_str()),
        ("post_type", r.post_type.as_str()),
        ("calendar", r.calendar.as_str()),
        ("completion_time", r.completion_time.as_str()),
        ("post_link", r.post_link.as_str()),
        ("post_id", r.post_id.as_str()),
        ("status", r.status.as_str()),
        ("script_action", r.script_action.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_schema_for_known_and_unknown_tables() {
        assert_eq!(schema_for("Facebook_db").unwrap().width(), 22);
        assert_eq!(schema_for("youtube_db").unwrap().width(), 21);
        assert_eq!(schema_for("Published_History").unwrap().width(), 14);
        assert!(matches!(
            schema_for("Media_Calendar"),
            Err(SchemaError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_table_platform_is_fixed_by_schema() {
        assert_eq!(Table::FacebookContent.platform(), Some(Platform::Facebook));
        assert_eq!(Table::YoutubeContent.platform(), Some(Platform::Youtube));
        assert_eq!(Table::History.platform(), None);
    }

    #[test]
    fn test_short_facebook_row_is_padded() {
        let schema = Table::FacebookContent.schema();
        let row = schema.decode(&cells(&["1", "", "Launch", "https://x/y", "", "Hello"]));
        let TableRow::Content(content) = row else {
            panic!("expected content row");
        };
        assert_eq!(content.video_name, "Launch");
        assert_eq!(content.hook, "Hello");
        assert_eq!(content.post_type, "");
        assert_eq!(content.target, ContentTarget::Page(PageTarget::default()));
    }

    #[test]
    fn test_youtube_columns_keep_their_own_order() {
        let schema = Table::YoutubeContent.schema();
        let mut raw = vec![String::new(); schema.width()];
        raw[8] = "#product".into();
        raw[10] = "0900".into();
        raw[12] = "UC123".into();
        let TableRow::Content(content) = schema.decode(&raw) else {
            panic!("expected content row");
        };
        assert_eq!(content.product_hashtags, "#product");
        assert_eq!(content.contact, "0900");
        assert_eq!(
            content.target,
            ContentTarget::Channel(ChannelTarget {
                id: "UC123".into(),
                ..Default::default()
            })
        );

        let encoded = schema.encode(&TableRow::Content(content)).unwrap();
        assert_eq!(encoded, raw);
    }

    #[test]
    fn test_history_empty_status_reads_as_success() {
        let schema = Table::History.schema();
        let TableRow::History(entry) = schema.decode(&cells(&["d", "n", "Video"])) else {
            panic!("expected history row");
        };
        assert_eq!(entry.status, HistoryStatus::Success);
        assert_eq!(schema.encode(&TableRow::History(entry)).unwrap()[13], "SUCCESS");
    }

    #[test]
    fn test_encode_rejects_wrong_target() {
        let row = TableRow::Content(ContentRow::new(ContentTarget::Channel(
            ChannelTarget::default(),
        )));
        assert!(matches!(
            Table::FacebookContent.schema().encode(&row),
            Err(SchemaError::RowMismatch("Facebook_db"))
        ));
    }

    #[test]
    fn test_object_mapping() {
        let schema = Table::YoutubeConfig.schema();
        let mut object = Map::new();
        object.insert("channel_name".into(), Value::String("Main".into()));
        object.insert("account_id".into(), Value::from(42));
        object.insert("unexpected".into(), Value::Bool(true));

        let row = schema.from_object(&object);
        assert_eq!(
            row,
            TableRow::YoutubeConfig(YoutubeConfig {
                channel_name: "Main".into(),
                account_id: "42".into(),
                ..Default::default()
            })
        );
        let back = schema.to_object(&row).unwrap();
        assert_eq!(back.len(), 4);
        assert_eq!(back["channel_id"], Value::String(String::new()));
    }
}
