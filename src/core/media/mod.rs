// Media acquisition: drive id parsing, the drive store port and downloads.

pub mod drive_id;
pub mod drive_store;
pub mod media_fetcher;

pub use drive_id::{json_list, looks_like_json_list, resolve_drive_id};
pub use drive_store::{
    ByteStream, DriveError, DriveFile, DriveMetadata, DriveStore, MediaKind, NewFile,
};
pub use media_fetcher::{FetchError, MediaFetcher, TempMedia};
