// Google infra layer.
// - `google_auth.rs` hands out OAuth2 access tokens.
// - `sheets_store.rs` is the spreadsheet-backed record store.
// - `drive_client.rs` is the Drive media store.

#[path = "google_auth.rs"]
pub mod google_auth;

#[path = "sheets_store.rs"]
pub mod sheets_store;

#[path = "drive_client.rs"]
pub mod drive_client;

pub use drive_client::GoogleDriveClient;
pub use google_auth::{
    google_auth_from_env, AccessTokenSource, AuthError, AuthorizedUserAuth, DRIVE_SCOPE,
    SHEETS_SCOPE,
};
pub use sheets_store::SheetsRecordStore;
