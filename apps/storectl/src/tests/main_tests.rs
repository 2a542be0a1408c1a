use super::*;
use chrono::{TimeZone, Utc};
use shared::domain::{StoreId, StoreState};

#[test]
fn parses_delete_with_custom_server() {
    let cli = Cli::try_parse_from([
        "storectl",
        "--server-url",
        "http://stores.internal:3001/",
        "delete",
        "store-abc123",
    ])
    .expect("parse");
    assert_eq!(cli.server_url, "http://stores.internal:3001/");
    assert!(matches!(cli.command, Command::Delete { ref id } if id == "store-abc123"));
}

#[test]
fn get_requires_an_id() {
    assert!(Cli::try_parse_from(["storectl", "get"]).is_err());
}

#[test]
fn formats_record_as_tab_separated_row() {
    let record = StoreRecord {
        id: StoreId::from("store-abc123"),
        state: StoreState::Ready,
        endpoint: "http://store-abc123.localtest.me".into(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    };
    assert_eq!(
        format_record(&record),
        "store-abc123\tReady\thttp://store-abc123.localtest.me\t2024-05-01T12:00:00+00:00"
    );
}
