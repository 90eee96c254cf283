//! Canned `bq` output and a fake `bq` executable
//!
//! The fake is a shell script that answers `version`, `show --format=json`
//! and `show --schema` the way the real CLI does, so the gateway can be
//! exercised end to end through a real subprocess.

use std::path::{Path, PathBuf};

/// `bq show --schema --format=prettyjson core.events`
pub const EVENTS_SCHEMA: &str = r#"[
  {"name": "event_id", "type": "STRING", "mode": "REQUIRED"},
  {"name": "client_id", "type": "INT64", "mode": "NULLABLE"},
  {"name": "event_ts", "type": "TIMESTAMP", "mode": "NULLABLE"},
  {"name": "payload", "type": "RECORD", "mode": "REPEATED", "fields": [
    {"name": "key", "type": "STRING"}
  ]}
]"#;

/// `bq show --format=json core.events`
pub const EVENTS_METADATA: &str = r#"{
  "kind": "bigquery#table",
  "tableReference": {"projectId": "analytics-prod", "datasetId": "core", "tableId": "events"},
  "type": "TABLE",
  "timePartitioning": {"type": "DAY", "field": "event_ts"},
  "clustering": {"fields": ["client_id"]},
  "numRows": "48213",
  "labels": {"team": "data-eng"}
}"#;

/// Write an executable fake `bq` into `dir`
///
/// Unknown tables exit 1 with BigQuery's "Not found" message; the table
/// `core.garbled` prints non-JSON.
#[cfg(unix)]
pub fn fake_bq(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
case "$1" in
  version) echo "This is BigQuery CLI 2.1.4"; exit 0 ;;
esac
last=""
for arg in "$@"; do last="$arg"; done
case "$*" in
  *--schema*)
    if [ "$last" = "core.events" ]; then cat <<'JSON'
{schema}
JSON
    exit 0; fi ;;
  *)
    if [ "$last" = "core.events" ]; then cat <<'JSON'
{metadata}
JSON
    exit 0; fi ;;
esac
if [ "$last" = "core.garbled" ]; then echo "Welcome to BigQuery!"; exit 0; fi
echo "BigQuery error in show operation: Not found: Table $last" >&2
exit 1
"#,
        schema = EVENTS_SCHEMA,
        metadata = EVENTS_METADATA,
    );

    let path = dir.join("bq");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
