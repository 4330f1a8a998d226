//! Video capture date via `ffprobe`.
//!
//! Container metadata is read by running
//! `ffprobe -show_format -show_streams -print_format json` and taking the
//! first stream `creation_time` tag, falling back to the format-level tag.
//! A missing binary or a non-zero exit simply means "no date".

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<TaggedSection>,
    format: Option<TaggedSection>,
}

#[derive(Debug, Deserialize)]
struct TaggedSection {
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl TaggedSection {
    fn creation_time(&self) -> Option<&str> {
        self.tags.get("creation_time").map(String::as_str)
    }
}

/// Reads video creation dates with an external `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeReader {
    binary: PathBuf,
}

impl FfprobeReader {
    /// Use `ffprobe` from `PATH`
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffprobe"),
        }
    }

    /// Use a specific ffprobe binary
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Capture date of a video in local wall-clock time
    pub fn capture_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let output = Command::new(&self.binary)
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(path)
            .args(["-show_format", "-show_streams", "-print_format", "json"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(path = %path.display(), status = %output.status, "ffprobe failed");
                return None;
            }
            Err(e) => {
                debug!(binary = %self.binary.display(), error = %e, "ffprobe unavailable");
                return None;
            }
        };

        let json = String::from_utf8_lossy(&output.stdout);
        parse_probe_creation_time(&json)
    }
}

impl Default for FfprobeReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the creation time from ffprobe JSON output.
///
/// Streams are searched first, in order; an unparseable stream value is
/// skipped rather than treated as an error.
pub fn parse_probe_creation_time(json: &str) -> Option<NaiveDateTime> {
    let probe: ProbeOutput = match serde_json::from_str(json) {
        Ok(probe) => probe,
        Err(e) => {
            debug!(error = %e, "unexpected ffprobe output");
            return None;
        }
    };

    probe
        .streams
        .iter()
        .chain(probe.format.iter())
        .filter_map(TaggedSection::creation_time)
        .find_map(parse_creation_time)
}

/// Parse an RFC 3339 `creation_time` and convert it to the local calendar
pub fn parse_creation_time(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(rfc3339: &str) -> NaiveDateTime {
        let utc = DateTime::parse_from_rfc3339(rfc3339).unwrap();
        Local.from_utc_datetime(&utc.naive_utc()).naive_local()
    }

    #[test]
    fn stream_tag_wins() {
        let json = r#"{
            "streams": [
                {"index": 0, "tags": {"creation_time": "2023-07-01T10:15:00.000000Z"}},
                {"index": 1, "tags": {"creation_time": "2020-01-01T00:00:00.000000Z"}}
            ],
            "format": {"tags": {"creation_time": "2019-01-01T00:00:00.000000Z"}}
        }"#;

        assert_eq!(
            parse_probe_creation_time(json),
            Some(local("2023-07-01T10:15:00Z"))
        );
    }

    #[test]
    fn falls_back_to_format_tag() {
        let json = r#"{
            "streams": [{"index": 0, "tags": {"language": "und"}}, {"index": 1}],
            "format": {"filename": "clip.mp4", "tags": {"creation_time": "2022-12-31T23:00:00+01:00"}}
        }"#;

        assert_eq!(
            parse_probe_creation_time(json),
            Some(local("2022-12-31T22:00:00Z"))
        );
    }

    #[test]
    fn unparseable_stream_value_is_skipped() {
        let json = r#"{
            "streams": [{"tags": {"creation_time": "garbage"}}],
            "format": {"tags": {"creation_time": "2021-05-05T05:05:05Z"}}
        }"#;

        assert_eq!(
            parse_probe_creation_time(json),
            Some(local("2021-05-05T05:05:05Z"))
        );
    }

    #[test]
    fn no_tags_means_no_date() {
        assert_eq!(parse_probe_creation_time(r#"{"streams": []}"#), None);
        assert_eq!(parse_probe_creation_time("not json"), None);
    }

    #[test]
    fn missing_binary_means_no_date() {
        let reader = FfprobeReader::with_binary("/nonexistent/ffprobe-binary");
        assert_eq!(reader.capture_date(Path::new("/tmp/clip.mp4")), None);
    }
}
