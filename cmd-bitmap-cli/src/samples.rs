//! Directory-backed sample payloads
//!
//! Looks up `<dir>/<command-id>.txt`. Each non-empty line is one payload in
//! hex, optionally prefixed by an RFC 3339 capture time; `#` starts a
//! comment. A missing file means no samples.

use chrono::{DateTime, Utc};
use cmd_bitmap::{BitmapError, CancelTicket, SampleFetcher, SamplePayload};
use std::path::PathBuf;

pub struct DirectorySampleFetcher {
    dir: PathBuf,
}

impl DirectorySampleFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SampleFetcher for DirectorySampleFetcher {
    async fn fetch(
        &self,
        command_id: &str,
        cancel: &CancelTicket,
    ) -> cmd_bitmap::Result<Vec<SamplePayload>> {
        let path = self.dir.join(format!("{}.txt", command_id));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No sample file for {} at {:?}", command_id, path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        cancel.check()?;

        let samples = parse_samples(&content)?;
        log::debug!("Loaded {} sample(s) for {}", samples.len(), command_id);
        Ok(samples)
    }
}

/// Parse a sample file's content
pub fn parse_samples(content: &str) -> cmd_bitmap::Result<Vec<SamplePayload>> {
    let mut samples = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let (timestamp, hex) = match line.split_once(char::is_whitespace) {
            Some((first, rest)) => match DateTime::parse_from_rfc3339(first) {
                Ok(ts) => (Some(ts.with_timezone(&Utc)), rest),
                Err(_) => (None, line),
            },
            None => (None, line),
        };

        let mut sample = SamplePayload::from_hex(hex).map_err(|e| {
            BitmapError::InvalidInput(format!("sample line {}: {}", number + 1, e))
        })?;
        if let Some(ts) = timestamp {
            sample = sample.with_timestamp(ts);
        }
        samples.push(sample);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmd_bitmap::{Renderer, SessionConfig, UpdateOutcome, UpdateSession, UpdateTarget};
    use serde_json::json;

    #[test]
    fn test_parse_samples() {
        let content = "\
# captured on the bench
41 0D 32
2024-05-01T10:00:00Z 410D00   # idle

";
        let samples = parse_samples(content).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].bytes, vec![0x41, 0x0D, 0x32]);
        assert!(samples[0].received_at.is_none());
        assert_eq!(samples[1].bytes, vec![0x41, 0x0D, 0x00]);
        assert!(samples[1].received_at.is_some());
    }

    #[test]
    fn test_parse_samples_reports_line() {
        let err = parse_samples("41 0D\nZZ").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_fetch_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("7E0.010D.txt"), "41 0D 32\n").unwrap();

        let surface = std::sync::Arc::new(crate::page::PageSurface::new());
        let session = UpdateSession::new(
            Renderer::default(),
            DirectorySampleFetcher::new(dir.path()),
            surface.clone(),
            SessionConfig::new(),
        );

        let command = json!({"hdr": "7E0", "cmd": {"01": "0D"},
                             "signals": [{"id": "SPD", "fmt": {"bix": 16, "len": 8}}]});
        let outcome = session.update_now(UpdateTarget::new(command)).await;
        assert_eq!(outcome, UpdateOutcome::Enriched);
        assert!(surface.sections()[0].1.contains(">41 0D 32</code>"));

        // Missing file is not an error
        let other = json!({"hdr": "7E0", "cmd": {"01": "0C"}, "signals": [{"id": "RPM"}]});
        let outcome = session.update_now(UpdateTarget::new(other)).await;
        assert_eq!(outcome, UpdateOutcome::Committed);
        assert_eq!(surface.sections().len(), 2);
    }
}
