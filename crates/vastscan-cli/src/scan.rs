//! `scan` command: resolve a tag one or more times and hand records to storage.
//!
//! Storage is a JSON-lines stream. Each line is one [`AdRecord`] plus the
//! caller-side context the resolver does not know about.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vastscan_resolver::{AdRecord, ScanConfig, TagScanner};

pub(crate) struct ScanOptions {
    pub calls: u32,
    pub output: Option<PathBuf>,
    pub max_depth: Option<u32>,
    pub parallel: bool,
}

/// One stored row: a resolver record plus caller context.
#[derive(Debug, Serialize)]
struct StoredAd<'a> {
    channel_name: Option<&'a str>,
    resolved_at: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a AdRecord,
}

/// Run `options.calls` resolutions of `tag_url` and write every record.
///
/// Prints `Call i: <outcome>` to stderr per call. A call that finds no ads is
/// reported, not treated as an error.
///
/// # Errors
///
/// Returns an error if `calls` is outside `1..=max_calls`, the scanner cannot
/// be built, or the output cannot be written.
pub(crate) async fn run_scan(
    config: &vastscan_core::AppConfig,
    tag_url: &str,
    options: &ScanOptions,
) -> anyhow::Result<()> {
    if options.calls == 0 || options.calls > config.max_calls {
        anyhow::bail!(
            "--calls must be between 1 and {} (got {})",
            config.max_calls,
            options.calls
        );
    }

    let mut scan_config = ScanConfig::from_app_config(config);
    if let Some(depth) = options.max_depth {
        scan_config.max_depth = depth;
    }
    scan_config.parallel_branches |= options.parallel;

    let scanner = TagScanner::new(&scan_config)
        .map_err(|e| anyhow::anyhow!("failed to build tag scanner: {e}"))?;

    let channel_name = channel_name_from_tag_url(tag_url);
    let mut sink = open_sink(options.output.as_ref())?;
    let mut total = 0usize;

    for call_number in 1..=options.calls {
        let report = scanner.scan(tag_url, call_number).await;
        let resolved_at = Utc::now();
        for record in &report.records {
            let row = StoredAd {
                channel_name: channel_name.as_deref(),
                resolved_at,
                record,
            };
            writeln!(sink, "{}", serde_json::to_string(&row)?)?;
        }
        total += report.count;
        eprintln!("Call {call_number}: {}", report.outcome);
    }
    sink.flush()?;

    tracing::info!(
        tag_url,
        calls = options.calls,
        total,
        channel = channel_name.as_deref().unwrap_or(""),
        "scan finished"
    );
    Ok(())
}

fn open_sink(output: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("cannot open {}: {e}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

/// Channel name carried in the tag URL's `csid` query parameter.
///
/// `csid` looks like `<network>/<channel>/...`; the second segment is the
/// channel. Returns `None` when the URL does not parse, has no `csid`, or the
/// value has fewer than two segments.
pub(crate) fn channel_name_from_tag_url(tag_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(tag_url).ok()?;
    let csid = url
        .query_pairs()
        .find(|(key, _)| key == "csid")
        .map(|(_, value)| value.into_owned())?;
    csid.split('/').nth(1).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_is_second_csid_segment() {
        assert_eq!(
            channel_name_from_tag_url(
                "http://ads.example/ad/g/1?nw=1&csid=roku%2Fnewschannel%2Flive&caid=x"
            )
            .as_deref(),
            Some("newschannel")
        );
    }

    #[test]
    fn channel_name_accepts_unencoded_slashes() {
        assert_eq!(
            channel_name_from_tag_url("http://ads.example/ad?csid=net/sports").as_deref(),
            Some("sports")
        );
    }

    #[test]
    fn channel_name_needs_two_segments() {
        assert!(channel_name_from_tag_url("http://ads.example/ad?csid=single").is_none());
    }

    #[test]
    fn channel_name_missing_csid() {
        assert!(channel_name_from_tag_url("http://ads.example/ad?nw=1").is_none());
    }

    #[test]
    fn channel_name_unparseable_url() {
        assert!(channel_name_from_tag_url("not a url").is_none());
    }

    #[test]
    fn stored_ad_flattens_record() {
        let origin = vastscan_resolver::OriginMetadata {
            ad_id: "w".to_string(),
            creative_id: None,
            ssai_creative_id: None,
            title: None,
            duration: None,
            clickthrough: None,
            media_urls: Vec::new(),
            adomain: None,
            creative_hash: "h0".to_string(),
        };
        let record = AdRecord {
            call_number: 2,
            ad_id: "a".to_string(),
            creative_id: Some("c".to_string()),
            ssai_creative_id: None,
            title: None,
            duration: None,
            clickthrough: None,
            media_urls: vec!["http://x/1.mp4".to_string()],
            adomain: Some("foo.com".to_string()),
            creative_hash: "h1".to_string(),
            raw_xml: "<Ad/>".to_string(),
            wrapped: true,
            origin_metadata: origin,
        };
        let row = StoredAd {
            channel_name: Some("news"),
            resolved_at: Utc::now(),
            record: &record,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["channel_name"], "news");
        assert_eq!(json["call_number"], 2);
        assert_eq!(json["ad_id"], "a");
        assert_eq!(json["origin_metadata"]["ad_id"], "w");
        assert!(json["resolved_at"].is_string());
    }
}
