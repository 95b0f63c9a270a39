//! Packaging of terminal ads into storage records.

use crate::fallback::resolve_advertiser_domain;
use crate::fetch::DocumentFetcher;
use crate::hash::creative_hash;
use crate::types::{AdRecord, ResolvedAd};

/// Turn resolved ads into records, in order.
///
/// Ads without a declared advertiser domain but with a click-through URL get
/// one lookup to recover it. The recovered domain feeds the record's hash;
/// `origin_metadata` is left exactly as extracted.
pub async fn assemble_batch(
    fetcher: &DocumentFetcher,
    ads: Vec<ResolvedAd>,
    call_number: u32,
) -> Vec<AdRecord> {
    let mut records = Vec::with_capacity(ads.len());
    for resolved in ads {
        let adomain = match (&resolved.ad.adomain, &resolved.ad.click_url) {
            (Some(declared), _) => Some(declared.clone()),
            (None, Some(click_url)) => resolve_advertiser_domain(fetcher, click_url).await,
            (None, None) => None,
        };
        records.push(build_record(resolved, adomain, call_number));
    }
    records
}

/// Build one record with `adomain` as the effective advertiser domain.
#[must_use]
pub fn build_record(resolved: ResolvedAd, adomain: Option<String>, call_number: u32) -> AdRecord {
    let raw_xml = resolved.element.to_pretty_xml().unwrap_or_else(|e| {
        tracing::warn!(ad_id = %resolved.ad.id, error = %e, "could not serialize ad XML");
        String::new()
    });
    let ad = resolved.ad;
    let creative_hash = creative_hash(
        ad.ssai_creative_id.as_deref(),
        ad.creative_id.as_deref(),
        &ad.media_urls,
        adomain.as_deref(),
    );

    AdRecord {
        call_number,
        ad_id: ad.id,
        creative_id: ad.creative_id,
        ssai_creative_id: ad.ssai_creative_id,
        title: ad.title,
        duration: ad.duration,
        clickthrough: ad.click_url,
        media_urls: ad.media_urls,
        adomain,
        creative_hash,
        raw_xml,
        wrapped: resolved.wrapped,
        origin_metadata: resolved.origin,
    }
}
