use crate::domain::model::{
    DomainSummary, Record, ReporterSummary, Reports, SummarySettings, TimeBucket,
    TimeBucketCount, COPYRIGHTED_URLS, DATE_SENT, NA, PRINCIPAL_NAME,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn build_reports(rows: &[Record], settings: &SummarySettings) -> Reports {
    Reports {
        top_domains: top_domains(rows, settings.top_domains),
        time_distribution: time_distribution(rows, settings.time_bucket),
        top_reporters: top_reporters(rows, settings.top_reporters),
    }
}

/// Most-reported domains. Rows whose domain is `"NA"` are not ranked.
pub fn top_domains(rows: &[Record], limit: usize) -> Vec<DomainSummary> {
    let mut groups: HashMap<&str, (usize, HashSet<&str>)> = HashMap::new();

    for row in rows {
        let domain = row.domain();
        if domain == NA {
            continue;
        }
        let entry = groups.entry(domain).or_default();
        entry.0 += 1;
        if let Some(url) = row.get_str(COPYRIGHTED_URLS) {
            entry.1.insert(url);
        }
    }

    let mut summaries: Vec<DomainSummary> = groups
        .into_iter()
        .map(|(domain, (count, urls))| DomainSummary {
            domain: domain.to_string(),
            notice_count: count,
            unique_copyrighted_urls: urls.len(),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.notice_count
            .cmp(&a.notice_count)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    summaries.truncate(limit);
    summaries
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn bucket_key(date: DateTime<Utc>, bucket: TimeBucket) -> String {
    match bucket {
        TimeBucket::Exact => date.to_rfc3339_opts(SecondsFormat::Secs, true),
        TimeBucket::Day => date.format("%Y-%m-%d").to_string(),
        TimeBucket::Month => date.format("%Y-%m").to_string(),
    }
}

/// Row counts per `date_sent` bucket, oldest first.
///
/// Bucket keys are fixed-width UTC strings, so lexical order is time order.
pub fn time_distribution(rows: &[Record], bucket: TimeBucket) -> Vec<TimeBucketCount> {
    let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
    let mut unparseable = 0usize;

    for row in rows {
        match row.get_str(DATE_SENT).and_then(parse_date) {
            Some(date) => *buckets.entry(bucket_key(date, bucket)).or_insert(0) += 1,
            None => unparseable += 1,
        }
    }

    if unparseable > 0 {
        tracing::warn!("⚠️ {} rows have a missing or unparseable date_sent", unparseable);
    }

    buckets
        .into_iter()
        .map(|(date_sent, notice_count)| TimeBucketCount {
            date_sent,
            notice_count,
        })
        .collect()
}

/// Reporting entities ranked by row count, with their most-reported domain.
pub fn top_reporters(rows: &[Record], limit: usize) -> Vec<ReporterSummary> {
    struct Tally<'a> {
        count: usize,
        domain_counts: HashMap<&'a str, usize>,
        first_seen: Vec<&'a str>,
    }

    let mut groups: HashMap<&str, Tally<'_>> = HashMap::new();

    for row in rows {
        let Some(name) = row.get_str(PRINCIPAL_NAME) else {
            continue;
        };
        let tally = groups.entry(name).or_insert_with(|| Tally {
            count: 0,
            domain_counts: HashMap::new(),
            first_seen: Vec::new(),
        });
        tally.count += 1;

        let domain = row.domain();
        if domain != NA {
            let seen = tally.domain_counts.entry(domain).or_insert(0);
            if *seen == 0 {
                tally.first_seen.push(domain);
            }
            *seen += 1;
        }
    }

    let mut summaries: Vec<ReporterSummary> = groups
        .into_iter()
        .map(|(name, tally)| {
            let mut top: Option<(&str, usize)> = None;
            for &domain in &tally.first_seen {
                let count = tally.domain_counts[domain];
                if top.map_or(true, |(_, best)| count > best) {
                    top = Some((domain, count));
                }
            }

            ReporterSummary {
                principal_name: name.to_string(),
                notice_count: tally.count,
                top_infringing_domain: top.map_or(NA, |(d, _)| d).to_string(),
                unique_infringing_domains: tally.first_seen.len(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.notice_count
            .cmp(&a.notice_count)
            .then_with(|| a.principal_name.cmp(&b.principal_name))
    });
    summaries.truncate(limit);
    summaries
}
