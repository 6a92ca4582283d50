//! Rules shared by both profiles.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{Rule, TraceTable, Violation, MAX_SAMPLES};
use crate::profile::{NodeType, Profile};

pub(crate) type Outcome = Result<(), Violation>;

pub(crate) fn filename(name: &str, profile: Profile) -> Outcome {
    match profile.parse_chunk_filename(name) {
        Some(_) => Ok(()),
        None => Err(Violation::new(
            Rule::Filename,
            format!(
                "'{name}' does not match {}<start_ms>_<end_ms>.csv",
                profile.file_prefix()
            ),
        )),
    }
}

pub(crate) fn columns(table: &TraceTable, required: &[&str]) -> Outcome {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(Violation::new(Rule::Columns, format!("{} required columns missing", missing.len()))
        .with_samples(missing, required.len()))
}

pub(crate) fn no_nulls(table: &TraceTable) -> Outcome {
    let nulls = table.nulls();
    if nulls.is_empty() {
        return Ok(());
    }
    Err(Violation::new(Rule::Nulls, format!("{} missing values", nulls.len()))
        .with_samples(nulls.iter().map(|(row, col)| format!("row {row} {col}")), MAX_SAMPLES))
}

pub(crate) fn rows_per_timestamp(times: &[u64], expected: usize) -> Outcome {
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for &t in times {
        *counts.entry(t).or_default() += 1;
    }
    let off: Vec<String> = counts
        .iter()
        .filter(|(_, &n)| n != expected)
        .map(|(t, n)| format!("{t}ms: {n}"))
        .collect();
    if off.is_empty() {
        return Ok(());
    }
    Err(Violation::new(
        Rule::RowsPerTimestamp,
        format!("{} timestamps do not have {expected} rows", off.len()),
    )
    .with_samples(off, MAX_SAMPLES))
}

pub(crate) fn unique_pairs(times: &[u64], node_ids: &[&str]) -> Outcome {
    let mut seen = HashSet::with_capacity(times.len());
    let duplicates: Vec<String> = times
        .iter()
        .zip(node_ids)
        .filter(|pair| !seen.insert(*pair))
        .map(|(t, id)| format!("({t}, {id})"))
        .collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    Err(Violation::new(
        Rule::Duplicates,
        format!("{} duplicate (time_ms, node_id) pairs", duplicates.len()),
    )
    .with_samples(duplicates, MAX_SAMPLES))
}

/// Unique timestamps must be spaced exactly `step_ms` apart.
pub(crate) fn timestamp_step(times: &[u64], step_ms: u64) -> Outcome {
    let unique: BTreeSet<u64> = times.iter().copied().collect();
    if unique.is_empty() {
        return Err(Violation::new(Rule::TimestampStep, "no timestamps"));
    }
    let gaps: Vec<String> = unique
        .iter()
        .zip(unique.iter().skip(1))
        .filter(|(a, b)| *b - *a != step_ms)
        .map(|(a, b)| format!("{a}->{b}"))
        .collect();
    if gaps.is_empty() {
        return Ok(());
    }
    Err(Violation::new(
        Rule::TimestampStep,
        format!("{} intervals differ from {step_ms} ms", gaps.len()),
    )
    .with_samples(gaps, MAX_SAMPLES))
}

pub(crate) fn timestamp_count(times: &[u64], expected: usize) -> Outcome {
    let unique = times.iter().collect::<BTreeSet<_>>().len();
    if unique == expected {
        return Ok(());
    }
    Err(Violation::new(
        Rule::TimestampCount,
        format!("{unique} unique timestamps, expected {expected}"),
    ))
}

pub(crate) fn node_types(types: &[&str], allowed: &[NodeType]) -> Outcome {
    let bad: BTreeSet<&str> = types
        .iter()
        .copied()
        .filter(|t| !allowed.iter().any(|a| a.tag() == *t))
        .collect();
    if bad.is_empty() {
        return Ok(());
    }
    let expected: Vec<&str> = allowed.iter().map(NodeType::tag).collect();
    Err(Violation::new(
        Rule::NodeType,
        format!("unexpected type tags, expected {}", expected.join("/")),
    )
    .with_samples(bad, MAX_SAMPLES))
}

/// `prefix` followed by one to three digits.
pub(crate) fn is_address(ip: &str, prefix: &str) -> bool {
    ip.strip_prefix(prefix).map_or(false, |host| {
        (1..=3).contains(&host.len()) && host.bytes().all(|b| b.is_ascii_digit())
    })
}

pub(crate) fn addresses(ips: &[&str], prefix: &str) -> Outcome {
    let bad: BTreeSet<&str> = ips.iter().copied().filter(|ip| !is_address(ip, prefix)).collect();
    if bad.is_empty() {
        return Ok(());
    }
    Err(Violation::new(
        Rule::Address,
        format!("{} addresses outside {prefix}<n>", bad.len()),
    )
    .with_samples(bad, MAX_SAMPLES))
}
