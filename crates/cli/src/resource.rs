// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog of Oura usercollection resources and list-query validation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat};

/// Which filters a resource's list endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    None,
    Date,
    DateTime,
    NextTokenOnly,
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "no filters",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::NextTokenOnly => "next_token",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub key: &'static str,
    pub path_segment: &'static str,
    pub supports_list: bool,
    pub supports_get: bool,
    pub query: QueryKind,
}

impl Resource {
    const fn dated(key: &'static str) -> Self {
        Self { key, path_segment: key, supports_list: true, supports_get: true, query: QueryKind::Date }
    }
}

pub const PERSONAL_INFO: &str = "personal_info";

static RESOURCES: &[Resource] = &[
    Resource {
        key: PERSONAL_INFO,
        path_segment: PERSONAL_INFO,
        supports_list: false,
        supports_get: true,
        query: QueryKind::None,
    },
    Resource::dated("daily_activity"),
    Resource::dated("daily_cardiovascular_age"),
    Resource::dated("daily_readiness"),
    Resource::dated("daily_resilience"),
    Resource::dated("daily_sleep"),
    Resource::dated("daily_spo2"),
    Resource::dated("daily_stress"),
    Resource::dated("sleep"),
    Resource::dated("sleep_time"),
    Resource::dated("session"),
    Resource::dated("workout"),
    Resource::dated("tag"),
    Resource::dated("enhanced_tag"),
    Resource::dated("rest_mode_period"),
    Resource {
        key: "vo2_max",
        path_segment: "vO2_max",
        supports_list: true,
        supports_get: true,
        query: QueryKind::Date,
    },
    Resource {
        key: "ring_configuration",
        path_segment: "ring_configuration",
        supports_list: true,
        supports_get: true,
        query: QueryKind::NextTokenOnly,
    },
    Resource {
        key: "heartrate",
        path_segment: "heartrate",
        supports_list: true,
        supports_get: false,
        query: QueryKind::DateTime,
    },
];

/// Case-insensitive lookup by key.
pub fn lookup(name: &str) -> Option<&'static Resource> {
    RESOURCES.iter().find(|r| r.key.eq_ignore_ascii_case(name))
}

/// All resources sorted by key.
pub fn all() -> Vec<&'static Resource> {
    let mut out: Vec<_> = RESOURCES.iter().collect();
    out.sort_by_key(|r| r.key);
    out
}

/// `/v2/[sandbox/]usercollection/<segment>`.
pub fn collection_path(sandbox: bool, segment: &str) -> String {
    if sandbox {
        format!("/v2/sandbox/usercollection/{segment}")
    } else {
        format!("/v2/usercollection/{segment}")
    }
}

/// Collection path plus a percent-encoded document id segment.
pub fn document_path(sandbox: bool, segment: &str, document_id: &str) -> String {
    format!("{}/{}", collection_path(sandbox, segment), escape_path_segment(document_id))
}

/// Raw list filters as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("resource does not accept date filters")]
    NoFilters,
    #[error("resource only accepts next_token")]
    NextTokenOnly,
    #[error("use --start-date/--end-date for this resource")]
    WantDate,
    #[error("use --start-datetime/--end-datetime for this resource")]
    WantDateTime,
    #[error("{0} and {1} must both be set")]
    HalfOpen(&'static str, &'static str),
    #[error("{1} must be after {0}")]
    Reversed(&'static str, &'static str),
    #[error("invalid {field} {value:?}: expected {expected}")]
    Parse { field: &'static str, value: String, expected: &'static str },
}

/// Validate filters against the resource's query kind and build the query.
pub fn build_list_query(
    resource: &Resource,
    filters: &ListFilters,
) -> Result<BTreeMap<String, String>, QueryError> {
    let start_date = given(&filters.start_date);
    let end_date = given(&filters.end_date);
    let start_dt = given(&filters.start_datetime);
    let end_dt = given(&filters.end_datetime);
    let any_date = start_date.is_some() || end_date.is_some();
    let any_dt = start_dt.is_some() || end_dt.is_some();

    let mut query = BTreeMap::new();
    if let Some(token) = given(&filters.next_token) {
        query.insert("next_token".to_owned(), token.to_owned());
    }

    match resource.query {
        QueryKind::None if any_date || any_dt => return Err(QueryError::NoFilters),
        QueryKind::NextTokenOnly if any_date || any_dt => return Err(QueryError::NextTokenOnly),
        QueryKind::None | QueryKind::NextTokenOnly => {}
        QueryKind::Date => {
            if any_dt {
                return Err(QueryError::WantDate);
            }
            match (start_date, end_date) {
                (None, None) => {}
                (Some(start), Some(end)) => {
                    let start = parse_date("start-date", start)?;
                    let end = parse_date("end-date", end)?;
                    if end < start {
                        return Err(QueryError::Reversed("start-date", "end-date"));
                    }
                    query.insert("start_date".to_owned(), start.format("%Y-%m-%d").to_string());
                    query.insert("end_date".to_owned(), end.format("%Y-%m-%d").to_string());
                }
                _ => return Err(QueryError::HalfOpen("start-date", "end-date")),
            }
        }
        QueryKind::DateTime => {
            if any_date {
                return Err(QueryError::WantDateTime);
            }
            match (start_dt, end_dt) {
                (None, None) => {}
                (Some(start), Some(end)) => {
                    let start = parse_datetime("start-datetime", start)?;
                    let end = parse_datetime("end-datetime", end)?;
                    if end < start {
                        return Err(QueryError::Reversed("start-datetime", "end-datetime"));
                    }
                    query.insert(
                        "start_datetime".to_owned(),
                        start.to_rfc3339_opts(SecondsFormat::Secs, true),
                    );
                    query.insert(
                        "end_datetime".to_owned(),
                        end.to_rfc3339_opts(SecondsFormat::Secs, true),
                    );
                }
                _ => return Err(QueryError::HalfOpen("start-datetime", "end-datetime")),
            }
        }
    }
    Ok(query)
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| QueryError::Parse {
        field,
        value: value.to_owned(),
        expected: "YYYY-MM-DD",
    })
}

fn parse_datetime(
    field: &'static str,
    value: &str,
) -> Result<DateTime<chrono::FixedOffset>, QueryError> {
    DateTime::parse_from_rfc3339(value).map_err(|_| QueryError::Parse {
        field,
        value: value.to_owned(),
        expected: "RFC 3339",
    })
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn escape_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0xf) as usize]));
            }
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
