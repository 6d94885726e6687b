//! Conversions between the wire shapes in [`crate::proto`] and the
//! transport-agnostic domain types in `search_types`.
//!
//! Kept as free functions/`From` impls in one place so the service layer
//! never hand-rolls field-by-field mapping inline.

use search_types::{Hit, QueryCategory, QueryInfo, SearchRequest, SearchResponse, SortOrder};

use crate::proto;

impl From<proto::SearchRequest> for SearchRequest {
    fn from(r: proto::SearchRequest) -> Self {
        Self {
            query: r.query,
            index: r.index,
            limit: r.limit,
            offset: r.offset,
            engines: (!r.engines.is_empty()).then_some(r.engines),
            engine_overrides: r.engine_overrides,
            filters: r.filters,
            sort_field: r.sort_field,
            sort_order: r.sort_order.and_then(|v| {
                match proto::SortOrder::try_from(v).unwrap_or(proto::SortOrder::SortOrderUnspecified) {
                    proto::SortOrder::Asc => Some(SortOrder::Asc),
                    proto::SortOrder::Desc => Some(SortOrder::Desc),
                    proto::SortOrder::SortOrderUnspecified => None,
                }
            }),
            highlight: r.highlight,
            timeout_ms: r.timeout_ms,
            request_id: r.request_id,
        }
    }
}

/// Gateway-side: a domain request built from client JSON/query params,
/// converted to the wire shape for the call to the coordinator.
impl From<SearchRequest> for proto::SearchRequest {
    fn from(r: SearchRequest) -> Self {
        Self {
            query: r.query,
            index: r.index,
            limit: r.limit,
            offset: r.offset,
            engines: r.engines.unwrap_or_default(),
            engine_overrides: r.engine_overrides,
            filters: r.filters,
            sort_field: r.sort_field,
            sort_order: r.sort_order.map(|v| proto::SortOrder::from(v) as i32),
            highlight: r.highlight,
            timeout_ms: r.timeout_ms,
            request_id: r.request_id,
        }
    }
}

impl From<SortOrder> for proto::SortOrder {
    fn from(v: SortOrder) -> Self {
        match v {
            SortOrder::Asc => proto::SortOrder::Asc,
            SortOrder::Desc => proto::SortOrder::Desc,
        }
    }
}

impl From<Hit> for proto::Hit {
    fn from(h: Hit) -> Self {
        Self {
            doc_id: h.doc_id,
            index: h.index,
            score: h.score,
            title: h.title,
            content: h.content,
            highlights: h.highlights,
            fields: h.fields,
            engine: h.engine,
            rank: h.rank,
        }
    }
}

/// Gateway-side: the coordinator's wire response, converted back to the
/// domain shape for JSON serialization to the client.
impl From<proto::Hit> for Hit {
    fn from(h: proto::Hit) -> Self {
        Self {
            doc_id: h.doc_id,
            index: h.index,
            score: h.score,
            title: h.title,
            content: h.content,
            highlights: h.highlights,
            fields: h.fields,
            engine: h.engine,
            rank: h.rank,
        }
    }
}

impl From<proto::QueryInfo> for QueryInfo {
    fn from(q: proto::QueryInfo) -> Self {
        Self {
            normalized_query: q.normalized_query,
            category: category_from_str(&q.category),
            length: q.length as usize,
            wildcard: q.wildcard,
            phrase: q.phrase,
            boolean: q.boolean,
            special: q.special,
        }
    }
}

fn category_from_str(s: &str) -> QueryCategory {
    match s {
        "single_term" => QueryCategory::SingleTerm,
        "short_phrase" => QueryCategory::ShortPhrase,
        "medium_phrase" => QueryCategory::MediumPhrase,
        "long_query" => QueryCategory::LongQuery,
        _ => QueryCategory::Empty,
    }
}

impl From<proto::SearchResponse> for SearchResponse {
    fn from(r: proto::SearchResponse) -> Self {
        Self {
            request_id: r.request_id,
            hits: r.hits.into_iter().map(Into::into).collect(),
            total: r.total,
            elapsed_ms: r.elapsed_ms,
            engines_used: r.engines_used,
            cache_hit: r.cache_hit,
            query_info: r.query_info.map(Into::into).unwrap_or_else(|| QueryInfo {
                normalized_query: String::new(),
                category: QueryCategory::Empty,
                length: 0,
                wildcard: false,
                phrase: false,
                boolean: false,
                special: false,
            }),
        }
    }
}

impl From<QueryInfo> for proto::QueryInfo {
    fn from(q: QueryInfo) -> Self {
        Self {
            normalized_query: q.normalized_query,
            category: category_str(q.category).to_string(),
            length: q.length as u32,
            wildcard: q.wildcard,
            phrase: q.phrase,
            boolean: q.boolean,
            special: q.special,
        }
    }
}

fn category_str(c: QueryCategory) -> &'static str {
    match c {
        QueryCategory::Empty => "empty",
        QueryCategory::SingleTerm => "single_term",
        QueryCategory::ShortPhrase => "short_phrase",
        QueryCategory::MediumPhrase => "medium_phrase",
        QueryCategory::LongQuery => "long_query",
    }
}

impl From<SearchResponse> for proto::SearchResponse {
    fn from(r: SearchResponse) -> Self {
        Self {
            request_id: r.request_id,
            hits: r.hits.into_iter().map(Into::into).collect(),
            total: r.total,
            elapsed_ms: r.elapsed_ms,
            engines_used: r.engines_used,
            cache_hit: r.cache_hit,
            query_info: Some(r.query_info.into()),
        }
    }
}
