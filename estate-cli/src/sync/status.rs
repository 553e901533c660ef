//! Status normalization and UI grouping
//!
//! Status cells are free text typed by staff. Nothing here rejects an unknown
//! status; it just gets no category.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{PropertyBadge, SellerRecord};

/// Trim surrounding whitespace (full-width spaces included); the text inside
/// is kept as typed. Blank text is `None`.
pub fn normalize_status(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

const BADGE_MARKERS: &[(&str, PropertyBadge)] = &[
    ("公開中", PropertyBadge::Published),
    ("公開前", PropertyBadge::PrePublication),
    ("非公開", PropertyBadge::Private),
];

/// Listing badge for a property status
///
/// Markers are checked by substring in order. No status at all means the
/// listing is unpublished or already sold; unrecognized text has no badge.
pub fn classify_property_status(status: Option<&str>) -> Option<PropertyBadge> {
    let Some(status) = status.and_then(normalize_status) else {
        return Some(PropertyBadge::UnpublishedOrSold);
    };
    BADGE_MARKERS
        .iter()
        .find(|(marker, _)| status.contains(marker))
        .map(|(_, badge)| *badge)
}

/// Seller grouping on the follow-up screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerCategory {
    /// Mediation contract signed
    Contracted,
    /// Lost to a competitor or no further follow-up wanted
    Closed,
    VisitScheduled,
    /// Follow-up call is due
    AwaitingCallback,
    FollowingUp,
    Unclassified,
}

impl SellerCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SellerCategory::Contracted => "媒介契約済",
            SellerCategory::Closed => "追客終了",
            SellerCategory::VisitScheduled => "訪問予定",
            SellerCategory::AwaitingCallback => "当日TEL",
            SellerCategory::FollowingUp => "追客中",
            SellerCategory::Unclassified => "未分類",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SellerCategory::Contracted => "contracted",
            SellerCategory::Closed => "closed",
            SellerCategory::VisitScheduled => "visit_scheduled",
            SellerCategory::AwaitingCallback => "awaiting_callback",
            SellerCategory::FollowingUp => "following_up",
            SellerCategory::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for SellerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Group a seller relative to `today` (in the office timezone)
pub fn classify_seller(record: &SellerRecord, today: NaiveDate) -> SellerCategory {
    let status = record.status.as_deref().unwrap_or("");

    if status.contains("専任") || status.contains("一般") {
        return SellerCategory::Contracted;
    }
    if status.contains("他決") || status.contains("追客不要") {
        return SellerCategory::Closed;
    }
    if record.visit_date.is_some_and(|visit| visit >= today) {
        return SellerCategory::VisitScheduled;
    }
    if status.contains("追客") {
        if record.next_call_date.is_some_and(|call| call <= today) {
            return SellerCategory::AwaitingCallback;
        }
        return SellerCategory::FollowingUp;
    }
    SellerCategory::Unclassified
}
