// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Skip / take / visible-count arithmetic.
//!
//! ```text
//! skip  = Σ Skip(n), clamped to ≥ 0
//! take  = Σ Take(n), negative sum → unbounded
//! top   = Count/GetFacets → 0, First/Any → 1, Single → 2,
//!         ElementAt(i) → 0 when take ≤ i, else the element row only,
//!         no Take → page size; always ≤ page size
//! ```
//!
//! ElementAt fetches exactly one row: the wire skip is advanced by the index
//! and the wire top is 1.

use crate::query::tree::QueryMethod;

/// Hard per-request row cap of the remote service.
pub const SERVICE_PAGE_CAP: usize = 1000;

/// Effective page size: the configured maximum intersected with the service cap.
#[must_use]
pub fn effective_page_size(max_page_size: usize) -> usize {
    max_page_size.clamp(1, SERVICE_PAGE_CAP)
}

/// Sum of all `Skip` counts; negative sums mean "do not skip".
#[must_use]
pub fn real_skip_value(methods: &[QueryMethod]) -> usize {
    let sum: i64 = methods
        .iter()
        .filter_map(|m| match m {
            QueryMethod::Skip(n) => Some(*n),
            _ => None,
        })
        .fold(0i64, |acc, n| acc.saturating_add(n));
    usize::try_from(sum.max(0)).unwrap_or(usize::MAX)
}

/// Sum of all `Take` counts; `None` when there is no `Take` or the sum is negative.
#[must_use]
pub fn real_take_value(methods: &[QueryMethod]) -> Option<usize> {
    let mut seen = false;
    let mut sum = 0i64;
    for m in methods {
        if let QueryMethod::Take(n) = m {
            seen = true;
            sum = sum.saturating_add(*n);
        }
    }
    if !seen || sum < 0 {
        return None;
    }
    usize::try_from(sum).ok()
}

/// Rows visible on one page for a reported total.
///
/// Zero when `total == 0`, `skip >= total` or `take == 0`; otherwise the
/// remaining rows after skip, bounded by take and the page size.
#[must_use]
pub fn calculate_actual_count_per_page(
    total: u64,
    take: Option<usize>,
    skip: Option<usize>,
    max_page_size: usize,
) -> usize {
    let skip = skip.unwrap_or(0) as u64;
    if total == 0 || skip >= total || take == Some(0) {
        return 0;
    }
    let remaining = total - skip;
    let bounded = match take {
        Some(take) => remaining.min(take as u64),
        None => remaining,
    };
    bounded.min(max_page_size as u64) as usize
}

/// Exact match count after skip/take, not bounded by the page size.
#[must_use]
pub fn count_after_paging(total: u64, take: Option<usize>, skip: usize) -> u64 {
    let remaining = total.saturating_sub(skip as u64);
    match take {
        Some(take) => remaining.min(take as u64),
        None => remaining,
    }
}

/// Resolved paging for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingPlan {
    /// Logical skip
    pub skip: usize,
    /// Logical take (`None` = unbounded)
    pub take: Option<usize>,
    /// `$skip` sent on the wire
    pub wire_skip: usize,
    /// `$top` sent on the wire
    pub top: usize,
    /// ElementAt index, when that is the terminal method
    pub element_at: Option<usize>,
}

impl PagingPlan {
    /// Resolve skip and top from the method list. The last terminal method wins.
    pub fn resolve(methods: &[QueryMethod], max_page_size: usize) -> Self {
        let page = effective_page_size(max_page_size);
        let skip = real_skip_value(methods);
        let take = real_take_value(methods);
        let bounded_take = |limit: usize| take.map_or(limit, |t| t.min(limit));

        let mut plan = Self {
            skip,
            take,
            wire_skip: skip,
            top: take.unwrap_or(page).min(page),
            element_at: None,
        };

        match methods.iter().rev().find(|m| m.is_terminal()) {
            Some(QueryMethod::Count) | Some(QueryMethod::GetFacets) => plan.top = 0,
            Some(QueryMethod::First { .. }) | Some(QueryMethod::Any) => plan.top = bounded_take(1),
            Some(QueryMethod::Single { .. }) => plan.top = bounded_take(2),
            Some(QueryMethod::ElementAt { index, .. }) => {
                plan.element_at = Some(*index);
                if Self::element_top(take, *index) == 0 {
                    plan.top = 0;
                } else {
                    plan.wire_skip = skip.saturating_add(*index);
                    plan.top = 1;
                }
            }
            _ => {}
        }

        plan
    }

    /// Logical top for ElementAt: provably empty when take ends before the index
    /// or the index has no following position.
    fn element_top(take: Option<usize>, index: usize) -> usize {
        match take {
            Some(take) if take <= index => 0,
            _ => index.checked_add(1).unwrap_or(0),
        }
    }
}
