//! Heuristics for attributing an imported payment to a tenant.
//!
//! Matching is tried in priority order: an exact match on normalized phone
//! numbers wins outright; otherwise the payer name is fuzzy-matched against
//! every tenant's full name and the best candidate is accepted only above a
//! confirmation threshold. Two thresholds keep the behavior conservative:
//! below the candidate floor a tenant is not even considered, and between
//! the floor and the confirmation threshold the payment stays unmatched for
//! human review.

use crate::domain::payment::{MatchResult, MatchStatus, ParsedPayment};
use crate::domain::tenant::Tenant;

/// Minimum similarity for a tenant to count as a candidate at all.
const CANDIDATE_FLOOR: f64 = 60.0;
/// Similarity a candidate must exceed to be auto-accepted.
const CONFIRM_THRESHOLD: f64 = 70.0;

/// Strips a phone number down to its last 9 digits.
///
/// Dropping everything before the last 9 digits makes local numbers and
/// their country-code-prefixed forms compare equal, e.g. `0712-345-678`
/// and `+254 712 345 678` both normalize to `712345678`.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > 9 {
        digits[digits.len() - 9..].to_string()
    } else {
        digits
    }
}

/// Levenshtein distance with unit costs, single-row DP.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Percentage similarity between two names, case-insensitive and trimmed.
///
/// Defined as `(max_len - edit_distance) / max_len * 100`. Identical
/// strings score exactly 100, including the degenerate empty-vs-empty
/// comparison. Symmetric in its arguments.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a == b {
        return 100.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    let distance = levenshtein(&a, &b);
    (max_len - distance) as f64 / max_len as f64 * 100.0
}

/// Attributes one payment to a tenant, or reports it unmatched.
///
/// The tenant pool is scanned as-is on every call; ties (an exact phone
/// match, or an exact similarity tie) keep the first tenant in iteration
/// order.
pub fn match_payment(payment: &ParsedPayment, tenants: &[Tenant]) -> MatchResult {
    if let Some(phone) = &payment.phone {
        let wanted = normalize_phone(phone);
        if !wanted.is_empty() {
            for tenant in tenants {
                if let Some(tenant_phone) = &tenant.phone
                    && normalize_phone(tenant_phone) == wanted
                {
                    return MatchResult {
                        status: MatchStatus::Matched,
                        tenant_id: Some(tenant.id),
                        confidence: 100,
                        reason: "phone number match".to_string(),
                    };
                }
            }
        }
    }

    let mut best: Option<(&Tenant, f64)> = None;
    for tenant in tenants {
        let score = calculate_similarity(&payment.payer_name, &tenant.full_name());
        if score > CANDIDATE_FLOOR && best.is_none_or(|(_, top)| score > top) {
            best = Some((tenant, score));
        }
    }

    match best {
        Some((tenant, score)) if score > CONFIRM_THRESHOLD => {
            let confidence = score.round() as u8;
            MatchResult {
                status: MatchStatus::Matched,
                tenant_id: Some(tenant.id),
                confidence,
                reason: format!("name similarity {confidence}%"),
            }
        }
        Some((_, score)) => MatchResult::unmatched(score.round() as u8),
        None => MatchResult::unmatched(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn tenant(id: u64, first: &str, last: &str, phone: Option<&str>) -> Tenant {
        Tenant {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: phone.map(str::to_string),
        }
    }

    fn payment(name: &str, phone: Option<&str>) -> ParsedPayment {
        ParsedPayment {
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount: dec!(1000),
            payer_name: name.to_string(),
            phone: phone.map(str::to_string),
            reference: None,
            description: None,
        }
    }

    #[test]
    fn test_normalize_phone_strips_formatting_and_country_code() {
        assert_eq!(normalize_phone("0712-345-678"), "712345678");
        assert_eq!(normalize_phone("+254 712 345 678"), "712345678");
        assert_eq!(normalize_phone("712345678"), "712345678");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn test_similarity_identical_and_case_insensitive() {
        assert_eq!(calculate_similarity("John Doe", "John Doe"), 100.0);
        assert_eq!(calculate_similarity("john doe", "JOHN DOE"), 100.0);
        assert_eq!(calculate_similarity("", ""), 100.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let ab = calculate_similarity("John Doe", "Jon Doe");
        let ba = calculate_similarity("Jon Doe", "John Doe");
        assert_eq!(ab, ba);
        assert!(ab > 70.0 && ab < 100.0);
    }

    #[test]
    fn test_similarity_disjoint_strings() {
        assert_eq!(calculate_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_phone_match_beats_name_similarity() {
        let tenants = vec![
            tenant(1, "John", "Doe", Some("0700000000")),
            tenant(2, "Completely", "Different", Some("+254712345678")),
        ];
        let result = match_payment(&payment("John Doe", Some("0712 345 678")), &tenants);

        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.tenant_id, Some(2));
        assert_eq!(result.confidence, 100);
        assert_eq!(result.reason, "phone number match");
    }

    #[test]
    fn test_phone_miss_falls_back_to_name() {
        let tenants = vec![tenant(1, "John", "Doe", Some("0700000000"))];
        let result = match_payment(&payment("John Doe", Some("0799999999")), &tenants);

        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.tenant_id, Some(1));
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_low_similarity_stays_unmatched() {
        let tenants = vec![tenant(1, "Alice", "Wanjiku", None)];
        let result = match_payment(&payment("Bob Kamau", None), &tenants);

        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.tenant_id, None);
        assert_eq!(result.reason, "no clear match found");
    }

    #[test]
    fn test_between_thresholds_reports_confidence_but_no_match() {
        // "john doe" vs "jon doexx": edit distance 3 over max length 9,
        // similarity 66.7% -- a candidate, but below the 70% confirmation
        // threshold.
        let tenants = vec![tenant(1, "Jon", "Doexx", None)];
        let result = match_payment(&payment("John Doe", None), &tenants);

        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.tenant_id, None);
        assert_eq!(result.confidence, 67);
    }

    #[test]
    fn test_tie_keeps_first_tenant() {
        let tenants = vec![
            tenant(1, "John", "Doe", None),
            tenant(2, "John", "Doe", None),
        ];
        let result = match_payment(&payment("John Doe", None), &tenants);

        assert_eq!(result.tenant_id, Some(1));
    }

    #[test]
    fn test_empty_pool_is_unmatched_with_zero_confidence() {
        let result = match_payment(&payment("John Doe", None), &[]);
        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.confidence, 0);
    }
}
