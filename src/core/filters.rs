use crate::models::{ExchangeMatch, ExchangeRequest};

/// Check whether `candidate` reciprocally satisfies `request`
///
/// Owners differ, the candidate is still active, and each side's desired
/// book appears in the other side's offered set. Storage adapters that
/// answer the candidate query must agree with this predicate.
#[inline]
pub fn is_reciprocal_match(request: &ExchangeRequest, candidate: &ExchangeRequest) -> bool {
    if request.id == candidate.id || request.user_id == candidate.user_id {
        return false;
    }

    if !candidate.is_active() {
        return false;
    }

    request.offers(&candidate.desired_book_id) && candidate.offers(&request.desired_book_id)
}

/// Keep matches whose distance does not exceed `threshold`, preserving order
pub fn within_distance(matches: Vec<ExchangeMatch>, threshold: f64) -> Vec<ExchangeMatch> {
    matches
        .into_iter()
        .filter(|m| m.distance <= threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExchangeRequestStatus;
    use uuid::Uuid;

    fn create_request(user: &str, desired: &str, offered: &[&str]) -> ExchangeRequest {
        let offered: Vec<String> = offered.iter().map(|s| s.to_string()).collect();
        ExchangeRequest::new(user, format!("{}@example.com", user), desired, &offered, 52.0, 21.0)
    }

    #[test]
    fn test_reciprocal_pair() {
        let x = create_request("u1", "A", &["B"]);
        let y = create_request("u2", "B", &["A", "C"]);

        assert!(is_reciprocal_match(&x, &y));
        assert!(is_reciprocal_match(&y, &x));
    }

    #[test]
    fn test_one_sided_is_not_reciprocal() {
        let x = create_request("u1", "A", &["B"]);
        let y = create_request("u2", "B", &["C"]);

        assert!(!is_reciprocal_match(&x, &y));
    }

    #[test]
    fn test_same_owner_excluded() {
        let x = create_request("u1", "A", &["B"]);
        let y = create_request("u1", "B", &["A"]);

        assert!(!is_reciprocal_match(&x, &y));
    }

    #[test]
    fn test_inactive_candidate_excluded() {
        let x = create_request("u1", "A", &["B"]);
        let mut y = create_request("u2", "B", &["A"]);
        y.status = ExchangeRequestStatus::Completed;

        assert!(!is_reciprocal_match(&x, &y));
    }

    #[test]
    fn test_within_distance_inclusive() {
        let matches: Vec<ExchangeMatch> = [5.0, 9.9, 10.1, 15.0, 10.0]
            .iter()
            .map(|d| ExchangeMatch::new(Uuid::new_v4(), Uuid::new_v4(), *d))
            .collect();

        let kept: Vec<f64> = within_distance(matches, 10.0).iter().map(|m| m.distance).collect();
        assert_eq!(kept, vec![5.0, 9.9, 10.0]);
    }
}
