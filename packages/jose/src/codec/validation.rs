//! Claim validation run after a token's integrity has been established

use crate::claims::{AUDIENCE, CLAIMS_SCHEMA, Claims};
use crate::error::{JoseError, JoseResult};
use crate::value::FieldValue;
use chrono::{DateTime, Duration, Utc};

/// A caller requirement on one claim
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimExpectation {
    /// The claim must be present with any value
    Present(String),
    /// The claim must equal the value; for `aud` the value must be a member
    Equals(String, FieldValue),
}

impl ClaimExpectation {
    /// Claim identifier this expectation applies to
    #[must_use]
    pub fn claim(&self) -> &str {
        match self {
            Self::Present(id) | Self::Equals(id, _) => id,
        }
    }
}

/// Reject expired and not-yet-valid claims
///
/// A token is expired when `exp < now - skew` and premature when `nbf > now + skew`.
pub(crate) fn validate_temporal(
    claims: &Claims,
    now: DateTime<Utc>,
    skew: Duration,
) -> JoseResult<()> {
    let skew_seconds = skew.num_seconds();
    if let Some(expired_at) = claims.expiration() {
        let earliest = now.checked_sub_signed(skew).unwrap_or(DateTime::<Utc>::MIN_UTC);
        if expired_at < earliest {
            return Err(JoseError::Expired {
                expired_at,
                now,
                skew_seconds,
            });
        }
    }
    if let Some(not_before) = claims.not_before() {
        let latest = now.checked_add_signed(skew).unwrap_or(DateTime::<Utc>::MAX_UTC);
        if not_before > latest {
            return Err(JoseError::Premature {
                not_before,
                now,
                skew_seconds,
            });
        }
    }
    Ok(())
}

/// Check every expectation in order, failing on the first unmet one
pub(crate) fn validate_expectations(
    claims: &Claims,
    expectations: &[ClaimExpectation],
) -> JoseResult<()> {
    for expectation in expectations {
        let id = expectation.claim();
        let Some(actual) = claims.get(id) else {
            return Err(JoseError::MissingClaim(id.to_string()));
        };
        let ClaimExpectation::Equals(_, expected) = expectation else {
            continue;
        };
        let expected = match CLAIMS_SCHEMA.get(id) {
            Some(field) => field.convert(expected.clone())?,
            None => expected.clone(),
        };
        let satisfied = if id == AUDIENCE.id() {
            audience_contains(actual, &expected)
        } else {
            *actual == expected
        };
        if !satisfied {
            return Err(JoseError::IncorrectClaim {
                claim: id.to_string(),
                expected: expected.to_json().to_string(),
                actual: actual.to_json().to_string(),
            });
        }
    }
    Ok(())
}

fn audience_contains(actual: &FieldValue, expected: &FieldValue) -> bool {
    match (actual.as_seq(), expected.as_seq()) {
        (Some(members), Some(wanted)) => wanted.iter().all(|w| members.contains(w)),
        _ => false,
    }
}
