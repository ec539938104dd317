//! Verification token generation and email masking.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};

/// Length of a verification token in characters.
pub const TOKEN_LENGTH: usize = 64;

/// How long a verification token stays valid.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// A token together with the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Fresh token valid for [`TOKEN_TTL_HOURS`] from now.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        Self {
            token: generate_token(),
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        }
    }
}

/// 64 alphanumeric characters from the thread-local CSPRNG (~381 bits).
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hide most of an email address while keeping it recognisable.
///
/// The local part and the domain name keep their first and last characters;
/// segments of one or two characters keep only the first. The top-level
/// domain after the last dot is shown as is.
///
/// `johndoe@example.org` becomes `j*****e@e*****e.org`.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return mask_segment(email);
    };

    let masked_domain = match domain.rsplit_once('.') {
        Some((name, tld)) => format!("{}.{}", mask_segment(name), tld),
        None => mask_segment(domain),
    };

    format!("{}@{}", mask_segment(local), masked_domain)
}

fn mask_segment(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    match chars.len() {
        0 => String::new(),
        1 | 2 => format!("{}*", chars[0]),
        len => {
            let mut masked = String::with_capacity(len);
            masked.push(chars[0]);
            masked.extend(std::iter::repeat_n('*', len - 2));
            masked.push(chars[len - 1]);
            masked
        }
    }
}
