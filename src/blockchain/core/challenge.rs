//! The ownership challenge a wallet signs before registering a star.
//!
//! Format: `<address>:<unixSeconds>:starRegistry`. The challenge carries its
//! own issue time, so the ledger keeps no record of the challenges it hands out.

use crate::error::ChainError;
use std::fmt;
use std::str::FromStr;

pub const CHALLENGE_SUFFIX: &str = "starRegistry";

/// Default signing window in seconds.
pub const CHALLENGE_WINDOW_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub address: String,
    pub issued_at: u64,
}

impl Challenge {
    pub fn new(address: impl Into<String>, issued_at: u64) -> Self {
        Challenge {
            address: address.into(),
            issued_at,
        }
    }

    /// Seconds elapsed since issue, zero for challenges dated in the future.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.issued_at)
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.address, self.issued_at, CHALLENGE_SUFFIX)
    }
}

impl FromStr for Challenge {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (suffix, timestamp, address) = match (parts.next(), parts.next(), parts.next()) {
            (Some(suffix), Some(timestamp), Some(address)) => (suffix, timestamp, address),
            _ => {
                return Err(ChainError::InvalidChallenge(format!(
                    "expected <address>:<timestamp>:{}, got {:?}",
                    CHALLENGE_SUFFIX, s
                )))
            }
        };

        if suffix != CHALLENGE_SUFFIX {
            return Err(ChainError::InvalidChallenge(format!(
                "unexpected suffix {:?}",
                suffix
            )));
        }

        let issued_at = timestamp.parse::<u64>().map_err(|e| {
            ChainError::InvalidChallenge(format!("bad timestamp {:?}: {}", timestamp, e))
        })?;

        Ok(Challenge::new(address, issued_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let challenge = Challenge::new("addr1", 1_700_000_000);
        assert_eq!(challenge.to_string(), "addr1:1700000000:starRegistry");
    }

    #[test]
    fn test_parse() {
        let challenge: Challenge = "myoJTcHCub3aLJ4aGmRzMGxbTUYHRAJJcF:1700000000:starRegistry"
            .parse()
            .unwrap();
        assert_eq!(challenge.address, "myoJTcHCub3aLJ4aGmRzMGxbTUYHRAJJcF");
        assert_eq!(challenge.issued_at, 1_700_000_000);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "addr1",
            "addr1:1700000000",
            "addr1:abc:starRegistry",
            "addr1:-5:starRegistry",
            "addr1:1700000000:otherRegistry",
        ] {
            let err = bad.parse::<Challenge>().unwrap_err();
            assert!(matches!(err, ChainError::InvalidChallenge(_)), "{bad}");
        }
    }

    #[test]
    fn test_age_saturates() {
        let challenge = Challenge::new("a", 1000);
        assert_eq!(challenge.age(1300), 300);
        assert_eq!(challenge.age(900), 0);
    }
}
