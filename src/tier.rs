use serde::{Deserialize, Serialize};

/// Skill bracket derived from a player's ELO rating.
/// Mirrors the bracket table used by the hosted database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Bronze,
        Tier::Silver,
        Tier::Gold,
        Tier::Platinum,
        Tier::Diamond,
        Tier::Master,
    ];

    pub fn from_elo(elo: i64) -> Tier {
        if elo >= 5001 {
            Tier::Master
        } else if elo >= 3001 {
            Tier::Diamond
        } else if elo >= 2001 {
            Tier::Platinum
        } else if elo >= 1201 {
            Tier::Gold
        } else if elo >= 501 {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
            Tier::Diamond => "Diamond",
            Tier::Master => "Master",
        }
    }

    /// Inclusive ELO range covered by this tier. Master has no upper bound.
    pub fn range(&self) -> (i64, Option<i64>) {
        match self {
            Tier::Bronze => (0, Some(500)),
            Tier::Silver => (501, Some(1200)),
            Tier::Gold => (1201, Some(2000)),
            Tier::Platinum => (2001, Some(3000)),
            Tier::Diamond => (3001, Some(5000)),
            Tier::Master => (5001, None),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display-side sanity check: does the stored tier label match the ELO?
/// Whitespace around the stored label is ignored, case is not.
pub fn is_tier_consistent(elo: i64, tier: &str) -> bool {
    Tier::from_elo(elo).as_str() == tier.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::from_elo(0), Tier::Bronze);
        assert_eq!(Tier::from_elo(500), Tier::Bronze);
        assert_eq!(Tier::from_elo(501), Tier::Silver);
        assert_eq!(Tier::from_elo(1200), Tier::Silver);
        assert_eq!(Tier::from_elo(1201), Tier::Gold);
        assert_eq!(Tier::from_elo(2000), Tier::Gold);
        assert_eq!(Tier::from_elo(2001), Tier::Platinum);
        assert_eq!(Tier::from_elo(3000), Tier::Platinum);
        assert_eq!(Tier::from_elo(3001), Tier::Diamond);
        assert_eq!(Tier::from_elo(5000), Tier::Diamond);
        assert_eq!(Tier::from_elo(5001), Tier::Master);
        assert_eq!(Tier::from_elo(9999), Tier::Master);
    }

    #[test]
    fn test_tier_monotonic_in_elo() {
        let mut previous = Tier::from_elo(0);
        for elo in 1..=6000 {
            let current = Tier::from_elo(elo);
            assert!(current >= previous, "tier regressed at elo {}", elo);
            previous = current;
        }
    }

    #[test]
    fn test_ranges_cover_classification() {
        for tier in Tier::ALL {
            let (min, max) = tier.range();
            assert_eq!(Tier::from_elo(min), tier);
            if let Some(max) = max {
                assert_eq!(Tier::from_elo(max), tier);
                assert_ne!(Tier::from_elo(max + 1), tier);
            }
        }
    }

    #[test]
    fn test_tier_consistency_check() {
        assert!(is_tier_consistent(200, "Bronze"));
        assert!(is_tier_consistent(200, "  Bronze "));
        assert!(!is_tier_consistent(200, "bronze"));
        assert!(!is_tier_consistent(200, "Silver"));
        assert!(is_tier_consistent(5001, "Master"));
    }
}
