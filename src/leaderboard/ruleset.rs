//! The canonical ruleset of the global ranking.

use crate::draft::types::{Limit, SessionLimits};

/// Shown when a score is not eligible for the global ranking.
pub const CANONICAL_RULES_MESSAGE: &str = "Only scores played with the basic configuration are saved:\n\
- 1 skip\n\
- 1 legendary\n\
- unlimited ultra beasts\n\
- 1 mega\n\
- shinies without stat boost";

/// Whether a game played with `limits` may enter the global ranking.
///
/// Variants may be on, but their stat boost may not.
pub fn is_canonical(limits: &SessionLimits) -> bool {
    limits.skip_limit == Limit::Finite(1)
        && limits.legendary_limit == Limit::Finite(1)
        && limits.ultrabeast_limit == Limit::Unlimited
        && limits.mega_limit == Limit::Finite(1)
        && !limits.variant_boost_active()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_ruleset() {
        let canonical = SessionLimits::canonical();
        assert!(is_canonical(&canonical));

        let with_variants = SessionLimits {
            variant_enabled: true,
            ..canonical
        };
        assert!(is_canonical(&with_variants));

        let boosted = SessionLimits {
            variant_enabled: true,
            variant_boost_enabled: true,
            ..canonical
        };
        assert!(!is_canonical(&boosted));

        // the startup defaults cap ultra beasts, so they are not canonical
        assert!(!is_canonical(&SessionLimits::default()));

        let two_skips = SessionLimits {
            skip_limit: Limit::Finite(2),
            ..canonical
        };
        assert!(!is_canonical(&two_skips));
    }
}
