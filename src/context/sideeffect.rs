//! Side-effect classification.

use strum::{Display, EnumString};

/// How much an invocation may have changed state outside its own registers.
///
/// Levels are ordered: `None < Weak < Strong`. An invocation starts at
/// [`SideEffect::Strong`] and is only lowered when there is evidence of a
/// purer execution.
///
/// ```rust
/// use std::str::FromStr;
/// use smaliscope::context::SideEffect;
///
/// assert!(SideEffect::None < SideEffect::Strong);
/// assert_eq!(SideEffect::from_str("weak").unwrap(), SideEffect::Weak);
/// assert_eq!(SideEffect::Strong.to_string(), "strong");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum SideEffect {
    /// No observable effect, safe to remove if the result is unused.
    None,
    /// Effects limited to objects passed in.
    Weak,
    /// Arbitrary effects.
    #[default]
    Strong,
}

impl SideEffect {
    /// The larger of two levels.
    #[must_use]
    pub fn join(self, other: SideEffect) -> SideEffect {
        self.max(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pessimistic() {
        assert_eq!(SideEffect::default(), SideEffect::Strong);
    }

    #[test]
    fn test_join() {
        assert_eq!(SideEffect::None.join(SideEffect::Weak), SideEffect::Weak);
        assert_eq!(SideEffect::Strong.join(SideEffect::None), SideEffect::Strong);
    }
}
