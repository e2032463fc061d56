//! RTMR3 allowlist: the three modes named in spec.md §3.

use std::collections::HashSet;

use parking_lot::RwLock;

/// Which code measurements the Coordinator will admit.
pub enum Allowlist {
    /// Preloaded from configuration; membership is fixed for the process
    /// lifetime.
    Explicit(HashSet<String>),
    /// Trust-on-first-use: the first successfully-verified agent's RTMR3 is
    /// locked in and required thereafter.
    Tofu(RwLock<Option<String>>),
    /// No restriction (mock deployments only).
    Open,
}

impl Allowlist {
    pub fn explicit(values: impl IntoIterator<Item = String>) -> Self {
        Self::Explicit(values.into_iter().map(|v| v.to_ascii_lowercase()).collect())
    }

    pub fn tofu() -> Self {
        Self::Tofu(RwLock::new(None))
    }

    pub fn open() -> Self {
        Self::Open
    }

    /// Check (and, for TOFU, possibly lock in) membership of `rtmr3`.
    ///
    /// Returns `true` if `rtmr3` is (now) an accepted measurement.
    pub fn check_and_admit(&self, rtmr3: &str) -> bool {
        let rtmr3 = rtmr3.to_ascii_lowercase();
        match self {
            Allowlist::Open => true,
            Allowlist::Explicit(set) => set.contains(&rtmr3),
            Allowlist::Tofu(locked) => {
                let mut guard = locked.write();
                match guard.as_ref() {
                    Some(locked_value) => *locked_value == rtmr3,
                    None => {
                        *guard = Some(rtmr3);
                        true
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_mode_only_admits_listed_values() {
        let allow = Allowlist::explicit(["DEADBEEF".to_string()]);
        assert!(allow.check_and_admit("deadbeef"));
        assert!(!allow.check_and_admit("cafef00d"));
    }

    #[test]
    fn open_mode_admits_anything() {
        let allow = Allowlist::open();
        assert!(allow.check_and_admit("anything"));
    }

    #[test]
    fn tofu_locks_in_first_success_then_requires_it() {
        let allow = Allowlist::tofu();
        assert!(allow.check_and_admit("first-seen"));
        assert!(allow.check_and_admit("first-seen"));
        assert!(!allow.check_and_admit("different"));
    }
}
