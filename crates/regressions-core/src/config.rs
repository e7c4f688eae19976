pub const FORCE_REGEN_ENV: &str = "REGRESSIONS_FORCE_REGEN";
pub const REGEN_ALL_ENV: &str = "REGRESSIONS_REGEN_ALL";
pub const WITH_TEST_CLASS_NAMES_ENV: &str = "REGRESSIONS_WITH_TEST_CLASS_NAMES";

/// Process-wide switches applied to every check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegressionSettings {
    /// Re-generate the expected file when a check fails.
    pub force_regen: bool,
    /// Re-generate every expected file without comparing.
    pub regen_all: bool,
    /// Prefix basenames with the enclosing test group.
    pub with_test_class_names: bool,
}

impl RegressionSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| lookup(name).as_deref().is_some_and(is_truthy);
        Self {
            force_regen: flag(FORCE_REGEN_ENV),
            regen_all: flag(REGEN_ALL_ENV),
            with_test_class_names: flag(WITH_TEST_CLASS_NAMES_ENV),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn switches_follow_truthy_values() {
        let env = HashMap::from([
            (FORCE_REGEN_ENV, "1"),
            (REGEN_ALL_ENV, "no"),
            (WITH_TEST_CLASS_NAMES_ENV, " TRUE "),
        ]);
        let settings = RegressionSettings::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert!(settings.force_regen);
        assert!(!settings.regen_all);
        assert!(settings.with_test_class_names);
    }

    #[test]
    fn unset_environment_disables_everything() {
        let settings = RegressionSettings::from_lookup(|_| None);
        assert_eq!(settings, RegressionSettings::default());
    }
}
