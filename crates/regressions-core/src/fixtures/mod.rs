macro_rules! switch_setters {
    () => {
        /// Regenerate the baseline when this check fails.
        pub fn force_regen(mut self, enabled: bool) -> Self {
            self.switches.force_regen = enabled;
            self
        }

        /// Prefix the snapshot basename with the test's enclosing group.
        pub fn with_test_class_names(mut self, enabled: bool) -> Self {
            self.switches.with_test_class_names = enabled;
            self
        }
    };
}

pub(crate) use switch_setters;

pub mod data;
pub mod file;
pub mod image;
pub mod ndarrays;
pub mod representers;
pub mod table;
