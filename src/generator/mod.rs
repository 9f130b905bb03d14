//! Enum class generation strategies and their registry.
//!
//! Every strategy produces a complete enum class file: the element fields, `$VALUES`,
//! `values()`, `valueOf(String)`, the constructors and a static initializer. They differ in
//! how `<clinit>` creates the elements, which decides how many elements fit before a class file
//! limit is hit:
//!
//! | Id              | Technique                                         | Version | Max elements |
//! |-----------------|---------------------------------------------------|---------|--------------|
//! | `ConDy`         | One `CONSTANT_Dynamic` per element (JEP 309)      | 55      | 10963        |
//! | `ExtractMethod` | Construction moved to a chain of helper methods   | 51      | 10920        |
//! | `Unsafe`        | Reflective stores through `sun.misc.Unsafe`       | 51      | 65410        |
//!
//! # Examples
//!
//! ```rust
//! use hugeenum::Strategy;
//!
//! let strategy = Strategy::from_id("unsafe")?;
//! let names: Vec<String> = vec!["RED".into(), "GREEN".into(), "BLUE".into()];
//! let class = strategy.generate("com.example.Color", &names)?;
//! assert_eq!(&class[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok::<(), hugeenum::Error>(())
//! ```

pub mod bootstrap;
pub(crate) mod common;
pub mod condy;
pub mod extract;
pub mod inject;
pub mod names;

use log::debug;
use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

use crate::{Error, Result};

/// Technique used to initialize the enum elements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, EnumIter, EnumCount, Display,
    IntoStaticStr,
)]
pub enum Strategy {
    /// Constant-dynamic entries bootstrapped through the element constructor
    ConDy,
    /// Element construction extracted to a chain of synthetic methods
    #[default]
    ExtractMethod,
    /// Reflective field stores through `sun.misc.Unsafe`
    Unsafe,
}

/// Registry entry describing a [`Strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyInfo {
    /// Identifier, matched case-insensitively by [`Strategy::from_id`]
    pub id: &'static str,
    /// Human readable summary
    pub description: &'static str,
    /// Element count used when the caller does not supply names
    pub default_elements: usize,
    /// Largest element count known to fit
    pub max_elements: usize,
    /// The strategy itself
    pub strategy: Strategy,
}

/// All strategies, sorted by id.
pub const REGISTRY: [StrategyInfo; Strategy::COUNT] = [
    StrategyInfo {
        id: "ConDy",
        description: "Employ Constant Dynamic (JEP 309) for enum elements initialization",
        default_elements: condy::MAX_ELEMENTS,
        max_elements: condy::MAX_ELEMENTS,
        strategy: Strategy::ConDy,
    },
    StrategyInfo {
        id: "ExtractMethod",
        description: "Extract enum elements initialization code to separate method",
        default_elements: extract::MAX_ELEMENTS,
        max_elements: extract::MAX_ELEMENTS,
        strategy: Strategy::ExtractMethod,
    },
    StrategyInfo {
        id: "Unsafe",
        description: "Employ sun.misc.Unsafe for enum elements initialization",
        default_elements: inject::MAX_ELEMENTS,
        max_elements: inject::MAX_ELEMENTS,
        strategy: Strategy::Unsafe,
    },
];

impl Strategy {
    /// Looks up a strategy by id, ignoring ASCII case.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownStrategy`] if no registered id matches.
    pub fn from_id(id: &str) -> Result<Strategy> {
        REGISTRY
            .iter()
            .find(|info| info.id.eq_ignore_ascii_case(id))
            .map(|info| info.strategy)
            .ok_or_else(|| Error::UnknownStrategy(id.to_string()))
    }

    /// Registry entry of this strategy.
    #[must_use]
    pub fn info(self) -> &'static StrategyInfo {
        match self {
            Strategy::ConDy => &REGISTRY[0],
            Strategy::ExtractMethod => &REGISTRY[1],
            Strategy::Unsafe => &REGISTRY[2],
        }
    }

    /// Registered identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.info().id
    }

    /// Synthetic member names an element must not shadow.
    #[must_use]
    pub fn reserved_names(self) -> &'static [&'static str] {
        match self {
            Strategy::ExtractMethod => &[names::VALUES_FIELD, extract::VALUE_INDEX_FIELD],
            Strategy::ConDy | Strategy::Unsafe => &[names::VALUES_FIELD],
        }
    }

    /// Generates the class file for enum `type_name` (source form, `a.b.Color`) with
    /// `element_names` in declaration order.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidIdentifier`] or [`crate::Error::DuplicateIdentifier`]
    /// for bad names, and the strategy's overflow error when the class does not fit.
    pub fn generate(self, type_name: &str, element_names: &[String]) -> Result<Vec<u8>> {
        let binary_name = names::binary_type_name(type_name)?;
        names::validate_element_names(element_names, self.reserved_names())?;

        debug!(
            "Generating {} with {} elements using {}",
            binary_name,
            element_names.len(),
            self.id()
        );
        match self {
            Strategy::ConDy => condy::generate(&binary_name, element_names),
            Strategy::ExtractMethod => extract::generate(&binary_name, element_names),
            Strategy::Unsafe => inject::generate(&binary_name, element_names),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::from_id(s)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn registry_is_sorted_and_complete() {
        let ids: Vec<&str> = REGISTRY.iter().map(|info| info.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);

        for strategy in Strategy::iter() {
            assert_eq!(strategy.info().strategy, strategy);
            let variant: &'static str = strategy.into();
            assert_eq!(variant, strategy.id());
            assert!(strategy.info().default_elements <= strategy.info().max_elements);
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(Strategy::from_id("condy").unwrap(), Strategy::ConDy);
        assert_eq!(
            Strategy::from_id("EXTRACTMETHOD").unwrap(),
            Strategy::ExtractMethod
        );
        assert_eq!("Unsafe".parse::<Strategy>().unwrap(), Strategy::Unsafe);
        assert!(matches!(
            Strategy::from_id("Reflection"),
            Err(Error::UnknownStrategy(id)) if id == "Reflection"
        ));
        assert!(Strategy::from_id("").is_err());
    }

    #[test]
    fn default_strategy() {
        assert_eq!(Strategy::default(), Strategy::ExtractMethod);
        assert_eq!(Strategy::default().to_string(), "ExtractMethod");
    }

    #[test]
    fn names_are_validated_first() {
        let names: Vec<String> = vec!["A".into(), "valueIndex".into()];
        assert!(matches!(
            Strategy::ExtractMethod.generate("X", &names),
            Err(Error::DuplicateIdentifier(name)) if name == "valueIndex"
        ));
        assert!(Strategy::Unsafe.generate("X", &names).is_ok());
        assert!(matches!(
            Strategy::ConDy.generate("a.1b.X", &names),
            Err(Error::InvalidIdentifier(_))
        ));
        let values: Vec<String> = vec!["$VALUES".into()];
        assert!(matches!(
            Strategy::ConDy.generate("X", &values),
            Err(Error::DuplicateIdentifier(_))
        ));
    }
}
