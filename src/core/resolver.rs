//! Fallback chain for variant lookups.
//!
//! Resolution is a pure read over local state. The first present value wins:
//!
//! 1. the variant in the store
//! 2. the call-site fallback
//! 3. `initial_flags[flag_key]`
//! 4. the configured `fallback_variant`
//! 5. the empty string

use crate::core::SkylabConfig;
use crate::storage::Storage;
use crate::types::{Variant, VariantSource};

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub variant: Variant,
    pub source: VariantSource,
}

impl Resolution {
    fn new(variant: Variant, source: VariantSource) -> Self {
        Self { variant, source }
    }
}

pub fn resolve_variant(
    flag_key: &str,
    storage: &dyn Storage,
    fallback: Option<Variant>,
    config: &SkylabConfig,
) -> Resolution {
    if let Some(variant) = storage.get(flag_key) {
        return Resolution::new(variant, VariantSource::Store);
    }

    if let Some(variant) = fallback {
        return Resolution::new(variant, VariantSource::CallSite);
    }

    if let Some(variant) = config.initial_flags.get(flag_key) {
        return Resolution::new(variant.clone(), VariantSource::InitialFlags);
    }

    if let Some(ref value) = config.fallback_variant {
        return Resolution::new(Variant::new(value.clone()), VariantSource::FallbackVariant);
    }

    Resolution::new(Variant::new(""), VariantSource::Default)
}
