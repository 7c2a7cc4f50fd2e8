//! Font family resolution
//!
//! Maps the CSS font stacks stored on text blocks to fonts the PDF writer
//! can reference. Every registered family is backed by one of the PDF
//! standard-14 base fonts, so nothing needs to be embedded.

use crate::constants::{DEFAULT_FONT_FAMILY, FONT_FALLBACKS};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Standard-14 base font backing a registered family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseFont {
    Helvetica,
    TimesRoman,
    Courier,
}

impl BaseFont {
    pub const ALL: [BaseFont; 3] = [BaseFont::Helvetica, BaseFont::TimesRoman, BaseFont::Courier];

    /// `/BaseFont` name written into the font dictionary
    pub fn pdf_name(self) -> &'static str {
        match self {
            BaseFont::Helvetica => "Helvetica",
            BaseFont::TimesRoman => "Times-Roman",
            BaseFont::Courier => "Courier",
        }
    }

    /// Key of the font in a page's `/Font` resource dictionary
    pub fn resource_name(self) -> &'static str {
        match self {
            BaseFont::Helvetica => "F1",
            BaseFont::TimesRoman => "F2",
            BaseFont::Courier => "F3",
        }
    }
}

/// Outcome of resolving one font stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    /// Registered family name
    pub family: &'static str,
    pub base: BaseFont,
    /// True when nothing in the request matched and the default was used
    pub substituted: bool,
}

#[derive(Debug)]
struct Registry {
    families: HashMap<&'static str, BaseFont>,
    aliases: HashMap<&'static str, &'static str>,
}

impl Registry {
    fn build() -> Self {
        let families = HashMap::from([
            ("Inter", BaseFont::Helvetica),
            ("Arial", BaseFont::Helvetica),
            ("Helvetica", BaseFont::Helvetica),
            ("sans-serif", BaseFont::Helvetica),
            ("Times New Roman", BaseFont::TimesRoman),
            ("Times", BaseFont::TimesRoman),
            ("serif", BaseFont::TimesRoman),
            ("Courier New", BaseFont::Courier),
            ("Courier", BaseFont::Courier),
            ("monospace", BaseFont::Courier),
        ]);

        // Full stacks the editor emits
        let aliases = HashMap::from([
            ("Inter, ui-sans-serif, system-ui, Arial", "Inter"),
            ("sans-serif", "Arial"),
            ("serif", "Times New Roman"),
            ("monospace", "Courier New"),
        ]);

        Self { families, aliases }
    }

    fn family(&self, name: &str) -> Option<&'static str> {
        self.families.get_key_value(name).map(|(k, _)| *k)
    }
}

/// Resolves requested font stacks to registered families.
///
/// Until [`FontResolver::register_fonts`] runs, every request resolves to
/// the default family.
#[derive(Debug, Default)]
pub struct FontResolver {
    registry: OnceLock<Registry>,
}

impl FontResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in families. Safe to call repeatedly.
    pub fn register_fonts(&self) {
        self.registry.get_or_init(|| {
            log::debug!("Registering print fonts");
            Registry::build()
        });
    }

    pub fn is_registered(&self, family: &str) -> bool {
        self.registry
            .get()
            .is_some_and(|r| r.families.contains_key(family))
    }

    /// Names of every registered family, sorted
    pub fn registered_families(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .registry
            .get()
            .map(|r| r.families.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Registered family name for a CSS font stack
    pub fn resolve(&self, font_family: &str) -> &'static str {
        self.resolve_detailed(font_family).family
    }

    pub fn resolve_detailed(&self, font_family: &str) -> ResolvedFont {
        let found = self.registry.get().and_then(|registry| {
            let stack = font_family.trim();
            registry
                .aliases
                .get(stack)
                .copied()
                .or_else(|| registry.family(stack))
                .or_else(|| registry.family(&first_family(stack)))
        });

        let (family, substituted) = match found {
            Some(family) => (family, false),
            None => (DEFAULT_FONT_FAMILY, !font_family.trim().is_empty()),
        };

        ResolvedFont {
            family,
            base: self.base_font(family),
            substituted,
        }
    }

    /// The resolved family followed by the generic fallback chain
    pub fn font_fallback(&self, font_family: &str) -> Vec<&'static str> {
        let primary = self.resolve(font_family);
        std::iter::once(primary)
            .chain(FONT_FALLBACKS.into_iter().filter(|f| *f != primary))
            .collect()
    }

    /// Whether the request resolves to something other than the default
    pub fn is_supported(&self, font_family: &str) -> bool {
        self.is_registered(font_family) || self.resolve(font_family) != DEFAULT_FONT_FAMILY
    }

    /// Standard-14 font backing a family; unknown names map to Helvetica
    pub fn base_font(&self, family: &str) -> BaseFont {
        self.registry
            .get()
            .and_then(|r| r.families.get(family).copied())
            .unwrap_or(BaseFont::Helvetica)
    }
}

/// First entry of a comma-separated stack with quotes removed
fn first_family(stack: &str) -> String {
    stack
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .replace(['"', '\''], "")
}
