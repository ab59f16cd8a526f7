//! Profile name normalization and migration preconditions

use crate::error::{ForeignExtension, ValidationError};
use crate::registry::ExtensionRegistry;
use camino::{Utf8Path, Utf8PathBuf};
use deunicode::deunicode_char;
use regex::Regex;
use sitepack_core::types::{ExtensionKind, ExtensionSet};
use sitepack_core::utils::dir_accepts_writes;
use sitepack_core::ConfigStorage;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static NON_IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").expect("identifier regex is valid"));

static REPEATED_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("underscore regex is valid"));

/// Reduce a string to ASCII, romanizing other scripts
///
/// Accents are stripped through NFKD first so "é" becomes "e" rather than
/// a transliteration of the composed character. Anything without an ASCII
/// form becomes `_`.
fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfkd() {
        if c.is_ascii() {
            out.push(c);
        } else if is_combining_mark(c) {
            continue;
        } else {
            out.push_str(deunicode_char(c).unwrap_or("_"));
        }
    }
    out
}

/// Convert a name to a valid machine name
///
/// "Mon Café" becomes `mon_cafe`, "My--Site" becomes `my_site`. The result
/// only contains `[a-z0-9_]`, never two underscores in a row, and
/// normalizing it again returns it unchanged.
pub fn normalize_to_identifier(input: &str) -> String {
    let value = transliterate(input).to_lowercase();
    let value = NON_IDENTIFIER_RE.replace_all(&value, "_");
    REPEATED_UNDERSCORE_RE.replace_all(&value, "_").into_owned()
}

/// Checks whether a profile can be generated from the current site
pub struct NameValidator<'a> {
    registry: &'a mut dyn ExtensionRegistry,
    live: &'a dyn ConfigStorage,
    profiles_dir: &'a Utf8Path,
}

impl<'a> NameValidator<'a> {
    pub fn new(
        registry: &'a mut dyn ExtensionRegistry,
        live: &'a dyn ConfigStorage,
        profiles_dir: &'a Utf8Path,
    ) -> Self {
        Self {
            registry,
            live,
            profiles_dir,
        }
    }

    /// Validate the names and the environment, failing on the first problem
    ///
    /// The registry is rescanned once up front, so a unit added or moved
    /// since the last scan is seen by every check. Checks, in order:
    /// 1. the active profile contains no other modules or themes
    /// 2. both names are present
    /// 3. the machine name is already normalized
    /// 4. no existing unit uses the machine name
    /// 5. the profiles directory is writable
    pub fn validate(
        &mut self,
        display_name: &str,
        machine_name: &str,
    ) -> Result<(), ValidationError> {
        self.registry.refresh()?;
        self.check_active_profile_owns_nothing()?;

        if display_name.trim().is_empty() || machine_name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }

        let normalized = normalize_to_identifier(machine_name);
        if machine_name != normalized {
            return Err(ValidationError::InvalidMachineName {
                machine_name: machine_name.to_string(),
                suggestion: normalized,
            });
        }

        if let Some(existing) = self.registry.find(machine_name)? {
            return Err(ValidationError::MachineNameTaken {
                machine_name: machine_name.to_string(),
                kind: existing.kind,
                path: existing.path,
            });
        }

        if !dir_accepts_writes(self.profiles_dir.as_std_path()) {
            return Err(ValidationError::ProfilesDirNotWritable {
                directory: self.profiles_dir.to_owned(),
            });
        }

        info!("Profile '{}' ({}) passed validation", display_name, machine_name);
        Ok(())
    }

    /// The outgoing profile must not own units the new profile would orphan
    fn check_active_profile_owns_nothing(&mut self) -> Result<(), ValidationError> {
        let active = ExtensionSet::read_from(self.live)?.unwrap_or_default();
        let Some(profile) = active.profile.as_deref() else {
            debug!("No active profile, skipping ownership check");
            return Ok(());
        };

        let profile_path: Utf8PathBuf = self
            .registry
            .list(ExtensionKind::Profile)?
            .remove(profile)
            .map(|p| p.path)
            .ok_or_else(|| ValidationError::UnknownActiveProfile {
                profile: profile.to_string(),
            })?;

        let mut discovered = BTreeMap::new();
        for kind in [
            ExtensionKind::Module,
            ExtensionKind::Theme,
            ExtensionKind::Profile,
        ] {
            discovered.append(&mut self.registry.list(kind)?);
        }

        let mut foreign = Vec::new();
        for kind in [ExtensionKind::Module, ExtensionKind::Theme] {
            for name in active.active_names(kind) {
                let Some(unit) = discovered.get(name) else {
                    return Err(ValidationError::ActiveExtensionMissing {
                        name: name.to_string(),
                        kind,
                    });
                };
                if unit.path.starts_with(&profile_path) {
                    foreign.push(ForeignExtension {
                        name: name.to_string(),
                        kind,
                        path: unit.path.clone(),
                    });
                }
            }
        }

        if foreign.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ForeignExtensions {
                profile: profile.to_string(),
                path: profile_path,
                extensions: foreign,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("My Site", "my_site" ; "spaces")]
    #[test_case("My--Site!!", "my_site_" ; "punctuation runs")]
    #[test_case("already_ok_123", "already_ok_123" ; "identity")]
    #[test_case("Mon Café", "mon_cafe" ; "accents")]
    #[test_case("Straße", "strasse" ; "sharp s")]
    #[test_case("Ærø Ø", "aero_o" ; "nordic letters")]
    #[test_case("a__b___c", "a_b_c" ; "repeated underscores")]
    #[test_case("Привет мир", "privet_mir" ; "cyrillic")]
    #[test_case("Ελλάδα", "ellada" ; "greek")]
    #[test_case("", "" ; "empty")]
    fn test_normalize(input: &str, expected: &str) {
        assert_eq!(normalize_to_identifier(input), expected);
    }

    #[test]
    fn test_normalize_keeps_edge_underscores() {
        assert_eq!(normalize_to_identifier(" site "), "_site_");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_identifier(input in ".*") {
            let out = normalize_to_identifier(&input);
            prop_assert!(out
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            prop_assert!(!out.contains("__"));
        }

        #[test]
        fn prop_normalize_is_idempotent(input in ".*") {
            let once = normalize_to_identifier(&input);
            prop_assert_eq!(normalize_to_identifier(&once), once);
        }
    }
}
