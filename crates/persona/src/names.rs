//! Profile name rules.

use crate::error::LifecycleError;

/// Profile created by `init` and activated when nothing else is requested.
pub const DEFAULT_PROFILE: &str = "default";

/// Index file listing every profile, one name per line.
pub const PROFILES_FILE: &str = "profiles";

/// Index file holding the name of the current profile.
pub const CURRENT_FILE: &str = "current_profile";

/// Names `add` refuses: the index files and the default profile.
pub const RESERVED_NAMES: [&str; 3] = [PROFILES_FILE, CURRENT_FILE, DEFAULT_PROFILE];

/// Check that `name` may be given to a new profile.
///
/// # Errors
///
/// - [`LifecycleError::InvalidName`] if the name is empty, surrounded by
///   whitespace, or not usable as a single directory name
/// - [`LifecycleError::Reserved`] for the names in [`RESERVED_NAMES`]
/// - [`LifecycleError::Underscore`] for names beginning with `_`
pub fn validate_name(name: &str) -> Result<(), LifecycleError> {
    if !is_usable_dir_name(name) {
        return Err(LifecycleError::InvalidName(name.to_owned()));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(LifecycleError::Reserved(name.to_owned()));
    }
    if name.starts_with('_') {
        return Err(LifecycleError::Underscore(name.to_owned()));
    }
    Ok(())
}

/// Whether `name` can be joined onto the base directory as one child
/// directory without escaping it.
pub(crate) fn is_usable_dir_name(name: &str) -> bool {
    !(name.is_empty()
        || name.trim() != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.chars().any(char::is_control))
}

/// Whether a name read back from the `profiles` file may be used as a
/// profile. The index files themselves never qualify.
pub(crate) fn is_indexable(name: &str) -> bool {
    is_usable_dir_name(name) && name != PROFILES_FILE && name != CURRENT_FILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["work", "home-2", "a_b", "Ünïcode", "with space"] {
            assert_eq!(validate_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn test_reserved() {
        for name in RESERVED_NAMES {
            assert_eq!(
                validate_name(name),
                Err(LifecycleError::Reserved(name.to_owned()))
            );
        }
    }

    #[test]
    fn test_underscore() {
        assert_eq!(
            validate_name("_private"),
            Err(LifecycleError::Underscore("_private".to_owned()))
        );
    }

    #[test]
    fn test_invalid() {
        for name in ["", " x", "x\n", ".", "..", "a/b", "a\\b"] {
            assert!(
                matches!(validate_name(name), Err(LifecycleError::InvalidName(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_indexable() {
        assert!(is_indexable("default"));
        assert!(is_indexable("_legacy"));
        for name in ["..", ".", "a/b", PROFILES_FILE, CURRENT_FILE] {
            assert!(!is_indexable(name), "{name:?}");
        }
    }
}
