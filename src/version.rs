/// This crate's major version number.
pub const VERSION_MAJOR: u32 = parse_u32(env!("CARGO_PKG_VERSION_MAJOR"));

/// This crate's minor version number.
pub const VERSION_MINOR: u32 = parse_u32(env!("CARGO_PKG_VERSION_MINOR"));

/// This crate's patch version number.
pub const VERSION_PATCH: u32 = parse_u32(env!("CARGO_PKG_VERSION_PATCH"));

/// Get the library version in the form "major.minor.patch".
pub fn crate_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

/// Get the ID of the source control revision that this crate was built
/// from, or "unknown" if it could not be determined at build time.
pub fn build_revision() -> String {
    build_revision_const().to_owned()
}

/// Checks whether the loaded API is compatible with the given version of the
/// API, abstracting API stability policy away from clients. The version
/// numbering used is major.minor.patch.
pub fn is_compatible(major: u32, minor: u32, _patch: u32) -> bool {
    if major > 0 {
        major == VERSION_MAJOR
    } else {
        minor == VERSION_MINOR
    }
}

const fn parse_u32(value: &str) -> u32 {
    let bytes = value.as_bytes();
    let mut acc = 0;
    let mut i = 0;
    while i < bytes.len() {
        acc = acc * 10 + u32::from(bytes[i] - b'0');
        i += 1;
    }
    acc
}

const fn build_revision_const() -> &'static str {
    if let Some(s) = option_env!("MODSORT_REVISION") {
        s
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod is_compatible {
        use super::*;

        #[test]
        fn should_return_true_if_given_the_current_version() {
            assert!(is_compatible(VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH));
        }

        #[test]
        fn should_return_true_if_given_a_different_patch_version() {
            assert!(is_compatible(
                VERSION_MAJOR,
                VERSION_MINOR,
                VERSION_PATCH + 1
            ));
        }

        #[test]
        fn should_return_false_if_given_a_different_major_version() {
            assert!(!is_compatible(
                VERSION_MAJOR + 1,
                VERSION_MINOR,
                VERSION_PATCH
            ));
        }

        #[test]
        fn should_return_false_if_given_a_different_minor_version() {
            assert!(!is_compatible(
                VERSION_MAJOR,
                VERSION_MINOR + 1,
                VERSION_PATCH
            ));
        }
    }

    mod crate_version {
        use super::*;

        #[test]
        fn should_be_version_numbers_separated_by_periods() {
            let expected = format!("{VERSION_MAJOR}.{VERSION_MINOR}.{VERSION_PATCH}");

            assert_eq!(expected, crate_version());
        }
    }

    mod build_revision {
        use super::*;

        #[test]
        fn should_not_be_empty() {
            assert!(!build_revision().is_empty());
        }
    }
}
