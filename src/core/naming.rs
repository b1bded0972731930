//! Destination file naming
//!
//! Transfers can rename files on the way: a prefix in front of the name and
//! a suffix between the stem and the extension. Target and archive
//! destinations carry independent prefix/suffix pairs, both applied through
//! [`decorated_file_name`].

/// Decorate a base file name with a prefix and a suffix
///
/// The name splits at its last dot; the suffix slots in between the stem
/// and the extension:
///
/// ```
/// use fileferry::core::decorated_file_name;
///
/// assert_eq!(decorated_file_name("a.txt", "p_", "_s"), "p_a_s.txt");
/// assert_eq!(decorated_file_name("a", "p_", "_s"), "p_a_s");
/// assert_eq!(decorated_file_name("archive.tar.gz", "p_", "_s"), "p_archive.tar_s.gz");
/// ```
///
/// A name without an extension gets no dot appended, and a name ending in a
/// dot drops it. A leading dot marks an extension with an empty stem, so
/// `.bashrc` decorates to `p__s.bashrc`.
pub fn decorated_file_name(base: &str, prefix: &str, suffix: &str) -> String {
    let (stem, extension) = split_extension(base);
    if extension.is_empty() {
        format!("{prefix}{stem}{suffix}")
    } else {
        format!("{prefix}{stem}{suffix}.{extension}")
    }
}

/// Split a file name at its last dot into a stem and an extension
///
/// No dot means no extension.
fn split_extension(base: &str) -> (&str, &str) {
    match base.rfind('.') {
        Some(cut) => (&base[..cut], &base[cut + 1..]),
        None => (base, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_prefix_and_suffix_around_stem() {
        assert_eq!(decorated_file_name("a.txt", "p_", "_s"), "p_a_s.txt");
        assert_eq!(decorated_file_name("report.xml", "in_", ""), "in_report.xml");
        assert_eq!(decorated_file_name("report.xml", "", "_done"), "report_done.xml");
    }

    #[test]
    fn test_no_extension_appends_no_dot() {
        assert_eq!(decorated_file_name("a", "p_", "_s"), "p_a_s");
        assert_eq!(decorated_file_name("Makefile", "", "_old"), "Makefile_old");
    }

    #[test]
    fn test_empty_prefix_and_suffix_keep_name() {
        assert_eq!(decorated_file_name("a.txt", "", ""), "a.txt");
        assert_eq!(decorated_file_name("a", "", ""), "a");
    }

    #[test]
    fn test_trailing_dot_is_dropped() {
        assert_eq!(decorated_file_name("name.", "p_", "_s"), "p_name_s");
    }

    #[test]
    fn test_leading_dot_counts_as_extension() {
        assert_eq!(decorated_file_name(".bashrc", "p_", "_s"), "p__s.bashrc");
    }

    #[test]
    fn test_only_last_extension_moves() {
        assert_eq!(
            decorated_file_name("archive.tar.gz", "p_", "_s"),
            "p_archive.tar_s.gz"
        );
    }

    proptest! {
        #[test]
        fn dotless_names_concatenate(
            name in "[a-zA-Z0-9_-]{1,20}",
            prefix in "[a-z_]{0,5}",
            suffix in "[a-z_]{0,5}",
        ) {
            let decorated = decorated_file_name(&name, &prefix, &suffix);
            prop_assert_eq!(decorated, format!("{prefix}{name}{suffix}"));
        }

        #[test]
        fn extension_survives_decoration(
            stem in "[a-zA-Z0-9_-]{1,20}",
            ext in "[a-z0-9]{1,6}",
            prefix in "[a-z_]{0,5}",
            suffix in "[a-z_]{0,5}",
        ) {
            let decorated = decorated_file_name(&format!("{stem}.{ext}"), &prefix, &suffix);
            let tail = format!(".{ext}");
            prop_assert!(decorated.starts_with(&prefix));
            prop_assert!(decorated.ends_with(&tail));
            prop_assert_eq!(decorated, format!("{prefix}{stem}{suffix}.{ext}"));
        }
    }
}
