//! Attachment content types by file extension.

use std::path::Path;

/// Fallback for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

const TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
];

/// Returns the MIME type for `path` based on its extension, ignoring case.
///
/// A leading dot counts as an extension separator, so `.pdf` is a PDF.
#[must_use]
pub fn mime_type_for_path(path: impl AsRef<Path>) -> &'static str {
    let Some(name) = path.as_ref().file_name().and_then(|n| n.to_str()) else {
        return OCTET_STREAM;
    };
    let Some((_, ext)) = name.rsplit_once('.') else {
        return OCTET_STREAM;
    };
    TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map_or(OCTET_STREAM, |&(_, mime)| mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(mime_type_for_path("report.pdf"), "application/pdf");
        assert_eq!(mime_type_for_path("notes.txt"), "text/plain");
        assert_eq!(mime_type_for_path("old.doc"), "application/msword");
        assert_eq!(
            mime_type_for_path("new.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(mime_type_for_path("photo.jpg"), "image/jpeg");
        assert_eq!(mime_type_for_path("diagram.png"), "image/png");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(mime_type_for_path("SCAN.PDF"), "application/pdf");
        assert_eq!(mime_type_for_path("/tmp/Photo.JpG"), "image/jpeg");
    }

    #[test]
    fn test_unknown_and_missing_extensions() {
        assert_eq!(mime_type_for_path("archive.zip"), OCTET_STREAM);
        assert_eq!(mime_type_for_path("photo.jpeg"), OCTET_STREAM);
        assert_eq!(mime_type_for_path("Makefile"), OCTET_STREAM);
        assert_eq!(mime_type_for_path("trailing."), OCTET_STREAM);
        assert_eq!(mime_type_for_path(""), OCTET_STREAM);
    }

    #[test]
    fn test_only_last_extension_counts() {
        assert_eq!(mime_type_for_path("backup.pdf.zip"), OCTET_STREAM);
        assert_eq!(mime_type_for_path("letter.txt.pdf"), "application/pdf");
        assert_eq!(mime_type_for_path(".pdf"), "application/pdf");
    }

    fn known() -> impl Strategy<Value = (&'static str, &'static str)> {
        proptest::sample::select(TYPES.to_vec())
    }

    proptest! {
        #[test]
        fn prop_known_extension_any_case((ext, mime) in known(), stem in "[a-zA-Z0-9_-]{1,12}", mask in any::<u8>()) {
            let mixed: String = ext
                .chars()
                .enumerate()
                .map(|(i, c)| if mask & (1 << (i % 8)) != 0 { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert_eq!(mime_type_for_path(format!("{stem}.{mixed}")), mime);
        }

        #[test]
        fn prop_unknown_extension_is_octet_stream(stem in "[a-z]{1,8}", ext in "[a-z]{1,6}") {
            prop_assume!(!TYPES.iter().any(|(known, _)| *known == ext));
            prop_assert_eq!(mime_type_for_path(format!("{stem}.{ext}")), OCTET_STREAM);
        }
    }
}
