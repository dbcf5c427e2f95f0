//! `Content-Disposition` and `Content-Type` values for downloads.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// RFC 5987 `attr-char`: everything else is percent-encoded in `filename*`.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

const PLACEHOLDER: &str = "download";

/// Build an `attachment` disposition that survives any file name.
///
/// The name is sanitized first. The result carries an ASCII fallback in
/// `filename` plus the exact UTF-8 name in `filename*`; if nothing
/// printable is left for the fallback only `filename*` is emitted.
pub fn encode_filename_for_header(filename: &str) -> String {
    let sanitized = sanitize(filename);
    if sanitized.is_empty() {
        return format!("attachment; filename=\"{PLACEHOLDER}\"");
    }

    let fallback: String = sanitized.chars().filter(|c| is_token_char(*c)).collect();
    let encoded = utf8_percent_encode(&sanitized, ATTR_CHAR);

    if fallback.is_empty() {
        format!("attachment; filename*=UTF-8''{encoded}")
    } else {
        format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
    }
}

/// Content type guessed from the file extension.
pub fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Name used when a download has no explicit display name.
pub fn fallback_name(object_name: &str) -> &str {
    object_name
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("downloaded_file")
}

fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .filter_map(|c| match c {
            '"' => Some('\''),
            '\\' | '|' | '/' => Some('-'),
            '<' | '>' | ':' | '*' | '?' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_token_char(c: char) -> bool {
    matches!(c as u32, 33..=126)
        && !matches!(
            c,
            '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?'
                | '=' | '{' | '}'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;

    fn ext_value(header: &str) -> Option<String> {
        let raw = header.split("filename*=UTF-8''").nth(1)?;
        Some(percent_decode_str(raw).decode_utf8().ok()?.into_owned())
    }

    fn quoted_value(header: &str) -> Option<&str> {
        let start = header.find("filename=\"")? + "filename=\"".len();
        let rest = &header[start..];
        rest.find('"').map(|end| &rest[..end])
    }

    #[test]
    fn test_hostile_name_produces_valid_header() {
        let header = encode_filename_for_header("héllo\"world\r\n.txt");

        assert!(!header.chars().any(|c| c.is_control()));
        assert!(header.is_ascii());
        let quoted = quoted_value(&header).unwrap();
        assert_eq!(quoted, "hllo'world.txt");
        assert!(!quoted.contains('"'));
        assert_eq!(ext_value(&header).unwrap(), "héllo'world.txt");
    }

    #[test]
    fn test_path_separators_are_replaced() {
        let header = encode_filename_for_header("..\\etc/passwd|x");
        assert_eq!(ext_value(&header).unwrap(), "..-etc-passwd-x");
    }

    #[test]
    fn test_illegal_characters_are_dropped() {
        let header = encode_filename_for_header("a<b>c:d*e?f.pdf");
        assert_eq!(quoted_value(&header).unwrap(), "abcdef.pdf");
    }

    #[test]
    fn test_non_ascii_only_name_uses_extended_form() {
        let header = encode_filename_for_header("日本語");
        assert!(!header.contains("filename=\""));
        assert_eq!(ext_value(&header).unwrap(), "日本語");
    }

    #[test]
    fn test_blank_name_uses_placeholder() {
        assert_eq!(
            encode_filename_for_header("  \t "),
            "attachment; filename=\"download\""
        );
        assert_eq!(
            encode_filename_for_header(""),
            "attachment; filename=\"download\""
        );
    }

    #[test]
    fn test_spaces_survive_in_extended_form() {
        let header = encode_filename_for_header("my report.pdf");
        assert_eq!(quoted_value(&header).unwrap(), "myreport.pdf");
        assert!(header.ends_with("my%20report.pdf"));
    }

    #[test]
    fn test_content_type_and_fallback_name() {
        assert_eq!(content_type_for("photo.PNG"), "image/png");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
        assert_eq!(fallback_name("user/123-report.pdf"), "123-report.pdf");
        assert_eq!(fallback_name("dir/"), "downloaded_file");
    }
}
