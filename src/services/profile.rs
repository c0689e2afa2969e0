use crate::models::MAX_PROFILE_NAME_LENGTH;

/// Returns a filtered string compatible with a StarCraft profile name.
///
/// Keeps ASCII letters, digits and spaces, trims the result, then truncates
/// it to [`MAX_PROFILE_NAME_LENGTH`] characters. A space left at the cut is
/// dropped so the result is a fixed point. Blank input yields an empty
/// string; callers pick their own fallback name.
pub fn sanitize_profile_name(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ' ')
        .collect();

    let truncated: String = filtered
        .trim()
        .chars()
        .take(MAX_PROFILE_NAME_LENGTH)
        .collect();

    truncated.trim_end().to_string()
}
