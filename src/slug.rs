use std::collections::HashSet;

/// Lowercase ASCII slug: runs of anything that isn't alphanumeric become one `-`.
/// Falls back to `fallback` when nothing usable is left.
pub fn slugify(input: &str, fallback: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !output.is_empty() {
                output.push('-');
            }
            pending_dash = false;
            output.push(ch.to_ascii_lowercase());
        } else if ch != '\'' {
            pending_dash = true;
        }
    }

    if output.is_empty() {
        fallback.to_owned()
    } else {
        output
    }
}

/// First of `base`, `base-1`, `base-2`, ... not in `taken`.
pub fn unique(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_owned();
    }
    (1..)
        .map(|counter| format!("{base}-{counter}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_owned())
}

/// `LIKE` pattern matching the suffixed variants of `base`.
pub fn suffix_pattern(base: &str) -> String {
    let escaped = base.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("{escaped}-%")
}
