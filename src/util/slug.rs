// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

/// Convert a display name into the object id part of an entity id.
///
/// Lowercase ASCII letters and digits are kept, every other run of characters is replaced by a
/// single underscore. Leading and trailing underscores are removed. An empty result is returned
/// as `unnamed`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        "unnamed".into()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;
    use rstest::rstest;

    #[rstest]
    #[case("B1", "b1")]
    #[case("Master left", "master_left")]
    #[case("  Living room -- east ", "living_room_east")]
    #[case("Küche", "k_che")]
    #[case("109.055-03", "109_055_03")]
    #[case("!!!", "unnamed")]
    fn slugify_creates_entity_object_ids(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(expected, slugify(name));
    }
}
