//! Identifier case conversions.

/// Splits a snake_case identifier into its lowercase words.
fn words(ident: &str) -> Vec<String> {
    ident
        .split('_')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn pascal_case(ident: &str) -> String {
    words(ident)
        .iter()
        .map(|word| capitalize(word))
        .collect()
}

pub(crate) fn camel_case(ident: &str) -> String {
    words(ident)
        .iter()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.clone() } else { capitalize(word) })
        .collect()
}

pub(crate) fn screaming_snake_case(ident: &str) -> String {
    words(ident)
        .join("_")
        .to_uppercase()
}

/// Applies a serde `rename_all` rule to a snake_case field name.
pub(crate) fn rename_all(rule: &str, ident: &str) -> Option<String> {
    Some(match rule {
        "lowercase" => ident.replace('_', "").to_lowercase(),
        "UPPERCASE" => ident.replace('_', "").to_uppercase(),
        "PascalCase" => pascal_case(ident),
        "camelCase" => camel_case(ident),
        "snake_case" => words(ident).join("_"),
        "SCREAMING_SNAKE_CASE" => screaming_snake_case(ident),
        "kebab-case" => words(ident).join("-"),
        "SCREAMING-KEBAB-CASE" => words(ident).join("-").to_uppercase(),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_snake_case() {
        assert_eq!(pascal_case("first_name"), "FirstName");
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(screaming_snake_case("first_name"), "FIRST_NAME");
        assert_eq!(pascal_case("id"), "Id");
    }

    #[test]
    fn applies_rename_all_rules() {
        assert_eq!(rename_all("kebab-case", "start_date").as_deref(), Some("start-date"));
        assert_eq!(rename_all("UPPERCASE", "start_date").as_deref(), Some("STARTDATE"));
        assert_eq!(rename_all("Title Case", "start_date"), None);
    }
}
