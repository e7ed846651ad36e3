use super::*;
use pretty_assertions::assert_eq;

#[test]
fn parse_normalizes_case_and_separators() {
    let locale = Locale::parse("EN-us");
    assert_eq!(locale.language(), "en");
    assert_eq!(locale.country(), "US");
    assert_eq!(locale.to_string(), "en_US");
}

#[test]
fn parse_keeps_variant() {
    let locale = Locale::parse("en_US_POSIX");
    assert_eq!(locale.variant(), "POSIX");
    assert_eq!(locale.to_string(), "en_US_POSIX");
}

#[test]
fn suffixes_most_specific_first() {
    let suffixes: Vec<String> = Locale::parse("de_AT").lookup_suffixes().into_vec();
    assert_eq!(suffixes, vec!["_de_AT".to_string(), "_de".to_string(), String::new()]);
}

#[test]
fn root_locale_only_tries_bare_name() {
    let names: Vec<String> = localized_names("page.ftl", &Locale::ROOT).into_vec();
    assert_eq!(names, vec!["page.ftl".to_string()]);
}

#[test]
fn localized_names_insert_before_extension() {
    let names: Vec<String> = localized_names("mail/welcome.ftl", &Locale::parse("de_AT")).into_vec();
    assert_eq!(
        names,
        vec![
            "mail/welcome_de_AT.ftl".to_string(),
            "mail/welcome_de.ftl".to_string(),
            "mail/welcome.ftl".to_string(),
        ]
    );
}

#[test]
fn localized_names_ignore_dots_in_directories() {
    let names: Vec<String> = localized_names("v1.2/page", &Locale::parse("fr")).into_vec();
    assert_eq!(names, vec!["v1.2/page_fr".to_string(), "v1.2/page".to_string()]);
}
