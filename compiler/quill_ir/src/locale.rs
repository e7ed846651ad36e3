//! Locales and localized template-name lookup.

use std::fmt;

use smallvec::SmallVec;

/// A `language[_COUNTRY[_variant]]` locale.
///
/// Only used for template lookup, the `.locale`/`.lang` special variables and
/// the `setting` directive; no locale-sensitive formatting is attached.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Locale {
    language: String,
    country: String,
    variant: String,
}

impl Locale {
    /// Locale with no language; lookups with it only try the bare name.
    pub const ROOT: Locale = Locale {
        language: String::new(),
        country: String::new(),
        variant: String::new(),
    };

    pub fn new(language: &str, country: &str, variant: &str) -> Self {
        Locale {
            language: language.to_ascii_lowercase(),
            country: country.to_ascii_uppercase(),
            variant: variant.to_owned(),
        }
    }

    /// Parse `en`, `en_US`, `en-US` or `en_US_POSIX`.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.trim().splitn(3, ['_', '-']);
        let language = parts.next().unwrap_or("");
        let country = parts.next().unwrap_or("");
        let variant = parts.next().unwrap_or("");
        Locale::new(language, country, variant)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn is_root(&self) -> bool {
        self.language.is_empty()
    }

    /// Locale suffixes from most to least specific, ending with the empty
    /// suffix: `["_en_US_POSIX", "_en_US", "_en", ""]`.
    pub fn lookup_suffixes(&self) -> SmallVec<[String; 4]> {
        let mut suffixes = SmallVec::new();
        if !self.language.is_empty() {
            if !self.country.is_empty() {
                if !self.variant.is_empty() {
                    suffixes.push(format!(
                        "_{}_{}_{}",
                        self.language, self.country, self.variant
                    ));
                }
                suffixes.push(format!("_{}_{}", self.language, self.country));
            }
            suffixes.push(format!("_{}", self.language));
        }
        suffixes.push(String::new());
        suffixes
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.country.is_empty() {
            write!(f, "_{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "_{}", self.variant)?;
        }
        Ok(())
    }
}

/// Candidate source names for `name` under `locale`, most specific first.
///
/// The locale suffix goes before the extension of the last path segment:
/// `mail/welcome.ftl` under `de_AT` yields `mail/welcome_de_AT.ftl`,
/// `mail/welcome_de.ftl`, `mail/welcome.ftl`.
pub fn localized_names(name: &str, locale: &Locale) -> SmallVec<[String; 4]> {
    let segment_start = name.rfind('/').map_or(0, |i| i + 1);
    let (stem, ext) = match name[segment_start..].rfind('.') {
        Some(dot) => name.split_at(segment_start + dot),
        None => (name, ""),
    };
    locale
        .lookup_suffixes()
        .into_iter()
        .map(|suffix| format!("{stem}{suffix}{ext}"))
        .collect()
}

#[cfg(test)]
mod tests;
