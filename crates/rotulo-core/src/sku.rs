// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SKU and name normalization helpers shared across the pipeline.

use std::sync::LazyLock;

use regex::Regex;

/// Clothing-size letter tokens that count as a variation suffix.
const SIZE_LETTERS: &[&str] = &[
    "P", "M", "G", "PP", "GG", "XG", "XS", "XL", "XXL", "XXG", "EG", "EGG",
];

/// Inclusive range of two-digit numbers treated as shoe/clothing sizes.
const SIZE_NUMBER_RANGE: std::ops::RangeInclusive<u32> = 24..=56;

/// Strip trailing variation tokens from a full SKU, leaving the base product
/// code.
///
/// Only `-`-separated tokens at the END are considered, and only when they are
/// clearly a variation: a known size letter, a two-digit number in the
/// shoe-size range, or a single digit. The first token is never stripped.
///
/// `"TEN-BO-BR-38"` → `"TEN-BO-BR"`, `"PROD-AZUL-M"` → `"PROD-AZUL"`,
/// `"TEN-BO-BR"` stays unchanged (BR is not a size token).
pub fn principal_sku(full_sku: &str) -> String {
    let parts: Vec<&str> = full_sku.split('-').collect();
    if parts.len() <= 1 {
        return full_sku.to_string();
    }

    let mut end = parts.len();
    while end > 1 {
        let token = parts[end - 1].trim().to_uppercase();
        let is_size_letter = SIZE_LETTERS.contains(&token.as_str());
        let is_size_number = token.len() == 2
            && token
                .parse::<u32>()
                .is_ok_and(|n| SIZE_NUMBER_RANGE.contains(&n));
        let is_single_digit = token.len() == 1 && token.chars().all(|c| c.is_ascii_digit());

        if is_size_letter || is_size_number || is_single_digit {
            end -= 1;
        } else {
            break;
        }
    }

    parts[..end].join("-")
}

static LEADING_TAX_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d[\d.]+\s+").expect("valid leading-digits pattern"));
static TRAILING_CPF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d{11}$").expect("valid trailing-cpf pattern"));
static CORPORATE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(LTDA|ME|MEI|EPP|EIRELI)\s*$").expect("valid suffix pattern")
});

/// Clean a raw issuer name into a display/folder-friendly store name.
///
/// Drops a leading tax-id fragment ("34.847.700 …"), a trailing CPF, and
/// corporate-form suffixes, then title-cases and removes characters that are
/// illegal in directory names.
pub fn clean_issuer_name(raw: &str) -> String {
    let name = LEADING_TAX_DIGITS.replace(raw, "");
    let name = TRAILING_CPF.replace(&name, "");
    let name = CORPORATE_SUFFIX.replace(&name, "");
    let name = title_case(name.trim());
    let name = sanitize_dir_name(&name);
    if name.is_empty() {
        "Loja_Desconhecida".to_string()
    } else {
        name
    }
}

/// Remove characters that are illegal in directory names on common
/// filesystems, plus trailing dots.
pub fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesized pattern"));

/// Collapse a direct-import attribute string into a clean item code.
///
/// Parenthesized runs (which carry non-Latin duplicates of the attribute
/// text) are removed first, then every character outside ASCII letters and
/// digits is dropped.
///
/// `"Rakka/Roxo(紫色)-BR41/42"` → `"RakkaRoxoBR4142"`.
pub fn attribute_code(attributes: &str) -> String {
    if attributes.is_empty() {
        return String::new();
    }
    let stripped = PARENTHESIZED.replace_all(attributes, "");
    stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_shoe_size() {
        assert_eq!(principal_sku("TEN-BO-BR-38"), "TEN-BO-BR");
    }

    #[test]
    fn strips_trailing_size_letter() {
        assert_eq!(principal_sku("ABC-M"), "ABC");
        assert_eq!(principal_sku("PROD-123-GG"), "PROD-123");
    }

    #[test]
    fn keeps_sku_without_size_token() {
        assert_eq!(principal_sku("TEN-BO-BR"), "TEN-BO-BR");
        assert_eq!(principal_sku("PLAIN"), "PLAIN");
    }

    #[test]
    fn never_strips_the_first_token() {
        assert_eq!(principal_sku("38-38"), "38");
        assert_eq!(principal_sku("GG"), "GG");
    }

    #[test]
    fn strips_stacked_size_tokens() {
        assert_eq!(principal_sku("PROD-AZUL-M-42"), "PROD-AZUL");
    }

    #[test]
    fn out_of_range_numbers_are_kept() {
        assert_eq!(principal_sku("SKU-99"), "SKU-99");
        assert_eq!(principal_sku("SKU-123"), "SKU-123");
    }

    #[test]
    fn cleans_issuer_names() {
        assert_eq!(
            clean_issuer_name("34.847.700 COMERCIO DE CALCADOS LTDA"),
            "Comercio De Calcados"
        );
        assert_eq!(clean_issuer_name("MARIA SILVA 11543563619"), "Maria Silva");
        assert_eq!(clean_issuer_name(""), "Loja_Desconhecida");
    }

    #[test]
    fn sanitizes_folder_characters() {
        assert_eq!(sanitize_dir_name("Loja <X>: a/b."), "Loja X ab");
    }

    #[test]
    fn attribute_code_drops_non_latin_runs() {
        assert_eq!(attribute_code("Rakka/Roxo(紫色)-BR41/42"), "RakkaRoxoBR4142");
        assert_eq!(
            attribute_code("Rakka/Preto/Dourado-L7(黒/金-L7)-BR41/42"),
            "RakkaPretoDouradoL7BR4142"
        );
        assert_eq!(attribute_code(""), "");
    }
}
