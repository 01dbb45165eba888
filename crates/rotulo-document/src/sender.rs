// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sender/store-identity heuristics.
//
// The sender block of a label prints, after the tracking code, the store
// name followed by the return address. There is no structural marker for
// the name line, so the extraction walks the lines after the tracking code
// and takes the first one that does not look like an address, postal code,
// or other label furniture.

use std::sync::LazyLock;

use regex::Regex;

static TRACKING_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BR\d{10,}[A-Z]").expect("valid tracking anchor"));
static GENERIC_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}\d{9,}[A-Z]?\b").expect("valid generic anchor"));

static ONLY_DIGITS_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s.,\-/]+$").expect("valid digits pattern"));
static POSTAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}-?\d{3}").expect("valid postal-prefix pattern"));
static POSTAL_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{5}-?\d{3}").expect("valid postal pattern"));
static STREET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Rua|Avenida|Travessa|Alameda|Estrada|Rodovia|Praca|Praça|Largo|R\.|Av\.|Rod\.|Est\.)\s")
        .expect("valid street pattern")
});
static UNIT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Bloco|Lote|Quadra|Qd|Lt|Sl|Sala|Apto|Apt|Conj|Casa|Galpao|Galpão|N[°o]?\s)")
        .expect("valid unit pattern")
});
static TWO_LETTER_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid state pattern"));
static LABEL_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(envio previsto|peso|volume|frete|destinat|remet|cep)")
        .expect("valid keyword pattern")
});

/// Brazilian state names accepted in "City, State" address lines.
const STATE_NAMES: &[&str] = &[
    "acre",
    "alagoas",
    "amapa",
    "amazonas",
    "bahia",
    "ceara",
    "distrito federal",
    "espirito santo",
    "goias",
    "maranhao",
    "mato grosso",
    "mato grosso do sul",
    "minas gerais",
    "para",
    "paraiba",
    "parana",
    "pernambuco",
    "piaui",
    "rio de janeiro",
    "rio grande do norte",
    "rio grande do sul",
    "rondonia",
    "roraima",
    "santa catarina",
    "sao paulo",
    "sergipe",
    "tocantins",
];

/// Extract the store name from a label region's sender block.
///
/// Looks for the tracking code (national shape first, generic
/// two-letter/digits shape second) and returns the first following line
/// that survives the address filter. Up to five lines are inspected.
pub fn extract_sender_store(text: &str) -> Option<String> {
    for anchor in [&*TRACKING_ANCHOR, &*GENERIC_ANCHOR] {
        if let Some(found) = anchor.find(text) {
            let after = &text[found.end()..];
            for line in after.lines().map(str::trim).filter(|l| !l.is_empty()).take(5) {
                if !is_address_line(line) {
                    return Some(line.to_string());
                }
            }
        }
    }
    None
}

/// True when a line looks like address/postal-code/label furniture rather
/// than a store name.
fn is_address_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 3 {
        return true;
    }
    if ONLY_DIGITS_PUNCT.is_match(trimmed)
        || POSTAL_PREFIX.is_match(trimmed)
        || STREET_PREFIX.is_match(trimmed)
        || UNIT_PREFIX.is_match(trimmed)
        || TWO_LETTER_STATE.is_match(trimmed)
        || POSTAL_ANYWHERE.is_match(trimmed)
        || LABEL_KEYWORD.is_match(trimmed)
    {
        return true;
    }

    // "City, State" lines: the part after the comma is a state name or UF.
    if let Some((_, second)) = trimmed.split_once(',') {
        let second = second.trim();
        if !second.is_empty()
            && trimmed.matches(',').count() == 1
            && (STATE_NAMES.contains(&second.to_lowercase().as_str()) || second.len() == 2)
            && trimmed
                .chars()
                .all(|c| c.is_alphabetic() || c.is_whitespace() || c == ',')
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_store_name_after_tracking_code() {
        let text = "Destinatario Fulano\nBR261920610412I\nLoja Azul Calcados\nRua das Flores 123\n01310-100";
        assert_eq!(
            extract_sender_store(text),
            Some("Loja Azul Calcados".into())
        );
    }

    #[test]
    fn skips_address_lines_between_tracking_and_name() {
        let text = "BR261920610412I\n01310-100\nAvenida Brasil 500\nLoja Verde";
        assert_eq!(extract_sender_store(text), Some("Loja Verde".into()));
    }

    #[test]
    fn generic_tracking_shape_is_a_fallback_anchor() {
        let text = "XX123456789A\nMercado do Sul\nQuadra 10";
        assert_eq!(extract_sender_store(text), Some("Mercado do Sul".into()));
    }

    #[test]
    fn returns_none_without_tracking_anchor() {
        assert_eq!(extract_sender_store("sem codigo de rastreio aqui"), None);
    }

    #[test]
    fn address_filter_rejects_common_shapes() {
        assert!(is_address_line("01310-100"));
        assert!(is_address_line("Rua das Flores 123"));
        assert!(is_address_line("Bloco A, 123"));
        assert!(is_address_line("SP"));
        assert!(is_address_line("Italva, Rio de Janeiro"));
        assert!(is_address_line("12 34-5"));
        assert!(is_address_line("Peso: 0,3kg"));
        assert!(!is_address_line("Loja Azul Calcados"));
    }
}
