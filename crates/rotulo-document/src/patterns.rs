// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text patterns shared by layout detection and the extraction pipelines.
//
// These run over the line-grouped region text produced by `PageText::text_in`.

use std::sync::LazyLock;

use regex::Regex;

/// "Emissão: <number>" — the primary document-number shape on label regions.
static EMISSION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Emiss.{0,2}o:\s*(\d{4,9})\b").expect("valid emission pattern"));

/// number / series digit / emission date — the positional fallback shape.
static POSITIONAL_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4,6})\s+\d\s+\d{2}-\d{2}-\d{4}").expect("valid positional pattern")
});

/// "NF: <number>" — used by compact pickup labels.
static PREFIXED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bNF:?\s*(\d{3,9})\b").expect("valid nf pattern"));

/// Marketplace order id after the order marker.
static ORDER_AFTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Pedido[:\s]+([A-Z0-9]{12,20})\b").expect("valid order pattern")
});

/// Bare order-id shape: digits then alphanumeric tail.
static ORDER_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5,7}[A-Z0-9]{5,15})\b").expect("valid bare-order pattern"));

/// National tracking code.
static TRACKING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(BR\w{10,20})\b").expect("valid tracking pattern"));

static ORDER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPedido\b").expect("valid order-marker pattern"));

/// Extract the tax-document number from a label region's text.
pub fn extract_document_number(text: &str) -> Option<String> {
    if let Some(caps) = EMISSION_NUMBER.captures(text) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = PREFIXED_NUMBER.captures(text) {
        return Some(caps[1].to_string());
    }
    POSITIONAL_NUMBER
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Extract the marketplace order id from a label region's text.
pub fn extract_order_id(text: &str) -> Option<String> {
    if let Some(caps) = ORDER_AFTER_MARKER.captures(text) {
        return Some(caps[1].to_string());
    }
    ORDER_BARE.captures(text).map(|caps| caps[1].to_string())
}

/// Extract the tracking code from a label region's text.
pub fn extract_tracking(text: &str) -> Option<String> {
    TRACKING.captures(text).map(|caps| caps[1].to_string())
}

/// The marker half of the label-evidence test: an order-number marker, a
/// sender marker, a tax-document marker, an invoice-number-shaped numeric
/// pattern, or a markerless document-number extraction.
pub fn has_label_markers(text: &str) -> bool {
    ORDER_MARKER.is_match(text)
        || text.contains("REMETENTE")
        || text.contains("DANFE")
        || POSITIONAL_NUMBER.is_match(text)
        || extract_document_number(text).is_some()
}
