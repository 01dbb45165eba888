// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Code128 barcode encoding for the invoice access key.

use barcoders::sym::code128::Code128;

use rotulo_core::error::{Result, RotuloError};

/// Encode a value as Code128 modules (1 = bar, 0 = space).
///
/// `barcoders` selects the character set from a unicode prefix: Ć (U+0106)
/// starts character-set C for digit pairs — the dense encoding the 44-digit
/// access key wants — and Ɓ (U+0181) starts character-set B for general
/// text.
pub fn encode(value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(RotuloError::Barcode("empty value".into()));
    }

    let all_digits = value.chars().all(|c| c.is_ascii_digit());
    let prefixed = if all_digits && value.len() % 2 == 0 {
        format!("\u{0106}{value}")
    } else {
        format!("\u{0181}{value}")
    };

    let barcode = Code128::new(&prefixed)
        .map_err(|err| RotuloError::Barcode(format!("{err:?}")))?;
    Ok(barcode.encode())
}

/// Collapse a module pattern into (offset, run-length) pairs of bars.
pub fn bar_runs(modules: &[u8]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut index = 0;
    while index < modules.len() {
        if modules[index] == 1 {
            let start = index;
            while index < modules.len() && modules[index] == 1 {
                index += 1;
            }
            runs.push((start, index - start));
        } else {
            index += 1;
        }
    }
    runs
}
