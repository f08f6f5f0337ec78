// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Misc helpers.

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only used by some float operations")]
use core_maths::CoreFloat;

/// Returns the first tab stop strictly after `x`.
pub(crate) fn next_tab_stop(x: f64, interval: f64) -> f64 {
    if interval <= 0.0 {
        return x;
    }
    ((x / interval).floor() + 1.0) * interval
}

pub(crate) fn is_line_separator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

pub(crate) fn is_combining_mark(ch: char) -> bool {
    matches!(ch, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' | '\u{20D0}'..='\u{20FF}')
}

#[cfg(test)]
mod tests {
    use super::next_tab_stop;

    #[test]
    fn tab_stops_advance_past_exact_multiples() {
        assert_eq!(next_tab_stop(0.0, 28.0), 28.0, "tab at line start");
        assert_eq!(next_tab_stop(28.0, 28.0), 56.0, "tab exactly on a stop");
        assert_eq!(next_tab_stop(30.0, 28.0), 56.0, "tab between stops");
        assert_eq!(next_tab_stop(5.0, 0.0), 5.0, "disabled tab stops");
    }
}
