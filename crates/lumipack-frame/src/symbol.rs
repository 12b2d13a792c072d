//! Mapping between 2-bit symbols and the four data-carrying colors.

use crate::signal::LightLevel;

/// Symbols carried per frame byte (one per 2-bit pair, MSB pair first).
pub const SYMBOLS_PER_BYTE: usize = 4;

const SYMBOL_COLORS: [LightLevel; 4] = [
    LightLevel::Red,
    LightLevel::Green,
    LightLevel::Blue,
    LightLevel::White,
];

/// Color for a 2-bit symbol value. Only the low two bits are significant.
pub fn symbol_to_color(symbol: u8) -> LightLevel {
    SYMBOL_COLORS[usize::from(symbol & 0b11)]
}

/// Symbol value for a color, or `None` for `Off` (idle carries no data).
pub fn color_to_symbol(level: LightLevel) -> Option<u8> {
    match level {
        LightLevel::Red => Some(0),
        LightLevel::Green => Some(1),
        LightLevel::Blue => Some(2),
        LightLevel::White => Some(3),
        LightLevel::Off => None,
    }
}
