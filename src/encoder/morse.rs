//! Morse Code Encoder
//!
//! Emits one tone index per Morse unit: `1` while the key is down and `0`
//! while it is up. Standard timing applies:
//!
//! | Element          | Units |
//! |------------------|-------|
//! | Dot              | 1 on  |
//! | Dash             | 3 on  |
//! | Element gap      | 1 off |
//! | Character gap    | 3 off |
//! | Word space       | 7 off |
//!
//! Runs of spaces collapse into a single word space. Leading and trailing
//! spaces produce nothing, and no gap follows the last character. Characters
//! without a Morse pattern are skipped.

use super::{load_payload, EncoderError, Payload, ToneEncoder};

/// Key-down tone index
pub const KEY_DOWN: u8 = 1;

/// Key-up tone index
pub const KEY_UP: u8 = 0;

/// Morse element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Element {
    /// Nothing sent yet
    #[default]
    Idle,
    /// Dot (1 unit)
    Dot,
    /// Dash (3 units)
    Dash,
    /// Inter-element gap (1 unit)
    ElementGap,
    /// Inter-character gap (3 units)
    CharGap,
    /// Word space (7 units)
    WordGap,
}

impl Element {
    /// Duration in Morse units
    #[must_use]
    pub const fn units(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Dot | Self::ElementGap => 1,
            Self::Dash | Self::CharGap => 3,
            Self::WordGap => 7,
        }
    }

    /// Check if this element keys the carrier
    #[must_use]
    pub const fn is_tone(self) -> bool {
        matches!(self, Self::Dot | Self::Dash)
    }
}

/// Morse code encoder
#[derive(Clone, Debug)]
pub struct MorseEncoder {
    symbol_rate: u32,
    data: Payload,
    /// Character being sent
    char_index: usize,
    /// Its dot/dash pattern
    pattern: &'static [u8],
    /// Next position in the pattern
    element_index: usize,
    /// Element being sent
    current: Element,
    /// Units of `current` still to send
    units_left: u8,
    done: bool,
}

impl MorseEncoder {
    /// Create an encoder sending `symbol_rate` units per second
    #[must_use]
    pub const fn new(symbol_rate: u32) -> Self {
        Self {
            symbol_rate,
            data: Payload::new(),
            char_index: 0,
            pattern: &[],
            element_index: 0,
            current: Element::Idle,
            units_left: 0,
            done: true,
        }
    }

    /// Unit rate for a speed in words per minute (PARIS, 50 units per word)
    #[must_use]
    pub const fn rate_for_wpm(wpm: u32) -> u32 {
        (wpm * 50 + 30) / 60
    }

    /// Element currently being sent
    #[must_use]
    pub const fn current(&self) -> Element {
        self.current
    }

    /// Find the next character with a pattern at or after `from`
    ///
    /// Returns its index, its pattern and whether a space was crossed.
    fn find_char(&self, from: usize) -> Option<(usize, &'static [u8], bool)> {
        let mut crossed_space = false;
        for (i, &c) in self.data.iter().enumerate().skip(from) {
            if c == b' ' {
                crossed_space = true;
            } else if let Some(pattern) = char_to_morse(c) {
                return Some((i, pattern.as_bytes(), crossed_space));
            }
        }
        None
    }

    fn load_char(&mut self, index: usize, pattern: &'static [u8]) {
        self.char_index = index;
        self.pattern = pattern;
        self.element_index = 0;
    }

    fn next_mark(&mut self) -> Option<Element> {
        let element = match *self.pattern.get(self.element_index)? {
            b'.' => Element::Dot,
            _ => Element::Dash,
        };
        self.element_index += 1;
        Some(element)
    }

    /// Element that follows `current`, `None` at the end of the message
    fn next_element(&mut self) -> Option<Element> {
        match self.current {
            Element::Idle => {
                let (index, pattern, _) = self.find_char(0)?;
                self.load_char(index, pattern);
                self.next_mark()
            }
            Element::Dot | Element::Dash => {
                if self.element_index < self.pattern.len() {
                    return Some(Element::ElementGap);
                }
                // Look ahead: no gap after the final character
                let (index, pattern, crossed_space) = self.find_char(self.char_index + 1)?;
                self.load_char(index, pattern);
                Some(if crossed_space {
                    Element::WordGap
                } else {
                    Element::CharGap
                })
            }
            Element::ElementGap | Element::CharGap | Element::WordGap => self.next_mark(),
        }
    }
}

impl ToneEncoder for MorseEncoder {
    /// Morse keys the carrier on and off; there are no tone offsets.
    fn tone_catalog(&self) -> &[u32] {
        &[]
    }

    fn tone_spacing(&self) -> u32 {
        0
    }

    fn symbol_rate(&self) -> u32 {
        self.symbol_rate
    }

    fn symbol_delay(&self) -> u32 {
        0
    }

    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError> {
        self.current = Element::Idle;
        self.units_left = 0;
        self.pattern = &[];
        self.element_index = 0;
        self.char_index = 0;
        self.done = true;
        if data.is_empty() {
            self.data.clear();
            return Err(EncoderError::EmptyPayload);
        }
        load_payload(&mut self.data, data)?;
        self.done = false;
        Ok(())
    }

    fn next_tone(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        while self.units_left == 0 {
            if let Some(element) = self.next_element() {
                self.current = element;
                self.units_left = element.units();
            } else {
                self.done = true;
                return None;
            }
        }
        self.units_left -= 1;
        Some(if self.current.is_tone() { KEY_DOWN } else { KEY_UP })
    }
}

/// Convert a character to its Morse pattern
const fn char_to_morse(c: u8) -> Option<&'static str> {
    match c.to_ascii_uppercase() {
        b'A' => Some(".-"),
        b'B' => Some("-..."),
        b'C' => Some("-.-."),
        b'D' => Some("-.."),
        b'E' => Some("."),
        b'F' => Some("..-."),
        b'G' => Some("--."),
        b'H' => Some("...."),
        b'I' => Some(".."),
        b'J' => Some(".---"),
        b'K' => Some("-.-"),
        b'L' => Some(".-.."),
        b'M' => Some("--"),
        b'N' => Some("-."),
        b'O' => Some("---"),
        b'P' => Some(".--."),
        b'Q' => Some("--.-"),
        b'R' => Some(".-."),
        b'S' => Some("..."),
        b'T' => Some("-"),
        b'U' => Some("..-"),
        b'V' => Some("...-"),
        b'W' => Some(".--"),
        b'X' => Some("-..-"),
        b'Y' => Some("-.--"),
        b'Z' => Some("--.."),
        b'0' => Some("-----"),
        b'1' => Some(".----"),
        b'2' => Some("..---"),
        b'3' => Some("...--"),
        b'4' => Some("....-"),
        b'5' => Some("....."),
        b'6' => Some("-...."),
        b'7' => Some("--..."),
        b'8' => Some("---.."),
        b'9' => Some("----."),
        b'.' => Some(".-.-.-"),
        b',' => Some("--..--"),
        b'?' => Some("..--.."),
        b'/' => Some("-..-."),
        b'=' => Some("-...-"),
        b'+' => Some(".-.-."),
        b'-' => Some("-....-"),
        b'@' => Some(".--.-."),
        _ => None,
    }
}
