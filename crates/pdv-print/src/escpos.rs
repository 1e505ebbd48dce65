//! # ESC/POS Command Builder
//!
//! Byte-level commands understood by Epson-compatible thermal printers
//! (Bematech, Elgin, Daruma, Epson TM series in ESC/POS mode).
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┬───────────────────────────┐
//! │ Command              │ Bytes                │ Method                    │
//! ├──────────────────────┼──────────────────────┼───────────────────────────┤
//! │ Initialize           │ ESC @                │ init()                    │
//! │ Code page            │ ESC t n              │ code_page(CodePage)       │
//! │ Justification        │ ESC a n              │ align(Align)              │
//! │ Emphasis             │ ESC E n              │ bold(bool)                │
//! │ Underline            │ ESC - n              │ underline(bool)           │
//! │ Character size       │ GS ! n               │ double_size(bool)         │
//! │ Print and feed lines │ ESC d n              │ feed(n)                   │
//! │ Cut                  │ GS V m               │ cut(partial)              │
//! │ Drawer kick pulse    │ ESC p 0 t1 t2        │ open_drawer()             │
//! └──────────────────────┴──────────────────────┴───────────────────────────┘
//! ```
//!
//! Text is transcoded to code page 860 (Portuguese). Characters outside it
//! print as `?`.

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Character tables selectable with `ESC t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    /// PC437, the power-on default.
    Pc437,
    /// PC860, Portuguese.
    Pc860,
}

impl CodePage {
    fn table(self) -> u8 {
        match self {
            CodePage::Pc437 => 0,
            CodePage::Pc860 => 3,
        }
    }
}

/// Accumulates ESC/POS commands into a byte buffer.
#[derive(Debug, Clone, Default)]
pub struct EscPos {
    buf: Vec<u8>,
}

impl EscPos {
    pub fn new() -> Self {
        EscPos::default()
    }

    /// Resets the printer and selects the Portuguese code page.
    pub fn init(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'@']);
        self.code_page(CodePage::Pc860)
    }

    pub fn code_page(&mut self, page: CodePage) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b't', page.table()]);
        self
    }

    pub fn align(&mut self, align: Align) -> &mut Self {
        let n = match align {
            Align::Left => 0,
            Align::Center => 1,
            Align::Right => 2,
        };
        self.buf.extend_from_slice(&[ESC, b'a', n]);
        self
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'E', on as u8]);
        self
    }

    pub fn underline(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'-', on as u8]);
        self
    }

    /// Double width and height.
    pub fn double_size(&mut self, on: bool) -> &mut Self {
        self.buf
            .extend_from_slice(&[GS, b'!', if on { 0x11 } else { 0x00 }]);
        self
    }

    /// Text without a line break, transcoded to CP860.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buf.extend(text.chars().map(to_cp860));
        self
    }

    /// Text followed by a line feed.
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.text(text);
        self.buf.push(LF);
        self
    }

    /// Prints the buffer and feeds `lines` lines.
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'd', lines]);
        self
    }

    pub fn cut(&mut self, partial: bool) -> &mut Self {
        self.buf.extend_from_slice(&[GS, b'V', partial as u8]);
        self
    }

    /// Pulses drawer pin 2 (100 ms on, 500 ms off).
    pub fn open_drawer(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'p', 0, 50, 250]);
        self
    }

    /// Appends bytes verbatim.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Maps a character to its CP860 byte.
pub fn to_cp860(c: char) -> u8 {
    if c.is_ascii() {
        return c as u8;
    }
    match c {
        'Ç' => 0x80,
        'ü' => 0x81,
        'é' => 0x82,
        'â' => 0x83,
        'ã' => 0x84,
        'à' => 0x85,
        'Á' => 0x86,
        'ç' => 0x87,
        'ê' => 0x88,
        'Ê' => 0x89,
        'è' => 0x8A,
        'Í' => 0x8B,
        'Ô' => 0x8C,
        'ì' => 0x8D,
        'Ã' => 0x8E,
        'Â' => 0x8F,
        'É' => 0x90,
        'À' => 0x91,
        'È' => 0x92,
        'ô' => 0x93,
        'õ' => 0x94,
        'ò' => 0x95,
        'Ú' => 0x96,
        'ù' => 0x97,
        'Ì' => 0x98,
        'Õ' => 0x99,
        'Ü' => 0x9A,
        '¢' => 0x9B,
        '£' => 0x9C,
        'Ù' => 0x9D,
        'Ó' => 0x9F,
        'á' => 0xA0,
        'í' => 0xA1,
        'ó' => 0xA2,
        'ú' => 0xA3,
        'ñ' => 0xA4,
        'Ñ' => 0xA5,
        'ª' => 0xA6,
        'º' => 0xA7,
        '¿' => 0xA8,
        'Ò' => 0xA9,
        '½' => 0xAB,
        '¼' => 0xAC,
        '¡' => 0xAD,
        '«' => 0xAE,
        '»' => 0xAF,
        '°' => 0xF8,
        // Non-breaking space, as produced by some number formatters.
        '\u{a0}' => b' ',
        _ => b'?',
    }
}
