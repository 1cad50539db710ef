//! Classification scales, their colors and key bindings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monk Skin Tone palette, darkest first.
pub const MONK_COLORS: [&str; 10] = [
    "#8D5524", "#A76C4E", "#C68642", "#E0A060", "#F1C27D", "#FFDBAC", "#F6CEB9", "#E7C697",
    "#D2B48C", "#C2B280",
];

/// Fitzpatrick skin types I to VI.
pub const FITZPATRICK_COLORS: [&str; 6] = [
    "#FFE5B4", "#F4A460", "#D2691E", "#8B4513", "#5D4037", "#3E2723",
];

const FITZPATRICK_NAMES: [&str; 6] = ["I", "II", "III", "IV", "V", "VI"];

/// A key the shell can deliver, independent of the windowing toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputKey {
    Digit(u8),
    /// Always stored uppercase.
    Letter(char),
    F(u8),
    ArrowLeft,
    ArrowRight,
    Space,
    Enter,
    Escape,
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKey::Digit(d) => write!(f, "{d}"),
            InputKey::Letter(c) => write!(f, "{c}"),
            InputKey::F(n) => write!(f, "F{n}"),
            InputKey::ArrowLeft => f.write_str("ArrowLeft"),
            InputKey::ArrowRight => f.write_str("ArrowRight"),
            InputKey::Space => f.write_str("Space"),
            InputKey::Enter => f.write_str("Enter"),
            InputKey::Escape => f.write_str("Escape"),
        }
    }
}

impl FromStr for InputKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(d) = c.to_digit(10) {
                return Ok(InputKey::Digit(d as u8));
            }
            if c.is_ascii_alphabetic() {
                return Ok(InputKey::Letter(c.to_ascii_uppercase()));
            }
            return Err(format!("unsupported key '{trimmed}'"));
        }

        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "arrowleft" | "left" => return Ok(InputKey::ArrowLeft),
            "arrowright" | "right" => return Ok(InputKey::ArrowRight),
            "space" => return Ok(InputKey::Space),
            "enter" | "return" => return Ok(InputKey::Enter),
            "escape" | "esc" => return Ok(InputKey::Escape),
            _ => {}
        }
        if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok())
            && (1..=12).contains(&n)
        {
            return Ok(InputKey::F(n));
        }
        Err(format!("unsupported key '{trimmed}'"))
    }
}

impl TryFrom<String> for InputKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputKey> for String {
    fn from(key: InputKey) -> Self {
        key.to_string()
    }
}

/// 8-bit RGB color parsed from `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Perceived brightness, used to pick a readable label color.
    pub fn is_light(&self) -> bool {
        let Rgb(r, g, b) = *self;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        luma > 150.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    /// `#RRGGBB`, also written to the CSV next to the index.
    pub color: String,
    pub key: Option<InputKey>,
}

/// A fixed, ordered set of mutually exclusive categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelScale {
    /// Column prefix in the annotations file.
    pub key: String,
    pub title: String,
    pub categories: Vec<Category>,
}

impl LabelScale {
    pub fn new(key: impl Into<String>, title: impl Into<String>, categories: Vec<Category>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            categories,
        }
    }

    /// 10-step Monk scale bound to `1`..`9`, `0`.
    pub fn monk() -> Self {
        let categories = MONK_COLORS
            .iter()
            .enumerate()
            .map(|(i, color)| Category {
                name: format!("{}", i + 1),
                color: (*color).to_string(),
                key: Some(InputKey::Digit(((i + 1) % 10) as u8)),
            })
            .collect();
        Self::new("monk_skin_tone", "Monk skin tone", categories)
    }

    /// 6-step Fitzpatrick scale bound to `Q W E R T Y`.
    pub fn fitzpatrick() -> Self {
        let categories = FITZPATRICK_COLORS
            .iter()
            .zip(FITZPATRICK_NAMES)
            .zip("QWERTY".chars())
            .map(|((color, name), key)| Category {
                name: format!("Type {name}"),
                color: (*color).to_string(),
                key: Some(InputKey::Letter(key)),
            })
            .collect();
        Self::new("fitzpatrick", "Fitzpatrick", categories)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn color_of(&self, index: usize) -> Option<&str> {
        self.category(index).map(|c| c.color.as_str())
    }

    pub fn index_for_key(&self, key: InputKey) -> Option<usize> {
        self.categories.iter().position(|c| c.key == Some(key))
    }

    pub fn index_column(&self) -> String {
        format!("{}_index", self.key)
    }

    pub fn color_column(&self) -> String {
        format!("{}_color", self.key)
    }
}

/// Scales used by the annotator when no config overrides them.
pub fn default_scales() -> Vec<LabelScale> {
    vec![LabelScale::monk(), LabelScale::fitzpatrick()]
}
