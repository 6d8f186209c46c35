//! Banknote reference data
//!
//! The seven recognised face values and the static descriptions used when
//! rendering or announcing a detection.

use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recognised banknote face value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Denomination {
    Ten,
    Twenty,
    Fifty,
    OneHundred,
    TwoHundred,
    FiveHundred,
    TwoThousand,
}

impl Denomination {
    /// All denominations in ascending order
    pub const ALL: [Denomination; 7] = [
        Denomination::Ten,
        Denomination::Twenty,
        Denomination::Fifty,
        Denomination::OneHundred,
        Denomination::TwoHundred,
        Denomination::FiveHundred,
        Denomination::TwoThousand,
    ];

    /// Face value in rupees
    pub fn value(self) -> u32 {
        match self {
            Denomination::Ten => 10,
            Denomination::Twenty => 20,
            Denomination::Fifty => 50,
            Denomination::OneHundred => 100,
            Denomination::TwoHundred => 200,
            Denomination::FiveHundred => 500,
            Denomination::TwoThousand => 2000,
        }
    }

    /// Look up a denomination by face value
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.value() == value)
    }

    /// Reference data for this note
    pub fn note(self) -> &'static NoteInfo {
        &CATALOG[self as usize]
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.value())
    }
}

impl From<Denomination> for u32 {
    fn from(denomination: Denomination) -> Self {
        denomination.value()
    }
}

impl TryFrom<u32> for Denomination {
    type Error = VisionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Denomination::from_value(value).ok_or(VisionError::UnknownDenomination(value))
    }
}

/// Static description of one banknote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteInfo {
    pub value: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub features: &'static [&'static str],
    /// Physical size in millimetres (width, height)
    pub dimensions_mm: (u32, u32),
}

/// Catalog indexed in the same order as [`Denomination::ALL`]
pub static CATALOG: [NoteInfo; 7] = [
    NoteInfo {
        value: 10,
        name: "Ten Rupees",
        description: "Ten Rupee note, chocolate brown color, featuring the Konark Sun Temple on the reverse",
        color: "chocolate brown",
        features: &["Konark Sun Temple", "Mahatma Gandhi portrait"],
        dimensions_mm: (123, 63),
    },
    NoteInfo {
        value: 20,
        name: "Twenty Rupees",
        description: "Twenty Rupee note, greenish-yellow color, featuring the Ellora Caves on the reverse",
        color: "greenish-yellow",
        features: &["Ellora Caves", "Mahatma Gandhi portrait"],
        dimensions_mm: (129, 63),
    },
    NoteInfo {
        value: 50,
        name: "Fifty Rupees",
        description: "Fifty Rupee note, fluorescent blue color, featuring Hampi with Chariot on the reverse",
        color: "fluorescent blue",
        features: &["Hampi with Chariot", "Mahatma Gandhi portrait"],
        dimensions_mm: (135, 66),
    },
    NoteInfo {
        value: 100,
        name: "One Hundred Rupees",
        description: "One Hundred Rupee note, lavender color, featuring Rani Ki Vav on the reverse",
        color: "lavender",
        features: &["Rani Ki Vav (Queen's Stepwell)", "Mahatma Gandhi portrait"],
        dimensions_mm: (142, 66),
    },
    NoteInfo {
        value: 200,
        name: "Two Hundred Rupees",
        description: "Two Hundred Rupee note, bright yellow color, featuring Sanchi Stupa on the reverse",
        color: "bright yellow",
        features: &["Sanchi Stupa", "Mahatma Gandhi portrait"],
        dimensions_mm: (146, 66),
    },
    NoteInfo {
        value: 500,
        name: "Five Hundred Rupees",
        description: "Five Hundred Rupee note, stone grey color, featuring Red Fort on the reverse",
        color: "stone grey",
        features: &["Red Fort", "Mahatma Gandhi portrait"],
        dimensions_mm: (150, 66),
    },
    NoteInfo {
        value: 2000,
        name: "Two Thousand Rupees",
        description: "Two Thousand Rupee note, magenta color, featuring Mangalyaan (Mars Orbiter Mission) on the reverse",
        color: "magenta",
        features: &["Mangalyaan (Mars Orbiter Mission)", "Mahatma Gandhi portrait"],
        dimensions_mm: (166, 66),
    },
];

/// Find the reference entry for a face value
pub fn lookup(value: u32) -> Option<&'static NoteInfo> {
    CATALOG.iter().find(|note| note.value == value)
}
