use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nature,
    City,
    Work,
    Noise,
    Relaxation,
}

impl Category {
    /// Categories in the order they are displayed.
    pub const ALL: [Category; 5] = [
        Category::Nature,
        Category::City,
        Category::Work,
        Category::Noise,
        Category::Relaxation,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Nature => "Nature",
            Category::City => "City/Public",
            Category::Work => "Work/Tech",
            Category::Noise => "Background Noise",
            Category::Relaxation => "Mind & Relaxation",
        }
    }
}

/// One catalog entry. Ids are unique and stable across releases since saved
/// mixes refer to them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Sound {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub icon: &'static str,
    pub audio_url: &'static str,
}

const fn sound(
    id: &'static str,
    name: &'static str,
    category: Category,
    icon: &'static str,
    audio_url: &'static str,
) -> Sound {
    Sound {
        id,
        name,
        category,
        icon,
        audio_url,
    }
}

static CATALOG: [Sound; 20] = [
    // Nature
    sound("rain", "Rain", Category::Nature, "🌧️", "/audio/rain.mp3"),
    sound("thunderstorm", "Thunderstorm", Category::Nature, "⛈️", "/audio/thunderstorm.mp3"),
    sound("ocean", "Ocean", Category::Nature, "🌊", "/audio/ocean.mp3"),
    sound("forest", "Forest", Category::Nature, "🌲", "/audio/forest.mp3"),
    sound("waterfall", "Waterfall", Category::Nature, "💧", "/audio/waterfall.mp3"),
    sound("wind", "Wind", Category::Nature, "💨", "/audio/wind.mp3"),
    // City/Public
    sound("cafe", "Cafe", Category::City, "☕", "/audio/cafe.mp3"),
    sound("library", "Library", Category::City, "📚", "/audio/library.mp3"),
    sound("train", "Train", Category::City, "🚂", "/audio/train.mp3"),
    sound("street-market", "Street Market", Category::City, "🏪", "/audio/street-market.mp3"),
    // Work/Tech
    sound("keyboard", "Keyboard", Category::Work, "⌨️", "/audio/keyboard.mp3"),
    sound("office", "Office", Category::Work, "🏢", "/audio/office.mp3"),
    sound("server-room", "Server Room", Category::Work, "🖥️", "/audio/server-room.mp3"),
    sound("mouse-clicks", "Mouse Clicks", Category::Work, "🖱️", "/audio/mouse-clicks.mp3"),
    // Background noise
    sound("brown-noise", "Brown Noise", Category::Noise, "🟤", "/audio/brown-noise.mp3"),
    sound("white-noise", "White Noise", Category::Noise, "⚪", "/audio/white-noise.mp3"),
    sound("pink-noise", "Pink Noise", Category::Noise, "🩷", "/audio/pink-noise.mp3"),
    sound("fireplace", "Fireplace", Category::Noise, "🔥", "/audio/fireplace.mp3"),
    // Mind & relaxation
    sound(
        "meditation-bowl",
        "Meditation Bowl",
        Category::Relaxation,
        "🎵",
        "/audio/meditation-bowl.mp3",
    ),
    sound("deep-breathing", "Deep Breathing", Category::Relaxation, "🧘", "/audio/deep-breathing.mp3"),
];

#[inline]
pub fn catalog() -> &'static [Sound] {
    &CATALOG
}

pub fn sound_by_id(id: &str) -> Option<&'static Sound> {
    CATALOG.iter().find(|s| s.id == id)
}

pub fn sounds_by_category(category: Category) -> impl Iterator<Item = &'static Sound> {
    CATALOG.iter().filter(move |s| s.category == category)
}
