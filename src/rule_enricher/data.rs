//! Curated dictionaries for the rule path. In the original these
//! lived in standalone JSON files loaded at import time; here they are
//! `const` tables baked into the binary, which is the natural Rust
//! equivalent of "process-wide cache, small and immutable".

pub struct IntensityLevel {
    pub name: &'static str,
    pub min_seconds: i64,
    pub max_seconds: i64,
    pub prefixes: &'static [&'static str],
}

/// Duration buckets. Bounds are half-open `[min, max)`; the last bucket's
/// `max_seconds` is unreachable and only exists so the table shape is
/// uniform.
pub const INTENSITY_LEVELS: &[IntensityLevel] = &[
    IntensityLevel {
        name: "micro",
        min_seconds: 0,
        max_seconds: 900,
        prefixes: &["Quick", "Brief", "Snappy"],
    },
    IntensityLevel {
        name: "minor",
        min_seconds: 900,
        max_seconds: 1800,
        prefixes: &["Focused", "Steady", "Solid"],
    },
    IntensityLevel {
        name: "major",
        min_seconds: 1800,
        max_seconds: 3600,
        prefixes: &["Deep", "Committed", "Sustained"],
    },
    IntensityLevel {
        name: "grand",
        min_seconds: 3600,
        max_seconds: 7200,
        prefixes: &["Powerful", "Relentless", "Driven"],
    },
    IntensityLevel {
        name: "epic",
        min_seconds: 7200,
        max_seconds: i64::MAX,
        prefixes: &["Epic", "Legendary", "Heroic"],
    },
];

pub struct Category {
    pub name: &'static str,
    pub nouns: &'static [&'static str],
    pub emojis: &'static [&'static str],
    pub action_noun: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "workout",
        nouns: &["workout", "exercise", "run", "gym", "training", "lift"],
        emojis: &["💪", "🏃", "🏋️"],
        action_noun: "workout",
    },
    Category {
        name: "meditation",
        nouns: &["meditation", "breathing", "mindfulness", "stillness"],
        emojis: &["🧘", "🕯️", "🌿"],
        action_noun: "meditation",
    },
    Category {
        name: "study",
        nouns: &["study", "exam", "lecture", "homework", "course"],
        emojis: &["📚", "📖", "✏️"],
        action_noun: "study session",
    },
    Category {
        name: "work",
        nouns: &["work", "meeting", "project", "task", "deadline", "report"],
        emojis: &["💼", "📈", "🗂️"],
        action_noun: "work block",
    },
    Category {
        name: "reading",
        nouns: &["reading", "book", "novel", "chapter", "article"],
        emojis: &["📖", "🔖", "🕮"],
        action_noun: "reading session",
    },
    Category {
        name: "creative",
        nouns: &["art", "drawing", "painting", "design", "sketch"],
        emojis: &["🎨", "✏️", "🖌️"],
        action_noun: "creative session",
    },
    Category {
        name: "coding",
        nouns: &["code", "program", "bug", "feature", "refactor", "api"],
        emojis: &["💻", "🧑‍💻", "⌨️"],
        action_noun: "coding session",
    },
    Category {
        name: "music",
        nouns: &["music", "practice", "song", "instrument", "rehearsal"],
        emojis: &["🎵", "🎸", "🎹"],
        action_noun: "practice session",
    },
    Category {
        name: "cooking",
        nouns: &["cooking", "recipe", "meal", "kitchen", "baking"],
        emojis: &["🍳", "🍲", "👩‍🍳"],
        action_noun: "cooking session",
    },
    Category {
        name: "gaming",
        nouns: &["game", "gaming", "match", "raid", "level"],
        emojis: &["🎮", "🕹️", "🏆"],
        action_noun: "gaming session",
    },
    Category {
        name: "social",
        nouns: &["friends", "family", "call", "visit", "gathering"],
        emojis: &["🗣️", "👥", "🤝"],
        action_noun: "catch-up",
    },
    Category {
        name: "travel",
        nouns: &["trip", "travel", "flight", "journey", "packing"],
        emojis: &["✈️", "🧳", "🗺️"],
        action_noun: "travel session",
    },
    Category {
        name: "default",
        nouns: &["focus", "session", "time"],
        emojis: &["✨", "🎯", "⏳"],
        action_noun: "focus session",
    },
];

pub const SYNONYMS: &[(&str, &str)] = &[
    ("learn", "study"),
    ("practice", "music"),
    ("write", "creative"),
    ("sketch", "creative"),
    ("debug", "coding"),
    ("ship", "coding"),
    ("relax", "meditation"),
    ("rest", "meditation"),
    ("plan", "work"),
    ("organize", "work"),
];

/// Fallback keyword map used only after fuzzy matching and synonyms have
/// both come up empty.
pub const ACTIVITY_KEYWORDS: &[(&str, &str)] = &[
    ("work", "work"),
    ("study", "study"),
    ("learn", "study"),
    ("read", "reading"),
    ("create", "creative"),
    ("write", "creative"),
    ("code", "coding"),
    ("program", "coding"),
    ("design", "creative"),
    ("think", "default"),
    ("meditate", "meditation"),
    ("plan", "work"),
    ("organize", "work"),
    ("exercise", "workout"),
    ("workout", "workout"),
    ("run", "workout"),
    ("relax", "meditation"),
    ("rest", "meditation"),
];

pub const POSITIVE_EMOTIONS: &[&str] = &[
    "accomplished", "fulfilled", "energized", "excited", "peaceful", "calm", "focused", "grounded",
    "centered", "proud", "inspired", "grateful",
];

pub const NEGATIVE_EMOTIONS: &[&str] = &[
    "frustrated", "exhausted", "anxious", "overwhelmed", "tired", "stressed", "disappointed",
];

/// emotion tag → sentiment bucket, consulted before falling back to lexical
/// polarity.
pub const EMOTION_TO_SENTIMENT: &[(&str, &str)] = &[
    ("accomplished", "very_positive"),
    ("fulfilled", "very_positive"),
    ("energized", "positive"),
    ("excited", "positive"),
    ("peaceful", "neutral_positive"),
    ("calm", "neutral_positive"),
    ("focused", "neutral_positive"),
    ("grounded", "neutral_positive"),
    ("centered", "neutral_positive"),
    ("contemplative", "neutral"),
    ("tired", "neutral_negative"),
    ("frustrated", "negative"),
];

pub struct SentimentBucket {
    pub name: &'static str,
    pub adjectives: &'static [&'static str],
}

pub const SENTIMENT_BUCKETS: &[SentimentBucket] = &[
    SentimentBucket { name: "very_positive", adjectives: &["triumphant", "radiant", "unstoppable"] },
    SentimentBucket { name: "positive", adjectives: &["encouraging", "upbeat", "bright"] },
    SentimentBucket { name: "neutral_positive", adjectives: &["steady", "grounded", "settled"] },
    SentimentBucket { name: "neutral", adjectives: &["ordinary", "measured", "quiet"] },
    SentimentBucket { name: "neutral_negative", adjectives: &["weary", "worn", "drained"] },
    SentimentBucket { name: "negative", adjectives: &["rough", "heavy", "tangled"] },
    SentimentBucket { name: "very_negative", adjectives: &["grueling", "punishing", "bruising"] },
];

/// Two-key `(category, intensity_level)` lookup. Entries
/// absent from this table fall through to the tier fallback chain in
/// `mod.rs`; not every category/level pair needs a bespoke badge.
pub const BADGES: &[(&str, &str, &str)] = &[
    ("workout", "epic", "🏆 Iron Legend"),
    ("workout", "grand", "💪 Powerhouse"),
    ("workout", "major", "🔥 Strong Finisher"),
    ("meditation", "epic", "🧘 Zen Master"),
    ("meditation", "grand", "🕯️ Deep Stillness"),
    ("study", "epic", "🎓 Scholar"),
    ("study", "grand", "📚 Dedicated Learner"),
    ("work", "epic", "🏆 Unstoppable Force"),
    ("work", "grand", "📈 Deep Work Champion"),
    ("coding", "epic", "🏆 Code Marathoner"),
    ("coding", "grand", "💻 Shipping Machine"),
    ("coding", "major", "🐛 Bug Slayer"),
    ("creative", "epic", "🎨 Visionary"),
    ("creative", "grand", "🖌️ Flow State Artist"),
    ("reading", "epic", "📖 Bookworm Supreme"),
    ("music", "epic", "🎵 Virtuoso"),
    ("cooking", "major", "👩‍🍳 Kitchen Master"),
    ("gaming", "epic", "🏆 Raid Champion"),
    ("social", "grand", "🤝 Connector"),
    ("travel", "grand", "🗺️ Wayfarer"),
    ("default", "major", "✨ Progress Maker"),
    ("default", "grand", "⭐ Great Performer"),
];

/// Overrides keyed by `(intent_emotion, reflection_emotion)` when the two
/// differ (the "journey badge" case).
pub const EMOTION_JOURNEY_BADGES: &[(&str, &str, &str)] = &[
    ("focused", "accomplished", "🎯➡️🏆 Focus Champion"),
    ("anxious", "calm", "🌊➡️🧘 Calm Achieved"),
    ("tired", "energized", "🔋➡️⚡ Second Wind"),
    ("frustrated", "accomplished", "😤➡️🏆 Breakthrough Maker"),
];

pub const HIGH_ENERGY_EMOTIONS: &[&str] = &["excited", "energized", "accomplished", "proud", "inspired"];
