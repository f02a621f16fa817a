//! Localization - spoken token numbers and voice selection
//!
//! Token numbers inside the mapped range are read out as words in the target
//! language; anything outside falls back to the decimal numeral. Voice
//! selection walks an ordered strategy list so a locale can add preferences
//! without the coordinator knowing about them.

use crate::domain::TokenNumber;
use crate::error::AppError;
use crate::port::VoiceDescriptor;
use std::str::FromStr;

/// Telugu number words for 1..=50
const TELUGU_NUMBERS: [&str; 50] = [
    "ఒకటి",
    "రెండు",
    "మూడు",
    "నాలుగు",
    "ఐదు",
    "ఆరు",
    "ఏడు",
    "ఎనిమిది",
    "తొమ్మిది",
    "పది",
    "పదకొండు",
    "పన్నెండు",
    "పదమూడు",
    "పదనాలుగు",
    "పదిహేను",
    "పదహారు",
    "పదిహేడు",
    "పద్దెనిమిది",
    "పందొమ్మిది",
    "ఇరవై",
    "ఇరవై ఒకటి",
    "ఇరవై రెండు",
    "ఇరవై మూడు",
    "ఇరవై నాలుగు",
    "ఇరవై ఐదు",
    "ఇరవై ఆరు",
    "ఇరవై ఏడు",
    "ఇరవై ఎనిమిది",
    "ఇరవై తొమ్మిది",
    "ముప్పై",
    "ముప్పై ఒకటి",
    "ముప్పై రెండు",
    "ముప్పై మూడు",
    "ముప్పై నాలుగు",
    "ముప్పై ఐదు",
    "ముప్పై ఆరు",
    "ముప్పై ఏడు",
    "ముప్పై ఎనిమిది",
    "ముప్పై తొమ్మిది",
    "నలభై",
    "నలభై ఒకటి",
    "నలభై రెండు",
    "నలభై మూడు",
    "నలభై నాలుగు",
    "నలభై ఐదు",
    "నలభై ఆరు",
    "నలభై ఏడు",
    "నలభై ఎనిమిది",
    "నలభై తొమ్మిది",
    "యాభై",
];

const ENGLISH_ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const ENGLISH_TENS: [&str; 6] = ["", "", "twenty", "thirty", "forty", "fifty"];

/// Highest token number with a spoken-word mapping
pub const MAX_MAPPED_NUMBER: TokenNumber = 50;

/// Announcement locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    TeluguIndia,
    EnglishIndia,
}

impl Locale {
    /// BCP-47 tag set on utterances
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::TeluguIndia => "te-IN",
            Locale::EnglishIndia => "en-IN",
        }
    }

    /// Language prefix used to match installed voices
    pub fn voice_prefix(&self) -> &'static str {
        match self {
            Locale::TeluguIndia => "te",
            Locale::EnglishIndia => "en",
        }
    }

    /// Spoken word for a token number, or its decimal form outside the table
    pub fn lookup_spoken_number(&self, n: TokenNumber) -> String {
        self.mapped_word(n).unwrap_or_else(|| n.to_string())
    }

    fn mapped_word(&self, n: TokenNumber) -> Option<String> {
        if n == 0 || n > MAX_MAPPED_NUMBER {
            return None;
        }
        match self {
            Locale::TeluguIndia => TELUGU_NUMBERS.get(n as usize - 1).map(|w| w.to_string()),
            Locale::EnglishIndia => {
                let n = n as usize;
                if n < 20 {
                    Some(ENGLISH_ONES[n].to_string())
                } else if n % 10 == 0 {
                    Some(ENGLISH_TENS[n / 10].to_string())
                } else {
                    Some(format!("{}-{}", ENGLISH_TENS[n / 10], ENGLISH_ONES[n % 10]))
                }
            }
        }
    }

    /// "token number {spoken}. {name}." in this locale
    pub fn announcement_text(&self, token: TokenNumber, name: &str) -> String {
        let spoken = self.lookup_spoken_number(token);
        match self {
            Locale::TeluguIndia => format!("టోకెన్ నంబర్ {}. {} గారు.", spoken, name),
            Locale::EnglishIndia => format!("Token number {}. {}.", spoken, name),
        }
    }

    /// Queue status read out to a waiting patient
    pub fn queue_status_text(&self, position: u32, wait_minutes: u32) -> String {
        match self {
            Locale::TeluguIndia => format!(
                "మీరు {}వ స్థానంలో ఉన్నారు. అంచనా వేచి ఉండే సమయం {} నిమిషాలు.",
                position, wait_minutes
            ),
            Locale::EnglishIndia => format!(
                "You are at position {}. Estimated wait time is {} minutes.",
                position, wait_minutes
            ),
        }
    }

    /// Voice preference order for this locale
    pub fn voice_strategies(&self) -> Vec<VoiceStrategy> {
        vec![
            VoiceStrategy::LanguagePrefix(self.voice_prefix().to_string()),
            VoiceStrategy::AnyAvailable,
        ]
    }
}

impl FromStr for Locale {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "te" | "te-in" | "te_in" => Ok(Locale::TeluguIndia),
            "en" | "en-in" | "en_in" => Ok(Locale::EnglishIndia),
            other => Err(AppError::Config(format!("Unsupported locale: {}", other))),
        }
    }
}

/// Spoken word for `n` in the default (Telugu) locale
pub fn lookup_spoken_number(n: TokenNumber) -> String {
    Locale::default().lookup_spoken_number(n)
}

/// One step of the voice fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceStrategy {
    /// First voice whose language tag starts with the prefix (ASCII case-insensitive)
    LanguagePrefix(String),
    /// First installed voice, whatever its language
    AnyAvailable,
}

impl VoiceStrategy {
    fn pick<'a>(&self, voices: &'a [VoiceDescriptor]) -> Option<&'a VoiceDescriptor> {
        match self {
            VoiceStrategy::LanguagePrefix(prefix) => voices.iter().find(|v| {
                v.lang.len() >= prefix.len()
                    && v.lang.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
            }),
            VoiceStrategy::AnyAvailable => voices.first(),
        }
    }
}

/// Walk `strategies` in order; None when no strategy yields a voice
pub fn select_voice_with(
    strategies: &[VoiceStrategy],
    voices: &[VoiceDescriptor],
) -> Option<VoiceDescriptor> {
    strategies.iter().find_map(|s| s.pick(voices)).cloned()
}

/// Language match, then any voice, then none
pub fn select_voice(preferred_lang_prefix: &str, voices: &[VoiceDescriptor]) -> Option<VoiceDescriptor> {
    select_voice_with(
        &[
            VoiceStrategy::LanguagePrefix(preferred_lang_prefix.to_string()),
            VoiceStrategy::AnyAvailable,
        ],
        voices,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_mapped_number() {
        assert_eq!(lookup_spoken_number(7), "ఏడు");
        assert_eq!(lookup_spoken_number(1), "ఒకటి");
        assert_eq!(lookup_spoken_number(50), "యాభై");
    }

    #[test]
    fn test_lookup_falls_back_to_numeral() {
        assert_eq!(lookup_spoken_number(999), "999");
        assert_eq!(lookup_spoken_number(51), "51");
        assert_eq!(lookup_spoken_number(0), "0");
    }

    #[test]
    fn test_english_words() {
        let en = Locale::EnglishIndia;
        assert_eq!(en.lookup_spoken_number(7), "seven");
        assert_eq!(en.lookup_spoken_number(19), "nineteen");
        assert_eq!(en.lookup_spoken_number(40), "forty");
        assert_eq!(en.lookup_spoken_number(42), "forty-two");
        assert_eq!(en.lookup_spoken_number(120), "120");
    }

    #[test]
    fn test_announcement_templates() {
        assert_eq!(
            Locale::TeluguIndia.announcement_text(3, "Ravi"),
            "టోకెన్ నంబర్ మూడు. Ravi గారు."
        );
        assert_eq!(
            Locale::EnglishIndia.announcement_text(75, "Ravi"),
            "Token number 75. Ravi."
        );
    }

    #[test]
    fn test_queue_status_templates() {
        assert_eq!(
            Locale::EnglishIndia.queue_status_text(3, 45),
            "You are at position 3. Estimated wait time is 45 minutes."
        );
        assert_eq!(
            Locale::TeluguIndia.queue_status_text(2, 30),
            "మీరు 2వ స్థానంలో ఉన్నారు. అంచనా వేచి ఉండే సమయం 30 నిమిషాలు."
        );
    }

    #[test]
    fn test_select_voice_prefers_language() {
        let voices = vec![
            VoiceDescriptor::new("English", "en-US"),
            VoiceDescriptor::new("Telugu", "te-IN"),
        ];
        let voice = select_voice("te", &voices).unwrap();
        assert_eq!(voice.name, "Telugu");
    }

    #[test]
    fn test_select_voice_falls_back_to_first() {
        let voices = vec![
            VoiceDescriptor::new("English", "en-US"),
            VoiceDescriptor::new("Hindi", "hi-IN"),
        ];
        let voice = select_voice("te", &voices).unwrap();
        assert_eq!(voice.name, "English");
    }

    #[test]
    fn test_select_voice_empty_is_none() {
        assert!(select_voice("te", &[]).is_none());
    }

    #[test]
    fn test_prefix_match_ignores_case_but_not_position() {
        let voices = vec![
            VoiceDescriptor::new("Not Telugu", "de-TE"),
            VoiceDescriptor::new("Telugu", "TE-in"),
        ];
        assert_eq!(select_voice("te", &voices).unwrap().name, "Telugu");
    }

    #[test]
    fn test_custom_strategy_order() {
        let voices = vec![
            VoiceDescriptor::new("English", "en-IN"),
            VoiceDescriptor::new("Hindi", "hi-IN"),
        ];
        let strategies = vec![
            VoiceStrategy::LanguagePrefix("te".to_string()),
            VoiceStrategy::LanguagePrefix("hi".to_string()),
            VoiceStrategy::AnyAvailable,
        ];
        assert_eq!(select_voice_with(&strategies, &voices).unwrap().name, "Hindi");
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!("te-IN".parse::<Locale>().unwrap(), Locale::TeluguIndia);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::EnglishIndia);
        assert!("fr-FR".parse::<Locale>().is_err());
    }
}
