//! Pattern-based intent classification and language guess.

use std::sync::LazyLock;

use regex::Regex;
use releasebot_core::Language;

use crate::types::Intent;

/// Messages shorter than this may be greetings.
const GREETING_MAX_CHARS: usize = 50;
/// Messages shorter than this with no question shape default to greetings.
const SHORT_MESSAGE_CHARS: usize = 30;

struct IntentPatterns {
    spanish_words: Regex,
    escalation: Vec<Regex>,
    greeting: Vec<Regex>,
    question: Vec<Regex>,
    has_word: Regex,
}

static PATTERNS: LazyLock<IntentPatterns> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid intent regex"))
            .collect()
    };

    IntentPatterns {
        spanish_words: Regex::new(
            r"(?i)\b(qué|que|cómo|como|por qué|porque|cuándo|cuando|dónde|donde|hay|está|esta|son|tiene|puede|nuevo|nueva|función|funcion|versión|hola|lanzamiento|cambios)\b",
        )
        .expect("Invalid intent regex"),
        escalation: mk(&[
            // Spanish
            r"(?i)\bquiero\s+hablar\b",
            r"(?i)\bhablar\s+con\b",
            r"(?i)\bcontactar\b",
            r"(?i)\bllamar\b",
            r"(?i)\bcomprar\b",
            r"(?i)\badquirir\b",
            r"(?i)\bservicio\b",
            r"(?i)\bcuenta\b",
            r"(?i)\bmejorar\b",
            r"(?i)\bagrandar\b",
            r"(?i)\bsoporte\s+humano\b",
            r"(?i)\bpersona\s+real\b",
            r"(?i)\brepresentante\b",
            r"(?i)\basesor\b",
            r"(?i)\bventas\b",
            // English
            r"(?i)\bwant\s+to\s+talk\b",
            r"(?i)\btalk\s+to\b",
            r"(?i)\bcontact\b",
            r"(?i)\bcall\b",
            r"(?i)\bbuy\b",
            r"(?i)\bpurchase\b",
            r"(?i)\bservice\b",
            r"(?i)\bplan\b",
            r"(?i)\baccount\b",
            r"(?i)\bupgrade\b",
            r"(?i)\bimprove\b",
            r"(?i)\bsupport\s+person\b",
            r"(?i)\breal\s+person\b",
            r"(?i)\brepresentative\b",
            r"(?i)\badvisor\b",
            r"(?i)\bsales\b",
        ]),
        greeting: mk(&[
            r"(?i)^\W*(hola|buenos\s+d[ií]as|buenas\s+tardes|buenas\s+noches|hey|saludos|qu[ée]\s+tal|c[oó]mo\s+est[aá]s)\b",
            r"(?i)^\W*(hello|hi|hey|good\s+morning|good\s+afternoon|good\s+evening|greetings|howdy)\b",
        ]),
        question: mk(&[
            // Spanish
            r"(?i)\b(qu[ée]|cu[aá]l(es)?|c[oó]mo|cu[aá]ndo|d[oó]nde|por\s+qu[ée])\b",
            r"(?i)\b(existe|hay|puedes|puede|tiene)\b",
            r"(?i)\b(nuevo|nueva|nuevos|nuevas|actualizaci[oó]n|versi[oó]n|release|funci[oó]n|feature)\b",
            // English
            r"(?i)\b(what|which|how|when|where|why|does|can|could|has)\b",
            r"(?i)\bis\s+there\b",
            r"(?i)\b(new|update|updates|version|release|releases|feature|features|function)\b",
        ]),
        has_word: Regex::new(r"\w").expect("Invalid intent regex"),
    }
});

/// Classification of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentResult {
    pub intent: Intent,
    /// 0-100.
    pub confidence: u8,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Spanish when any Spanish marker word appears, even alongside English
    /// ones. Everything else is treated as English.
    pub fn detect_language(&self, message: &str) -> Language {
        let p = &*PATTERNS;
        if p.spanish_words.is_match(message) {
            Language::Es
        } else {
            Language::En
        }
    }

    pub fn classify(&self, message: &str) -> IntentResult {
        let text = message.trim();
        let language = self.detect_language(text);
        let p = &*PATTERNS;

        let result = |intent, confidence| IntentResult {
            intent,
            confidence,
            language,
        };

        if !p.has_word.is_match(text) {
            return result(Intent::Unknown, 0);
        }

        if p.escalation.iter().any(|re| re.is_match(text)) {
            return result(Intent::EscalationRequest, 95);
        }

        let chars = text.chars().count();
        let question_shaped =
            text.contains('?') || p.question.iter().any(|re| re.is_match(text));

        if chars < GREETING_MAX_CHARS
            && !question_shaped
            && p.greeting.iter().any(|re| re.is_match(text))
        {
            return result(Intent::Greeting, 95);
        }

        if question_shaped {
            return result(Intent::Question, 90);
        }

        if chars < SHORT_MESSAGE_CHARS {
            return result(Intent::Greeting, 70);
        }

        result(Intent::Question, 75)
    }
}
