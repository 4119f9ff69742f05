// Review text cleaning: tokenise, drop stop words and non-alphabetic tokens, lemmatise

use std::collections::{HashMap, HashSet};
use tracing::info;

/// Default number of texts per cleaning batch
pub const DEFAULT_BATCH_SIZE: usize = 500;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "amount",
    "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "bottom", "but", "by", "ca", "call", "can", "cannot", "could", "did", "do",
    "does", "doing", "done", "down", "due", "during", "each", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "first", "five", "for", "former",
    "formerly", "forty", "four", "from", "front", "full", "further", "get", "give", "go", "had",
    "has", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon",
    "hers", "herself", "him", "himself", "his", "how", "however", "hundred", "i", "if", "in",
    "indeed", "into", "is", "it", "its", "itself", "just", "keep", "last", "latter", "latterly",
    "least", "less", "made", "make", "many", "may", "me", "meanwhile", "might", "mine", "more",
    "moreover", "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely",
    "neither", "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor",
    "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "quite", "rather", "re", "really", "regarding",
    "same", "say", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she",
    "should", "show", "side", "since", "six", "sixty", "so", "some", "somehow", "someone",
    "something", "sometime", "sometimes", "somewhere", "still", "such", "take", "ten", "than",
    "that", "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
    "thereby", "therefore", "therein", "thereupon", "these", "they", "third", "this", "those",
    "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too", "top",
    "toward", "towards", "twelve", "twenty", "two", "under", "unless", "until", "up", "upon",
    "us", "used", "using", "various", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby",
    "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever",
    "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

const IRREGULAR_FORMS: &[(&str, &str)] = &[
    ("ate", "eat"),
    ("eaten", "eat"),
    ("bought", "buy"),
    ("brought", "bring"),
    ("came", "come"),
    ("children", "child"),
    ("feet", "foot"),
    ("found", "find"),
    ("gave", "give"),
    ("given", "give"),
    ("got", "get"),
    ("gotten", "get"),
    ("went", "go"),
    ("gone", "go"),
    ("kept", "keep"),
    ("knew", "know"),
    ("known", "know"),
    ("left", "leave"),
    ("made", "make"),
    ("men", "man"),
    ("mice", "mouse"),
    ("paid", "pay"),
    ("people", "person"),
    ("ran", "run"),
    ("said", "say"),
    ("sent", "send"),
    ("sold", "sell"),
    ("spent", "spend"),
    ("taken", "take"),
    ("took", "take"),
    ("teeth", "tooth"),
    ("thought", "think"),
    ("told", "tell"),
    ("tried", "try"),
    ("women", "woman"),
    ("wrote", "write"),
    ("written", "write"),
    ("better", "well"),
    ("best", "well"),
    ("worse", "bad"),
    ("worst", "bad"),
];

// Verb stems whose base form ends in a silent "e" (lov|ing -> love)
const E_STEMS: &[&str] = &[
    "arrive", "bake", "believe", "care", "change", "choose", "close", "come", "compare",
    "continue", "decide", "describe", "dislike", "expire", "give", "hate", "have", "hope",
    "include", "like", "live", "lose", "love", "make", "move", "notice", "price",
    "produce", "purchase", "receive", "save", "serve", "shake", "smile", "store",
    "taste", "take", "use", "waste", "write",
];

// Adjectives that take comparative/superlative suffixes
const GRADABLE_ADJECTIVES: &[&str] = &[
    "big", "bright", "cheap", "cold", "dark", "dry", "easy", "fast", "fine", "fresh", "great",
    "happy", "hard", "healthy", "heavy", "high", "hot", "large", "late", "light", "long", "low",
    "mild", "nice", "old", "rich", "safe", "salty", "short", "small", "smooth", "soft", "spicy",
    "strong", "sweet", "tasty", "thick", "thin", "tough", "warm", "weak", "young",
];

/// Stop-word list used to drop function words before embedding
#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<&'static str>,
}

impl StopWords {
    pub fn english() -> Self {
        StopWords {
            words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Case-insensitive membership
    pub fn is_stop(&self, word: &str) -> bool {
        if self.words.contains(word) {
            return true;
        }
        self.words.contains(word.to_lowercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::english()
    }
}

/// Rule-based English lemmatiser: irregular table first, then suffix rules.
///
/// Input is expected in lowercase.
#[derive(Debug, Clone)]
pub struct Lemmatizer {
    irregular: HashMap<&'static str, &'static str>,
    e_stems: HashSet<&'static str>,
    adjectives: HashSet<&'static str>,
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer {
    pub fn new() -> Self {
        Lemmatizer {
            irregular: IRREGULAR_FORMS.iter().copied().collect(),
            e_stems: E_STEMS.iter().copied().collect(),
            adjectives: GRADABLE_ADJECTIVES.iter().copied().collect(),
        }
    }

    pub fn lemmatize(&self, word: &str) -> String {
        if let Some(&lemma) = self.irregular.get(word) {
            return lemma.to_string();
        }
        if let Some(lemma) = self.strip_comparative(word) {
            return lemma;
        }
        if let Some(stem) = word.strip_suffix("ing").filter(|s| s.len() >= 3) {
            return self.restore_stem(stem);
        }
        if let Some(stem) = word.strip_suffix("ied").filter(|s| s.len() >= 2) {
            return format!("{stem}y");
        }
        if let Some(stem) = word.strip_suffix("ed").filter(|s| s.len() >= 3) {
            return self.restore_stem(stem);
        }
        self.singular(word)
    }

    fn singular(&self, word: &str) -> String {
        if word.len() <= 3 {
            return word.to_string();
        }
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{stem}y");
        }
        if word.ends_with("sses")
            || word.ends_with("ches")
            || word.ends_with("shes")
            || word.ends_with("xes")
            || word.ends_with("zes")
        {
            return word[..word.len() - 2].to_string();
        }
        if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
            return word.to_string();
        }
        match word.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => word.to_string(),
        }
    }

    /// Undo consonant doubling or a dropped silent "e" after removing -ing/-ed
    fn restore_stem(&self, stem: &str) -> String {
        let with_e = format!("{stem}e");
        if self.e_stems.contains(with_e.as_str()) {
            return with_e;
        }
        let mut tail = stem.chars().rev();
        if let (Some(last), Some(prev)) = (tail.next(), tail.next()) {
            if last == prev && is_doubled_consonant(last) {
                return stem.strip_suffix(last).unwrap_or(stem).to_string();
            }
        }
        stem.to_string()
    }

    fn strip_comparative(&self, word: &str) -> Option<String> {
        for suffix in ["est", "er"] {
            let Some(stem) = word.strip_suffix(suffix) else {
                continue;
            };
            let candidates = [
                stem.to_string(),
                format!("{stem}e"),
                stem.strip_suffix('i').map(|s| format!("{s}y")).unwrap_or_default(),
                without_last_char(stem).to_string(),
            ];
            if let Some(found) = candidates
                .into_iter()
                .find(|c| !c.is_empty() && self.adjectives.contains(c.as_str()))
            {
                return Some(found);
            }
        }
        None
    }
}

// "stopped" -> "stop", but "called" and "passed" keep their double letter
fn is_doubled_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'l' | 's' | 'z')
}

fn without_last_char(word: &str) -> &str {
    word.char_indices().last().map_or(word, |(i, _)| &word[..i])
}

/// Lemmatise, keep purely alphabetic tokens, drop stop words.
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    stop_words: StopWords,
    lemmatizer: Lemmatizer,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clean(&self, text: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        for raw in text.split(|c: char| !(c.is_alphabetic() || c == '\'' || c == '\u{2019}')) {
            let Some(token) = word_part(raw) else {
                continue;
            };
            let lower = token.to_lowercase();
            if self.stop_words.is_stop(&lower) {
                continue;
            }
            out.push(self.lemmatizer.lemmatize(&lower));
        }
        out.join(" ")
    }
}

/// Word part of a token with its clitic removed ("don't" -> "do", "dog's" -> "dog").
/// `None` when nothing alphabetic remains.
fn word_part(raw: &str) -> Option<&str> {
    let trimmed = raw.trim_matches(|c: char| c == '\'' || c == '\u{2019}');
    let lower_end = trimmed.len();
    let base = if trimmed.to_ascii_lowercase().ends_with("n't") && lower_end > 3 {
        &trimmed[..lower_end - 3]
    } else {
        trimmed
            .split(|c: char| c == '\'' || c == '\u{2019}')
            .next()
            .unwrap_or_default()
    };
    if base.is_empty() || !base.chars().all(char::is_alphabetic) {
        None
    } else {
        Some(base)
    }
}

/// Clean every text in order, `batch_size` texts at a time.
pub fn clean_corpus<S: AsRef<str>>(texts: &[S], batch_size: usize) -> Vec<String> {
    let cleaner = TextCleaner::new();
    let batch_size = batch_size.max(1);
    let total = texts.len();

    let mut cleaned = Vec::with_capacity(total);
    for batch in texts.chunks(batch_size) {
        cleaned.extend(batch.iter().map(|t| cleaner.clean(t.as_ref())));
        info!(done = cleaned.len(), total, "cleaned batch");
    }
    cleaned
}
