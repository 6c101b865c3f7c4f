//! Deterministic classifiers over message and reply text.
//!
//! Keyword sets cover Indonesian and English, the two languages the
//! assistants speak. Matching is done on lowercased whole words, except for
//! multi-word phrases and emoji which are matched as substrings.

use std::collections::{BTreeMap, HashSet};

use syncara_models::{ConversationEntry, InteractionType, Mood};

const QUESTION_WORDS: &[&str] = &[
    "apa", "apakah", "bagaimana", "gimana", "kenapa", "mengapa", "kapan", "dimana", "mana",
    "siapa", "berapa", "what", "how", "why", "when", "where", "who", "which",
];

const REQUEST_WORDS: &[&str] = &[
    "tolong", "bantu", "bantuin", "minta", "mohon", "buatkan", "buatin", "carikan", "help",
    "please", "pls", "assist",
];

const APPRECIATION_WORDS: &[&str] = &[
    "makasih", "makasi", "thanks", "thank", "thx", "tengkyu", "mantap", "hatur",
];
const APPRECIATION_PHRASES: &[&str] = &["terima kasih", "thank you"];

const GREETING_WORDS: &[&str] = &[
    "halo", "hai", "hi", "hello", "hey", "hola", "pagi", "siang", "sore", "malam", "assalamualaikum",
];

const POSITIVE_WORDS: &[&str] = &[
    "senang", "bahagia", "suka", "mantap", "keren", "bagus", "asik", "asyik", "seru", "hebat",
    "happy", "great", "love", "awesome", "nice", "good", "wow",
];
const POSITIVE_EMOJI: &[&str] = &["😊", "😄", "😁", "🥰", "❤️", "👍", "🎉"];

const NEGATIVE_WORDS: &[&str] = &[
    "sedih", "kesal", "marah", "capek", "cape", "lelah", "bosan", "stres", "stress", "galau",
    "kecewa", "bete", "sad", "angry", "tired", "bad", "upset", "hate",
];
const NEGATIVE_EMOJI: &[&str] = &["😢", "😭", "😡", "😞", "💔"];

const PRACTICAL_WORDS: &[&str] = &[
    "cara", "langkah", "contoh", "tips", "coba", "gunakan", "pakai", "solusi", "saran", "step",
    "example", "try", "use", "solution",
];

const STOP_WORDS: &[&str] = &[
    "yang", "untuk", "dengan", "dari", "pada", "adalah", "tidak", "bisa", "akan", "juga", "sudah",
    "belum", "saya", "kamu", "aku", "kita", "kami", "mereka", "dong", "sih", "deh", "nih", "banget",
    "this", "that", "with", "from", "have", "what", "your", "about", "there", "would", "could",
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_any(words: &[String], set: &[&str]) -> bool {
    words.iter().any(|w| set.contains(&w.as_str()))
}

/// Classifies a user message. Sets are checked in order: question,
/// request, appreciation, greeting; anything else is a statement.
pub fn classify_interaction(message: &str) -> InteractionType {
    let lower = message.to_lowercase();
    let tokens = words(message);

    if lower.contains('?') || has_any(&tokens, QUESTION_WORDS) {
        InteractionType::Question
    } else if has_any(&tokens, REQUEST_WORDS) {
        InteractionType::Request
    } else if has_any(&tokens, APPRECIATION_WORDS)
        || APPRECIATION_PHRASES.iter().any(|p| lower.contains(p))
    {
        InteractionType::Appreciation
    } else if has_any(&tokens, GREETING_WORDS) {
        InteractionType::Greeting
    } else {
        InteractionType::Statement
    }
}

/// Detects mood by comparing positive and negative lexeme counts.
pub fn detect_mood(message: &str) -> Mood {
    let tokens = words(message);
    let count = |set: &[&str], emoji: &[&str]| {
        tokens.iter().filter(|w| set.contains(&w.as_str())).count()
            + emoji.iter().map(|e| message.matches(e).count()).sum::<usize>()
    };

    let positive = count(POSITIVE_WORDS, POSITIVE_EMOJI);
    let negative = count(NEGATIVE_WORDS, NEGATIVE_EMOJI);

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Mood::Positive,
        std::cmp::Ordering::Less => Mood::Negative,
        std::cmp::Ordering::Equal => Mood::Neutral,
    }
}

/// Scores an assistant reply to `message`, in `[0, 1]`.
///
/// - length within 50..=800 chars: +0.3 (20..50 or 801..=1500: +0.15)
/// - list or bullet structure: +0.2
/// - practical vocabulary: +0.1 per word, at most +0.2
/// - share of the message's content words echoed in the reply: up to +0.3
pub fn quality_score(message: &str, response: &str) -> f32 {
    let mut score = 0.0f32;

    let len = response.chars().count();
    if (50..=800).contains(&len) {
        score += 0.3;
    } else if (20..50).contains(&len) || (801..=1500).contains(&len) {
        score += 0.15;
    }

    let structured = response.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("- ")
            || line.starts_with("• ")
            || line.starts_with("* ")
            || line
                .split_once(". ")
                .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    });
    if structured {
        score += 0.2;
    }

    let reply_words = words(response);
    let practical = PRACTICAL_WORDS
        .iter()
        .filter(|p| reply_words.iter().any(|w| w.as_str() == **p))
        .count();
    score += (practical as f32 * 0.1).min(0.2);

    let content: HashSet<String> = words(message).into_iter().filter(|w| w.len() > 3).collect();
    if !content.is_empty() {
        let reply_set: HashSet<&String> = reply_words.iter().collect();
        let echoed = content.iter().filter(|w| reply_set.contains(w)).count();
        score += 0.3 * echoed as f32 / content.len() as f32;
    }

    score.clamp(0.0, 1.0)
}

/// Jaccard similarity of the lowercase word sets of `a` and `b`.
pub fn jaccard(a: &str, b: &str) -> f32 {
    let a: HashSet<String> = words(a).into_iter().collect();
    let b: HashSet<String> = words(b).into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f32 / union as f32
}

/// Similarity above which two questions count as a repeat.
pub const REPEAT_THRESHOLD: f32 = 0.7;

/// Number of most recent entries the effectiveness score looks at.
pub const EFFECTIVENESS_WINDOW: usize = 10;

/// Effectiveness over the latest window of a conversation log, in `[0, 1]`.
///
/// Starts from the mean reply quality, loses up to 0.3 for the rate of
/// near-duplicate consecutive questions (the user had to ask again) and
/// gains up to 0.2 when replies in the newer half of the window are longer
/// than in the older half.
pub fn effectiveness(conversations: &[ConversationEntry]) -> f32 {
    let start = conversations.len().saturating_sub(EFFECTIVENESS_WINDOW);
    let window = &conversations[start..];
    if window.is_empty() {
        return 0.0;
    }

    let mean_quality = window.iter().map(|e| e.quality_score).sum::<f32>() / window.len() as f32;

    let questions: Vec<&ConversationEntry> = window
        .iter()
        .filter(|e| e.classified_type == InteractionType::Question)
        .collect();
    let repeat_rate = if questions.len() > 1 {
        let repeats = questions
            .windows(2)
            .filter(|pair| jaccard(&pair[0].message, &pair[1].message) > REPEAT_THRESHOLD)
            .count();
        repeats as f32 / (questions.len() - 1) as f32
    } else {
        0.0
    };

    let mut improvement = 0.0;
    if window.len() >= 4 {
        let (older, newer) = window.split_at(window.len() / 2);
        let avg = |entries: &[ConversationEntry]| {
            entries.iter().map(|e| e.response.chars().count()).sum::<usize>() as f32
                / entries.len() as f32
        };
        let (old_len, new_len) = (avg(older), avg(newer));
        if old_len > 0.0 && new_len > old_len {
            improvement = (0.2 * (new_len - old_len) / old_len).min(0.2);
        }
    }

    (mean_quality - 0.3 * repeat_rate + improvement).clamp(0.0, 1.0)
}

/// Most frequent content words across `messages`, at most `limit`.
/// Ties resolve alphabetically.
pub fn extract_topics<'a>(messages: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for message in messages {
        for word in words(message) {
            if word.chars().count() < 4
                || word.chars().all(|c| c.is_ascii_digit())
                || STOP_WORDS.contains(&word.as_str())
                || QUESTION_WORDS.contains(&word.as_str())
            {
                continue;
            }
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

/// Whether the text contains at least one emoji-range character.
pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c as u32,
            0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F000..=0x1F2FF)
    })
}
