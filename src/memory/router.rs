//! Content-based routing across the six cognitive layers.
//!
//! A fixed catalog of weighted linguistic patterns is scored against the
//! incoming content. Two orthogonal observables (emotional intensity and
//! technical density) are derived from the same firings and feed the layer
//! boosts. The router holds no mutable state; [`ContentRouter::analyze`] is
//! pure and reentrant.

use serde::Serialize;

use crate::memory::types::Layer;

/// What a pattern's firing says about the content, beyond its layer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalKind {
    Plain,
    /// Counts toward emotional intensity.
    Emotional,
    /// Counts toward technical density.
    Technical,
    /// Enables the procedural branch of the technical boost.
    HowTo,
}

/// One weighted pattern: a named signal with its trigger substrings.
struct Pattern {
    signal: &'static str,
    weight: f64,
    kind: SignalKind,
    needles: &'static [&'static str],
}

/// Additional firings of one pattern add 10% of its base weight each, up to
/// this many repeats.
const MAX_REPEAT_BONUS: usize = 5;

/// The router's decision for one piece of content.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDecision {
    pub layer: Layer,
    /// In [0, 0.95] for routed content; 1.0 when the caller named the layer.
    pub confidence: f64,
    /// Names of the patterns that fired, in catalog order.
    pub signals: Vec<&'static str>,
    pub emotional_intensity: f64,
    pub technical_density: f64,
}

impl RouteDecision {
    /// Decision for an explicitly supplied layer; routing is skipped.
    pub fn explicit(layer: Layer) -> Self {
        Self {
            layer,
            confidence: 1.0,
            signals: Vec::new(),
            emotional_intensity: 0.5,
            technical_density: 0.0,
        }
    }
}

/// Stateless router over the fixed pattern catalog.
pub struct ContentRouter {
    catalog: [(Layer, &'static [Pattern]); 6],
}

impl Default for ContentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRouter {
    pub fn new() -> Self {
        Self {
            catalog: [
                (Layer::Episodic, EPISODIC_PATTERNS),
                (Layer::Semantic, SEMANTIC_PATTERNS),
                (Layer::Procedural, PROCEDURAL_PATTERNS),
                (Layer::Meta, META_PATTERNS),
                (Layer::Identity, IDENTITY_PATTERNS),
                (Layer::Working, WORKING_PATTERNS),
            ],
        }
    }

    /// Score the content against every layer's pattern bag and decide.
    pub fn analyze(&self, content: &str) -> RouteDecision {
        let lowered = content.to_lowercase();

        let mut scores = [0.0f64; 6];
        let mut signals: Vec<&'static str> = Vec::new();
        let mut emotional_signals = 0usize;
        let mut technical_signals = 0usize;
        let mut howto_fired = false;

        for (idx, (_, patterns)) in self.catalog.iter().enumerate() {
            for pattern in patterns.iter() {
                let firings = count_firings(&lowered, pattern.needles);
                if firings == 0 {
                    continue;
                }
                let repeats = (firings - 1).min(MAX_REPEAT_BONUS);
                scores[idx] += pattern.weight * (1.0 + 0.1 * repeats as f64);
                signals.push(pattern.signal);
                match pattern.kind {
                    SignalKind::Emotional => emotional_signals += 1,
                    SignalKind::Technical => technical_signals += 1,
                    SignalKind::HowTo => howto_fired = true,
                    SignalKind::Plain => {}
                }
            }
        }

        let emotional_intensity = emotional_intensity(content, emotional_signals);
        let technical_density = technical_density(content, technical_signals);

        // Boosts
        if emotional_intensity > 0.7 {
            scores[layer_index(Layer::Identity)] *= 1.0 + 0.5 * emotional_intensity;
        }
        if technical_density > 0.6 {
            let factor = 1.0 + 0.3 * technical_density;
            if howto_fired {
                scores[layer_index(Layer::Procedural)] *= factor;
            } else {
                scores[layer_index(Layer::Semantic)] *= factor;
            }
        }

        // Highest score wins; ties break on fixed layer order.
        let mut best = 0usize;
        for idx in 1..scores.len() {
            if scores[idx] > scores[best] {
                best = idx;
            }
        }

        if scores[best] <= 0.0 {
            return RouteDecision {
                layer: Layer::Working,
                confidence: 0.5,
                signals,
                emotional_intensity,
                technical_density,
            };
        }

        let top = scores[best];
        let second = scores
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != best)
            .map(|(_, s)| *s)
            .fold(0.0f64, f64::max);
        let confidence = (0.5 + 0.5 * (top - second) / top).clamp(0.0, 0.95);

        RouteDecision {
            layer: self.catalog[best].0,
            confidence,
            signals,
            emotional_intensity,
            technical_density,
        }
    }
}

fn layer_index(layer: Layer) -> usize {
    match layer {
        Layer::Episodic => 0,
        Layer::Semantic => 1,
        Layer::Procedural => 2,
        Layer::Meta => 3,
        Layer::Identity => 4,
        Layer::Working => 5,
    }
}

/// Total non-overlapping occurrences of any needle.
fn count_firings(lowered: &str, needles: &[&str]) -> usize {
    needles
        .iter()
        .map(|needle| count_occurrences(lowered, needle))
        .sum()
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(pos) = rest.find(needle) {
        count += 1;
        rest = &rest[pos + needle.len()..];
    }
    count
}

/// 0.5 baseline, raised by distinct emotional signals, exclamation marks,
/// and ALL-CAPS words.
fn emotional_intensity(content: &str, emotional_signals: usize) -> f64 {
    let exclamations = content.chars().filter(|c| *c == '!').count();
    let caps_words = content
        .split_whitespace()
        .filter(|word| {
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
        })
        .count();

    let score = 0.5
        + 0.1 * emotional_signals as f64
        + (0.05 * exclamations as f64).min(0.2)
        + (0.03 * caps_words as f64).min(0.15);
    score.clamp(0.0, 1.0)
}

/// Raised by distinct technical signals, code-like punctuation, and
/// identifier-style tokens (`camelCase` / `snake_case`).
fn technical_density(content: &str, technical_signals: usize) -> f64 {
    let has_code_punctuation = content
        .chars()
        .any(|c| matches!(c, '{' | '}' | '(' | ')' | ';' | '=' | '<' | '>' | '`'));
    let identifiers = content
        .split_whitespace()
        .filter(|word| is_identifier_token(word))
        .count();

    let score = 0.15 * technical_signals as f64
        + if has_code_punctuation { 0.1 } else { 0.0 }
        + (0.02 * identifiers as f64).min(0.2);
    score.clamp(0.0, 1.0)
}

/// `snake_case` or `camelCase` shaped token.
fn is_identifier_token(word: &str) -> bool {
    let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    if trimmed.len() < 3 {
        return false;
    }
    let snake = trimmed.contains('_')
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && trimmed.chars().any(|c| c.is_ascii_alphanumeric());
    let camel = trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        && trimmed.chars().next().is_some_and(|c| c.is_lowercase())
        && trimmed
            .chars()
            .zip(trimmed.chars().skip(1))
            .any(|(a, b)| a.is_lowercase() && b.is_uppercase());
    snake || camel
}

// ── Pattern catalog ──────────────────────────────────────────────────────────
//
// Base weights are in (0, 1]. Needles are matched as lowercase substrings;
// trailing spaces keep short needles from firing inside longer words.

const EPISODIC_PATTERNS: &[Pattern] = &[
    Pattern {
        signal: "temporal_marker",
        weight: 0.6,
        kind: SignalKind::Plain,
        needles: &[
            "yesterday",
            "today",
            "this morning",
            "last week",
            "last night",
            "earlier",
            " ago",
            "just now",
        ],
    },
    Pattern {
        signal: "event_reference",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["happened", "occurred", "we had", "went to", "attended", "during the"],
    },
    Pattern {
        signal: "session_marker",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["session", "meeting", "conversation", "standup", "call with"],
    },
    Pattern {
        signal: "narrative_voice",
        weight: 0.3,
        kind: SignalKind::Plain,
        needles: &["we were", "i was", "then we", "after that"],
    },
    Pattern {
        signal: "emotional_event",
        weight: 0.4,
        kind: SignalKind::Emotional,
        needles: &["amazing", "exciting", "frustrating", "stressful", "celebrated", "upset"],
    },
];

const SEMANTIC_PATTERNS: &[Pattern] = &[
    Pattern {
        signal: "definition_marker",
        weight: 0.7,
        kind: SignalKind::Plain,
        needles: &[
            " is a ",
            " are a ",
            " means ",
            "refers to",
            "defined as",
            "consists of",
            "is called",
        ],
    },
    Pattern {
        signal: "fact_assertion",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["always", "never", "typically", "generally", "the fact that"],
    },
    Pattern {
        signal: "reference_marker",
        weight: 0.4,
        kind: SignalKind::Plain,
        needles: &["according to", "documentation", "known as", "officially"],
    },
    Pattern {
        signal: "technical_term",
        weight: 0.4,
        kind: SignalKind::Technical,
        needles: &[
            "api",
            "database",
            "server",
            "algorithm",
            "protocol",
            "compiler",
            "schema",
            "latency",
            "encryption",
        ],
    },
];

const PROCEDURAL_PATTERNS: &[Pattern] = &[
    Pattern {
        signal: "howto_marker",
        weight: 0.8,
        kind: SignalKind::HowTo,
        needles: &["how to", "in order to", "the way to", "procedure", "workflow", "process"],
    },
    Pattern {
        signal: "step_sequence",
        weight: 0.6,
        kind: SignalKind::Plain,
        needles: &["step 1", "step one", "first,", "next,", "then ", "finally"],
    },
    Pattern {
        signal: "imperative_tech",
        weight: 0.5,
        kind: SignalKind::Technical,
        needles: &[
            "install",
            "configure",
            "deploy",
            "run the",
            "execute",
            "compile",
            "restart",
            "migrate",
        ],
    },
    Pattern {
        signal: "command_reference",
        weight: 0.4,
        kind: SignalKind::Technical,
        needles: &["command", "script", "terminal", " cli ", "shell"],
    },
];

const META_PATTERNS: &[Pattern] = &[
    Pattern {
        signal: "insight_marker",
        weight: 0.8,
        kind: SignalKind::Plain,
        needles: &["i realized", "i realize", "realized that", "i noticed", "insight"],
    },
    Pattern {
        signal: "pattern_marker",
        weight: 0.6,
        kind: SignalKind::Plain,
        needles: &["the pattern", "a pattern", "tends to", "recurring", "theme"],
    },
    Pattern {
        signal: "reflection_marker",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["in retrospect", "looking back", "reflecting on", "on reflection"],
    },
    Pattern {
        signal: "learning_marker",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["learned that", "lesson", "takeaway", "conclusion"],
    },
];

const IDENTITY_PATTERNS: &[Pattern] = &[
    Pattern {
        signal: "self_reference",
        weight: 0.7,
        kind: SignalKind::Plain,
        needles: &["i am ", "i'm ", "my personality", "about me", "who i am"],
    },
    Pattern {
        signal: "value_statement",
        weight: 0.6,
        kind: SignalKind::Emotional,
        needles: &["i value", "i believe", "i care about", "matters to me", "important to me"],
    },
    Pattern {
        signal: "preference_marker",
        weight: 0.5,
        kind: SignalKind::Emotional,
        needles: &["i prefer", "i like", "i love", "i hate", "my favorite"],
    },
    Pattern {
        signal: "goal_marker",
        weight: 0.4,
        kind: SignalKind::Plain,
        needles: &["my goal", "i want to become", "i aspire"],
    },
];

const WORKING_PATTERNS: &[Pattern] = &[
    Pattern {
        signal: "task_marker",
        weight: 0.6,
        kind: SignalKind::Plain,
        needles: &["todo", "to-do", "need to", "have to", "must "],
    },
    Pattern {
        signal: "ephemera_marker",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["for now", "temporarily", "draft", "scratch", "placeholder", "wip"],
    },
    Pattern {
        signal: "reminder_marker",
        weight: 0.5,
        kind: SignalKind::Plain,
        needles: &["remind", "remember to", "don't forget", "follow up"],
    },
    Pattern {
        signal: "open_item",
        weight: 0.3,
        kind: SignalKind::Plain,
        needles: &["pending", "in progress", "unfinished", "still open"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ContentRouter {
        ContentRouter::new()
    }

    #[test]
    fn analysis_is_deterministic() {
        let content = "Today we had a great session working on the project";
        let a = router().analyze(content);
        let b = router().analyze(content);
        assert_eq!(a.layer, b.layer);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.signals, b.signals);
    }

    #[test]
    fn empty_input_defaults_to_working() {
        let decision = router().analyze("");
        assert_eq!(decision.layer, Layer::Working);
        assert!(decision.confidence >= 0.5);
        assert!(decision.signals.is_empty());
    }

    #[test]
    fn signal_free_input_defaults_to_working() {
        let decision = router().analyze("zebra umbrella cactus");
        assert_eq!(decision.layer, Layer::Working);
        assert!(decision.confidence >= 0.5);
    }

    #[test]
    fn session_narrative_routes_episodic() {
        let decision = router().analyze("Today we had a great session working on the project");
        assert_eq!(decision.layer, Layer::Episodic);
        assert!(decision.signals.contains(&"temporal_marker"));
        assert!(decision.signals.contains(&"event_reference"));
    }

    #[test]
    fn howto_routes_procedural() {
        let decision =
            router().analyze("How to deploy the MCP server: step 1 install dependencies");
        assert_eq!(decision.layer, Layer::Procedural);
        assert!(decision.signals.contains(&"howto_marker"));
        assert!(decision.signals.contains(&"step_sequence"));
    }

    #[test]
    fn deployment_process_routes_procedural() {
        let decision = router().analyze(
            "The deployment process requires running migrations before starting the app server",
        );
        assert_eq!(decision.layer, Layer::Procedural);
    }

    #[test]
    fn insight_routes_meta() {
        let decision = router()
            .analyze("I realized that the pattern here is about integration not separation");
        assert_eq!(decision.layer, Layer::Meta);
        assert!(decision.signals.contains(&"insight_marker"));
        assert!(decision.signals.contains(&"pattern_marker"));
    }

    #[test]
    fn definition_routes_semantic() {
        let decision = router().analyze("A monad is a structure that represents computations");
        assert_eq!(decision.layer, Layer::Semantic);
        assert!(decision.signals.contains(&"definition_marker"));
    }

    #[test]
    fn self_description_routes_identity() {
        let decision =
            router().analyze("I am someone who values clarity, and I believe in direct feedback");
        assert_eq!(decision.layer, Layer::Identity);
        assert!(decision.signals.contains(&"self_reference"));
    }

    #[test]
    fn task_note_routes_working() {
        let decision = router().analyze("TODO: follow up on the pending review, draft for now");
        assert_eq!(decision.layer, Layer::Working);
        assert!(decision.signals.contains(&"task_marker"));
    }

    #[test]
    fn confidence_is_bounded() {
        let decision = router().analyze("How to deploy: step 1 install, configure, run the build");
        assert!(decision.confidence >= 0.5);
        assert!(decision.confidence <= 0.95);
    }

    #[test]
    fn exclamations_raise_emotional_intensity() {
        let calm = router().analyze("we met at the session");
        let loud = router().analyze("we met at the session!!! AMAZING GREAT");
        assert!(loud.emotional_intensity > calm.emotional_intensity);
        // Contribution caps keep the observable in range.
        let shouting = router().analyze("WOW WOW WOW WOW WOW !!!!!!!!!!!!!");
        assert!(shouting.emotional_intensity <= 1.0);
    }

    #[test]
    fn identifiers_raise_technical_density() {
        let prose = router().analyze("the server process");
        let code = router().analyze("the server process calls getUserById and retry_count = 3;");
        assert!(code.technical_density > prose.technical_density);
    }

    #[test]
    fn high_emotion_boosts_identity() {
        // Emotional signals plus shouting push intensity past the boost gate.
        let decision =
            router().analyze("I love this!!! I believe in it, it matters to me SO MUCH!!");
        assert!(decision.emotional_intensity > 0.7);
        assert_eq!(decision.layer, Layer::Identity);
    }

    #[test]
    fn technical_boost_prefers_procedural_with_howto() {
        let decision = router().analyze(
            "How to fix the api: install the cli, configure the database schema, run the \
             migrate script; then restart the server (set retry_count = 3, maxConnections = 10, \
             pool_size = 5)",
        );
        assert!(decision.technical_density > 0.6);
        assert_eq!(decision.layer, Layer::Procedural);
    }

    #[test]
    fn explicit_decision_has_full_confidence() {
        let decision = RouteDecision::explicit(Layer::Semantic);
        assert_eq!(decision.layer, Layer::Semantic);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn repeated_firings_have_diminishing_returns() {
        // Six temporal markers: weight * (1 + 0.1*5), not weight * 6.
        let content = "yesterday today earlier yesterday today earlier";
        let decision = router().analyze(content);
        assert_eq!(decision.layer, Layer::Episodic);
        // One signal entry even though it fired six times.
        assert_eq!(
            decision.signals.iter().filter(|s| **s == "temporal_marker").count(),
            1
        );
    }
}
