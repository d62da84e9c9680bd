//! Canned replies used when the completion provider is unavailable.

use rand::Rng;

pub const FALLBACK_RESPONSES: [&str; 5] = [
    "I'm here, but my digital connection is a bit glitchy right now. What's on your mind?",
    "The gremlins in the machine are being particularly stubborn today. Let's try again?",
    "I'm picking up some interference in the digital realm. Can you repeat that?",
    "The ghosts in the machine are restless. Let me try to focus on your request.",
    "There's some chaos in the code right now. Let's work through this together.",
];

pub fn fallback_response(rng: &mut impl Rng) -> &'static str {
    FALLBACK_RESPONSES[rng.random_range(0..FALLBACK_RESPONSES.len())]
}
