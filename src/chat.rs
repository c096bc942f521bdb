//! Small-talk replies for the chat endpoint.
//!
//! A message that contains one of the phrases below as whole words gets the
//! matching canned reply instead of a document search. Phrases are checked
//! in table order, so `"hello, how are you"` answers as a greeting.

const CANNED: &[(&str, &str)] = &[
    ("hi", "Hello! 👋 How can I help you today?"),
    ("hello", "Hi there! How’s your day going?"),
    ("how are you", "I'm doing great! Thanks for asking 😊"),
    ("help", "I can answer questions from PDFs/images or chat with you."),
];

/// The canned reply for `message`, if any phrase matches.
pub fn canned_reply(message: &str) -> Option<&'static str> {
    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    CANNED.iter().find_map(|(phrase, reply)| {
        let needle: Vec<&str> = phrase.split(' ').collect();
        words
            .windows(needle.len())
            .any(|w| w == needle.as_slice())
            .then_some(*reply)
    })
}
