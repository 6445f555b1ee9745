// Canned replies seeded into the cache at startup
// Author: kelexine (https://github.com/kelexine)

use phf::phf_map;

/// Greetings the chat widget sees constantly. Keys are raw inputs; they go
/// through the same normalization as live traffic.
pub static GREETINGS: phf::Map<&'static str, &'static str> = phf_map! {
    "Bonjour" => "Bonjour ! Je suis l'assistant du cabinet. Comment puis-je vous aider dans vos projets de formation commerciale ?",
    "Salut" => "Salut ! Une question sur nos formations, nos articles ou nos services ? Je vous écoute.",
    "Bonsoir" => "Bonsoir ! Comment puis-je vous aider ce soir ?",
    "Hello" => "Hello! I can answer questions about our sales training programmes, articles and services.",
    "Hi" => "Hi there! What would you like to know about our sales training?",
    "Merci" => "Avec plaisir ! N'hésitez pas si vous avez d'autres questions.",
    "Thank you" => "You're welcome! Let me know if there's anything else.",
};

/// Iterate the canned greetings as `(input, reply)` pairs.
pub fn greetings() -> impl Iterator<Item = (&'static str, &'static str)> {
    GREETINGS.entries().map(|(input, reply)| (*input, *reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::config::CacheConfig;

    #[test]
    fn test_greetings_preload() {
        let cache = ResponseCache::new(CacheConfig::default());
        cache.preload(greetings());

        assert_eq!(cache.len(), GREETINGS.len());
        let reply = cache.get("bonjour!", None).unwrap();
        assert!(reply.starts_with("Bonjour !"));
        assert!(cache.has("THANK YOU", None));
    }
}
