//! Support chat for the marketing site.
//!
//! `/api/chat` forwards a visitor's question to the Anthropic Messages API
//! with a fixed AIChatFlows system prompt. Without an API key, and always on
//! `/api/demo-chat`, replies come from a keyword table instead.

mod client;
mod error;
mod types;

pub use client::ClaudeClient;
pub use error::ChatError;
pub use types::{ChatResponse, ContentBlock, Message};

use async_trait::async_trait;

/// Longest accepted visitor message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// System prompt sent with every LLM request.
pub const SYSTEM_PROMPT: &str = "You are AIChatFlows, a friendly, expert virtual assistant for businesses. \
You answer questions about the AIChatFlows service: AI chatbot setups, pricing tiers, \
social media automation, customer service integrations, and feature details. \
Be helpful, concise, and professional.";

const PRICING_REPLY: &str = "Great question! AIChatFlows offers two plans: Starter ($99/mo with a $199 setup fee) \
for Instagram automation, and Pro ($149/mo with a $249 setup fee) which adds Facebook, TikTok and WhatsApp. \
Would you like details on a specific plan?";

const FEATURES_REPLY: &str = "AIChatFlows provides 24/7 AI chatbots, social media automation, and customer service \
integration. Our bots work across Instagram, Facebook, TikTok, WhatsApp, and more. \
What specific feature interests you most?";

const DEMO_REPLY: &str = "You're already using our demo! This showcases how our AI responds to questions. \
In the full version, you'd get customized responses, integrations, and detailed analytics. Impressed so far?";

const GREETING_REPLY: &str = "Hello! I'm the AIChatFlows demo assistant. I can answer questions about our AI chatbot \
services, pricing, and features. What would you like to know?";

const PRICING_WORDS: &[&str] = &["price", "prices", "pricing", "cost", "costs", "plan", "plans"];
const FEATURE_WORDS: &[&str] = &["feature", "features", "what", "how", "does"];
const DEMO_WORDS: &[&str] = &["demo", "test", "try"];
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];

/// Something that can answer a visitor's message.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Produce a reply to a single visitor message.
    async fn reply(&self, message: &str) -> Result<String, ChatError>;
}

/// Why a visitor message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Message cannot be empty")]
    Empty,
    #[error("Message must be at most 2000 characters")]
    TooLong,
}

/// Trim a visitor message and enforce the length limits.
///
/// # Errors
///
/// Returns [`MessageError`] for blank or over-long messages.
pub fn check_message(message: &str) -> Result<&str, MessageError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(MessageError::Empty);
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(MessageError::TooLong);
    }
    Ok(trimmed)
}

/// Keyword-matched canned reply.
#[must_use]
pub fn demo_reply(message: &str) -> String {
    let lower = message.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let mentions = |vocab: &[&str]| words.iter().any(|w| vocab.contains(w));

    if mentions(PRICING_WORDS) || lower.contains("how much") {
        PRICING_REPLY.to_string()
    } else if mentions(FEATURE_WORDS) {
        FEATURES_REPLY.to_string()
    } else if mentions(DEMO_WORDS) {
        DEMO_REPLY.to_string()
    } else if mentions(GREETING_WORDS) {
        GREETING_REPLY.to_string()
    } else {
        format!(
            "Thanks for your message! This is a demo showcasing AIChatFlows' AI capabilities. \
Your question '{message}' would be answered by our full AI system with detailed, contextual responses. \
Want to learn more about our services?"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_message_limits() {
        assert_eq!(check_message("  hi  "), Ok("hi"));
        assert_eq!(check_message("   "), Err(MessageError::Empty));
        assert_eq!(
            check_message(&"a".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(MessageError::TooLong)
        );
        assert!(check_message(&"a".repeat(MAX_MESSAGE_CHARS)).is_ok());
    }

    #[test]
    fn test_demo_reply_keywords() {
        assert!(demo_reply("How much does it cost?").contains("$99/mo"));
        assert!(demo_reply("Tell me about your PLANS").contains("Starter"));
        assert!(demo_reply("What can the bot do").contains("24/7"));
        assert!(demo_reply("Can I try it?").contains("demo"));
        assert!(demo_reply("hey there").starts_with("Hello!"));
    }

    #[test]
    fn test_demo_reply_does_not_match_inside_words() {
        // "this" contains "hi" but is not a greeting.
        let reply = demo_reply("this is nice");
        assert!(reply.contains("'this is nice'"));
    }
}
