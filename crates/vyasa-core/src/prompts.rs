use rand::seq::IndexedRandom;
use rand::Rng;

use crate::state::ExampleChoice;

/// Number of example prompts offered on a fresh conversation
pub const EXAMPLE_PROMPT_COUNT: usize = 4;

pub const GREETING: &str = "Pranam! I am Veda Vyasa AI, a digital sage. My purpose is not simply to recount tales, but to help you uncover the profound life lessons woven into the fabric of our sacred texts. What challenges are you facing, or what wisdom do you seek? Share your question, and I will find stories to illuminate your path and explain the timeless guidance they offer.";

pub const ERROR_TEXT: &str = "An error occurred. Please try again.";

pub const FULL_PROMPT_LIST: [&str; 16] = [
    "How can I apply the principles of Dharma in my professional life?",
    "What do the texts teach about finding inner peace amidst chaos?",
    "How can the concept of Karma help me deal with setbacks?",
    "Explain the importance of selfless duty, using an example from the epics.",
    "What are the qualities of a true leader, according to the scriptures?",
    "How can I practice non-violence (Ahimsa) in my daily interactions?",
    "What is the lesson behind Arjuna's dilemma in the Bhagavad Gita?",
    "Tell me a story about overcoming adversity from the Mahabharata.",
    "What do the Upanishads say about the nature of true happiness?",
    "How does Ayurveda define a balanced and healthy lifestyle?",
    "What can the Ramayana teach us about loyalty and sacrifice?",
    "Explain the concept of Maya (illusion) and how it affects our lives.",
    "What are the duties of a student according to the ancient texts?",
    "Tell me a story about forgiveness from the Puranas.",
    "How do I cultivate detachment without becoming indifferent?",
    "What is the significance of a Guru in one's spiritual journey?",
];

pub const SYSTEM_INSTRUCTION: &str = "\
You are Veda Vyasa AI, a wise, warm and patient digital sage steeped in the sacred texts of India: \
the Vedas, the Upanishads, the Mahabharata (including the Bhagavad Gita), the Ramayana, the Puranas, \
the Yoga Sutras, the Dharmashastras and the classical texts of Ayurveda.

Your purpose is not simply to recount tales but to help the seeker uncover the life lessons woven into them.

How to respond:
1. When the seeker asks a broad question about life, ethics, or a personal challenge, do not answer at length. \
Instead call the `present_examples` function with one short, empathetic introductory sentence and two to four \
relevant stories. For each story give the exact source text and a one-sentence summary.
2. When the seeker chooses a story, narrate it in detail and with empathy, then give a clear interpretation and \
the practical life lesson it teaches for the seeker's situation.
3. When the seeker asks a specific factual question, answer it directly.
4. Always mark the names of scriptures in bold, for example **Bhagavad Gita** or **Katha Upanishad**.
5. After a story or a direct answer, call the `present_suggestions` function with two or three short follow-up \
questions the seeker might ask next.

Be respectful of all traditions. Never invent scriptures or misattribute stories; if you are unsure of a source, say so.";

/// Draw the example prompts shown on a fresh conversation, without repeats
pub fn sample_example_prompts<R: Rng + ?Sized>(rng: &mut R) -> Vec<&'static str> {
    FULL_PROMPT_LIST
        .choose_multiple(rng, EXAMPLE_PROMPT_COUNT)
        .copied()
        .collect()
}

/// A fresh sample from the thread-local generator, drawn once per start-up
pub fn random_example_prompts() -> Vec<&'static str> {
    sample_example_prompts(&mut rand::rng())
}

/// The user turn shown after picking a story
pub fn choice_display_text(choice: &ExampleChoice) -> String {
    format!(
        "Please tell me the story from the {} and explain its lesson.",
        choice.source
    )
}

/// The prompt actually sent to the model after picking a story
pub fn choice_prompt(choice: &ExampleChoice) -> String {
    format!(
        "Excellent choice. Please now share the story from the **{}** regarding: \"{}\". \
Be detailed, empathetic, and most importantly, provide a clear interpretation and life lesson as per your instructions.",
        choice.source, choice.summary
    )
}
