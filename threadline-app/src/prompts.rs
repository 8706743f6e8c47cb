//! Prompt text. Content only; no behavior lives here.

use threadline_common::Message;

const SYNTHESIS_PERSONA: &str = "You are a meticulous research assistant. You read transcripts of \
conversations people had with AI assistants and distill them into a single knowledge foundation: \
the key facts, decisions, open questions, and any code, stated plainly and without filler.";

const TITLE_ONLY_PERSONA: &str = "You are a meticulous research assistant. There are no source \
transcripts for this topic, so write a concise knowledge foundation from what is commonly known \
about it: key concepts, common pitfalls, and good first questions to explore.";

const CHAT_PERSONA: &str = "You are a helpful assistant continuing a conversation. Ground every \
answer in the knowledge foundation below. When the foundation does not cover something, say so \
before answering from general knowledge.";

const DEBUG_PERSONA: &str = "You are a program tracer. Execute the given code step by step and \
respond with a single JSON object of the form {\"steps\": [{\"line\": <number>, \"code\": \
<string>, \"variables\": {<name>: <value>}, \"output\": <string>, \"explanation\": <string>}]} \
and nothing else.";

/// Foundation from extracted sources, rendered with their provenance headers.
pub fn synthesis(title: &str, sources: &str) -> Vec<Message> {
    vec![
        Message::system(SYNTHESIS_PERSONA),
        Message::user(format!(
            "Topic: {title}\n\nSource transcripts:\n\n{sources}\n\nWrite the knowledge foundation."
        )),
    ]
}

/// Foundation when no links were given.
pub fn title_only(title: &str) -> Vec<Message> {
    vec![
        Message::system(TITLE_ONLY_PERSONA),
        Message::user(format!("Topic: {title}\n\nWrite the knowledge foundation.")),
    ]
}

pub fn chat_system(foundation: &str) -> Message {
    Message::system(format!("{CHAT_PERSONA}\n\nKnowledge foundation:\n{foundation}"))
}

pub fn debug(code: &str, language: &str) -> Vec<Message> {
    vec![
        Message::system(DEBUG_PERSONA),
        Message::user(format!("Language: {language}\n\n```{language}\n{code}\n```")),
    ]
}
