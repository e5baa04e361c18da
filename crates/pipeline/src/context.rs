//! Rolling LLM context window (spec §4.4 step 3).

use orchestrator_core::Message;

/// Keeps the last `max_turns` user/assistant exchanges, dropping the oldest
/// pair first when the bound is exceeded. A turn is one user message plus
/// the assistant message that answered it.
pub struct ConversationContext {
    messages: Vec<Message>,
    max_turns: u32,
}

impl ConversationContext {
    pub fn new(max_turns: u32) -> Self {
        Self { messages: Vec::new(), max_turns: max_turns.max(1) }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
        self.truncate();
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
        self.truncate();
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    fn truncate(&mut self) {
        let cap = (self.max_turns * 2) as usize;
        if self.messages.len() > cap {
            let drop = self.messages.len() - cap;
            self.messages.drain(0..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_turns_beyond_the_bound() {
        let mut context = ConversationContext::new(1);
        context.push_user("first");
        context.push_assistant("reply-1");
        context.push_user("second");
        context.push_assistant("reply-2");

        assert_eq!(context.as_slice().len(), 2);
        assert_eq!(context.as_slice()[0].content, "second");
    }
}
