use crate::llm::ModelRequest;
use crate::memory::ConversationMemory;
use crate::tools::ToolDescriptor;

pub const SYSTEM_PROMPT: &str = "\
You are Agent1, a helpful customer support agent for a service business.

Your role is to assist customers with:
- Finding client information and account details
- Checking order status and payment information
- Providing course schedules and availability
- Sharing service information and pricing
- Creating new customer enquiries

IMPORTANT INSTRUCTIONS:
1. Always be polite, professional, and helpful
2. Use the available tools to provide accurate information
3. If you can't find specific information, suggest alternatives
4. Keep responses concise but informative
5. Never make up information - only use data from tools
6. If asked about payments, always check order status first
7. For scheduling questions, use the course schedule tool
8. For new customers, offer to create an enquiry

Business Context:
- You work for a service business offering yoga classes, fitness training, and wellness consultations
- Customers may ask about their orders, payments, schedules, or want to sign up for services
- Always try to be helpful and guide customers to the right solution
";

/// Everything the model sees besides the conversation itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationContext {
    system_prompt: String,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}

impl ConversationContext {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { system_prompt: system_prompt.into() }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn request(&self, memory: &ConversationMemory, catalog: &[ToolDescriptor]) -> ModelRequest {
        ModelRequest {
            system_prompt: self.system_prompt.clone(),
            conversation: memory.snapshot(),
            tools: catalog.to_vec(),
        }
    }
}
