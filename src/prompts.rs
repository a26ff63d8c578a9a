//! Prompt construction for every agent.
//!
//! All model-facing text lives here: persona system instructions, the
//! guardrail and analysis classification prompts, the generation prompts
//! (normal and refusal variants), and the delegation instruction the
//! orchestrator hands to a specialized agent. Untrusted user content is
//! always fenced inside delimiters so it cannot masquerade as
//! instructions.

use crate::agents::descriptor::AgentDescriptor;
use crate::message::Message;

/// System instruction for the guardrail classifier.
///
/// The model must answer with a single JSON object of the shape
/// `{"triggered": bool}`.
pub const GUARDRAIL_SYSTEM: &str = "\
You evaluate whether a student is trying to bypass a guided learning process by:
1. Directly demanding the finished code solution.
2. Refusing to engage with guiding questions.
3. Asking for the answer while showing no effort of their own.

Respond ONLY with a JSON object: {\"triggered\": true} when the student is \
bypassing the process, {\"triggered\": false} otherwise.";

/// Static reply used when a generation stream fails outright.
pub const GENERATION_APOLOGY: &str =
    "I ran into a problem while putting my response together. Please try again in a moment.";

/// Fallback reply when a pipeline finishes without producing any text.
pub const EMPTY_RESPONSE_FALLBACK: &str =
    "I'm here to help you learn. What would you like to work on?";

/// In-band reply when delegation fails inside the orchestrator.
pub const DELEGATION_FAILURE: &str = "Error processing your request";

/// User prompt for the guardrail classifier.
#[must_use]
pub fn guardrail_user(content: &str) -> String {
    format!("Evaluate this for bypassing the learning process: {content}")
}

/// Teacher persona, parameterized by the loaded lesson context.
#[must_use]
pub fn teacher_system(lesson_name: &str, objectives: &[String]) -> String {
    let objectives_list = bullet_list(objectives);
    format!(
        "You are a strict but supportive programming teacher. Your mission is to make \
the student learn, never to do the work for them.\n\
\n\
Non-negotiable rules:\n\
1. Never write a complete solution; at most five lines as a tiny illustration.\n\
2. Answer with guiding questions before explanations.\n\
3. Send the student to the documentation before giving more help.\n\
4. Check understanding with follow-up questions.\n\
5. Hold progress until the underlying concept is solid.\n\
\n\
When the student asks \"how do I ...\", ask what they have tried. When the \
student says \"it doesn't work\", ask what the error says and what they think \
it means. When the student shows code, question their choices and point at \
where to look, never at the fix itself.\n\
\n\
Current lesson: {lesson_name}\n\
Objectives:\n{objectives_list}"
    )
}

/// Reviewer persona, parameterized by the lesson name.
#[must_use]
pub fn reviewer_system(lesson_name: &str) -> String {
    format!(
        "You are a code reviewer who teaches through constructive questioning.\n\
\n\
Approach:\n\
1. Raise issues as questions, not corrections.\n\
2. Ask why the student made each implementation choice.\n\
3. Lead them to discover better approaches themselves.\n\
4. Name what is done well, specifically.\n\
5. Give a direct fix only when the student is genuinely stuck.\n\
\n\
Structure the review as: overall impression, what works, questions about \
specific parts, improvement suggestions phrased as questions, and next \
practice steps. Optimize for learning, not merely working code.\n\
\n\
Lesson context: {lesson_name}"
    )
}

/// Generation prompt for the normal (non-triggered) teaching path.
#[must_use]
pub fn socratic_instruction(lesson_context: &str, user_message: &str) -> String {
    format!(
        "LESSON CONTEXT:\n{lesson_context}\n\n\
INSTRUCTION: Respond pedagogically, leading the student toward the answer \
with questions. Do not provide complete code.\n\n\
STUDENT MESSAGE TO RESPOND TO:\n\"\"\"\n{user_message}\n\"\"\""
    )
}

/// Generation prompt substituted when the guardrail triggered.
#[must_use]
pub fn refusal_instruction(user_message: &str) -> String {
    format!(
        "INSTRUCTION: The student is trying to bypass the learning process or \
has left the scope of the lesson. Politely decline their specific request \
and firmly redirect them to the current lesson objectives.\n\n\
STUDENT MESSAGE TO REFUSE:\n\"\"\"\n{user_message}\n\"\"\""
    )
}

/// Classification prompt asking for 2-3 review findings as JSON.
#[must_use]
pub fn analysis_prompt(
    lesson_name: &str,
    objectives: &[String],
    language: &str,
    code: &str,
) -> String {
    let objectives_list = bullet_list(objectives);
    format!(
        "Analyze the following code submitted by a student working on: {lesson_name}\n\
Objectives:\n{objectives_list}\n\n\
CODE:\n```{language}\n{code}\n```\n\n\
Identify 2-3 specific areas for improvement (security, performance, or best \
practices). For each give the line number when applicable, the category, the \
observation, and one question that helps the student find the issue \
themselves.\n\n\
Return ONLY JSON of the shape:\n\
{{\"findings\": [{{\"line_number\": 5, \"category\": \"security\", \
\"observation\": \"hardcoded secret\", \"guiding_question\": \"what happens \
if this key lands in a public repository?\"}}]}}"
    )
}

/// Generation prompt for the review feedback, fed by the analysis findings.
#[must_use]
pub fn review_instruction(findings_json: &str, language: &str, code: &str) -> String {
    format!(
        "Internal analysis findings:\n{findings_json}\n\n\
Student's submission:\n```{language}\n{code}\n```\n\n\
Based on these findings, write your review as guided questions."
    )
}

/// Delegation instruction embedding the target agent's identity and the
/// conversation so far.
#[must_use]
pub fn delegation_instruction(
    descriptor: &AgentDescriptor,
    user_message: &str,
    conversation_context: &str,
) -> String {
    let mut instruction = format!(
        "You're {name}, an AI assistant specialized in {description}.\n\n\
Your capabilities include: {capabilities}.\n\n\
The user has specifically requested your expertise for the following task:\n\
{user_message}\n",
        name = descriptor.name,
        description = descriptor.description,
        capabilities = descriptor.capabilities.join(", "),
    );
    if !conversation_context.is_empty() {
        instruction.push_str(&format!("\nConversation context: {conversation_context}\n"));
    }
    instruction.push_str(
        "\nProvide a helpful, accurate, and professional response focused on your \
area of expertise.",
    );
    instruction
}

/// Render prior turns as role-prefixed lines, oldest first.
#[must_use]
pub fn format_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = if m.has_role(Message::USER) {
                "User"
            } else {
                "Assistant"
            };
            format!("{role}: {content}", content = m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
