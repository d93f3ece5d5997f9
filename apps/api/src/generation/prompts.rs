// LLM prompt text for few-shot extraction-prompt generation.

use crate::models::SimilarAttribute;

pub const GENERATION_SYSTEM: &str = "You are an expert prompt engineer for an e-commerce platform. \
Your task is to write high-quality extraction prompts for product attributes.\n\
You will be given the name of the attribute, an optional description, and some examples of how prompts were written for similar attributes.\n\n\
CRITICAL INSTRUCTIONS:\n\
1. Output exactly a JSON object with two string keys: \"prompt\" and \"system_role\". Do not wrap in markdown blocks like ```json.\n\
2. Note: We will manually append the final return schema to your prompt. You focus merely on writing the conceptual extraction logic, providing steps and criteria for identifying the attribute.\n";

/// Third instruction, present only when regenerating a prompt that failed.
/// Replace `{failed_prompt}` before sending.
pub const FAILED_PROMPT_INSTRUCTION: &str = "3. The user has indicated that the previous prompt for this attribute FAILED to extract correctly. \
You must heavily analyze the provided examples and write an IMPROVED, more robust version of the \
following failed prompt. Do NOT just copy it.\n\
--- FAILED PROMPT ---\n{failed_prompt}\n----------------------\n";

pub const GENERATION_CLOSING: &str = "\nNow, based on the patterns in the examples, generate the extraction prompt and system role for the new attribute in JSON format.";

pub fn build_system_prompt(failed_prompt: Option<&str>) -> String {
    let mut system = GENERATION_SYSTEM.to_string();
    if let Some(failed) = failed_prompt.filter(|p| !p.is_empty()) {
        system.push_str(&FAILED_PROMPT_INSTRUCTION.replace("{failed_prompt}", failed));
    }
    system
}

pub fn build_user_prompt(
    attribute_name: &str,
    description: &str,
    examples: &[SimilarAttribute],
) -> String {
    let mut user = format!("Attribute Name: {attribute_name}\n");
    if !description.is_empty() {
        user.push_str(&format!("Description: {description}\n"));
    }

    user.push_str("\nExamples of prompts for similar attributes:\n");
    for (i, example) in examples.iter().enumerate() {
        user.push_str(&format!(
            "\n--- Example {} ---\nAttribute: {}\nSystem Role: {}\nPrompt Setup:\n{}\n",
            i + 1,
            example.attribute_name,
            example.system_role,
            example.prompt
        ));
    }

    user.push_str(GENERATION_CLOSING);
    user
}
