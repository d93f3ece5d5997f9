/// Appends the fixed return-schema rules to an extraction prompt.
///
/// `{allowed_values}`, `{language}` and the doubled braces are literal: the
/// consumer of these prompts fills them with its own formatter.
pub fn append_formatting_rules(
    prompt: &str,
    attribute_name: &str,
    has_fixed_values: bool,
) -> String {
    let mut lines: Vec<String> = vec![prompt.to_string()];

    if has_fixed_values {
        lines.push("Select only from the following allowed values.".to_string());
        lines.push("\"allowed_values\": {allowed_values}".to_string());
    }

    lines.push(format!(
        "- return the output in {{language}} language in JSON format {{{{ \"{attribute_name}\" : <your_classification> }}}}"
    ));
    lines.push("- Strictly return the JSON object only.".to_string());
    lines.push(
        "- Do not include markdown formatting, code blocks, escaped characters or explanations."
            .to_string(),
    );

    lines.join("\n")
}
