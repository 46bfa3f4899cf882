// Shared prompt fragments and the template renderer.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Persona shared by every assistant prompt.
pub const AGRONOMY_PERSONA: &str = "You are a helpful assistant specialized in \
    agricultural planning and pest control for soybean crops in Brazil.";

/// Retrieval happens in one language, the final answer in another.
pub const LANGUAGE_INSTRUCTION: &str = "Search and reason over the sources in English, \
    but write your final answer in Brazilian Portuguese.";

/// Appended to every answer-producing prompt.
pub const CITATION_INSTRUCTION: &str = "At the end of your answer, cite the sources you used.";

/// Fills `{name}` placeholders in `template` with the matching value.
///
/// Substitution is a single pass: inserted values are never scanned again, so
/// a query containing `{sources}` is embedded verbatim. Unknown placeholders
/// are left untouched.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let filled = after.find('}').and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match filled {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
