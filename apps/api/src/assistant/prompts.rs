// All LLM prompt constants for the assistant module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Planting date written into the crop-planning report when the caller does
/// not supply one. Format: DD/MM/YYYY.
pub const DEFAULT_PLANTING_DATE: &str = "15/10/2024";

/// General question prompt.
/// Replace: {persona}, {language_instruction}, {citation_instruction}, {query}, {sources}
pub const GENERAL_QUERY_PROMPT_TEMPLATE: &str = r#"{persona}
Answer ONLY with the facts listed in the sources below or in previous turns of this conversation.
If there isn't enough information in the sources, say "I don't know". Do not generate answers that don't use the sources.
{language_instruction}
{citation_instruction}

QUESTION:
{query}

SOURCES:
{sources}"#;

/// Crop-planning report prompt. The report format and the reference data
/// travel as system messages; this is the user turn.
/// Replace: {persona}, {language_instruction}, {citation_instruction},
///          {location}, {planting_date}, {query}, {sources}
pub const CROP_PLANNING_PROMPT_TEMPLATE: &str = r#"{persona}
Write a soybean crop-planning report using the reference data provided in the system messages and the sources below.
Fill EVERY field of the template. When the data does not support a value, write "I don't know" for that field.
{language_instruction}
{citation_instruction}

TEMPLATE:
Location: {location}
Planting date: {planting_date}
Estimated emergence date:
Estimated harvest date:
Cultivar:
Planting system:
Previous crop:
Row spacing:
Fertilization:
Seed treatment:
Inoculant:
Micronutrients:
Insecticides:
Fungicides:

REQUEST:
{query}

SOURCES:
{sources}"#;

/// System prompt for the question classifier. The model must answer with one word.
pub const CLASSIFIER_SYSTEM: &str = "You are a useful assistant specialized in filtering \
    questions by subject. The user will ask a question, usually in Portuguese. \
    If the question is about pesticides, pests or crop protection, answer exactly \"pesticides\". \
    For any other subject, answer exactly \"other\". \
    Do NOT include any other text.";
