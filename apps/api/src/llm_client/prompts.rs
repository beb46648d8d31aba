// Cross-cutting prompt fragments shared by every evaluator prompt.
// Evaluator-specific templates live in evaluation::prompts.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Output contract appended to every scoring prompt.
pub const SCORE_OUTPUT_INSTRUCTION: &str = "\
Return STRICTLY a JSON object with exactly these fields:
- score: an integer from 0 to 10
- explanation: one short sentence justifying the score

Example:
{\"score\": 7, \"explanation\": \"Several years of relevant backend work with clear progression.\"}";
