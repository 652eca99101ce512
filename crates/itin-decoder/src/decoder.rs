//! Full decode pipeline: strip, repair-via-continuation, schema-validate,
//! coerce.

use serde_json::Value;

use itin_providers::{CompletionRequest, ModelClient};

use crate::coerce::apply_coercions;
use crate::strip::{scrub_non_ascii_intrusions, strip_fences_and_preamble};

/// Result of decoding one model response.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub ok: bool,
    pub data: Option<Value>,
    pub errors: Vec<String>,
    pub needs_continuation: bool,
}

fn try_parse(raw: &str) -> Result<Value, String> {
    let cleaned = scrub_non_ascii_intrusions(&strip_fences_and_preamble(raw));
    serde_json::from_str(&cleaned).map_err(|e| e.to_string())
}

fn validate(data: &Value, schema: &Value) -> Vec<String> {
    match jsonschema::validator_for(schema) {
        Ok(validator) => validator
            .iter_errors(data)
            .map(|e| e.to_string())
            .collect(),
        Err(e) => vec![format!("invalid schema: {e}")],
    }
}

/// Decode a model response against `schema`. If the first parse fails,
/// requests a single continuation from `model` with the original schema
/// appended, then retries once. `day_date`, when supplied, parameterizes
/// the `"HH:mm"` coercion for any `startTime`/`endTime` fields found.
pub async fn decode(
    model: &dyn ModelClient,
    original_prompt: &str,
    schema: &Value,
    raw: &str,
    day_date: Option<&str>,
) -> DecodeOutcome {
    let parsed = match try_parse(raw) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let continuation_prompt = format!(
                "{original_prompt}\n\nYour previous response could not be parsed as JSON \
                 ({first_error}). Continue it so the full response is valid JSON matching the \
                 schema:\n{schema}"
            );
            match model
                .complete(CompletionRequest { prompt: continuation_prompt, schema: Some(schema.clone()) })
                .await
            {
                Ok(response) => try_parse(&response.text).map_err(|e| format!("{first_error}; after continuation: {e}")),
                Err(model_err) => Err(format!("{first_error}; continuation failed: {model_err}")),
            }
        }
    };

    let mut data = match parsed {
        Ok(value) => value,
        Err(error) => {
            return DecodeOutcome { ok: false, data: None, errors: vec![error], needs_continuation: false };
        }
    };

    let schema_errors = validate(&data, schema);
    if !schema_errors.is_empty() {
        return DecodeOutcome { ok: false, data: Some(data), errors: schema_errors, needs_continuation: false };
    }

    apply_coercions(&mut data, day_date);

    DecodeOutcome { ok: true, data: Some(data), errors: vec![], needs_continuation: false }
}
