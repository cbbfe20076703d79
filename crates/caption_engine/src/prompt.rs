use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8088/v1";
pub const DEFAULT_MODEL: &str = "Llama-Joycaption-Beta-One-Hf-Llava-Q4_K.gguf";
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Instruction sent alongside every image. The model is expected to answer
/// with a bare JSON object holding `description` and `tags`.
pub const DEFAULT_PROMPT: &str = r#"Write a straightforward description for this image. Begin with the main subject and medium. Mention pivotal elements (people, objects, scenery) using confident, definite language. When describing people, pay particular attention to: hair color (blonde, black hair, brunette, etc), race (white, black, asian), gender, tattoos, and clothing. Use bold, simple descriptions, such as colors, garment names, etc. Focus on concrete details like color, shape, quantity, texture, and spatial relationships. Show how elements interact. Omit mood and speculative wording. If text is present, quote it exactly. Note any watermarks, signatures, or compression artifacts. Never mention what's absent, resolution, or unobservable details. Vary your sentence structure and keep the description concise, without starting with "This image is..." or similar phrasing.

Write a json-formatted list of booru-like tags for this image.

Return the results in a JSON object, under the "description" and "tags" keys. Do not return any text outside the JSON. Do not return markdown, return just a raw json object
"#;

/// `data:` URL embedding the image inline.
pub fn image_data_url(mime_type: &str, image_base64: &str) -> String {
    format!("data:{mime_type};base64,{image_base64}")
}

/// Single-turn chat-completions body: one user message with the image first,
/// then the instruction text.
pub fn build_chat_request(
    model: &str,
    prompt: &str,
    max_tokens: u32,
    mime_type: &str,
    image_base64: &str,
) -> Value {
    json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                {
                    "type": "image_url",
                    "image_url": { "url": image_data_url(mime_type, image_base64) },
                },
                { "type": "text", "text": prompt },
            ],
        }],
        "max_tokens": max_tokens,
    })
}
