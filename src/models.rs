use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "jimeng-3.1";

/// The model forced whenever a reference image is supplied. Only this
/// generation line supports the `blend` ability.
pub const DEFAULT_BLEND_MODEL: &str = "jimeng-3.0";

/// Mapping from the public model names to the backend model identifiers the
/// generation endpoint expects.
static MODEL_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "jimeng-3.1",
            "high_aes_general_v30l_art_fangzhou:general_v3.0_18b",
        ),
        ("jimeng-3.0", "high_aes_general_v30l:general_v3.0_18b"),
        ("jimeng-2.1", "high_aes_general_v21_L:general_v2.1_L"),
        ("jimeng-2.0-pro", "high_aes_general_v20_L:general_v2.0_L"),
        ("jimeng-2.0", "high_aes_general_v20:general_v2.0"),
        ("jimeng-1.4", "high_aes_general_v14:general_v1.4"),
        ("jimeng-xl-pro", "text2img_xl_sft"),
    ])
});

/// Resolves a public model name to its backend identifier.
///
/// Unknown names fall back to the backend identifier of [`DEFAULT_MODEL`],
/// matching the behavior of the web client.
pub fn resolve_model(name: &str) -> &'static str {
    MODEL_MAP
        .get(name)
        .or_else(|| MODEL_MAP.get(DEFAULT_MODEL))
        .copied()
        .expect("default model is always registered")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_model() {
        assert_eq!(
            resolve_model("jimeng-3.1"),
            "high_aes_general_v30l_art_fangzhou:general_v3.0_18b"
        );
        assert_eq!(resolve_model("jimeng-xl-pro"), "text2img_xl_sft");
    }

    #[test]
    fn test_resolve_unknown_model_falls_back_to_default() {
        assert_eq!(resolve_model("jimeng-99"), resolve_model(DEFAULT_MODEL));
        assert_eq!(
            resolve_model(""),
            "high_aes_general_v30l_art_fangzhou:general_v3.0_18b"
        );
    }
}
