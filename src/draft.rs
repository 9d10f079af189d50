//! Typed model of the "draft" document submitted to start a generation.
//!
//! The service consumes a nested component tree in which every node carries a
//! fresh opaque id; reusing an id across nodes or submissions is rejected.
//! Id generation is centralized in [`new_id`] and each call to
//! [`DraftSpec::build`] mints a completely new set.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

/// Minimum draft schema version the document declares.
pub(crate) const DRAFT_MIN_VERSION: &str = "3.0.2";
/// Version of the web client the document claims to come from.
pub(crate) const WEB_VERSION: &str = "3.2.2";

/// Canvas the blend ability renders to, regardless of the requested size.
const BLEND_CANVAS: u32 = 1360;
/// Edit strength of the `byte_edit` ability.
const BYTE_EDIT_STRENGTH: f32 = 0.5;

const SEED_RANGE: std::ops::Range<u64> = 2_500_000_000..2_600_000_000;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Everything needed to assemble one submission.
pub(crate) struct DraftSpec<'a> {
    pub(crate) model: &'a str,
    pub(crate) prompt: &'a str,
    pub(crate) negative_prompt: &'a str,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) sample_strength: f32,
    pub(crate) image_uri: Option<&'a str>,
}

impl DraftSpec<'_> {
    /// Builds the submission body. The draft tree is serialized once here and
    /// embedded as a JSON string, the shape the generation endpoint expects.
    pub(crate) fn build(&self) -> Result<SubmitRequest, serde_json::Error> {
        let component_id = new_id();

        let (generate_type, abilities) = match self.image_uri {
            Some(uri) => ("blend", Abilities::blend(self, uri)),
            None => ("generate", Abilities::generate(self)),
        };

        let draft = Draft {
            type_: "draft",
            id: new_id(),
            min_version: DRAFT_MIN_VERSION,
            is_from_tsn: true,
            version: WEB_VERSION,
            main_component_id: component_id.clone(),
            component_list: vec![Component {
                type_: "image_base_component",
                id: component_id,
                min_version: DRAFT_MIN_VERSION,
                metadata: Metadata {
                    type_: "",
                    id: new_id(),
                    created_platform: 3,
                    created_platform_version: "",
                    created_time_in_ms: Utc::now().timestamp_millis(),
                    created_did: "",
                },
                generate_type,
                aigc_mode: "workbench",
                abilities,
            }],
        };

        // Only plain generation reports the metrics blob.
        let metrics_extra = match self.image_uri {
            Some(_) => None,
            None => Some(serde_json::to_string(&MetricsExtra::default())?),
        };

        Ok(SubmitRequest {
            extend: Extend {
                root_model: self.model.to_string(),
                template_id: String::new(),
            },
            submit_id: new_id(),
            draft_content: serde_json::to_string(&draft)?,
            metrics_extra,
        })
    }
}

/// The body of `POST /mweb/v1/aigc_draft/generate`.
#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest {
    pub(crate) extend: Extend,
    pub(crate) submit_id: String,
    pub(crate) draft_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) metrics_extra: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Extend {
    pub(crate) root_model: String,
    pub(crate) template_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsExtra {
    template_id: &'static str,
    generate_count: u32,
    prompt_source: &'static str,
    template_source: &'static str,
    last_request_id: &'static str,
    origin_request_id: &'static str,
}

impl Default for MetricsExtra {
    fn default() -> Self {
        Self {
            template_id: "",
            generate_count: 1,
            prompt_source: "custom",
            template_source: "",
            last_request_id: "",
            origin_request_id: "",
        }
    }
}

#[derive(Serialize)]
struct Draft {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    min_version: &'static str,
    is_from_tsn: bool,
    version: &'static str,
    main_component_id: String,
    component_list: Vec<Component>,
}

#[derive(Serialize)]
struct Component {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    min_version: &'static str,
    metadata: Metadata,
    generate_type: &'static str,
    aigc_mode: &'static str,
    abilities: Abilities,
}

#[derive(Serialize)]
struct Metadata {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    created_platform: u32,
    created_platform_version: &'static str,
    created_time_in_ms: i64,
    created_did: &'static str,
}

/// Exactly one of `generate`/`blend` is present per component.
#[derive(Serialize)]
struct Abilities {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    generate: Option<GenerateAbility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blend: Option<BlendAbility>,
}

impl Abilities {
    fn generate(spec: &DraftSpec<'_>) -> Self {
        Self {
            type_: "",
            id: new_id(),
            generate: Some(GenerateAbility {
                type_: "",
                id: new_id(),
                core_param: CoreParam {
                    type_: "",
                    id: new_id(),
                    model: spec.model.to_string(),
                    prompt: spec.prompt.to_string(),
                    negative_prompt: Some(spec.negative_prompt.to_string()),
                    seed: Some(rand::thread_rng().gen_range(SEED_RANGE)),
                    sample_strength: spec.sample_strength,
                    image_ratio: 1,
                    large_image_info: LargeImageInfo {
                        type_: "",
                        id: new_id(),
                        height: spec.height,
                        width: spec.width,
                        resolution_type: "1k",
                    },
                },
                history_option: HistoryOption {
                    type_: "",
                    id: new_id(),
                },
            }),
            blend: None,
        }
    }

    fn blend(spec: &DraftSpec<'_>, image_uri: &str) -> Self {
        Self {
            type_: "",
            id: new_id(),
            generate: None,
            blend: Some(BlendAbility {
                type_: "",
                id: new_id(),
                min_features: vec![],
                core_param: CoreParam {
                    type_: "",
                    id: new_id(),
                    model: spec.model.to_string(),
                    // The `##` suffix marks edit mode for the service.
                    prompt: format!("{}##", spec.prompt),
                    negative_prompt: None,
                    seed: None,
                    sample_strength: spec.sample_strength,
                    image_ratio: 1,
                    large_image_info: LargeImageInfo {
                        type_: "",
                        id: new_id(),
                        height: BLEND_CANVAS,
                        width: BLEND_CANVAS,
                        resolution_type: "1k",
                    },
                },
                ability_list: vec![EditAbility {
                    type_: "",
                    id: new_id(),
                    name: "byte_edit",
                    image_uri_list: vec![image_uri.to_string()],
                    image_list: vec![ImageRef {
                        type_: "image",
                        id: new_id(),
                        source_from: "upload",
                        platform_type: 1,
                        name: "",
                        image_uri: image_uri.to_string(),
                        width: 0,
                        height: 0,
                        format: "",
                        uri: image_uri.to_string(),
                    }],
                    strength: BYTE_EDIT_STRENGTH,
                }],
                history_option: HistoryOption {
                    type_: "",
                    id: new_id(),
                },
                prompt_placeholder_info_list: vec![PromptPlaceholder {
                    type_: "",
                    id: new_id(),
                    ability_index: 0,
                }],
                postedit_param: PostEditParam {
                    type_: "",
                    id: new_id(),
                    generate_type: 0,
                },
            }),
        }
    }
}

#[derive(Serialize)]
struct GenerateAbility {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    core_param: CoreParam,
    history_option: HistoryOption,
}

#[derive(Serialize)]
struct BlendAbility {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    min_features: Vec<String>,
    core_param: CoreParam,
    ability_list: Vec<EditAbility>,
    history_option: HistoryOption,
    prompt_placeholder_info_list: Vec<PromptPlaceholder>,
    postedit_param: PostEditParam,
}

#[derive(Serialize)]
struct CoreParam {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    sample_strength: f32,
    image_ratio: u32,
    large_image_info: LargeImageInfo,
}

#[derive(Serialize)]
struct LargeImageInfo {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    height: u32,
    width: u32,
    resolution_type: &'static str,
}

#[derive(Serialize)]
struct HistoryOption {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
}

#[derive(Serialize)]
struct EditAbility {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    name: &'static str,
    image_uri_list: Vec<String>,
    image_list: Vec<ImageRef>,
    strength: f32,
}

#[derive(Serialize)]
struct ImageRef {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    source_from: &'static str,
    platform_type: u32,
    name: &'static str,
    image_uri: String,
    width: u32,
    height: u32,
    format: &'static str,
    uri: String,
}

#[derive(Serialize)]
struct PromptPlaceholder {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    ability_index: u32,
}

#[derive(Serialize)]
struct PostEditParam {
    #[serde(rename = "type")]
    type_: &'static str,
    id: String,
    generate_type: u32,
}
