use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A model identifier understood by the completion endpoint.
///
/// This can be a model the client knows about or any other string the
/// endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model identifiers.
    Known(KnownModel),

    /// Any other model identifier.
    Custom(String),
}

/// Models from the hosted catalogue that the client names directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Llama 3.3 70B, the default.
    #[serde(rename = "llama-3.3-70b-versatile")]
    Llama3370bVersatile,

    /// Llama 3.1 8B.
    #[serde(rename = "llama-3.1-8b-instant")]
    Llama318bInstant,

    /// GPT-OSS 120B.
    #[serde(rename = "openai/gpt-oss-120b")]
    GptOss120b,

    /// GPT-OSS 20B.
    #[serde(rename = "openai/gpt-oss-20b")]
    GptOss20b,

    /// Qwen 3 32B.
    #[serde(rename = "qwen/qwen3-32b")]
    Qwen332b,

    /// DeepSeek R1 distilled onto Llama 70B.
    #[serde(rename = "deepseek-r1-distill-llama-70b")]
    DeepseekR1DistillLlama70b,
}

impl KnownModel {
    /// Every known model, in catalogue order.
    pub const ALL: [KnownModel; 6] = [
        KnownModel::Llama3370bVersatile,
        KnownModel::Llama318bInstant,
        KnownModel::GptOss120b,
        KnownModel::GptOss20b,
        KnownModel::Qwen332b,
        KnownModel::DeepseekR1DistillLlama70b,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Llama3370bVersatile => "llama-3.3-70b-versatile",
            KnownModel::Llama318bInstant => "llama-3.1-8b-instant",
            KnownModel::GptOss120b => "openai/gpt-oss-120b",
            KnownModel::GptOss20b => "openai/gpt-oss-20b",
            KnownModel::Qwen332b => "qwen/qwen3-32b",
            KnownModel::DeepseekR1DistillLlama70b => "deepseek-r1-distill-llama-70b",
        }
    }

    /// True for models that accept a `reasoning_format`.
    pub fn is_reasoning(&self) -> bool {
        matches!(
            self,
            KnownModel::GptOss120b
                | KnownModel::GptOss20b
                | KnownModel::Qwen332b
                | KnownModel::DeepseekR1DistillLlama70b
        )
    }
}

impl Model {
    /// True when the model is known to accept a `reasoning_format`.
    pub fn is_reasoning(&self) -> bool {
        match self {
            Model::Known(known) => known.is_reasoning(),
            Model::Custom(_) => false,
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Llama3370bVersatile)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == s)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}
