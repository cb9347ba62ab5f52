//! Descriptive metadata of a model.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GENERATION_TOOL: &str = concat!("fmuvars ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Also used as the model identifier.
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub copyright: Option<String>,
    pub license: Option<String>,
    /// Ties a description to the instances created from it.
    pub instantiation_token: Uuid,
    pub generation_tool: String,
    pub generation_date: DateTime<Utc>,
}

impl ModelMetadata {
    /// Metadata with a fresh token, generated now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            author: None,
            version: None,
            copyright: None,
            license: None,
            instantiation_token: Uuid::new_v4(),
            generation_tool: GENERATION_TOOL.to_string(),
            generation_date: Utc::now().trunc_subsecs(0),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into());
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// Fix the token and generation date, for reproducible descriptions.
    pub fn pinned(mut self, token: Uuid, date: DateTime<Utc>) -> Self {
        self.instantiation_token = token;
        self.generation_date = date.trunc_subsecs(0);
        self
    }

    /// Generation date in ISO 8601 with seconds precision.
    pub fn generation_date_string(&self) -> String {
        self.generation_date
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

/// Name of a type without its module path, used as the default model name.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
