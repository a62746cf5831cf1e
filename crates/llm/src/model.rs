#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl Model {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), id)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

pub fn default_gemini_models() -> Vec<Model> {
    vec![
        Model::from_id(DEFAULT_GEMINI_MODEL).with_description("Fast conversational default"),
        Model::from_id("gemini-3-pro-preview").with_description("Higher quality, slower replies"),
        Model::from_id("gemini-2.5-flash").with_description("Stable flash model"),
    ]
}
