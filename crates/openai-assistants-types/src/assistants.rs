/// Body of `POST /assistants`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateAssistantRequest {
    model: String,

    /// System instructions the assistant follows for every run.
    instructions: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl CreateAssistantRequest {
    pub fn new(model: &str, instructions: &str) -> Self {
        Self {
            model: model.to_string(),
            instructions: instructions.to_string(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Assistant {
    id: String,
    model: String,
    #[serde(default)]
    instructions: Option<String>,
}

impl Assistant {
    pub fn new(id: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            model: model.to_string(),
            instructions: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Thread {
    id: String,
    #[serde(default)]
    created_at: i64,
}

impl Thread {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            created_at: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Reply of the `DELETE /assistants/{id}` and `DELETE /threads/{id}` calls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeletionStatus {
    id: String,
    deleted: bool,
}

impl DeletionStatus {
    pub fn new(id: &str, deleted: bool) -> Self {
        Self {
            id: id.to_string(),
            deleted,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deleted(&self) -> bool {
        self.deleted
    }
}
