//! File-backed scene tree used by the older frontend.
//!
//! Scenes form a binary tree keyed by id: the children of scene `n` are
//! `2n + 1` and `2n + 2`. Each scene is stored as `{id}.json` next to its
//! background art `{id}.jpg` in a directory that must already exist.
use crate::background::BackgroundRequester;
use crate::error::{Result, StoryError};
use crate::generic_types::CompletionRequest;
use crate::prompts::Prompts;
use crate::provider::StoryProvider;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_BRANCH_MODEL: &str = "gpt-4o";
const BRANCH_COUNT: usize = 2;

/// The record written for each generated child scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedScene {
    pub scene_id: u64,
    pub parent_scene_id: u64,
    pub choice: String,
    pub description: String,
    /// File name of the background image, relative to the archive directory.
    pub background: String,
    pub background_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BranchPlan {
    branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    choice: String,
    description: String,
}

pub struct SceneArchive {
    root: PathBuf,
    provider: Arc<dyn StoryProvider>,
    prompts: Arc<Prompts>,
    images: BackgroundRequester,
    chat_model: String,
}

impl SceneArchive {
    pub fn new(root: impl Into<PathBuf>, provider: Arc<dyn StoryProvider>, prompts: Arc<Prompts>) -> Self {
        Self {
            root: root.into(),
            images: BackgroundRequester::new(provider.clone()),
            provider,
            prompts,
            chat_model: DEFAULT_BRANCH_MODEL.to_string(),
        }
    }

    pub fn with_chat_model(mut self, model: &str) -> Self {
        self.chat_model = model.to_string();
        self
    }

    pub fn with_image_model(mut self, model: &str) -> Self {
        self.images = self.images.with_model(model);
        self
    }

    /// Reads a stored scene as it was written.
    pub async fn load(&self, scene_id: u64) -> Result<serde_json::Value> {
        let path = self.scene_path(scene_id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoryError::SceneNotFound(scene_id)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| {
            StoryError::Storage(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {}", path.display(), e),
            ))
        })
    }

    /// Plans two continuations of `scene_id`, renders their backgrounds and
    /// stores both children. Returns the records in child order.
    pub async fn generate_branches(&self, scene_id: u64, description: &str) -> Result<Vec<ArchivedScene>> {
        if description.trim().is_empty() {
            return Err(StoryError::MissingField("description"));
        }
        let children = child_ids(scene_id)?;
        if !tokio::fs::try_exists(&self.root).await? {
            return Err(StoryError::Storage(io::Error::new(
                io::ErrorKind::NotFound,
                format!("scene directory {} does not exist", self.root.display()),
            )));
        }

        let branches = self.plan_branches(description).await?;

        let mut scenes = Vec::with_capacity(BRANCH_COUNT);
        for (child_id, branch) in children.into_iter().zip(branches) {
            let background_url = self.images.image_url(&branch.description).await?;
            let image = self.provider.download(&background_url).await?;

            let background = format!("{}.jpg", child_id);
            tokio::fs::write(self.root.join(&background), &image).await?;

            let scene = ArchivedScene {
                scene_id: child_id,
                parent_scene_id: scene_id,
                choice: branch.choice,
                description: branch.description,
                background,
                background_url,
            };
            let json = serde_json::to_vec_pretty(&scene)
                .map_err(|e| StoryError::Storage(io::Error::new(io::ErrorKind::InvalidData, e)))?;
            tokio::fs::write(self.scene_path(child_id), json).await?;

            tracing::info!("stored scene {} (branch of {})", child_id, scene_id);
            scenes.push(scene);
        }
        Ok(scenes)
    }

    async fn plan_branches(&self, description: &str) -> Result<Vec<Branch>> {
        let request = CompletionRequest {
            model: self.chat_model.clone(),
            system: self.prompts.branch_choices().to_string(),
            user: format!("Current scene: {}", description),
            temperature: None,
            json_object: true,
        };
        let raw = self.provider.complete(request).await?;

        let plan: BranchPlan =
            serde_json::from_str(raw.trim()).map_err(|e| StoryError::malformed(e.to_string(), &raw))?;
        if plan.branches.len() != BRANCH_COUNT {
            return Err(StoryError::malformed(
                format!("expected {} branches, got {}", BRANCH_COUNT, plan.branches.len()),
                &raw,
            ));
        }
        if plan
            .branches
            .iter()
            .any(|b| b.choice.trim().is_empty() || b.description.trim().is_empty())
        {
            return Err(StoryError::malformed("branch choice and description must not be blank", &raw));
        }
        Ok(plan.branches)
    }

    fn scene_path(&self, scene_id: u64) -> PathBuf {
        self.root.join(format!("{}.json", scene_id))
    }
}

fn child_ids(scene_id: u64) -> Result<[u64; BRANCH_COUNT]> {
    let left = scene_id.checked_mul(2).and_then(|n| n.checked_add(1));
    let right = scene_id.checked_mul(2).and_then(|n| n.checked_add(2));
    match (left, right) {
        (Some(left), Some(right)) => Ok([left, right]),
        _ => Err(StoryError::Storage(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("scene {} has no room for children", scene_id),
        ))),
    }
}
