use crate::content::TextModel;
use crate::defaults;
use std::sync::Arc;
use tracing::{info, warn};

const TOPIC_PROMPT: &str = "Identify the single most compelling and discussed current events \
topic globally or in technology/business. Summarize the topic in a concise sentence. \
Do NOT add any extra text or conversation.";

/// Script plus the episode metadata derived from its topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeScript {
    pub topic: String,
    pub title: String,
    pub description: String,
    pub script: String,
}

impl EpisodeScript {
    fn new(topic: &str, script: String) -> Self {
        Self {
            topic: topic.to_string(),
            title: format!("Daily Brief: {}", topic),
            description: format!(
                "Automated briefing covering recent developments about: {}. Generated automatically.",
                topic
            ),
            script,
        }
    }
}

/// Host/Guest script prompt for `topic` at roughly `minutes` of audio.
pub fn script_prompt(topic: &str, minutes: u32) -> String {
    format!(
        "You are producing a podcast script (Host + Guest). Topic: {topic}. \
         Length target: approximately {minutes} minutes of spoken audio. \
         Structure: Intro (Host), Guest intro, 3 main points with short back-and-forth, and a closing. \
         Write natural, conversational dialogue. Mark speaker lines like 'Host:' and 'Guest:'."
    )
}

fn fallback_script(topic: &str) -> String {
    format!(
        "Host: Welcome. Today we talk about {topic}. Guest: Thanks. Let's discuss the main points..."
    )
}

/// Picks the day's topic.
pub struct TopicPicker {
    model: Option<Arc<dyn TextModel>>,
}

impl TopicPicker {
    pub fn new(model: Option<Arc<dyn TextModel>>) -> Self {
        Self { model }
    }

    /// Ask the model for a topic. Never fails; falls back to a fixed topic.
    pub async fn pick(&self) -> String {
        let Some(model) = &self.model else {
            info!(topic = defaults::FALLBACK_TOPIC, "No topic model configured");
            return defaults::FALLBACK_TOPIC.to_string();
        };

        match model.generate(TOPIC_PROMPT).await {
            Ok(text) => match clean_topic(&text) {
                Some(topic) => {
                    info!(model = model.name(), %topic, "Picked topic");
                    topic
                }
                None => {
                    warn!(model = model.name(), "Topic model returned nothing, using fallback");
                    defaults::FALLBACK_TOPIC.to_string()
                }
            },
            Err(e) => {
                warn!(model = model.name(), error = %e, "Topic lookup failed, using fallback");
                defaults::FALLBACK_TOPIC.to_string()
            }
        }
    }
}

/// First non-empty line, without surrounding quotes or a trailing period.
fn clean_topic(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let topic = line
        .trim_matches(|c| c == '"' || c == '\'' || c == '*')
        .trim_end_matches('.')
        .trim();
    (!topic.is_empty()).then(|| topic.to_string())
}

/// Writes episode scripts, trying each model in order.
pub struct ScriptGenerator {
    models: Vec<Arc<dyn TextModel>>,
    minutes: u32,
}

impl ScriptGenerator {
    pub fn new(models: Vec<Arc<dyn TextModel>>) -> Self {
        Self {
            models,
            minutes: defaults::EPISODE_MINUTES,
        }
    }

    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes = minutes.max(1);
        self
    }

    /// Generate the script for `topic`. Never fails; the last resort is a
    /// short built-in script.
    pub async fn generate(&self, topic: &str) -> EpisodeScript {
        let prompt = script_prompt(topic, self.minutes);

        for model in &self.models {
            match model.generate(&prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(model = model.name(), chars = text.len(), "Script generated");
                    return EpisodeScript::new(topic, text);
                }
                Ok(_) => warn!(model = model.name(), "Model returned an empty script"),
                Err(e) => warn!(model = model.name(), error = %e, "Script generation failed"),
            }
        }

        warn!(%topic, "All script models failed, using built-in script");
        EpisodeScript::new(topic, fallback_script(topic))
    }
}
