//! Explicit assistant context
//!
//! Holds the configuration, the shared state store, and every collaborator
//! handle. Constructed once per process and passed to the router and the
//! listener.

use std::sync::Arc;

use crate::Result;
use crate::config::Config;
use crate::effects::EffectRunner;
use crate::integrations::{
    CameraVision, ConversationProvider, ExternalVision, KnowledgeProvider, NewsApiClient,
    NewsProvider, OpenAiConversation, OpenWeatherClient, WeatherProvider, WikipediaClient,
};
use crate::phrases::PhraseBook;
use crate::state::PersistentStateStore;
use crate::system::{AppCatalog, HostControls, Launcher, SystemControl, SystemLauncher};
use crate::voice::{ConsoleSpeaker, Speaker};

/// Everything the assistant's components share
pub struct AssistantContext {
    pub config: Arc<Config>,
    pub store: Arc<PersistentStateStore>,
    pub phrases: PhraseBook,
    pub speaker: Arc<dyn Speaker>,
    pub launcher: Arc<dyn Launcher>,
    pub controls: Arc<dyn SystemControl>,
    pub apps: AppCatalog,
    pub weather: Arc<dyn WeatherProvider>,
    pub news: Arc<dyn NewsProvider>,
    pub knowledge: Arc<dyn KnowledgeProvider>,
    pub conversation: Option<Arc<dyn ConversationProvider>>,
    pub vision: Option<Arc<dyn CameraVision>>,
    pub effects: EffectRunner,
}

impl std::fmt::Debug for AssistantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantContext")
            .field("assistant", &self.config.assistant_name)
            .field("data_dir", &self.config.data_dir)
            .field("conversation", &self.conversation.is_some())
            .field("vision", &self.vision.is_some())
            .finish_non_exhaustive()
    }
}

impl AssistantContext {
    #[must_use]
    pub fn builder(config: Config) -> ContextBuilder {
        ContextBuilder::new(config)
    }

    /// Context with every collaborator derived from `config`
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }
}

/// Assembles an [`AssistantContext`], defaulting unset collaborators
pub struct ContextBuilder {
    config: Config,
    store: Option<Arc<PersistentStateStore>>,
    speaker: Option<Arc<dyn Speaker>>,
    launcher: Option<Arc<dyn Launcher>>,
    controls: Option<Arc<dyn SystemControl>>,
    apps: Option<AppCatalog>,
    weather: Option<Arc<dyn WeatherProvider>>,
    news: Option<Arc<dyn NewsProvider>>,
    knowledge: Option<Arc<dyn KnowledgeProvider>>,
    conversation: Option<Arc<dyn ConversationProvider>>,
    vision: Option<Arc<dyn CameraVision>>,
}

impl ContextBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            speaker: None,
            launcher: None,
            controls: None,
            apps: None,
            weather: None,
            news: None,
            knowledge: None,
            conversation: None,
            vision: None,
        }
    }

    #[must_use]
    pub fn store(mut self, store: Arc<PersistentStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    #[must_use]
    pub fn launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    #[must_use]
    pub fn controls(mut self, controls: Arc<dyn SystemControl>) -> Self {
        self.controls = Some(controls);
        self
    }

    #[must_use]
    pub fn apps(mut self, apps: AppCatalog) -> Self {
        self.apps = Some(apps);
        self
    }

    #[must_use]
    pub fn weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    #[must_use]
    pub fn news(mut self, news: Arc<dyn NewsProvider>) -> Self {
        self.news = Some(news);
        self
    }

    #[must_use]
    pub fn knowledge(mut self, knowledge: Arc<dyn KnowledgeProvider>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    #[must_use]
    pub fn conversation(mut self, conversation: Arc<dyn ConversationProvider>) -> Self {
        self.conversation = Some(conversation);
        self
    }

    #[must_use]
    pub fn vision(mut self, vision: Arc<dyn CameraVision>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// # Errors
    ///
    /// Returns error if a default HTTP client cannot be built
    pub fn build(self) -> Result<AssistantContext> {
        let config = self.config;
        let integrations = &config.integrations;
        let keys = &config.api_keys;
        let phrases =
            PhraseBook::for_session(&config.assistant_name).with_overrides(&config.phrases);

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(PersistentStateStore::from_config(&config)));
        let speaker = self
            .speaker
            .unwrap_or_else(|| Arc::new(ConsoleSpeaker::new(phrases.display_name())));
        let launcher = self
            .launcher
            .unwrap_or_else(|| Arc::new(SystemLauncher::new()));
        let controls = self
            .controls
            .unwrap_or_else(|| Arc::new(HostControls::new()));
        let apps = self
            .apps
            .unwrap_or_else(|| AppCatalog::new(std::env::consts::OS, &config.apps));

        let weather: Arc<dyn WeatherProvider> = match self.weather {
            Some(weather) => weather,
            None => Arc::new(OpenWeatherClient::new(
                &integrations.weather_url,
                copy_secret(keys.openweather.as_ref()),
            )?),
        };
        let news: Arc<dyn NewsProvider> = match self.news {
            Some(news) => news,
            None => Arc::new(NewsApiClient::new(
                &integrations.news_url,
                copy_secret(keys.newsapi.as_ref()),
                &integrations.news_country,
            )?),
        };
        let knowledge: Arc<dyn KnowledgeProvider> = match self.knowledge {
            Some(knowledge) => knowledge,
            None => Arc::new(WikipediaClient::new(&integrations.knowledge_url)?),
        };

        let conversation = match self.conversation {
            Some(conversation) => Some(conversation),
            None => match &integrations.conversation_url {
                Some(url) => Some(Arc::new(OpenAiConversation::new(
                    url,
                    copy_secret(keys.conversation.as_ref()),
                    &integrations.conversation_model,
                    &phrases.display_name(),
                )?) as Arc<dyn ConversationProvider>),
                None => None,
            },
        };

        let vision = self.vision.or_else(|| {
            config
                .vision_command
                .as_deref()
                .and_then(ExternalVision::new)
                .map(|v| Arc::new(v) as Arc<dyn CameraVision>)
        });

        let effects = EffectRunner::new(Arc::clone(&launcher), Arc::clone(&speaker));

        tracing::debug!(
            assistant = %config.assistant_name,
            conversation = conversation.is_some(),
            vision = vision.is_some(),
            "assistant context built"
        );

        Ok(AssistantContext {
            config: Arc::new(config),
            store,
            phrases,
            speaker,
            launcher,
            controls,
            apps,
            weather,
            news,
            knowledge,
            conversation,
            vision,
            effects,
        })
    }
}

fn copy_secret(secret: Option<&secrecy::SecretString>) -> Option<secrecy::SecretString> {
    use secrecy::ExposeSecret;
    secret.map(|s| secrecy::SecretString::from(s.expose_secret().to_owned()))
}
