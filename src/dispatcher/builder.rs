// ABOUTME: Builder that wires the radio and policy collaborators into a running dispatcher
// ABOUTME: Unset collaborators fall back to headless defaults: no IMS, deny prompts, no country

use crate::dispatcher::GsmSmsDispatcher;
use crate::dispatcher::config::DispatcherConfig;
use crate::dispatcher::confirm::{DenyAllPrompt, UserPrompt};
use crate::dispatcher::engine::{Collaborators, Engine};
use crate::dispatcher::looper::Looper;
use crate::ims::{ImsGate, NoImsGate};
use crate::policy::{
    BlockedNumberNotifier, BlockedNumberProvider, CountryDetector, EnvProperties,
    NoCountryDetector, NoopBlockedNumberProvider, PropertySource,
};
use crate::radio::{RadioInterface, StatusSink};
use std::sync::Arc;

/// Builder for [`GsmSmsDispatcher`]
///
/// ```rust,no_run
/// use gsm_sms::dispatcher::{DispatcherBuilder, DispatcherConfig};
/// # use gsm_sms::radio::RadioInterface;
/// # use std::sync::Arc;
/// # async fn example(radio: Arc<dyn RadioInterface>) {
/// let dispatcher = DispatcherBuilder::new(radio)
///     .with_config(DispatcherConfig::default().with_sub_id(1))
///     .build();
/// # }
/// ```
pub struct DispatcherBuilder {
    radio: Arc<dyn RadioInterface>,
    config: DispatcherConfig,
    ims: Arc<dyn ImsGate>,
    prompt: Arc<dyn UserPrompt>,
    country_detector: Arc<dyn CountryDetector>,
    properties: Arc<dyn PropertySource>,
    blocked_numbers: Arc<dyn BlockedNumberProvider>,
}

impl DispatcherBuilder {
    pub fn new(radio: Arc<dyn RadioInterface>) -> Self {
        Self {
            radio,
            config: DispatcherConfig::default(),
            ims: Arc::new(NoImsGate),
            prompt: Arc::new(DenyAllPrompt),
            country_detector: Arc::new(NoCountryDetector),
            properties: Arc::new(EnvProperties),
            blocked_numbers: Arc::new(NoopBlockedNumberProvider),
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ims_gate(mut self, ims: Arc<dyn ImsGate>) -> Self {
        self.ims = ims;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn UserPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_country_detector(mut self, detector: Arc<dyn CountryDetector>) -> Self {
        self.country_detector = detector;
        self
    }

    pub fn with_properties(mut self, properties: Arc<dyn PropertySource>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_blocked_number_provider(mut self, provider: Arc<dyn BlockedNumberProvider>) -> Self {
        self.blocked_numbers = provider;
        self
    }

    /// Register with the radio and start the loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> GsmSmsDispatcher {
        let (handler, looper) = Looper::new();
        let notifier = BlockedNumberNotifier::new(self.blocked_numbers);

        self.radio.set_on_sms_status(StatusSink::new(handler.clone()));

        let deps = Collaborators {
            radio: self.radio,
            ims: self.ims,
            prompt: self.prompt,
            country_detector: self.country_detector,
            properties: self.properties,
            notifier: notifier.clone(),
        };
        let engine = Engine::new(self.config, deps, handler.clone(), looper);
        let task = tokio::spawn(engine.run());

        GsmSmsDispatcher::new(handler, notifier, task)
    }
}
