use fundline_core::{AppError, AppResult};
use fundline_domain::{
    AgentSetting, AgentSettingUpdate, MutationAck, Page, Permission, QueryKey, QueryParams,
    REQUIRED_FIELDS_MESSAGE, Resource, Setting, SettingUpdate, SettingsCategory,
    default_settings_categories,
};
use serde_json::Value;
use tracing::warn;

use super::view::ResourceView;
use super::{PageContext, decode_ack};
use crate::client_ports::{HttpMethod, HttpRequest};
use crate::mutation::Mutation;
use crate::query_cache::QueryPolicy;

const PLACEHOLDER_MESSAGE: &str =
    "Settings could not be loaded; defaults are shown and cannot be edited.";

/// Rendered settings categories.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsView {
    /// Categories in display order.
    pub categories: Vec<SettingsCategory>,
    /// Categories are built-in defaults, not the live configuration.
    pub is_placeholder: bool,
    /// Last failure.
    pub error: Option<AppError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AgentSettingsFilter {
    agent_type: Option<String>,
}

impl QueryParams for AgentSettingsFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        self.agent_type
            .iter()
            .map(|agent_type| ("agent_type", agent_type.clone()))
            .collect()
    }
}

/// Settings screen.
pub struct SettingsPage {
    ctx: PageContext,
    policy: QueryPolicy,
    showing_placeholder: bool,
}

impl SettingsPage {
    /// Creates the controller.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            policy: QueryPolicy::reference(),
            showing_placeholder: false,
        }
    }

    /// Loads all categories, falling back to marked defaults when the
    /// backend cannot serve them.
    pub async fn categories(&mut self) -> SettingsView {
        let placeholder = serde_json::to_value(default_settings_categories())
            .unwrap_or(Value::Array(Vec::new()));
        let snapshot = self
            .ctx
            .cache()
            .fetch_with_fallback(&QueryKey::root(Resource::Settings), &self.policy, placeholder)
            .await;
        self.showing_placeholder = snapshot.is_placeholder;

        let decoded = snapshot.map_data(|value| {
            Page::<SettingsCategory>::from_value(value, Resource::Settings.collection_field())
        });
        let (mut categories, decode_error) = match decoded {
            Ok(page) => (page.map(|page| page.items).unwrap_or_default(), None),
            Err(error) => (Vec::new(), Some(error)),
        };
        categories.sort_by_key(|category| category.sort_order);

        SettingsView {
            categories,
            is_placeholder: snapshot.is_placeholder,
            error: decode_error.or(snapshot.error),
        }
    }

    /// Loads one category by machine name.
    pub async fn category(&self, name: &str) -> ResourceView<SettingsCategory> {
        let key = QueryKey::build(Resource::Settings, format!("/settings/category/{name}"), &());
        let snapshot = self.ctx.cache().read(&key, &self.policy).await;
        ResourceView::from_snapshot(&snapshot)
    }

    /// Validates and stores a new value for `setting`.
    ///
    /// Refused while placeholder categories are shown.
    pub async fn update_setting(&self, setting: &Setting, value: &Value) -> AppResult<MutationAck> {
        self.ensure_live()?;
        let value = setting.validate_value(value)?;
        let body = SettingUpdate { value };
        let response = self
            .ctx
            .mutate(
                &Permission::admin(Resource::Settings),
                Mutation::put(
                    Resource::Settings,
                    format!("/settings/setting/{}", setting.id),
                    &body,
                )?,
            )
            .await?;

        if setting.requires_restart {
            warn!(key = %setting.key, "setting changed; backend restart required");
        }
        self.acknowledge(&response, &format!("{} saved", setting.label()))
    }

    /// Per-agent overrides, optionally for one agent type.
    pub async fn agent_settings(&self, agent_type: Option<&str>) -> ResourceView<Vec<AgentSetting>> {
        let filter = AgentSettingsFilter {
            agent_type: agent_type.map(str::to_owned),
        };
        let key = QueryKey::build(Resource::Settings, "/settings/agents", &filter);
        let snapshot = self.ctx.cache().read(&key, &self.policy).await;
        ResourceView::decode_with(&snapshot, |value| {
            Page::from_value(value, "settings").map(|page| page.items)
        })
    }

    /// Creates or replaces an agent override.
    pub async fn update_agent_setting(
        &self,
        agent_type: &str,
        setting_key: &str,
        value: Value,
        is_enabled: bool,
    ) -> AppResult<MutationAck> {
        if agent_type.trim().is_empty() || setting_key.trim().is_empty() {
            return Err(AppError::Validation(
                REQUIRED_FIELDS_MESSAGE.to_owned(),
            ));
        }

        let body = AgentSettingUpdate { value, is_enabled };
        let response = self
            .ctx
            .mutate(
                &Permission::admin(Resource::Settings),
                Mutation::put(
                    Resource::Settings,
                    format!("/settings/agents/{agent_type}/{setting_key}"),
                    &body,
                )?,
            )
            .await?;
        self.acknowledge(&response, "Agent setting saved")
    }

    /// Removes an agent override.
    pub async fn delete_agent_setting(
        &self,
        agent_type: &str,
        setting_key: &str,
    ) -> AppResult<MutationAck> {
        let response = self
            .ctx
            .mutate(
                &Permission::admin(Resource::Settings),
                Mutation::delete(
                    Resource::Settings,
                    format!("/settings/agents/{agent_type}/{setting_key}"),
                ),
            )
            .await?;
        self.acknowledge(&response, "Agent setting deleted")
    }

    /// Restores defaults for one category, or for everything.
    pub async fn reset_to_defaults(&self, category: Option<&str>) -> AppResult<MutationAck> {
        self.ensure_live()?;
        let query = category
            .map(|name| vec![("category_name".to_owned(), name.to_owned())])
            .unwrap_or_default();
        let request =
            HttpRequest::new(HttpMethod::Post, "/settings/reset-to-defaults").with_query(query);
        let response = self
            .ctx
            .mutate(
                &Permission::admin(Resource::Settings),
                Mutation::new(Resource::Settings, request),
            )
            .await?;
        self.acknowledge(&response, "Settings reset to defaults")
    }

    fn ensure_live(&self) -> AppResult<()> {
        if self.showing_placeholder {
            return Err(AppError::Validation(PLACEHOLDER_MESSAGE.to_owned()));
        }
        Ok(())
    }

    fn acknowledge(&self, response: &Value, fallback: &str) -> AppResult<MutationAck> {
        let ack = decode_ack(response).map_err(|error| self.ctx.decode_failure(error))?;
        self.ctx
            .confirm(ack.message.as_deref().unwrap_or(fallback));
        Ok(ack)
    }
}
