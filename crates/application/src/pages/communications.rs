use std::collections::BTreeMap;

use fundline_core::AppResult;
use fundline_domain::{
    Channel, Communication, CommunicationFilter, CommunicationStatus, Direction, MessageForm,
    MessageTemplate, Page, Permission, QueryKey, RecordId, RenderedMessage, Resource,
    decode_record, normalize_search, parse_choice,
};
use serde_json::Value;

use super::PageContext;
use super::list::ListState;
use super::view::{ListView, ResourceView};
use crate::mutation::Mutation;
use crate::query_cache::QueryPolicy;

/// Communications screen with the compose modal.
pub struct CommunicationsPage {
    ctx: PageContext,
    list: ListState<CommunicationFilter>,
    policy: QueryPolicy,
}

impl CommunicationsPage {
    /// Creates the controller on page 1 with no filter.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            list: ListState::new(Resource::Communications),
            policy: QueryPolicy::list(),
        }
    }

    /// List state.
    #[must_use]
    pub fn list(&self) -> &ListState<CommunicationFilter> {
        &self.list
    }

    /// Mutable list state.
    pub fn list_mut(&mut self) -> &mut ListState<CommunicationFilter> {
        &mut self.list
    }

    /// Applies the search box.
    pub fn set_search(&mut self, raw: &str) -> bool {
        let search = normalize_search(raw);
        self.list.update_filter(|filter| filter.search = search)
    }

    /// Applies the channel dropdown.
    pub fn set_channel(&mut self, raw: &str) -> AppResult<bool> {
        let channel = parse_choice::<Channel>(raw)?;
        Ok(self.list.update_filter(|filter| filter.channel = channel))
    }

    /// Applies the delivery status dropdown.
    pub fn set_status(&mut self, raw: &str) -> AppResult<bool> {
        let status = parse_choice::<CommunicationStatus>(raw)?;
        Ok(self.list.update_filter(|filter| filter.status = status))
    }

    /// Applies the direction dropdown.
    pub fn set_direction(&mut self, raw: &str) -> AppResult<bool> {
        let direction = parse_choice::<Direction>(raw)?;
        Ok(self.list.update_filter(|filter| filter.direction = direction))
    }

    /// Loads the current page.
    pub async fn load(&mut self) -> ListView<Communication> {
        self.list.load(&self.ctx, &self.policy).await
    }

    /// Stored templates, cached as reference data.
    pub async fn templates(&self) -> ResourceView<Vec<MessageTemplate>> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::Templates), &QueryPolicy::reference())
            .await;
        ResourceView::decode_with(&snapshot, |value| {
            Page::from_value(value, Resource::Templates.collection_field()).map(|page| page.items)
        })
    }

    /// Renders `template` and copies the result into `form`.
    ///
    /// The form is left untouched when a placeholder has no value.
    pub fn apply_template(
        &self,
        form: &mut MessageForm,
        template: &MessageTemplate,
        values: &BTreeMap<String, String>,
    ) -> AppResult<RenderedMessage> {
        let rendered = template.render(values)?;
        if let Some(subject) = &rendered.subject {
            form.subject.clone_from(subject);
        }
        form.body.clone_from(&rendered.body);
        form.template_id = template.id.to_string();
        if form.channel.trim().is_empty()
            && let Some(channel) = &template.channel
        {
            form.channel.clone_from(channel);
        }
        Ok(rendered)
    }

    /// Validates and sends a message, then closes the compose modal.
    pub async fn send(&mut self, form: &MessageForm) -> AppResult<Communication> {
        let message = form.validate()?;
        let value = self
            .ctx
            .mutate(
                &Permission::write(Resource::Communications),
                Mutation::post(Resource::Communications, "/communications/send", &message)?,
            )
            .await?;
        self.list.close_modal();
        self.ctx.confirm(&format!("{} sent", channel_label(message.channel)));
        decode_communication(&self.ctx, &value)
    }

    /// Saves the compose form as a draft; only the channel is required.
    pub async fn save_draft(&mut self, form: &MessageForm) -> AppResult<Communication> {
        let message = form.validate_draft()?;
        let value = self
            .ctx
            .mutate(
                &Permission::write(Resource::Communications),
                Mutation::post(Resource::Communications, "/communications/draft", &message)?,
            )
            .await?;
        self.list.close_modal();
        self.ctx.confirm("Draft saved");
        decode_communication(&self.ctx, &value)
    }

    /// Deletes a log entry.
    pub async fn delete(&mut self, id: &RecordId) -> AppResult<()> {
        self.ctx
            .mutate(
                &Permission::write(Resource::Communications),
                Mutation::delete(Resource::Communications, format!("/communications/{id}")),
            )
            .await?;
        self.list.forget(id);
        Ok(())
    }
}

fn channel_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Email => "Email",
        Channel::Sms => "SMS",
        Channel::PhoneCall => "Call",
        Channel::Letter => "Letter",
    }
}

fn decode_communication(ctx: &PageContext, value: &Value) -> AppResult<Communication> {
    decode_record(value, "communication").map_err(|error| ctx.decode_failure(error))
}
