use contractdesk_core::{ActorId, AppError, AppResult};
use contractdesk_domain::{
    ActivityAction, ActivityEvent, ActivityEventInput, ClientContext, ResourceType, diff_fields,
};
use serde_json::{Map, Value};
use tracing::warn;

use crate::activity_writer::ActivityQueue;

/// Request-scoped data captured by the web layer for activity events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestActivityContext {
    /// Authenticated user, absent for anonymous requests.
    pub actor_id: Option<ActorId>,
    /// Request origin.
    pub client_context: Option<ClientContext>,
}

impl RequestActivityContext {
    /// Creates a context for an authenticated user.
    #[must_use]
    pub fn for_actor(actor_id: ActorId, client_context: ClientContext) -> Self {
        Self {
            actor_id: Some(actor_id),
            client_context: Some(client_context),
        }
    }

    /// Creates a context for background or anonymous work.
    #[must_use]
    pub fn system() -> Self {
        Self::default()
    }
}

/// Resource targeted by an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Resource kind.
    pub resource_type: ResourceType,
    /// Resource identifier, absent for listings and admin pages.
    pub resource_id: Option<i64>,
    /// Human-readable title at the time of the action.
    pub title: Option<String>,
}

impl ResourceRef {
    /// References a single resource.
    #[must_use]
    pub fn new(resource_type: ResourceType, resource_id: i64) -> Self {
        Self {
            resource_type,
            resource_id: Some(resource_id),
            title: None,
        }
    }

    /// References a page or listing without a single target.
    #[must_use]
    pub fn page(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            resource_id: None,
            title: None,
        }
    }

    /// Attaches the resource title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Builds activity events at request boundaries and hands them to the writer.
///
/// Every method returns without waiting on the log store and never fails;
/// an event that cannot be built is reported through `tracing` and skipped.
#[derive(Clone)]
pub struct ActivityRecorder {
    queue: ActivityQueue,
}

impl ActivityRecorder {
    /// Creates a recorder that feeds the given writer queue.
    #[must_use]
    pub fn new(queue: ActivityQueue) -> Self {
        Self { queue }
    }

    /// Records a successful action.
    pub fn record(
        &self,
        context: &RequestActivityContext,
        action: ActivityAction,
        resource: ResourceRef,
    ) {
        self.submit(build_input(context, action, resource));
    }

    /// Records a failed action with its error message.
    pub fn record_failure(
        &self,
        context: &RequestActivityContext,
        action: ActivityAction,
        resource: ResourceRef,
        error: &AppError,
    ) {
        let mut input = build_input(context, action, resource);
        input.success = false;
        input.detail = Some(error.to_string());
        self.submit(input);
    }

    /// Records the outcome of a handler result.
    pub fn record_outcome<T>(
        &self,
        context: &RequestActivityContext,
        action: ActivityAction,
        resource: ResourceRef,
        outcome: &AppResult<T>,
    ) {
        match outcome {
            Ok(_) => self.record(context, action, resource),
            Err(error) => self.record_failure(context, action, resource, error),
        }
    }

    /// Records an update with the tracked fields that differ between snapshots.
    ///
    /// Call before `prior` is overwritten by the new state.
    pub fn record_update(
        &self,
        context: &RequestActivityContext,
        resource: ResourceRef,
        prior: &Map<String, Value>,
        current: &Map<String, Value>,
        tracked_fields: &[&str],
    ) {
        let field_changes = match diff_fields(prior, current, tracked_fields) {
            Ok(field_changes) => field_changes,
            Err(error) => {
                warn!(
                    error = %error,
                    resource_type = resource.resource_type.as_str(),
                    resource_id = ?resource.resource_id,
                    "failed to diff fields for activity event"
                );
                Vec::new()
            }
        };

        let mut input = build_input(context, ActivityAction::Update, resource);
        input.field_changes = field_changes;
        self.submit(input);
    }

    fn submit(&self, input: ActivityEventInput) {
        let action = input.action;
        let resource_type = input.resource_type;

        match ActivityEvent::new(input) {
            Ok(event) => self.queue.enqueue(event),
            Err(error) => warn!(
                error = %error,
                event_action = action.as_str(),
                resource_type = resource_type.as_str(),
                "skipping invalid activity event"
            ),
        }
    }
}

fn build_input(
    context: &RequestActivityContext,
    action: ActivityAction,
    resource: ResourceRef,
) -> ActivityEventInput {
    let mut input = ActivityEventInput::new(action, resource.resource_type);
    input.actor_id = context.actor_id;
    input.resource_id = resource.resource_id;
    input.resource_title = resource.title;
    input.client_context = context.client_context.clone();
    input
}
