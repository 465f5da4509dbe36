use std::cell::Cell;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use contractdesk_core::{ActorId, AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Maximum stored length of an event detail message.
pub const ACTIVITY_DETAIL_MAX_LENGTH: usize = 2_000;

/// Maximum stored length of a resource title.
pub const RESOURCE_TITLE_MAX_LENGTH: usize = 300;

/// Maximum length of a changed field's name.
pub const FIELD_NAME_MAX_LENGTH: usize = 100;

/// User actions captured by the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// A page or resource was viewed.
    View,
    /// A resource was created.
    Create,
    /// A resource was modified.
    Update,
    /// A resource was soft-deleted.
    Delete,
    /// A soft-deleted resource was restored.
    Restore,
}

impl ActivityAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }

    /// Returns the past-tense verb used in activity feeds.
    #[must_use]
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::View => "Viewed",
            Self::Create => "Created",
            Self::Update => "Updated",
            Self::Delete => "Deleted",
            Self::Restore => "Restored",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ActivityAction] = &[
            ActivityAction::View,
            ActivityAction::Create,
            ActivityAction::Update,
            ActivityAction::Delete,
            ActivityAction::Restore,
        ];

        ALL
    }
}

impl FromStr for ActivityAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "restore" => Ok(Self::Restore),
            _ => Err(AppError::Validation(format!(
                "unknown activity action '{value}'"
            ))),
        }
    }
}

/// Kinds of resources an activity can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A contract.
    Contract,
    /// A client organisation.
    Client,
    /// An application user.
    User,
    /// Anything else, such as admin pages.
    Other,
}

impl ResourceType {
    /// Returns a stable storage value for this resource type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Client => "client",
            Self::User => "user",
            Self::Other => "other",
        }
    }
}

impl FromStr for ResourceType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "contract" => Ok(Self::Contract),
            "client" => Ok(Self::Client),
            "user" => Ok(Self::User),
            "other" => Ok(Self::Other),
            _ => Err(AppError::Validation(format!(
                "unknown resource type '{value}'"
            ))),
        }
    }
}

/// One field-level change captured during an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    field_name: NonEmptyString,
    old_value: Option<String>,
    new_value: Option<String>,
}

impl FieldChange {
    /// Creates a field change for a named field.
    pub fn new(
        field_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> AppResult<Self> {
        let field_name = NonEmptyString::new(field_name)?;
        if field_name.as_str().chars().count() > FIELD_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "field name must not exceed {FIELD_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self {
            field_name,
            old_value,
            new_value,
        })
    }

    /// Returns the changed field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.field_name.as_str()
    }

    /// Returns the value before the update.
    #[must_use]
    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    /// Returns the value after the update.
    #[must_use]
    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }
}

/// Network origin of the request that produced an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl ClientContext {
    /// Creates a client context, discarding blank values.
    #[must_use]
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address: non_blank(ip_address),
            user_agent: non_blank(user_agent),
        }
    }

    /// Returns the client IP address.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Returns the client user agent.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns whether neither value is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ip_address.is_none() && self.user_agent.is_none()
    }
}

/// Input payload for creating an activity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEventInput {
    /// Acting user, absent for anonymous or system events.
    pub actor_id: Option<ActorId>,
    /// Performed action.
    pub action: ActivityAction,
    /// Targeted resource kind.
    pub resource_type: ResourceType,
    /// Targeted resource identifier.
    pub resource_id: Option<i64>,
    /// Resource title at the time of the action.
    pub resource_title: Option<String>,
    /// Ordered field changes, only for updates.
    pub field_changes: Vec<FieldChange>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Optional detail, usually an error message.
    pub detail: Option<String>,
    /// Optional request origin.
    pub client_context: Option<ClientContext>,
}

impl ActivityEventInput {
    /// Creates a successful event input without field changes.
    #[must_use]
    pub fn new(action: ActivityAction, resource_type: ResourceType) -> Self {
        Self {
            actor_id: None,
            action,
            resource_type,
            resource_id: None,
            resource_title: None,
            field_changes: Vec::new(),
            success: true,
            detail: None,
            client_context: None,
        }
    }
}

/// Immutable record of one user or system action.
///
/// The timestamp is taken when the event is built on the producer side,
/// so persistence delay in the background writer never shifts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    actor_id: Option<ActorId>,
    action: ActivityAction,
    resource_type: ResourceType,
    resource_id: Option<i64>,
    resource_title: Option<String>,
    field_changes: Vec<FieldChange>,
    success: bool,
    detail: Option<String>,
    occurred_at: DateTime<Utc>,
    client_context: Option<ClientContext>,
}

thread_local! {
    static LAST_OCCURRED_AT: Cell<Option<DateTime<Utc>>> = const { Cell::new(None) };
}

/// Returns the current time, never earlier than the last value this thread observed.
fn producer_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    LAST_OCCURRED_AT.with(|last| {
        let stamped = match last.get() {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        last.set(Some(stamped));
        stamped
    })
}

impl ActivityEvent {
    /// Creates a validated event stamped with the producer's current time.
    pub fn new(input: ActivityEventInput) -> AppResult<Self> {
        Self::with_occurred_at(input, producer_timestamp())
    }

    /// Creates a validated event with an explicit timestamp.
    ///
    /// Used for imported history; regular producers call [`ActivityEvent::new`].
    pub fn with_occurred_at(
        input: ActivityEventInput,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let ActivityEventInput {
            actor_id,
            action,
            resource_type,
            resource_id,
            resource_title,
            field_changes,
            success,
            detail,
            client_context,
        } = input;

        if !field_changes.is_empty() && action != ActivityAction::Update {
            return Err(AppError::Validation(format!(
                "field changes are only allowed on update events, got '{}'",
                action.as_str()
            )));
        }

        Ok(Self {
            actor_id,
            action,
            resource_type,
            resource_id,
            resource_title: non_blank(resource_title)
                .map(|title| truncate_chars(title, RESOURCE_TITLE_MAX_LENGTH)),
            field_changes,
            success,
            detail: non_blank(detail).map(|detail| truncate_chars(detail, ACTIVITY_DETAIL_MAX_LENGTH)),
            occurred_at,
            client_context: client_context.filter(|context| !context.is_empty()),
        })
    }

    /// Returns the acting user.
    #[must_use]
    pub fn actor_id(&self) -> Option<ActorId> {
        self.actor_id
    }

    /// Returns the performed action.
    #[must_use]
    pub fn action(&self) -> ActivityAction {
        self.action
    }

    /// Returns the targeted resource kind.
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Returns the targeted resource identifier.
    #[must_use]
    pub fn resource_id(&self) -> Option<i64> {
        self.resource_id
    }

    /// Returns the resource title captured with the event.
    #[must_use]
    pub fn resource_title(&self) -> Option<&str> {
        self.resource_title.as_deref()
    }

    /// Returns the ordered field changes.
    #[must_use]
    pub fn field_changes(&self) -> &[FieldChange] {
        &self.field_changes
    }

    /// Returns whether the action succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Returns the optional detail message.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the producer-side creation timestamp.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Returns the request origin.
    #[must_use]
    pub fn client_context(&self) -> Option<&ClientContext> {
        self.client_context.as_ref()
    }
}

/// Formats a one-line activity feed message.
#[must_use]
pub fn describe_activity(
    action: ActivityAction,
    resource_type: ResourceType,
    resource_title: Option<&str>,
) -> String {
    match resource_title {
        Some(title) => format!(
            "{} {} '{title}'",
            action.past_tense(),
            resource_type.as_str()
        ),
        None => format!("{} {}", action.past_tense(), resource_type.as_str()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}

fn truncate_chars(value: String, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => value[..byte_index].to_owned(),
        None => value,
    }
}
