//! Per-principal resource scopes.
//!
//! Topic layout:
//!
//! | Topic                      | Published by | Consumed by |
//! |----------------------------|--------------|-------------|
//! | `v1/{device}/tasks`        | scheduler    | device      |
//! | `v1/@devices/{service}`    | scheduler    | devices     |
//! | `v1/@cloud/task_responses` | devices      | scheduler   |
//! | `v1/@cloud`                | devices      | scheduler   |

use crate::policy::resource::{ArnContext, ResourceKind, ResourcePattern};
use crate::principal::Principal;

const VERSION_SEGMENT: &str = "v1";
const DEVICES_SEGMENT: &str = "@devices";
const CLOUD_SEGMENT: &str = "@cloud";
const TASKS_SEGMENT: &str = "tasks";
const TASK_RESPONSES_SEGMENT: &str = "task_responses";

/// Broker action a statement allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    Subscribe,
    Receive,
    Publish,
}

impl Action {
    /// Policy action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Connect => "iot:Connect",
            Action::Subscribe => "iot:Subscribe",
            Action::Receive => "iot:Receive",
            Action::Publish => "iot:Publish",
        }
    }
}

/// Allow statement: one action over rendered resource ARNs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeStatement {
    pub action: Action,
    pub resources: Vec<String>,
}

/// Ordered allow statements granted to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    statements: Vec<ScopeStatement>,
}

impl ResourceScope {
    pub fn statements(&self) -> &[ScopeStatement] {
        &self.statements
    }

    /// Resources allowed for an action, empty if the action is not granted.
    pub fn resources_for(&self, action: Action) -> &[String] {
        self.statements
            .iter()
            .find(|s| s.action == action)
            .map(|s| s.resources.as_slice())
            .unwrap_or_default()
    }
}

/// Builds the resource scope for a principal. Pure: no I/O, no failure.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    /// Group for scheduler shared subscriptions.
    shared_group: String,
}

impl PolicyBuilder {
    pub fn new(shared_group: String) -> Self {
        Self { shared_group }
    }

    pub fn build(&self, principal: &Principal, context: &ArnContext) -> ResourceScope {
        let statements = match principal {
            Principal::Device { id } => device_statements(id),
            Principal::Service { client_id } => self.service_statements(client_id),
        };

        tracing::debug!(
            target: "authz.policy",
            principal_kind = principal.kind(),
            statement_count = statements.len(),
            "Policy built"
        );

        ResourceScope {
            statements: statements
                .into_iter()
                .map(|(action, patterns)| ScopeStatement {
                    action,
                    resources: patterns.iter().map(|p| p.render(context)).collect(),
                })
                .collect(),
        }
    }

    fn service_statements(&self, client_id: &str) -> Vec<(Action, Vec<ResourcePattern>)> {
        let group = self.shared_group.as_str();
        // Each cloud topic unscoped and under the shared-subscription prefix
        let cloud_topics = |kind: ResourceKind| {
            vec![
                cloud_task_responses(kind),
                cloud_task_responses(kind).shared(group),
                cloud_messages(kind),
                cloud_messages(kind).shared(group),
            ]
        };

        vec![
            (Action::Connect, vec![ResourcePattern::client(client_id)]),
            (Action::Subscribe, cloud_topics(ResourceKind::TopicFilter)),
            (Action::Receive, cloud_topics(ResourceKind::Topic)),
            (
                Action::Publish,
                vec![
                    ResourcePattern::new(ResourceKind::Topic)
                        .literal(VERSION_SEGMENT)
                        .any()
                        .literal(TASKS_SEGMENT),
                    ResourcePattern::new(ResourceKind::Topic)
                        .literal(VERSION_SEGMENT)
                        .literal(DEVICES_SEGMENT)
                        .any(),
                ],
            ),
        ]
    }
}

fn device_statements(device_id: &str) -> Vec<(Action, Vec<ResourcePattern>)> {
    let device_topics = |kind: ResourceKind| {
        vec![
            ResourcePattern::new(kind)
                .literal(VERSION_SEGMENT)
                .literal(device_id)
                .literal(TASKS_SEGMENT),
            ResourcePattern::new(kind)
                .literal(VERSION_SEGMENT)
                .literal(DEVICES_SEGMENT)
                .single_level(),
        ]
    };

    vec![
        (Action::Connect, vec![ResourcePattern::client(device_id)]),
        (Action::Subscribe, device_topics(ResourceKind::TopicFilter)),
        (Action::Receive, device_topics(ResourceKind::Topic)),
        (
            Action::Publish,
            vec![
                cloud_task_responses(ResourceKind::Topic),
                cloud_messages(ResourceKind::Topic),
            ],
        ),
    ]
}

fn cloud_task_responses(kind: ResourceKind) -> ResourcePattern {
    ResourcePattern::new(kind)
        .literal(VERSION_SEGMENT)
        .literal(CLOUD_SEGMENT)
        .literal(TASK_RESPONSES_SEGMENT)
}

fn cloud_messages(kind: ResourceKind) -> ResourcePattern {
    ResourcePattern::new(kind)
        .literal(VERSION_SEGMENT)
        .literal(CLOUD_SEGMENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SCHEDULER_CLIENT: &str = "bebc5cbf-acc0-431f-8c4e-c582dc2489e2-abc123";

    fn context() -> ArnContext {
        ArnContext::new("us-west-2", "11111122222")
    }

    fn builder() -> PolicyBuilder {
        PolicyBuilder::new("krypton".to_string())
    }

    fn arn(rest: &str) -> String {
        format!("arn:aws:iot:us-west-2:11111122222:{rest}")
    }

    #[test]
    fn test_statement_order() {
        let scope = builder().build(
            &Principal::Device {
                id: "d1".to_string(),
            },
            &context(),
        );

        let actions: Vec<Action> = scope.statements().iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Connect,
                Action::Subscribe,
                Action::Receive,
                Action::Publish
            ]
        );
    }

    #[test]
    fn test_device_scope() {
        let scope = builder().build(
            &Principal::Device {
                id: "d1".to_string(),
            },
            &context(),
        );

        assert_eq!(scope.resources_for(Action::Connect), [arn("client/d1")]);
        assert_eq!(
            scope.resources_for(Action::Subscribe),
            [
                arn("topicfilter/v1/d1/tasks"),
                arn("topicfilter/v1/@devices/+")
            ]
        );
        assert_eq!(
            scope.resources_for(Action::Receive),
            [arn("topic/v1/d1/tasks"), arn("topic/v1/@devices/+")]
        );
        assert_eq!(
            scope.resources_for(Action::Publish),
            [arn("topic/v1/@cloud/task_responses"), arn("topic/v1/@cloud")]
        );
    }

    #[test]
    fn test_service_scope() {
        let scope = builder().build(
            &Principal::Service {
                client_id: SCHEDULER_CLIENT.to_string(),
            },
            &context(),
        );

        assert_eq!(
            scope.resources_for(Action::Connect),
            [arn(&format!("client/{SCHEDULER_CLIENT}"))]
        );
        assert_eq!(
            scope.resources_for(Action::Subscribe),
            [
                arn("topicfilter/v1/@cloud/task_responses"),
                arn("topicfilter/$share/krypton/v1/@cloud/task_responses"),
                arn("topicfilter/v1/@cloud"),
                arn("topicfilter/$share/krypton/v1/@cloud"),
            ]
        );
        assert_eq!(
            scope.resources_for(Action::Receive),
            [
                arn("topic/v1/@cloud/task_responses"),
                arn("topic/$share/krypton/v1/@cloud/task_responses"),
                arn("topic/v1/@cloud"),
                arn("topic/$share/krypton/v1/@cloud"),
            ]
        );
        assert_eq!(
            scope.resources_for(Action::Publish),
            [arn("topic/v1/*/tasks"), arn("topic/v1/@devices/*")]
        );
    }

    #[test]
    fn test_shared_group_is_configurable() {
        let scope = PolicyBuilder::new("workers".to_string()).build(
            &Principal::Service {
                client_id: SCHEDULER_CLIENT.to_string(),
            },
            &context(),
        );

        assert!(scope
            .resources_for(Action::Subscribe)
            .contains(&arn("topicfilter/$share/workers/v1/@cloud")));
    }

    #[test]
    fn test_build_is_deterministic() {
        let principal = Principal::Device {
            id: "d4a8cd9a-be0e-4e71-b1b5-91d0226dad0d".to_string(),
        };

        let first = builder().build(&principal, &context());
        let second = builder().build(&principal, &context());

        assert_eq!(first, second);
    }

    #[test]
    fn test_device_id_cannot_widen_scope() {
        let scope = builder().build(
            &Principal::Device {
                id: "*".to_string(),
            },
            &context(),
        );

        assert_eq!(scope.resources_for(Action::Connect), [arn("client/${*}")]);
        assert_eq!(
            scope.resources_for(Action::Receive).first().map(String::as_str),
            Some(arn("topic/v1/${*}/tasks").as_str())
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Connect.as_str(), "iot:Connect");
        assert_eq!(Action::Subscribe.as_str(), "iot:Subscribe");
        assert_eq!(Action::Receive.as_str(), "iot:Receive");
        assert_eq!(Action::Publish.as_str(), "iot:Publish");
    }
}
