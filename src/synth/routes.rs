//! Capability to URL-prefix mapping for the reverse proxy.

use serde::{Deserialize, Serialize};

use crate::model::{Component, Route};

/// Routes traffic for services carrying `capability` under `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteRule {
    /// Capability tag to match.
    pub capability: String,
    /// URL prefix, e.g. `/auth`.
    pub prefix: String,
    /// Proxy with connection-upgrade headers.
    #[serde(default)]
    pub websocket: bool,
}

/// Ordered rule list; the first rule whose capability the service carries wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Builds a table, normalising prefixes to a single leading `/` and no trailing `/`.
    #[must_use]
    pub fn new(rules: Vec<RouteRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.prefix = format!("/{}", rule.prefix.trim_matches('/'));
                rule
            })
            .collect();
        Self { rules }
    }

    /// Rules in priority order.
    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// First rule matching one of the component's capabilities.
    #[must_use]
    pub fn rule_for(&self, component: &Component) -> Option<&RouteRule> {
        self.rules
            .iter()
            .find(|rule| component.has_capability(&rule.capability))
    }

    /// Route for a service named `service`: `<prefix>/<service>` when a rule
    /// matches, `/<service>` otherwise.
    #[must_use]
    pub fn route(&self, service: &str, component: &Component) -> Route {
        match self.rule_for(component) {
            Some(rule) => Route {
                path_prefix: format!("{}/{service}", rule.prefix.trim_end_matches('/')),
                target_service: service.to_string(),
                websocket: rule.websocket,
            },
            None => Route {
                path_prefix: format!("/{service}"),
                target_service: service.to_string(),
                websocket: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::service;
    use pretty_assertions::assert_eq;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteRule {
                capability: "authentication".into(),
                prefix: "auth/".into(),
                websocket: false,
            },
            RouteRule {
                capability: "realtime-communication".into(),
                prefix: "/ws".into(),
                websocket: true,
            },
        ])
    }

    #[test]
    fn first_matching_rule_wins() {
        let c = service(
            "login.py",
            &[9000],
            &["realtime-communication", "authentication"],
        );
        let route = table().route("login", &c);
        assert_eq!(route.path_prefix, "/auth/login");
        assert!(!route.websocket);
    }

    #[test]
    fn websocket_flag_follows_rule() {
        let c = service("chat.py", &[8765], &["realtime-communication"]);
        let route = table().route("chat", &c);
        assert_eq!(route.path_prefix, "/ws/chat");
        assert!(route.websocket);
    }

    #[test]
    fn unmatched_service_gets_its_own_prefix() {
        let c = service("misc.py", &[7000], &[]);
        assert_eq!(table().route("misc", &c).path_prefix, "/misc");
    }

    #[test]
    fn rules_deserialize_with_default_websocket() {
        let rules: Vec<RouteRule> =
            serde_yaml::from_str("- capability: monitoring\n  prefix: /metrics\n").unwrap();
        assert!(!rules[0].websocket);
    }
}
