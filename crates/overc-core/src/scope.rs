use std::fmt;
use thiserror::Error;
use urlencoding::encode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("route names both server {server_id} and service {service_id}")]
    Conflicting {
        server_id: String,
        service_id: String,
    },
}

/// Route parameters a view is opened with. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub server_id: Option<String>,
    pub service_id: Option<String>,
}

impl RouteParams {
    pub fn fleet() -> Self {
        Self::default()
    }

    pub fn server(server_id: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            service_id: None,
        }
    }

    pub fn service(service_id: impl Into<String>) -> Self {
        Self {
            server_id: None,
            service_id: Some(service_id.into()),
        }
    }
}

/// What a view is looking at. Fixed for the lifetime of the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Fleet,
    Server(String),
    Service(String),
}

impl Scope {
    pub fn from_route(params: &RouteParams) -> Result<Self, ScopeError> {
        let server_id = non_blank(params.server_id.as_deref());
        let service_id = non_blank(params.service_id.as_deref());
        match (server_id, service_id) {
            (Some(server_id), Some(service_id)) => Err(ScopeError::Conflicting {
                server_id: server_id.to_string(),
                service_id: service_id.to_string(),
            }),
            (Some(server_id), None) => Ok(Scope::Server(server_id.to_string())),
            (None, Some(service_id)) => Ok(Scope::Service(service_id.to_string())),
            (None, None) => Ok(Scope::Fleet),
        }
    }

    pub fn service_id(&self) -> Option<&str> {
        match self {
            Scope::Service(service_id) => Some(service_id),
            _ => None,
        }
    }

    pub fn server_id(&self) -> Option<&str> {
        match self {
            Scope::Server(server_id) => Some(server_id),
            _ => None,
        }
    }

    pub fn status_path(&self) -> String {
        match self {
            Scope::Fleet => "api/status/".to_string(),
            Scope::Server(server_id) => format!("api/status/server/{}", encode(server_id)),
            Scope::Service(service_id) => format!("api/status/service/{}", encode(service_id)),
        }
    }

    pub fn alerts_path(&self) -> String {
        match self {
            Scope::Fleet => "api/status/alerts/".to_string(),
            Scope::Server(server_id) => {
                format!("api/status/alerts/server/{}", encode(server_id))
            }
            Scope::Service(service_id) => {
                format!("api/status/alerts/service/{}", encode(service_id))
            }
        }
    }

    pub fn states_path(service_id: &str) -> String {
        format!("api/status/service/{}/states", encode(service_id))
    }
}

/// Path of the delete endpoint for one server or service.
pub fn item_path(kind: ItemKind, id: &str) -> String {
    format!("api/item/{}/{}", kind.as_str(), encode(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Server,
    Service,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Server => "server",
            ItemKind::Service => "service",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Fleet => f.write_str("fleet"),
            Scope::Server(server_id) => write!(f, "server {server_id}"),
            Scope::Service(service_id) => write!(f, "service {service_id}"),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_of_both_params_is_fleet_scope() {
        assert_eq!(Scope::from_route(&RouteParams::fleet()), Ok(Scope::Fleet));
        let blank = RouteParams {
            server_id: Some("  ".to_string()),
            service_id: Some(String::new()),
        };
        assert_eq!(Scope::from_route(&blank), Ok(Scope::Fleet));
    }

    #[test]
    fn both_params_conflict() {
        let params = RouteParams {
            server_id: Some("1".to_string()),
            service_id: Some("7".to_string()),
        };
        assert!(matches!(
            Scope::from_route(&params),
            Err(ScopeError::Conflicting { .. })
        ));
    }

    #[test]
    fn endpoint_paths_follow_scope() {
        let server = Scope::from_route(&RouteParams::server("3")).expect("scope");
        let service = Scope::from_route(&RouteParams::service("7")).expect("scope");

        assert_eq!(Scope::Fleet.status_path(), "api/status/");
        assert_eq!(server.status_path(), "api/status/server/3");
        assert_eq!(service.status_path(), "api/status/service/7");

        assert_eq!(Scope::Fleet.alerts_path(), "api/status/alerts/");
        assert_eq!(server.alerts_path(), "api/status/alerts/server/3");
        assert_eq!(service.alerts_path(), "api/status/alerts/service/7");

        assert_eq!(Scope::states_path("7"), "api/status/service/7/states");
        assert_eq!(service.service_id(), Some("7"));
        assert_eq!(server.server_id(), Some("3"));
        assert_eq!(server.to_string(), "server 3");
    }

    #[test]
    fn ids_are_encoded_as_single_path_segments() {
        let server = Scope::Server("a/b?c".to_string());
        let service = Scope::Service("x y#1".to_string());

        assert_eq!(server.status_path(), "api/status/server/a%2Fb%3Fc");
        assert_eq!(server.alerts_path(), "api/status/alerts/server/a%2Fb%3Fc");
        assert_eq!(service.status_path(), "api/status/service/x%20y%231");
        assert_eq!(
            Scope::states_path("../7"),
            "api/status/service/..%2F7/states"
        );
        assert_eq!(
            item_path(ItemKind::Service, "9/../1"),
            "api/item/service/9%2F..%2F1"
        );
        assert_eq!(item_path(ItemKind::Server, "1"), "api/item/server/1");
    }
}
